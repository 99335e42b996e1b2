use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::app::errors;
use crate::context::{ActorContext, ActorRole};

/// Header carrying the caller's role, set by the auth gateway in front of us.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let role = match extract_role(req.headers()) {
        Ok(role) => role,
        Err(message) => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", message);
        }
    };

    req.extensions_mut().insert(ActorContext::new(role));
    next.run(req).await
}

fn extract_role(headers: &HeaderMap) -> Result<ActorRole, &'static str> {
    let header = headers
        .get(ACTOR_ROLE_HEADER)
        .ok_or("missing actor role")?;

    let header = header.to_str().map_err(|_| "malformed actor role")?;

    header.parse().map_err(|_| "unknown actor role")
}
