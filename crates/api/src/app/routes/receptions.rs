use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::app::routes::pvz::parse_point_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/", post(open_reception))
}

pub async fn open_reception(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<dto::OpenReceptionRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize(&actor, authz::RECEPTION_OPS) {
        return resp;
    }
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", e.body_text()),
    };
    let id = match parse_point_id(&body.pvz_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine.open_reception(id).await {
        Ok(reception) => (StatusCode::CREATED, Json(dto::ReceptionDto::from(&reception))).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
