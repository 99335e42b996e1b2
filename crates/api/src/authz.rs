//! API-side role guard.
//!
//! Roles are checked at the route boundary, before the lifecycle engine is
//! called; the engine itself is role-agnostic.

use axum::http::StatusCode;
use axum::response::Response;

use crate::app::errors;
use crate::context::{ActorContext, ActorRole};

/// Point registration.
pub const REGISTER_POINT: &[ActorRole] = &[ActorRole::Moderator];
/// Reading and listing points.
pub const READ_POINTS: &[ActorRole] = &[ActorRole::Moderator, ActorRole::Employee];
/// Reception and product operations.
pub const RECEPTION_OPS: &[ActorRole] = &[ActorRole::Employee];

/// Reject with 403 unless the actor holds one of `allowed`.
pub fn authorize(actor: &ActorContext, allowed: &[ActorRole]) -> Result<(), Response> {
    if allowed.contains(&actor.role()) {
        return Ok(());
    }
    tracing::debug!(role = actor.role().as_str(), "role not permitted");
    Err(errors::json_error(
        StatusCode::FORBIDDEN,
        "forbidden",
        format!("role '{}' is not permitted", actor.role().as_str()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_partitioned() {
        let moderator = ActorContext::new(ActorRole::Moderator);
        let employee = ActorContext::new(ActorRole::Employee);

        assert!(authorize(&moderator, REGISTER_POINT).is_ok());
        assert!(authorize(&employee, REGISTER_POINT).is_err());
        assert!(authorize(&employee, RECEPTION_OPS).is_ok());
        assert!(authorize(&moderator, RECEPTION_OPS).is_err());
        assert!(authorize(&moderator, READ_POINTS).is_ok());
        assert!(authorize(&employee, READ_POINTS).is_ok());
    }

    #[test]
    fn forbidden_is_403() {
        let err = authorize(&ActorContext::new(ActorRole::Employee), REGISTER_POINT).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
