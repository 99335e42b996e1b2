use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use pvz_infra::LifecycleError;

pub fn lifecycle_error_to_response(err: LifecycleError) -> axum::response::Response {
    let status = match &err {
        LifecycleError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        LifecycleError::PreconditionFailed(_) => StatusCode::CONFLICT,
        LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
        LifecycleError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LifecycleError::CorruptAggregate(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvz_core::Precondition;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (LifecycleError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                LifecycleError::PreconditionFailed(Precondition::ReceptionAlreadyOpen),
                StatusCode::CONFLICT,
            ),
            (LifecycleError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (LifecycleError::StorageUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (LifecycleError::CorruptAggregate("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(lifecycle_error_to_response(err).status(), status);
        }
    }
}
