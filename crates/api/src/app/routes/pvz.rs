use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use pvz_core::PickupPointId;
use pvz_infra::document_store::{Pagination, TimeWindow};
use pvz_infra::lifecycle;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_pvz).get(list_pvz))
        .route("/:id", get(get_pvz))
        .route("/:id/delete_last_product", post(delete_last_product))
        .route("/:id/close_last_reception", post(close_last_reception))
}

pub(crate) fn parse_point_id(raw: &str) -> Result<PickupPointId, axum::response::Response> {
    raw.parse().map_err(|_| errors::invalid_id("pvz"))
}

pub async fn register_pvz(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<dto::CreatePvzRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize(&actor, authz::REGISTER_POINT) {
        return resp;
    }
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", e.body_text()),
    };

    match services.engine.register_pickup_point(&body.city).await {
        Ok(point) => (StatusCode::CREATED, Json(dto::PvzDto::from(&point))).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn list_pvz(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::ListPvzQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize(&actor, authz::READ_POINTS) {
        return resp;
    }

    let window = match TimeWindow::from_raw(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        lifecycle::now(),
    ) {
        Ok(w) => w,
        Err(e) => return errors::lifecycle_error_to_response(e.into()),
    };
    let pagination = Pagination::from_raw(query.limit.as_deref(), query.offset.as_deref());

    match services.engine.list_in_interval(window, pagination).await {
        Ok(points) => {
            let items: Vec<dto::PvzWithReceptions> = points.iter().map(Into::into).collect();
            Json(items).into_response()
        }
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn get_pvz(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize(&actor, authz::READ_POINTS) {
        return resp;
    }
    let id = match parse_point_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine.pickup_point(id).await {
        Ok(point) => Json(dto::PvzWithReceptions::from(&point)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn delete_last_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize(&actor, authz::RECEPTION_OPS) {
        return resp;
    }
    let id = match parse_point_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine.remove_last_product(id).await {
        Ok(product) => Json(dto::ProductDto::from(&product)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn close_last_reception(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize(&actor, authz::RECEPTION_OPS) {
        return resp;
    }
    let id = match parse_point_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine.close_reception(id, lifecycle::now()).await {
        Ok(reception) => Json(dto::ReceptionDto::from(&reception)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
