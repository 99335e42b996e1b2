use axum::Router;

pub mod products;
pub mod pvz;
pub mod receptions;
pub mod system;

/// Router for all endpoints that require an actor role.
pub fn router() -> Router {
    Router::new()
        .nest("/pvz", pvz::router())
        .nest("/receptions", receptions::router())
        .nest("/products", products::router())
}
