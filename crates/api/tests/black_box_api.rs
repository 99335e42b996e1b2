use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use pvz_api::app::services::AppServices;
use pvz_pickup::Catalog;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let services = Arc::new(AppServices::in_memory(Catalog::default()));
        let app = pvz_api::app::build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn post(&self, role: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("X-Actor-Role", role);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, role: &str, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("X-Actor-Role", role)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn register(&self, city: &str) -> String {
        let (status, body) = self.post("moderator", "/pvz", Some(json!({ "city": city }))).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_needs_no_role() {
    let server = TestServer::spawn().await;
    let resp = reqwest::get(format!("{}/health", server.base_url)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_role_is_unauthorized() {
    let server = TestServer::spawn().await;
    let resp = server
        .client
        .post(format!("{}/pvz", server.base_url))
        .json(&json!({ "city": "Москва" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn roles_are_enforced_per_route() {
    let server = TestServer::spawn().await;

    let (status, body) = server.post("employee", "/pvz", Some(json!({ "city": "Москва" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let id = server.register("Москва").await;
    let (status, _) = server
        .post("moderator", "/receptions", Some(json!({ "pvzId": id })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server.get("employee", &format!("/pvz/{id}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn full_reception_flow() {
    let server = TestServer::spawn().await;
    let id = server.register("Москва").await;

    let (status, reception) = server
        .post("employee", "/receptions", Some(json!({ "pvzId": id })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reception["status"], "in_progress");
    assert_eq!(reception["pvzId"], json!(id));

    let (status, body) = server
        .post("employee", "/receptions", Some(json!({ "pvzId": id })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "reception_already_open");

    for product_type in ["электроника", "одежда"] {
        let (status, product) = server
            .post(
                "employee",
                "/products",
                Some(json!({ "type": product_type, "pvzId": id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(product["type"], product_type);
        assert_eq!(product["receptionId"], reception["id"]);
    }

    let (status, removed) = server
        .post("employee", &format!("/pvz/{id}/delete_last_product"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["type"], "одежда");

    let (status, closed) = server
        .post("employee", &format!("/pvz/{id}/close_last_reception"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "close");
    assert!(closed["closedAt"].is_string());

    let (status, body) = server
        .post("employee", &format!("/pvz/{id}/delete_last_product"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "no_open_reception");

    let (status, point) = server.get("moderator", &format!("/pvz/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(point["pvz"]["city"], "Москва");
    let receptions = point["receptions"].as_array().unwrap();
    assert_eq!(receptions.len(), 1);
    assert_eq!(receptions[0]["products"].as_array().unwrap().len(), 1);
    assert_eq!(receptions[0]["products"][0]["type"], "электроника");
}

#[tokio::test]
async fn empty_stack_removal_conflicts() {
    let server = TestServer::spawn().await;
    let id = server.register("Казань").await;
    server
        .post("employee", "/receptions", Some(json!({ "pvzId": id })))
        .await;

    let (status, body) = server
        .post("employee", &format!("/pvz/{id}/delete_last_product"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "empty_product_stack");
}

#[tokio::test]
async fn bad_input_is_400_and_unknown_point_is_404() {
    let server = TestServer::spawn().await;

    let (status, body) = server.post("moderator", "/pvz", Some(json!({ "city": "Париж" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let (status, body) = server.post("moderator", "/pvz", Some(json!({ "town": "Москва" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let (status, body) = server.get("moderator", "/pvz/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let id = server.register("Москва").await;
    server
        .post("employee", "/receptions", Some(json!({ "pvzId": id })))
        .await;
    let (status, _) = server
        .post("employee", "/products", Some(json!({ "type": "мебель", "pvzId": id })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = "0190a6f0-0000-7000-8000-000000000000";
    let (status, body) = server.get("employee", &format!("/pvz/{missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn listing_filters_by_reception_window() {
    let server = TestServer::spawn().await;
    let active = server.register("Москва").await;
    let _idle = server.register("Санкт-Петербург").await;
    server
        .post("employee", "/receptions", Some(json!({ "pvzId": active })))
        .await;

    let (status, body) = server.get("moderator", "/pvz").await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["pvz"]["id"], json!(active));

    let (status, body) = server
        .get(
            "employee",
            "/pvz?startDate=2000-01-01T00:00:00Z&endDate=2000-01-02T00:00:00Z",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = server
        .get("employee", "/pvz?limit=abc&offset=-4")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = server
        .get(
            "moderator",
            "/pvz?startDate=2030-01-02T00:00:00Z&endDate=2030-01-01T00:00:00Z",
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}
