//! HTTP server for the Mosq rewards ledger.
//!
//! Exposes one JSON endpoint per engine operation. Successful responses are
//! `{"data": ...}`; failures are `{"error": "..."}` with a status code that
//! separates bad input (400), unknown users or tasks (404) and store
//! outages (503).

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{ServerConfig, StoreConfig};
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::MosqServer;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use chrono::NaiveDate;
    use mosq_engine::{FixedClock, InMemoryRecordStore, RewardEngine};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use super::*;

    fn app() -> (Arc<FixedClock>, Router) {
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()));
        let engine = RewardEngine::new(Arc::new(InMemoryRecordStore::new()), clock.clone());
        (clock, build_router(engine))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (_, app) = app();
        let (status, body) = send(&app, "GET", "/v1/health", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn info_endpoint() {
        let (_, app) = app();
        let (status, body) = send(&app, "GET", "/v1/info", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["name"], "mosq-server");
    }

    #[tokio::test]
    async fn start_then_user_data() {
        let (_, app) = app();
        let (status, body) = send(
            &app,
            "POST",
            "/start",
            Some(json!({ "user_id": 1001, "is_premium": true, "text": "/start 77" })),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["created"], true);
        assert_eq!(body["data"]["invitor"], "77");

        let (status, body) = send(&app, "GET", "/user_data?user_id=1001", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["task_point"], 150);
        assert_eq!(body["data"]["fleet"], 3);

        let (_, body) = send(&app, "POST", "/user_data", Some(json!({ "user_id": "1001" }))).await;
        assert_eq!(body["data"]["uid"], "1001");
    }

    #[tokio::test]
    async fn task_completion_flow() {
        let (_, app) = app();
        send(&app, "POST", "/start", Some(json!({ "user_id": "u1" }))).await;

        let task = json!({
            "task_name": "daily-survey",
            "task_point": 20,
            "task_link": "http://x",
            "task_description": "desc",
        });
        let (status, body) = send(&app, "POST", "/add_task", Some(task.clone())).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["created"], true);
        let (_, body) = send(&app, "POST", "/add_task", Some(task)).await;
        assert_eq!(body["data"]["created"], false);

        let done = json!({ "user_id": "u1", "task_name": "daily-survey" });
        let (status, body) = send(&app, "POST", "/task_complete", Some(done.clone())).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"], json!({ "status": "credited", "points": 20 }));
        let (_, body) = send(&app, "POST", "/task_complete", Some(done)).await;
        assert_eq!(body["data"]["status"], "already_completed");

        let (_, body) = send(&app, "GET", "/user_data?user_id=u1", None).await;
        assert_eq!(body["data"]["task_point"], 120);
        assert_eq!(body["data"]["completed_tasks"], json!(["daily-survey"]));

        let (_, body) = send(&app, "GET", "/tasks", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["completed_by"], json!(["u1"]));
    }

    #[tokio::test]
    async fn end_game_overflow_is_bad_request() {
        let (_, app) = app();
        send(&app, "POST", "/start", Some(json!({ "user_id": 5 }))).await;

        let (status, body) = send(
            &app,
            "POST",
            "/end_game",
            Some(json!({ "user_id": 5, "game_points": i64::MAX })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("out of range"));

        let (status, body) = send(&app, "GET", "/user_data?user_id=5", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["task_point"], 100);
        assert_eq!(body["data"]["fleet"], 3);
    }

    #[tokio::test]
    async fn check_in_and_end_game() {
        let (clock, app) = app();
        send(&app, "POST", "/start", Some(json!({ "user_id": 5 }))).await;

        let (_, body) = send(&app, "POST", "/end_game", Some(json!({ "user_id": 5, "game_points": 12 }))).await;
        assert_eq!(body["data"]["task_point"], 112);
        assert_eq!(body["data"]["fleet"], 2);

        clock.advance_days(3);
        let (status, body) = send(&app, "POST", "/check_in", Some(json!({ "user_id": 5 }))).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["fleet"], 5);
        assert_eq!(body["data"]["checkin"], "2024-07-04");
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let (_, app) = app();
        let (status, body) = send(&app, "POST", "/check_in", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing field: user_id");

        let (status, body) = send(&app, "POST", "/add_task", Some(json!({ "task_name": "t" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing field: task_point");
    }

    #[tokio::test]
    async fn unknown_user_and_task_are_not_found() {
        let (_, app) = app();
        let (status, body) = send(&app, "GET", "/user_data?user_id=ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user not found: ghost");

        send(&app, "POST", "/start", Some(json!({ "user_id": "u1" }))).await;
        let (status, _) = send(
            &app,
            "POST",
            "/task_complete",
            Some(json!({ "user_id": "u1", "task_name": "ghost" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_all_users_lists_everyone() {
        let (_, app) = app();
        send(&app, "POST", "/start", Some(json!({ "user_id": "a" }))).await;
        send(&app, "POST", "/start", Some(json!({ "user_id": "b" }))).await;
        let (status, body) = send(&app, "GET", "/get_all_users", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (_, app) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/check_in")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
