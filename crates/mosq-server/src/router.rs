use axum::routing::{get, post};
use axum::Router;
use mosq_engine::RewardEngine;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;

/// Build the axum router with all Mosq endpoints.
pub fn build_router(engine: RewardEngine) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/start", post(handler::start_handler))
        .route("/add_task", post(handler::add_task_handler))
        .route("/task_complete", post(handler::task_complete_handler))
        .route("/check_in", post(handler::check_in_handler))
        .route(
            "/user_data",
            get(handler::user_data_query_handler).post(handler::user_data_handler),
        )
        .route("/get_all_users", get(handler::all_users_handler))
        .route("/tasks", get(handler::tasks_handler))
        .route("/end_game", post(handler::end_game_handler))
        .layer(TraceLayer::new_for_http())
        // The mini-app front end is served from another origin.
        .layer(CorsLayer::permissive())
        .with_state(engine)
}
