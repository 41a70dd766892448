use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all Dolphins endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/diver", post(handler::add_diver).get(handler::get_diver))
        .route("/diver/history", get(handler::get_history))
        .route("/level", post(handler::add_level))
        .route("/course", post(handler::add_course))
        .route("/test", post(handler::add_test_result))
        .route("/invoke", post(handler::invoke))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
