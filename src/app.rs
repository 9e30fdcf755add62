use axum::{Router, routing::{get, post}};
use std::sync::Arc;
use crate::handlers::{health_handler, metrics_handler, submit_task_handler};
use crate::state::AppState;

// creating the router with routes
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/task", post(submit_task_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
