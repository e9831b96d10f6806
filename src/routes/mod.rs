use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod error;
pub mod generate;
pub mod health;
pub mod metrics;
pub mod tasks;

/// Build the API router with its middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        // Request form (embedded at compile time)
        .route("/form", get(|| async { Html(include_str!("../../static/form.html")) }))
        .route("/generate_dataset", post(generate::generate_dataset))
        .route("/tasks", post(tasks::submit_task))
        .route("/tasks/{task_id}", get(tasks::get_task_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)) // 1 MB limit
}
