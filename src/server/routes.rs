//! Router configuration for the HTTP API.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/metadata/:filename", get(handlers::get_metadata))
        .route("/extract/:filename", get(handlers::get_selectable_text))
        .route("/ocr/:filename", get(handlers::get_ocr_text))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
