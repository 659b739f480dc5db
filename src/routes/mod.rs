mod api;
mod upload;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Room for the text fields and multipart framing around the file itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/submissions",
            get(api::list_submissions).post(upload::upload_submission),
        )
        .route("/api/submissions/:submission_id", get(api::get_submission))
        .route("/api/submissions/:submission_id/file", get(api::download_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
