pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::optimization::handlers;
use crate::state::AppState;

/// Uploaded resume PDFs are small; anything larger is rejected before parsing.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume intake
        .route("/api/resume/extract-name", post(handlers::handle_extract_name))
        .route(
            "/api/resume/parse-pdf",
            post(handlers::handle_parse_pdf).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Job intake
        .route("/api/job/parse", post(handlers::handle_parse_job))
        // Optimize-validate loop
        .route("/api/optimize", post(handlers::handle_optimize))
        // Artifacts
        .route("/api/history", get(handlers::handle_history))
        .route(
            "/api/history/download/:filename",
            get(handlers::handle_download),
        )
        .route("/api/settings", get(handlers::handle_settings))
        .with_state(state)
}
