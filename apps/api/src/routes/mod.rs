pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::matching::handlers as matching;
use crate::resume::handlers as resume;
use crate::state::AppState;

/// Resume PDFs rarely exceed a few hundred KB; the axum default of 2 MB is too tight
/// for scanned ones.
const RESUME_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching API
        .route("/api/v1/index/status", get(matching::handle_index_status))
        .route("/api/v1/matches", post(matching::handle_match))
        // Resume API
        .route(
            "/api/v1/resumes/match",
            post(resume::handle_resume_match).layer(DefaultBodyLimit::max(RESUME_UPLOAD_LIMIT)),
        )
        .with_state(state)
}
