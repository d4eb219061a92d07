//! Route definitions for analysis jobs.

use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Job routes, mounted at the root.
///
/// ```text
/// POST   /run-maaslin         -> run_maaslin
/// DELETE /jobs/{job_id}       -> release_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run-maaslin", post(jobs::run_maaslin))
        .route("/jobs/{job_id}", delete(jobs::release_job))
}
