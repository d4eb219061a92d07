pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the application route tree (everything except `/health`).
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(jobs::router())
}
