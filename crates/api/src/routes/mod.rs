pub mod health;

use axum::routing::get;
use axum::Router;

use crate::handlers::{leaderboard, status};
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /health               same as the root-level health check
/// /leaderboard          ranked rows (?type=&limit=&q=)
/// /rankings             alias of /leaderboard
/// /status               status with staleness applied
/// /server_status        alias of /status
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .route("/rankings", get(leaderboard::get_leaderboard))
        .route("/status", get(status::get_status))
        .route("/server_status", get(status::get_status))
}
