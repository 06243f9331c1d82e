//! Handlers for server status endpoints.

use axum::extract::State;
use axum::Json;
use rankmirror_core::status::StatusView;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/status, GET /api/server_status
///
/// The last published status, reported offline once it is older than the
/// staleness window.
pub async fn get_status(State(state): State<AppState>) -> AppResult<Json<StatusView>> {
    let view = state.service.status().await?;
    Ok(Json(view))
}
