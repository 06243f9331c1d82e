//! Handlers for leaderboard endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;

use crate::error::AppResult;
use crate::query::LeaderboardParams;
use crate::service::LeaderboardPage;
use crate::state::AppState;

/// GET /api/leaderboard, GET /api/rankings
///
/// Ranked rows for one ranking type. Unknown types fall back to level;
/// the limit is clamped to the configured maximum.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> AppResult<Json<Arc<LeaderboardPage>>> {
    let query = state.service.parse_query(
        params.ranking.as_deref(),
        params.name_filter(),
        params.limit.as_deref(),
    );
    let page = state.service.leaderboard(query).await?;
    Ok(Json(page))
}
