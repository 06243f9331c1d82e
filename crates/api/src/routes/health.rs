use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};

use crate::service::HealthReport;
use crate::state::AppState;

/// GET / -- plain-text banner.
async fn root() -> &'static str {
    "OK - rankmirror-api is running"
}

/// GET /health, GET /api/health -- service and cache store health.
///
/// Responds 503 when the cache store is unreachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.service.health().await;
    let status = if report.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// Mount the root banner and health check (NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
