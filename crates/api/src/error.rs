use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rankmirror_db::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses
/// of the form `{ "error": ..., "code": ... }`. Store details never reach
/// the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A cache store failure on the read path.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Store(err) if err.is_connectivity() => {
                tracing::warn!(error = %err, "Cache store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "The data store is temporarily unavailable",
                )
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "Cache store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
