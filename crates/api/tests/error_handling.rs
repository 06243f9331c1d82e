//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly; no router is involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use rankmirror_api::error::AppError;
use rankmirror_db::StoreError;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: connectivity failures map to 503
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connectivity_error_returns_503() {
    let err = AppError::Store(StoreError::Connectivity(sqlx::Error::PoolTimedOut));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "STORE_UNAVAILABLE");
}

// ---------------------------------------------------------------------------
// Test: other store errors map to 500 with a sanitized message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn query_error_returns_500_and_sanitizes_message() {
    let err = AppError::Store(StoreError::Query(sqlx::Error::Protocol(
        "relation \"leaderboard_snapshot\" does not exist".into(),
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: schema mismatch on the read path stays internal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_columns_return_500_without_column_names() {
    let err = AppError::Store(StoreError::MissingColumns {
        table: "leaderboard_snapshot",
        columns: vec!["fame"],
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!json["error"].as_str().unwrap().contains("fame"));
}
