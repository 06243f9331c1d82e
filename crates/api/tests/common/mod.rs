#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use rankmirror_api::config::ServerConfig;
use rankmirror_api::router::build_app_router;
use rankmirror_api::service::{QueryService, QuerySettings};
use rankmirror_api::state::AppState;
use rankmirror_db::memory::MemoryCacheStore;

/// Build a test `ServerConfig` with safe defaults and in-process sync off.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        sync_enabled: false,
        ..ServerConfig::default()
    }
}

/// Build the full application router over an in-memory cache store.
pub fn build_test_app(store: Arc<MemoryCacheStore>) -> Router {
    build_test_app_with(store, test_config())
}

/// Same as [`build_test_app`] with a custom config.
pub fn build_test_app_with(store: Arc<MemoryCacheStore>, config: ServerConfig) -> Router {
    let service = Arc::new(QueryService::new(store, QuerySettings::from(&config)));
    let state = AppState { service };
    build_app_router(state, &config)
}

/// Config whose read cache never holds entries.
pub fn uncached_config() -> ServerConfig {
    ServerConfig {
        read_cache_ttl: Duration::ZERO,
        ..test_config()
    }
}

/// Send a GET request through the router.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
