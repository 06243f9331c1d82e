use std::sync::Arc;

use crate::service::QueryService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Read side of the cache store, including the read cache.
    pub service: Arc<QueryService>,
}
