//! `rankmirror-api` -- read-only leaderboard and server status API.
//!
//! Serves the derived leaderboard and status from the cache database. With
//! `SYNC_ENABLED=true` (the default) it also runs the sync pipeline in the
//! same process; see `rankmirror-sync` for the variables it reads.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rankmirror_api::config::ServerConfig;
use rankmirror_api::router::build_app_router;
use rankmirror_api::service::{spawn_cache_purger, QueryService, QuerySettings};
use rankmirror_api::state::AppState;
use rankmirror_core::config::process_env;
use rankmirror_db::{CacheStore, DbConfig, DbPool, PgCacheStore, PgSourceStore, SourceStore};
use rankmirror_sync::{process, runner, SyncConfig, SyncOrchestrator};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// In-process sync runner and the resources it owns.
struct SyncHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    source_pool: Option<DbPool>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    process::init_tracing("rankmirror_api=debug,rankmirror_sync=debug,tower_http=debug");

    // --- Configuration ---
    let config = ServerConfig::from_vars(&process_env).expect("Invalid server configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Cache store ---
    let cache_config =
        DbConfig::cache_from_vars(&process_env).expect("Invalid cache store configuration");
    let cache_pool = rankmirror_db::create_pool(&cache_config).expect("Invalid CACHE_DATABASE_URL");
    match rankmirror_db::health_check(&cache_pool).await {
        Ok(()) => tracing::info!("Cache store health check passed"),
        Err(e) => {
            tracing::warn!(error = %e, "Cache store unreachable at startup, serving degraded")
        }
    }
    let cache: Arc<dyn CacheStore> = Arc::new(PgCacheStore::new(cache_pool.clone()));

    // --- Sync pipeline ---
    let sync = if config.sync_enabled {
        Some(start_sync(Arc::clone(&cache)))
    } else {
        tracing::info!("In-process sync disabled");
        None
    };

    // --- App state ---
    let shutdown = CancellationToken::new();
    let service = Arc::new(QueryService::new(cache, QuerySettings::from(&config)));
    let purger = spawn_cache_purger(Arc::clone(&service), shutdown.clone());
    let state = AppState { service };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(process::shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    shutdown.cancel();
    if let Some(purger) = purger {
        let _ = purger.await;
    }

    if let Some(sync) = sync {
        sync.cancel.cancel();
        let timeout = Duration::from_secs(config.shutdown_timeout_secs);
        if tokio::time::timeout(timeout, sync.task).await.is_err() {
            tracing::warn!("Timed out waiting for in-flight sync cycle");
        }
        if let Some(pool) = sync.source_pool {
            pool.close().await;
        }
    }

    cache_pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Build the orchestrator against the shared cache store and spawn the
/// scheduler + runner.
fn start_sync(cache: Arc<dyn CacheStore>) -> SyncHandle {
    let sync_config = SyncConfig::from_vars(&process_env).expect("Invalid sync configuration");
    let source_config =
        DbConfig::source_from_vars(&process_env).expect("Invalid source store configuration");

    let source_pool = source_config
        .as_ref()
        .map(rankmirror_db::create_pool)
        .transpose()
        .expect("Invalid SOURCE_DATABASE_URL");
    let source = source_pool
        .clone()
        .map(|pool| Arc::new(PgSourceStore::new(pool)) as Arc<dyn SourceStore>);

    if source.is_none() {
        tracing::warn!("SOURCE_DATABASE_URL not set, sync runs in schema-only mode");
    }

    let orchestrator = Arc::new(SyncOrchestrator::new(source, cache, sync_config.row_limit));
    let cancel = CancellationToken::new();
    let task = runner::spawn(orchestrator, sync_config.interval, cancel.clone());

    SyncHandle {
        cancel,
        task,
        source_pool,
    }
}
