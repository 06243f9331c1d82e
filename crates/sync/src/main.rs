//! `rankmirror-sync` -- standalone leaderboard sync daemon.
//!
//! Copies the leaderboard snapshot and server status from the game
//! database into the cache database on a fixed interval. With
//! `SYNC_RUN_ONCE=true` it runs a single cycle and exits, for cron-style
//! invocation; the exit code is non-zero if any stage failed.
//!
//! # Environment variables
//!
//! | Variable              | Required | Default | Description                       |
//! |-----------------------|----------|---------|-----------------------------------|
//! | `CACHE_DATABASE_URL`  | yes      | --      | Cache store connection string     |
//! | `SOURCE_DATABASE_URL` | no       | --      | Game database; unset = schema-only mode |
//! | `SYNC_INTERVAL_SECS`  | no       | `60`    | Seconds between cycles            |
//! | `SYNC_ROW_LIMIT`      | no       | `200`   | Rows copied per cycle             |
//! | `SYNC_RUN_ONCE`       | no       | `false` | Run one cycle and exit            |

use std::sync::Arc;

use rankmirror_core::config::process_env;
use rankmirror_db::{CacheStore, DbConfig, PgCacheStore, PgSourceStore, SourceStore};
use rankmirror_sync::orchestrator::CycleOutcome;
use rankmirror_sync::{process, runner, SyncConfig, SyncOrchestrator};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    process::init_tracing("rankmirror_sync=debug");

    let config = SyncConfig::from_vars(&process_env).expect("Invalid sync configuration");
    let cache_config =
        DbConfig::cache_from_vars(&process_env).expect("Invalid cache store configuration");
    let source_config =
        DbConfig::source_from_vars(&process_env).expect("Invalid source store configuration");

    let cache_pool = rankmirror_db::create_pool(&cache_config).expect("Invalid CACHE_DATABASE_URL");
    let cache: Arc<dyn CacheStore> = Arc::new(PgCacheStore::new(cache_pool.clone()));

    let source_pool = source_config
        .as_ref()
        .map(rankmirror_db::create_pool)
        .transpose()
        .expect("Invalid SOURCE_DATABASE_URL");
    let source: Option<Arc<dyn SourceStore>> = source_pool
        .clone()
        .map(|pool| Arc::new(PgSourceStore::new(pool)) as Arc<dyn SourceStore>);

    if source.is_none() {
        tracing::warn!("SOURCE_DATABASE_URL not set, running in schema-only mode");
    }

    let orchestrator = Arc::new(SyncOrchestrator::new(source, cache, config.row_limit));

    let clean = if config.run_once {
        match runner::run_once(&orchestrator).await {
            CycleOutcome::Completed(report) => report.is_clean(),
            CycleOutcome::Skipped => false,
        }
    } else {
        tracing::info!(
            interval_secs = config.interval.as_secs(),
            row_limit = config.row_limit,
            "Starting rankmirror-sync"
        );
        let cancel = CancellationToken::new();
        let handle = runner::spawn(Arc::clone(&orchestrator), config.interval, cancel.clone());

        process::shutdown_signal().await;
        cancel.cancel();

        if tokio::time::timeout(config.shutdown_timeout, handle)
            .await
            .is_err()
        {
            tracing::warn!("Timed out waiting for in-flight sync cycle");
        }
        true
    };

    cache_pool.close().await;
    if let Some(pool) = source_pool {
        pool.close().await;
    }

    if !clean {
        std::process::exit(1);
    }
}
