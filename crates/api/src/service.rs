//! Query service: the read side of the cache store.
//!
//! Leaderboard pages go through the [`ReadCache`]; status is read from the
//! store on every call and passed through the staleness evaluation, since
//! its answer depends on the current time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rankmirror_core::leaderboard::{LeaderboardQuery, RankingType};
use rankmirror_core::status::{self, StatusView};
use rankmirror_core::types::Timestamp;
use rankmirror_db::models::character::CharacterSnapshot;
use rankmirror_db::{CacheStore, StoreError};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::read_cache::ReadCache;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A leaderboard row with its 1-based position.
#[derive(Debug, Clone, Serialize)]
pub struct RankedRow {
    pub rank: usize,
    #[serde(flatten)]
    pub row: CharacterSnapshot,
}

/// One leaderboard response, shared between cache hits.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    #[serde(rename = "type")]
    pub ranking: RankingType,
    pub limit: i64,
    pub count: usize,
    pub rows: Vec<RankedRow>,
    /// When the page was read from the store.
    pub updated_at: Timestamp,
}

impl LeaderboardPage {
    fn new(query: &LeaderboardQuery, rows: Vec<CharacterSnapshot>, fetched_at: Timestamp) -> Self {
        let rows: Vec<RankedRow> = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| RankedRow { rank: i + 1, row })
            .collect();
        Self {
            ranking: query.ranking,
            limit: query.limit,
            count: rows.len(),
            rows,
            updated_at: fetched_at,
        }
    }
}

/// Liveness of the service and its cache store.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    /// Whether the cache store answered a trivial query.
    pub db: bool,
    pub version: &'static str,
    pub time: Timestamp,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Read settings taken from [`ServerConfig`].
#[derive(Debug, Clone, Copy)]
pub struct QuerySettings {
    pub stale_after: Duration,
    pub read_cache_ttl: Duration,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl From<&ServerConfig> for QuerySettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            stale_after: config.stale_after,
            read_cache_ttl: config.read_cache_ttl,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }
}

pub struct QueryService {
    store: Arc<dyn CacheStore>,
    cache: ReadCache<LeaderboardQuery, LeaderboardPage>,
    settings: QuerySettings,
}

impl QueryService {
    pub fn new(store: Arc<dyn CacheStore>, settings: QuerySettings) -> Self {
        Self {
            store,
            cache: ReadCache::new(settings.read_cache_ttl),
            settings,
        }
    }

    /// Normalise raw request values into a query using the configured
    /// default and maximum limits.
    pub fn parse_query(
        &self,
        ranking: Option<&str>,
        name_filter: Option<&str>,
        limit: Option<&str>,
    ) -> LeaderboardQuery {
        LeaderboardQuery::from_raw(
            ranking,
            name_filter,
            limit,
            self.settings.default_limit,
            self.settings.max_limit,
        )
    }

    /// A leaderboard page, served from the read cache when a live entry
    /// exists for this exact query.
    pub async fn leaderboard(
        &self,
        query: LeaderboardQuery,
    ) -> Result<Arc<LeaderboardPage>, StoreError> {
        if let Some(page) = self.cache.get(&query) {
            tracing::trace!(ranking = %query.ranking, limit = query.limit, "Read cache hit");
            return Ok(page);
        }

        let rows = self.store.fetch_leaderboard(&query).await?;
        let page = LeaderboardPage::new(&query, rows, Utc::now());
        tracing::debug!(
            ranking = %query.ranking,
            limit = query.limit,
            rows = page.count,
            "Leaderboard read from store"
        );
        Ok(self.cache.insert(query, page))
    }

    /// Current server status with the staleness window applied.
    pub async fn status(&self) -> Result<StatusView, StoreError> {
        let record = self.store.fetch_status().await?;
        Ok(status::evaluate(record, Utc::now(), self.settings.stale_after))
    }

    /// Round-trip to the cache store. Never fails; an unreachable store is
    /// reported in the payload.
    pub async fn health(&self) -> HealthReport {
        let db = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Health check: cache store unreachable");
                false
            }
        };
        HealthReport {
            ok: db,
            db,
            version: env!("CARGO_PKG_VERSION"),
            time: Utc::now(),
        }
    }

    /// Drop expired read-cache entries.
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }
}

/// Purge expired read-cache entries once per TTL until `cancel` fires.
///
/// Entries are otherwise only dropped by the next insert, so without this a
/// burst of distinct queries stays resident through a quiet period. Returns
/// `None` when the read cache is disabled.
pub fn spawn_cache_purger(
    service: Arc<QueryService>,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    let period = service.cache.ttl();
    if period.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can have expired yet.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let purged = service.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "Purged expired read cache entries");
                    }
                }
            }
        }
        tracing::debug!("Read cache purger stopped");
    }))
}
