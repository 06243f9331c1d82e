//! Store seams used by the sync pipeline and the read API.
//!
//! The source store (the game database) is only ever read; the cache store
//! holds the derived leaderboard and the status row. The two are backed by
//! separate pools so a failure of one never affects the other.

use async_trait::async_trait;
use rankmirror_core::leaderboard::LeaderboardQuery;
use rankmirror_core::status::StatusRecord;
use rankmirror_core::types::Timestamp;

use crate::error::StoreError;
use crate::models::character::CharacterSnapshot;
use crate::repositories::schema_repo::ReconcileReport;
use crate::repositories::source_character_repo::{SourceColumns, SOURCE_TABLE};
use crate::repositories::{
    LeaderboardRepo, SchemaRepo, ServerStatusRepo, SessionRepo, SourceCharacterRepo,
};
use crate::DbPool;

/// Read access to the authoritative game database.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Up to `limit` non-privileged characters, highest level first.
    async fn extract(&self, limit: i64) -> Result<Vec<CharacterSnapshot>, StoreError>;

    /// Number of active sessions on non-privileged characters.
    async fn count_online(&self) -> Result<i64, StoreError>;
}

/// Read/write access to the derived cache database.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Ensure the derived tables exist with the expected columns.
    async fn reconcile(&self) -> Result<ReconcileReport, StoreError>;

    /// Atomically replace the leaderboard contents. Returns rows written.
    async fn replace_snapshot(&self, rows: &[CharacterSnapshot]) -> Result<u64, StoreError>;

    /// Upsert the status row. Returns `false` when a newer write already
    /// exists and this one was discarded.
    async fn publish_status(
        &self,
        is_online: bool,
        online_count: i64,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// One ranked leaderboard page.
    async fn fetch_leaderboard(
        &self,
        query: &LeaderboardQuery,
    ) -> Result<Vec<CharacterSnapshot>, StoreError>;

    /// The stored status row, if any.
    async fn fetch_status(&self) -> Result<Option<StatusRecord>, StoreError>;

    /// Trivial round-trip.
    async fn ping(&self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL implementations
// ---------------------------------------------------------------------------

/// [`SourceStore`] backed by a PostgreSQL game database.
#[derive(Clone)]
pub struct PgSourceStore {
    pool: DbPool,
}

impl PgSourceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceStore for PgSourceStore {
    async fn extract(&self, limit: i64) -> Result<Vec<CharacterSnapshot>, StoreError> {
        let present = SourceCharacterRepo::present_columns(&self.pool)
            .await
            .map_err(|e| StoreError::classify(e, StoreError::Extract))?;

        let columns =
            SourceColumns::resolve(&present).map_err(|columns| StoreError::MissingColumns {
                table: SOURCE_TABLE,
                columns,
            })?;

        SourceCharacterRepo::extract(&self.pool, columns, limit)
            .await
            .map_err(|e| StoreError::classify(e, StoreError::Extract))
    }

    async fn count_online(&self) -> Result<i64, StoreError> {
        SessionRepo::count_online(&self.pool)
            .await
            .map_err(|e| StoreError::classify(e, StoreError::Probe))
    }
}

/// [`CacheStore`] backed by the PostgreSQL cache database.
#[derive(Clone)]
pub struct PgCacheStore {
    pool: DbPool,
}

impl PgCacheStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        SchemaRepo::reconcile(&self.pool)
            .await
            .map_err(|e| StoreError::classify(e, StoreError::Schema))
    }

    async fn replace_snapshot(&self, rows: &[CharacterSnapshot]) -> Result<u64, StoreError> {
        LeaderboardRepo::replace_all(&self.pool, rows)
            .await
            .map_err(|e| StoreError::classify(e, StoreError::Replace))
    }

    async fn publish_status(
        &self,
        is_online: bool,
        online_count: i64,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError> {
        ServerStatusRepo::upsert(&self.pool, is_online, online_count, updated_at)
            .await
            .map_err(|e| StoreError::classify(e, StoreError::Publish))
    }

    async fn fetch_leaderboard(
        &self,
        query: &LeaderboardQuery,
    ) -> Result<Vec<CharacterSnapshot>, StoreError> {
        LeaderboardRepo::fetch_page(&self.pool, query)
            .await
            .map_err(|e| StoreError::classify(e, StoreError::Query))
    }

    async fn fetch_status(&self) -> Result<Option<StatusRecord>, StoreError> {
        let row = ServerStatusRepo::get(&self.pool)
            .await
            .map_err(|e| StoreError::classify(e, StoreError::Query))?;
        Ok(row.map(StatusRecord::from))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::classify(e, StoreError::Query))
    }
}
