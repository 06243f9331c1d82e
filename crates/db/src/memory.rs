//! In-memory [`SourceStore`] and [`CacheStore`] implementations.
//!
//! They mirror the semantics of the PostgreSQL stores (GM filtering,
//! ordering, atomic replace, monotonic status writes) and add failure
//! injection and call counters for tests. Locks are never held across an
//! `.await`.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rankmirror_core::leaderboard::{LeaderboardQuery, RankingType};
use rankmirror_core::status::StatusRecord;
use rankmirror_core::types::Timestamp;

use crate::error::StoreError;
use crate::models::character::CharacterSnapshot;
use crate::models::status::UNSET_UPDATED_AT;
use crate::repositories::schema_repo::ReconcileReport;
use crate::store::{CacheStore, SourceStore};

fn injected(stage: fn(sqlx::Error) -> StoreError, what: &str) -> StoreError {
    stage(sqlx::Error::Protocol(format!("injected {what} failure")))
}

fn unreachable_store() -> StoreError {
    StoreError::Connectivity(sqlx::Error::PoolTimedOut)
}

/// Order two rows the way the cache store's ORDER BY clauses do.
pub fn compare_rows(
    ranking: RankingType,
    a: &CharacterSnapshot,
    b: &CharacterSnapshot,
) -> CmpOrdering {
    let primary = match ranking {
        RankingType::Level => CmpOrdering::Equal,
        RankingType::Fame => b.fame.cmp(&a.fame),
        RankingType::Currency => b.meso.cmp(&a.meso),
        RankingType::Aux1 => b.dog_points.cmp(&a.dog_points),
        RankingType::Aux2 => b.fish_points.cmp(&a.fish_points),
    };
    primary
        .then_with(|| b.level.cmp(&a.level))
        .then_with(|| a.name.cmp(&b.name))
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// A character row in the in-memory game database.
#[derive(Debug, Clone)]
pub struct SourceCharacter {
    pub snapshot: CharacterSnapshot,
    pub gm: bool,
    pub account_id: i64,
    pub logged_in: bool,
}

impl SourceCharacter {
    /// A non-GM, logged-out character with zeroed counters.
    pub fn new(name: &str, level: i32) -> Self {
        Self {
            snapshot: CharacterSnapshot {
                name: name.to_string(),
                job: 0,
                level,
                fame: 0,
                meso: 0,
                dog_points: 0,
                fish_points: 0,
            },
            gm: false,
            account_id: 0,
            logged_in: false,
        }
    }

    pub fn gm(mut self) -> Self {
        self.gm = true;
        self
    }

    pub fn online(mut self, account_id: i64) -> Self {
        self.account_id = account_id;
        self.logged_in = true;
        self
    }

    pub fn with_meso(mut self, meso: i64) -> Self {
        self.snapshot.meso = meso;
        self
    }

    pub fn with_fame(mut self, fame: i32) -> Self {
        self.snapshot.fame = fame;
        self
    }
}

/// In-memory game database.
#[derive(Default)]
pub struct MemorySourceStore {
    characters: RwLock<Vec<SourceCharacter>>,
    fail_extract: AtomicBool,
    fail_probe: AtomicBool,
    extract_delay: Mutex<Duration>,
    extract_calls: AtomicUsize,
}

impl MemorySourceStore {
    pub fn new(characters: Vec<SourceCharacter>) -> Self {
        Self {
            characters: RwLock::new(characters),
            ..Self::default()
        }
    }

    pub fn set_characters(&self, characters: Vec<SourceCharacter>) {
        *self.characters.write().unwrap_or_else(|e| e.into_inner()) = characters;
    }

    /// Make extraction fail as if the store were unreachable.
    pub fn fail_extract(&self, fail: bool) {
        self.fail_extract.store(fail, Ordering::SeqCst);
    }

    /// Make the online probe fail as if the store were unreachable.
    pub fn fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    /// Delay every extraction, to hold a cycle in flight.
    pub fn set_extract_delay(&self, delay: Duration) {
        *self.extract_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn extract(&self, limit: i64) -> Result<Vec<CharacterSnapshot>, StoreError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.extract_delay.lock().unwrap_or_else(|e| e.into_inner());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_extract.load(Ordering::SeqCst) {
            return Err(unreachable_store());
        }

        let characters = self.characters.read().unwrap_or_else(|e| e.into_inner());
        let mut rows: Vec<CharacterSnapshot> = characters
            .iter()
            .filter(|c| !c.gm)
            .map(|c| c.snapshot.clone())
            .collect();
        rows.sort_by(|a, b| compare_rows(RankingType::Level, a, b));
        rows.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn count_online(&self) -> Result<i64, StoreError> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(unreachable_store());
        }
        let characters = self.characters.read().unwrap_or_else(|e| e.into_inner());
        let mut accounts: Vec<i64> = characters
            .iter()
            .filter(|c| !c.gm && c.logged_in)
            .map(|c| c.account_id)
            .collect();
        accounts.sort_unstable();
        accounts.dedup();
        Ok(accounts.len() as i64)
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// In-memory cache database.
#[derive(Default)]
pub struct MemoryCacheStore {
    rows: RwLock<Vec<CharacterSnapshot>>,
    status: RwLock<Option<StatusRecord>>,
    reconciled: AtomicBool,
    fail_reconcile: AtomicBool,
    fail_replace: AtomicBool,
    fail_publish: AtomicBool,
    unreachable: AtomicBool,
    reconcile_calls: AtomicUsize,
    replace_calls: AtomicUsize,
    publish_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the leaderboard table directly, bypassing the replacer.
    pub fn with_rows(rows: Vec<CharacterSnapshot>) -> Self {
        Self {
            rows: RwLock::new(rows),
            ..Self::default()
        }
    }

    /// Seed the status row directly, bypassing the publisher.
    pub fn set_status(&self, status: Option<StatusRecord>) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub fn fail_reconcile(&self, fail: bool) {
        self.fail_reconcile.store(fail, Ordering::SeqCst);
    }

    pub fn fail_replace(&self, fail: bool) {
        self.fail_replace.store(fail, Ordering::SeqCst);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make every read fail as if the store were unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Current leaderboard contents, in storage order.
    pub fn rows(&self) -> Vec<CharacterSnapshot> {
        self.rows.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn status(&self) -> Option<StatusRecord> {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_reconciled(&self) -> bool {
        self.reconciled.load(Ordering::SeqCst)
    }

    pub fn reconcile_calls(&self) -> usize {
        self.reconcile_calls.load(Ordering::SeqCst)
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    /// Number of leaderboard reads that reached the store.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(unreachable_store());
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        self.reconcile_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        if self.fail_reconcile.load(Ordering::SeqCst) {
            return Err(injected(StoreError::Schema, "reconcile"));
        }

        self.reconciled.store(true, Ordering::SeqCst);
        let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
        if status.is_none() {
            *status = Some(StatusRecord {
                is_online: false,
                online_count: 0,
                updated_at: UNSET_UPDATED_AT,
            });
        }

        Ok(ReconcileReport {
            columns_added: Vec::new(),
            keys_added: Vec::new(),
            widened_currency: false,
            canonical_order: true,
        })
    }

    async fn replace_snapshot(&self, rows: &[CharacterSnapshot]) -> Result<u64, StoreError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(injected(StoreError::Replace, "replace"));
        }

        let mut fresh: Vec<CharacterSnapshot> = Vec::with_capacity(rows.len());
        for row in rows {
            if !fresh.iter().any(|r| r.name == row.name) {
                fresh.push(row.clone());
            }
        }
        let written = fresh.len() as u64;
        *self.rows.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        Ok(written)
    }

    async fn publish_status(
        &self,
        is_online: bool,
        online_count: i64,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(injected(StoreError::Publish, "publish"));
        }

        let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
        if matches!(*status, Some(current) if current.updated_at > updated_at) {
            return Ok(false);
        }
        *status = Some(StatusRecord {
            is_online,
            online_count: online_count.max(0),
            updated_at,
        });
        Ok(true)
    }

    async fn fetch_leaderboard(
        &self,
        query: &LeaderboardQuery,
    ) -> Result<Vec<CharacterSnapshot>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let needle = query.name_filter.as_ref().map(|f| f.to_lowercase());
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        let mut page: Vec<CharacterSnapshot> = rows
            .iter()
            .filter(|r| {
                needle
                    .as_ref()
                    .map_or(true, |n| r.name.to_lowercase().contains(n.as_str()))
            })
            .cloned()
            .collect();
        page.sort_by(|a, b| compare_rows(query.ranking, a, b));
        page.truncate(usize::try_from(query.limit.max(0)).unwrap_or(usize::MAX));
        Ok(page)
    }

    async fn fetch_status(&self) -> Result<Option<StatusRecord>, StoreError> {
        self.check_reachable()?;
        Ok(self.status().filter(|s| s.updated_at > UNSET_UPDATED_AT))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_reachable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, level: i32, meso: i64) -> CharacterSnapshot {
        SourceCharacter::new(name, level).with_meso(meso).snapshot
    }

    #[test]
    fn currency_ranking_breaks_ties_by_level_then_name() {
        let mut rows = vec![row("b", 10, 5), row("a", 10, 5), row("c", 20, 5), row("d", 1, 9)];
        rows.sort_by(|x, y| compare_rows(RankingType::Currency, x, y));
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["d", "c", "a", "b"]);
    }

    #[tokio::test]
    async fn extract_skips_gms_and_orders_by_level() {
        let source = MemorySourceStore::new(vec![
            SourceCharacter::new("low", 10),
            SourceCharacter::new("admin", 250).gm(),
            SourceCharacter::new("high", 90),
        ]);
        let rows = source.extract(200).await.unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["high", "low"]);
    }

    #[tokio::test]
    async fn count_online_counts_distinct_accounts() {
        let source = MemorySourceStore::new(vec![
            SourceCharacter::new("a1", 10).online(1),
            SourceCharacter::new("a2", 10).online(1),
            SourceCharacter::new("b", 10).online(2),
            SourceCharacter::new("gm", 10).gm().online(3),
        ]);
        assert_eq!(source.count_online().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn older_status_write_is_discarded() {
        let cache = MemoryCacheStore::new();
        let now = chrono::Utc::now();
        assert!(cache.publish_status(true, 5, now).await.unwrap());
        let earlier = now - chrono::Duration::seconds(5);
        assert!(!cache.publish_status(false, 0, earlier).await.unwrap());
        assert!(cache.status().unwrap().is_online);
    }

    #[tokio::test]
    async fn seeded_status_is_hidden_and_never_blocks_a_publish() {
        let cache = MemoryCacheStore::new();
        cache.reconcile().await.unwrap();
        assert!(cache.fetch_status().await.unwrap().is_none());

        let behind = chrono::Utc::now() - chrono::Duration::seconds(1);
        assert!(cache.publish_status(true, 2, behind).await.unwrap());
        assert_eq!(cache.fetch_status().await.unwrap().unwrap().online_count, 2);
    }
}
