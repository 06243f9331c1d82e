//! One synchronisation cycle, guarded so only one runs at a time.
//!
//! ```text
//! Idle -> Reconciling (until it first succeeds)
//!      -> Extracting -> Replacing -> Probing
//!      -> Publishing -> Idle
//! ```
//!
//! A failed extraction skips straight to Publishing with the server marked
//! offline and leaves the previous snapshot untouched. A failed replace or
//! probe never prevents the status from being published.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rankmirror_core::types::Timestamp;
use rankmirror_db::repositories::schema_repo::ReconcileReport;
use rankmirror_db::{CacheStore, SourceStore, StoreError};
use serde::Serialize;
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Phase / report types
// ---------------------------------------------------------------------------

/// Where the orchestrator currently is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Reconciling,
    Extracting,
    Replacing,
    Probing,
    Publishing,
}

/// What happened to the leaderboard snapshot during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum SnapshotOutcome {
    /// The snapshot was replaced with `written` rows.
    Replaced { extracted: usize, written: u64 },
    /// Extraction failed; the previous snapshot was kept.
    ExtractFailed { connectivity: bool },
    /// Extraction succeeded but the write failed; the previous snapshot was kept.
    ReplaceFailed { extracted: usize },
    /// No source store is configured.
    SchemaOnly,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub snapshot: SnapshotOutcome,
    pub is_online: bool,
    pub online_count: i64,
    /// Whether the status row was written.
    pub published: bool,
}

impl CycleReport {
    /// Every stage that was attempted succeeded.
    pub fn is_clean(&self) -> bool {
        self.published
            && matches!(
                self.snapshot,
                SnapshotOutcome::Replaced { .. } | SnapshotOutcome::SchemaOnly
            )
    }
}

/// Result of asking the orchestrator to run a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was already in flight.
    Skipped,
}

// ---------------------------------------------------------------------------
// Single-flight guard
// ---------------------------------------------------------------------------

/// Marks a cycle as in flight; clears the flag and resets the phase on drop,
/// including when the cycle future is cancelled.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    phase: &'a watch::Sender<SyncPhase>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, phase: &'a watch::Sender<SyncPhase>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, phase })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(SyncPhase::Idle);
        self.flag.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives sync cycles against a source and a cache store.
///
/// Holds no lock across store round-trips; mutual exclusion between cycles
/// is a single atomic flag, and a cycle requested while another is running
/// is rejected rather than queued.
pub struct SyncOrchestrator {
    source: Option<Arc<dyn SourceStore>>,
    cache: Arc<dyn CacheStore>,
    row_limit: i64,
    in_flight: AtomicBool,
    reconciled: AtomicBool,
    phase: watch::Sender<SyncPhase>,
    last_report: Mutex<Option<CycleReport>>,
}

impl SyncOrchestrator {
    /// `source = None` runs in schema-only mode: each cycle reconciles and
    /// publishes the server as offline.
    pub fn new(
        source: Option<Arc<dyn SourceStore>>,
        cache: Arc<dyn CacheStore>,
        row_limit: i64,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            source,
            cache,
            row_limit,
            in_flight: AtomicBool::new(false),
            reconciled: AtomicBool::new(false),
            phase,
            last_report: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Watch phase transitions.
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Whether schema reconciliation has succeeded in this process.
    pub fn is_reconciled(&self) -> bool {
        self.reconciled.load(Ordering::Acquire)
    }

    /// Report of the most recent completed cycle.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Reconcile the cache schema. Failures are logged and returned; the
    /// next cycle retries until one succeeds.
    pub async fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        self.phase.send_replace(SyncPhase::Reconciling);
        let result = self.cache.reconcile().await;
        if !self.in_flight.load(Ordering::Acquire) {
            self.phase.send_replace(SyncPhase::Idle);
        }

        match &result {
            Ok(report) => {
                self.reconciled.store(true, Ordering::Release);
                if !report.columns_added.is_empty() {
                    tracing::info!(columns = ?report.columns_added, "Schema: added missing columns");
                }
                if !report.keys_added.is_empty() {
                    tracing::warn!(indexes = ?report.keys_added, "Schema: added missing unique keys");
                }
                if report.widened_currency {
                    tracing::info!("Schema: widened currency column to BIGINT");
                }
                if !report.canonical_order {
                    tracing::debug!("Schema: leaderboard columns are not in canonical order (cosmetic)");
                }
                tracing::info!("Schema reconciled");
            }
            Err(e) => {
                tracing::error!(error = %e, "Schema reconciliation failed");
            }
        }
        result
    }

    /// Run one cycle, or return [`CycleOutcome::Skipped`] if one is already
    /// in flight.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight, &self.phase) else {
            tracing::debug!("Sync cycle already in flight, skipping tick");
            return CycleOutcome::Skipped;
        };

        let started_at = Utc::now();

        if !self.is_reconciled() {
            // Already logged; the derived table may still be usable.
            let _ = self.reconcile().await;
        }

        let (snapshot, is_online, online_count) = match &self.source {
            None => (SnapshotOutcome::SchemaOnly, false, 0),
            Some(source) => self.sync_snapshot(source.as_ref()).await,
        };

        self.phase.send_replace(SyncPhase::Publishing);
        let published = match self
            .cache
            .publish_status(is_online, online_count, Utc::now())
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!("Status publish superseded by a newer write");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Status publish failed");
                false
            }
        };

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            snapshot,
            is_online,
            online_count,
            published,
        };

        tracing::info!(
            snapshot = ?report.snapshot,
            is_online,
            online_count,
            published,
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Sync cycle finished"
        );

        *self.last_report.lock().unwrap_or_else(|e| e.into_inner()) = Some(report.clone());
        CycleOutcome::Completed(report)
    }

    /// Extract, replace, probe. Returns the snapshot outcome and the
    /// observed online state.
    async fn sync_snapshot(&self, source: &dyn SourceStore) -> (SnapshotOutcome, bool, i64) {
        self.phase.send_replace(SyncPhase::Extracting);
        let rows = match source.extract(self.row_limit).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    connectivity = e.is_connectivity(),
                    "Extraction failed, keeping previous snapshot and reporting offline"
                );
                let outcome = SnapshotOutcome::ExtractFailed {
                    connectivity: e.is_connectivity(),
                };
                return (outcome, false, 0);
            }
        };

        self.phase.send_replace(SyncPhase::Replacing);
        let extracted = rows.len();
        let snapshot = match self.cache.replace_snapshot(&rows).await {
            Ok(written) => {
                tracing::debug!(extracted, written, "Leaderboard snapshot replaced");
                SnapshotOutcome::Replaced { extracted, written }
            }
            Err(e) => {
                tracing::error!(error = %e, extracted, "Snapshot replace failed, previous snapshot remains");
                SnapshotOutcome::ReplaceFailed { extracted }
            }
        };

        self.phase.send_replace(SyncPhase::Probing);
        let (is_online, online_count) = match source.count_online().await {
            Ok(count) => (true, count.max(0)),
            Err(e) => {
                tracing::warn!(error = %e, "Online probe failed, reporting offline for this cycle");
                (false, 0)
            }
        };

        (snapshot, is_online, online_count)
    }
}
