//! Synchronisation pipeline: copies a bounded leaderboard snapshot from the
//! game database into the cache store and publishes the server status.
//!
//! A [`scheduler`] produces ticks, the [`runner`] turns each tick into a
//! cycle on the single-flight [`orchestrator::SyncOrchestrator`], and
//! shutdown lets in-flight cycles finish.

pub mod config;
pub mod orchestrator;
pub mod process;
pub mod runner;
pub mod scheduler;

pub use config::SyncConfig;
pub use orchestrator::{CycleOutcome, CycleReport, SnapshotOutcome, SyncOrchestrator, SyncPhase};
