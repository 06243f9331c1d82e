//! Consumes scheduler ticks and drives the orchestrator.
//!
//! Each tick starts a cycle on its own task; the orchestrator's single-flight
//! guard rejects overlapping ones. On cancellation the runner stops taking
//! ticks and waits for in-flight cycles to finish, so a snapshot replace is
//! never interrupted mid-write.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::{CycleOutcome, SyncOrchestrator};
use crate::scheduler::{self, Tick};

/// Reconcile once, then run a cycle per tick until `cancel` fires or the
/// tick channel closes.
pub async fn run(
    orchestrator: Arc<SyncOrchestrator>,
    mut ticks: mpsc::Receiver<Tick>,
    cancel: CancellationToken,
) {
    // Failure is logged inside; the first cycle retries.
    let _ = orchestrator.reconcile().await;

    let mut in_flight: JoinSet<CycleOutcome> = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            tick = ticks.recv() => {
                let Some(tick) = tick else { break };
                tracing::debug!(seq = tick.seq, at = %tick.at, "Sync tick");
                let orchestrator = Arc::clone(&orchestrator);
                in_flight.spawn(async move { orchestrator.run_cycle().await });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_join(joined);
            }
        }
    }

    if !in_flight.is_empty() {
        tracing::info!(cycles = in_flight.len(), "Waiting for in-flight sync cycle to finish");
    }
    while let Some(joined) = in_flight.join_next().await {
        log_join(joined);
    }
    tracing::info!("Sync runner stopped");
}

fn log_join(joined: Result<CycleOutcome, tokio::task::JoinError>) {
    match joined {
        Ok(CycleOutcome::Completed(_)) => {}
        Ok(CycleOutcome::Skipped) => {
            tracing::debug!("Overlapping sync tick rejected");
        }
        Err(e) => {
            tracing::error!(error = %e, "Sync cycle task failed");
        }
    }
}

/// Spawn the scheduler and runner together. The returned handle completes
/// once the runner has drained after `cancel`.
pub fn spawn(
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let (ticks, scheduler_handle) = scheduler::spawn_ticks(interval, cancel.clone());
    tracing::info!(interval_secs = interval.as_secs(), "Sync scheduler started");

    tokio::spawn(async move {
        run(orchestrator, ticks, cancel).await;
        if let Err(e) = scheduler_handle.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }
    })
}

/// Reconcile and run exactly one cycle.
pub async fn run_once(orchestrator: &SyncOrchestrator) -> CycleOutcome {
    let _ = orchestrator.reconcile().await;
    orchestrator.run_cycle().await
}
