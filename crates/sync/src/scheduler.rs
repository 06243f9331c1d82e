//! Fixed-interval tick source.
//!
//! Ticks are delivered over a bounded channel. When the consumer is still
//! busy with the previous tick the new one is dropped rather than queued, so
//! a slow cycle never builds up a backlog.

use std::time::Duration;

use chrono::Utc;
use rankmirror_core::types::Timestamp;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// One scheduler firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Monotonic sequence number, starting at 1.
    pub seq: u64,
    pub at: Timestamp,
}

/// Spawn a task producing a tick every `interval`, the first immediately.
///
/// The channel closes when `cancel` fires.
pub fn spawn_ticks(
    interval: Duration,
    cancel: CancellationToken,
) -> (mpsc::Receiver<Tick>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut seq = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Scheduler stopping");
                    break;
                }
                _ = timer.tick() => {
                    seq += 1;
                    let tick = Tick { seq, at: Utc::now() };
                    match tx.try_send(tick) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            tracing::debug!(seq, "Previous tick not yet consumed, dropping tick");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
            }
        }
    });

    (rx, handle)
}
