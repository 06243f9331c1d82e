//! Scheduler + runner wiring, including graceful drain on shutdown.

use std::sync::Arc;
use std::time::Duration;

use rankmirror_db::memory::{MemoryCacheStore, MemorySourceStore, SourceCharacter};
use rankmirror_db::SourceStore;
use rankmirror_sync::orchestrator::CycleOutcome;
use rankmirror_sync::scheduler::Tick;
use rankmirror_sync::{runner, SyncOrchestrator, SyncPhase};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn stores() -> (Arc<MemorySourceStore>, Arc<MemoryCacheStore>) {
    let source = Arc::new(MemorySourceStore::new(vec![
        SourceCharacter::new("one", 10).online(1),
        SourceCharacter::new("two", 20),
    ]));
    (source, Arc::new(MemoryCacheStore::new()))
}

fn orchestrator(source: &Arc<MemorySourceStore>, cache: &Arc<MemoryCacheStore>) -> SyncOrchestrator {
    let source: Arc<dyn SourceStore> = source.clone();
    SyncOrchestrator::new(Some(source), cache.clone(), 200)
}

#[tokio::test]
async fn spawned_runner_syncs_on_first_tick() {
    let (source, cache) = stores();
    let orch = Arc::new(orchestrator(&source, &cache));
    let cancel = CancellationToken::new();

    let handle = runner::spawn(Arc::clone(&orch), Duration::from_secs(3600), cancel.clone());

    for _ in 0..100 {
        if orch.last_report().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(orch.last_report().is_some(), "first tick should run a cycle");
    assert_eq!(cache.rows().len(), 2);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_cycle() {
    let (source, cache) = stores();
    source.set_extract_delay(Duration::from_millis(200));
    let orch = Arc::new(orchestrator(&source, &cache));
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(runner::run(Arc::clone(&orch), rx, cancel.clone()));

    tx.send(Tick {
        seq: 1,
        at: chrono::Utc::now(),
    })
    .await
    .unwrap();

    let mut phase = orch.subscribe_phase();
    phase
        .wait_for(|p| *p == SyncPhase::Extracting)
        .await
        .unwrap();

    cancel.cancel();
    handle.await.unwrap();

    // The cycle ran to completion rather than being dropped mid-write.
    assert_eq!(cache.rows().len(), 2);
    assert_eq!(cache.publish_calls(), 1);
    assert_eq!(orch.phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn run_once_reconciles_and_syncs() {
    let (source, cache) = stores();
    let orch = orchestrator(&source, &cache);

    let outcome = runner::run_once(&orch).await;

    assert!(matches!(outcome, CycleOutcome::Completed(ref r) if r.is_clean()));
    assert_eq!(cache.reconcile_calls(), 1);
    assert_eq!(cache.rows().len(), 2);
}
