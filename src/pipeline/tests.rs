use super::*;
use crate::cache::{CacheKey, FetchRecord, ResultCache, ResultRecord};
use crate::retry::RemoteError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn units(n: usize) -> Vec<WorkUnit<usize>> {
    (0..n)
        .map(|i| WorkUnit::new(CacheKey::pair("Article", format!("10.1/{i}")), i))
        .collect()
}

fn record_for(i: usize) -> ResultRecord {
    FetchRecord {
        title: Some(format!("Citing {i}")),
        ..Default::default()
    }
    .into()
}

fn scheduler(temp: &TempDir, interval: CheckpointInterval) -> CheckpointScheduler {
    CheckpointScheduler::new(temp.path().join("crossref.rkyv"), interval)
}

#[tokio::test]
async fn test_resolved_keys_issue_no_calls() {
    let temp = TempDir::new().unwrap();
    let cache = ResultCache::new("crossref");
    let resolved = CacheKey::pair("Article", "10.1/0");
    cache.set(resolved.clone(), record_for(99));
    let before = cache.get(&resolved);

    let calls = AtomicUsize::new(0);
    let coordinator = Coordinator::new(3, Arc::new(AtomicBool::new(false)));
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(100));

    let summary = coordinator
        .run("crossref", units(4), &cache, &mut checkpoint, |unit| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { TaskOutcome::single(unit.key, record_for(unit.payload)) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.completed, 3);
    assert_eq!(cache.get(&resolved), before);
}

#[tokio::test]
async fn test_error_records_are_retried() {
    let temp = TempDir::new().unwrap();
    let cache = ResultCache::new("crossref");
    let failed = CacheKey::pair("Article", "10.1/0");
    cache.set(
        failed.clone(),
        FetchRecord {
            error: Some("timeout".into()),
            ..Default::default()
        }
        .into(),
    );
    assert_eq!(UnitStatus::of(&cache, &failed), UnitStatus::FailedTerminal);

    let coordinator = Coordinator::new(1, Arc::new(AtomicBool::new(false)));
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(100));

    let summary = coordinator
        .run("crossref", units(1), &cache, &mut checkpoint, |unit| async move {
            TaskOutcome::single(unit.key, record_for(unit.payload))
        })
        .await;

    assert_eq!(summary.completed, 1);
    assert_eq!(UnitStatus::of(&cache, &failed), UnitStatus::Completed);
}

#[tokio::test]
async fn test_terminal_failures_are_recorded_with_error() {
    let temp = TempDir::new().unwrap();
    let cache = ResultCache::new("crossref");
    let coordinator = Coordinator::new(2, Arc::new(AtomicBool::new(false)));
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(100));

    let summary = coordinator
        .run("crossref", units(4), &cache, &mut checkpoint, |unit| async move {
            if unit.payload % 2 == 0 {
                TaskOutcome::single(unit.key, record_for(unit.payload))
            } else {
                TaskOutcome::single(
                    unit.key,
                    FetchRecord {
                        error: Some("client error 404".into()),
                        ..Default::default()
                    },
                )
            }
        })
        .await;

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed_terminal, 2);
    assert_eq!(cache.len(), 4);
    assert_eq!(
        UnitStatus::of(&cache, &CacheKey::pair("Article", "10.1/1")),
        UnitStatus::FailedTerminal
    );
}

#[tokio::test]
async fn test_unresolved_outcome_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let cache = ResultCache::new("scores");
    let coordinator = Coordinator::new(1, Arc::new(AtomicBool::new(false)));
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(100));

    let summary = coordinator
        .run("scores", units(3), &cache, &mut checkpoint, |unit| async move {
            TaskOutcome::Unresolved {
                keys: vec![unit.key],
                error: RemoteError::ContractViolation {
                    expected: 1,
                    actual: 0,
                },
            }
        })
        .await;

    assert!(cache.is_empty());
    assert_eq!(summary.unresolved, 3);
    assert_eq!(
        UnitStatus::of(&cache, &CacheKey::pair("Article", "10.1/0")),
        UnitStatus::Pending
    );
}

#[tokio::test]
async fn test_interrupted_run_resumes_remaining_units() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("crossref.rkyv");

    // First run stops dispatching after the third unit.
    let first_calls = AtomicUsize::new(0);
    let coordinator = Coordinator::new(1, Arc::new(AtomicBool::new(false)));
    let cache = ResultCache::load("crossref", &path).unwrap();
    let mut checkpoint = CheckpointScheduler::new(&path, CheckpointInterval::Every(100));
    let summary = coordinator
        .run("crossref", units(10), &cache, &mut checkpoint, |unit| {
            if first_calls.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                coordinator.request_shutdown();
            }
            async move { TaskOutcome::single(unit.key, record_for(unit.payload)) }
        })
        .await;

    assert!(summary.interrupted);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.abandoned, 7);

    // Second run picks up from the snapshot.
    let second_calls = AtomicUsize::new(0);
    let coordinator = Coordinator::new(4, Arc::new(AtomicBool::new(false)));
    let cache = ResultCache::load("crossref", &path).unwrap();
    assert_eq!(cache.len(), 3);
    let mut checkpoint = CheckpointScheduler::new(&path, CheckpointInterval::Every(100));
    let summary = coordinator
        .run("crossref", units(10), &cache, &mut checkpoint, |unit| {
            second_calls.fetch_add(1, Ordering::SeqCst);
            async move { TaskOutcome::single(unit.key, record_for(unit.payload)) }
        })
        .await;

    assert_eq!(second_calls.load(Ordering::SeqCst), 7);
    assert_eq!(summary.skipped, 3);
    assert!(!summary.interrupted);
    assert_eq!(ResultCache::load("crossref", &path).unwrap().len(), 10);
}

#[tokio::test]
async fn test_final_contents_independent_of_completion_order() {
    async fn run_with(workers: usize) -> Vec<(CacheKey, ResultRecord)> {
        let temp = TempDir::new().unwrap();
        let cache = ResultCache::new("crossref");
        let coordinator = Coordinator::new(workers, Arc::new(AtomicBool::new(false)));
        let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(5));

        coordinator
            .run("crossref", units(20), &cache, &mut checkpoint, |unit| async move {
                // Later units finish first.
                let delay = 20u64.saturating_sub(unit.payload as u64);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                TaskOutcome::single(unit.key, record_for(unit.payload))
            })
            .await;
        cache.entries()
    }

    let sequential = run_with(1).await;
    let concurrent = run_with(8).await;

    assert_eq!(sequential.len(), 20);
    assert_eq!(sequential, concurrent);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let temp = TempDir::new().unwrap();
    let cache = ResultCache::new("articles");
    let coordinator = Coordinator::new(3, Arc::new(AtomicBool::new(false)));
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(100));
    let active = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    coordinator
        .run("articles", units(12), &cache, &mut checkpoint, |unit| {
            let active = &active;
            let peak = &peak;
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                TaskOutcome::single(unit.key, record_for(unit.payload))
            }
        })
        .await;

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(cache.len(), 12);
    assert_eq!(coordinator.in_flight(), 0);
}

#[tokio::test]
async fn test_checkpoints_on_interval_and_at_end() {
    let temp = TempDir::new().unwrap();
    let cache = ResultCache::new("crossref");
    let coordinator = Coordinator::new(1, Arc::new(AtomicBool::new(false)));
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(2));

    let summary = coordinator
        .run("crossref", units(5), &cache, &mut checkpoint, |unit| async move {
            TaskOutcome::single(unit.key, record_for(unit.payload))
        })
        .await;

    // After 2 units, after 4 unless the first write was still running, then the final one.
    assert!((2..=3).contains(&summary.checkpoints));
    assert_eq!(checkpoint.failures(), 0);
    assert!(!checkpoint.is_writing());
    assert_eq!(
        ResultCache::load("crossref", &temp.path().join("crossref.rkyv"))
            .unwrap()
            .len(),
        5
    );
}

#[test]
fn test_percent_interval_step() {
    let temp = TempDir::new().unwrap();
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Percent(1.0));

    checkpoint.set_total(250);
    assert_eq!(checkpoint.step(), 2);

    checkpoint.set_total(40);
    assert_eq!(checkpoint.step(), 1);
}

#[tokio::test]
async fn test_record_only_fires_on_boundary() {
    let temp = TempDir::new().unwrap();
    let cache = ResultCache::new("crossref");
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(3));
    checkpoint.set_total(10);

    let mut fired = Vec::new();
    for n in 1..=7 {
        fired.push(checkpoint.record(n, &cache));
        checkpoint.settle().await;
    }

    assert_eq!(fired, vec![false, false, true, false, false, true, false]);
    assert_eq!(checkpoint.snapshots(), 2);
}

#[tokio::test]
async fn test_boundary_during_write_is_deferred_not_lost() {
    let temp = TempDir::new().unwrap();
    let cache = ResultCache::new("crossref");
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(1));
    checkpoint.set_total(3);

    assert!(checkpoint.record(1, &cache));
    cache.set(CacheKey::pair("Article", "10.1/late"), record_for(7));
    // Either starts a fresh write or leaves the cache dirty behind the running one.
    checkpoint.record(2, &cache);
    checkpoint.settle().await;
    checkpoint.record(2, &cache);
    checkpoint.settle().await;

    let saved = ResultCache::load("crossref", &temp.path().join("crossref.rkyv")).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(checkpoint.snapshots(), 2);
}

#[tokio::test]
async fn test_checkpoint_write_does_not_stall_workers() {
    let temp = TempDir::new().unwrap();
    let cache = ResultCache::new("crossref");
    for i in 0..200_000 {
        cache.set(CacheKey::pair("Preloaded", format!("10.2/{i}")), record_for(i));
    }

    let started = Instant::now();
    cache.snapshot(&temp.path().join("reference.rkyv")).unwrap();
    let snapshot_time = started.elapsed();

    let coordinator = Coordinator::new(2, Arc::new(AtomicBool::new(false)));
    let mut checkpoint = scheduler(&temp, CheckpointInterval::Every(1));
    let waited = Mutex::new(Duration::ZERO);

    // Unit 0 finishes at once and triggers a snapshot while unit 1 sleeps.
    let summary = coordinator
        .run("crossref", units(2), &cache, &mut checkpoint, |unit| {
            let waited = &waited;
            async move {
                if unit.payload == 1 {
                    let started = Instant::now();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    *waited.lock() = started.elapsed();
                }
                TaskOutcome::single(unit.key, record_for(unit.payload))
            }
        })
        .await;

    let waited = *waited.lock();
    assert!(
        waited < snapshot_time / 2,
        "5ms sleep took {waited:?}, one snapshot takes {snapshot_time:?}"
    );
    assert_eq!(summary.completed, 2);
    assert_eq!(
        ResultCache::load("crossref", &temp.path().join("crossref.rkyv"))
            .unwrap()
            .len(),
        200_002
    );
}

#[tokio::test]
async fn test_snapshot_failure_does_not_abort_run() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let cache = ResultCache::new("crossref");
    let coordinator = Coordinator::new(2, Arc::new(AtomicBool::new(false)));
    let mut checkpoint = CheckpointScheduler::new(
        blocker.join("crossref.rkyv"),
        CheckpointInterval::Every(1),
    );

    let summary = coordinator
        .run("crossref", units(3), &cache, &mut checkpoint, |unit| async move {
            TaskOutcome::single(unit.key, record_for(unit.payload))
        })
        .await;

    // At least the first boundary and the final snapshot were attempted.
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.checkpoints, 0);
    assert!((2..=4).contains(&checkpoint.failures()));
}

#[test]
fn test_summary_absorb() {
    let mut total = RunSummary {
        completed: 2,
        ..Default::default()
    };
    total.absorb(&RunSummary {
        completed: 1,
        unresolved: 4,
        interrupted: true,
        ..Default::default()
    });

    assert_eq!(total.completed, 3);
    assert_eq!(total.dispatched(), 7);
    assert!(total.interrupted);
}
