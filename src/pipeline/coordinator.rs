//! Bounded-concurrency dispatch of work units.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::future;
use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use super::checkpoint::CheckpointScheduler;
use crate::cache::{CacheKey, ResultCache, ResultRecord};
use crate::retry::RemoteError;

/// Anything the coordinator can dispatch: it must name the cache keys it will resolve.
pub trait Dispatchable {
    fn keys(&self) -> Vec<CacheKey>;
}

/// A single-key unit of remote work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit<P> {
    pub key: CacheKey,
    pub payload: P,
}

impl<P> WorkUnit<P> {
    pub fn new(key: CacheKey, payload: P) -> Self {
        Self { key, payload }
    }
}

impl<P> Dispatchable for WorkUnit<P> {
    fn keys(&self) -> Vec<CacheKey> {
        vec![self.key.clone()]
    }
}

impl Dispatchable for crate::batch::Batch {
    fn keys(&self) -> Vec<CacheKey> {
        crate::batch::Batch::keys(self).to_vec()
    }
}

/// Where a key stands with respect to a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Pending,
    InFlight,
    Completed,
    FailedTerminal,
}

impl UnitStatus {
    /// Status as seen from the cache alone (in-flight work is not visible there).
    pub fn of(cache: &ResultCache, key: &CacheKey) -> Self {
        match cache.get(key) {
            Some(record) if record.is_error() => UnitStatus::FailedTerminal,
            Some(_) => UnitStatus::Completed,
            None => UnitStatus::Pending,
        }
    }
}

/// What a worker hands back for one dispatched unit.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Records to upsert; records carrying an error count as terminal failures.
    Recorded(Vec<(CacheKey, ResultRecord)>),
    /// Nothing is written; the keys stay eligible for the next run.
    Unresolved {
        keys: Vec<CacheKey>,
        error: RemoteError,
    },
}

impl TaskOutcome {
    pub fn single(key: CacheKey, record: impl Into<ResultRecord>) -> Self {
        TaskOutcome::Recorded(vec![(key, record.into())])
    }
}

/// Counts for one coordinator run, in keys unless noted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks (units or batches) that ran to an outcome.
    pub tasks: usize,
    /// Keys already resolved in the cache and not dispatched.
    pub skipped: usize,
    pub completed: usize,
    pub failed_terminal: usize,
    /// Keys left absent from the cache after their task returned.
    pub unresolved: usize,
    /// Keys never dispatched because shutdown was requested.
    pub abandoned: usize,
    pub checkpoints: usize,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn dispatched(&self) -> usize {
        self.completed + self.failed_terminal + self.unresolved
    }

    /// Adds another run's counts to this one.
    pub fn absorb(&mut self, other: &RunSummary) {
        self.tasks += other.tasks;
        self.skipped += other.skipped;
        self.completed += other.completed;
        self.failed_terminal += other.failed_terminal;
        self.unresolved += other.unresolved;
        self.abandoned += other.abandoned;
        self.checkpoints += other.checkpoints;
        self.interrupted |= other.interrupted;
    }
}

/// Runs at most `workers` tasks at once and applies their outcomes to a cache.
///
/// Outcomes are applied by the driving task as they arrive, so no worker ever touches the
/// cache and the cache lock is never held while a worker waits.
#[derive(Debug, Clone)]
pub struct Coordinator {
    workers: usize,
    shutdown: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
}

impl Coordinator {
    pub fn new(workers: usize, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            workers: workers.max(1),
            shutdown,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Stops dispatch of further units; in-flight units finish normally.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Dispatches every unit that still has an unresolved key, writes outcomes into `cache`,
    /// checkpoints on progress and once at the end.
    pub async fn run<U, F, Fut>(
        &self,
        phase: &str,
        units: Vec<U>,
        cache: &ResultCache,
        checkpoint: &mut CheckpointScheduler,
        worker: F,
    ) -> RunSummary
    where
        U: Dispatchable,
        F: Fn(U) -> Fut,
        Fut: Future<Output = TaskOutcome>,
    {
        let mut summary = RunSummary::default();

        let mut pending = Vec::with_capacity(units.len());
        for unit in units {
            let keys = unit.keys();
            if !keys.is_empty() && keys.iter().all(|k| cache.is_resolved(k)) {
                summary.skipped += keys.len();
            } else {
                pending.push(unit);
            }
        }

        let total: usize = pending.iter().map(|u| u.keys().len()).sum();
        checkpoint.set_total(total);

        info!(
            phase,
            tasks = pending.len(),
            pending = total,
            skipped = summary.skipped,
            workers = self.workers,
            "Dispatching work"
        );

        let shutdown = Arc::clone(&self.shutdown);
        let in_flight = Arc::clone(&self.in_flight);
        let worker = &worker;

        let mut outcomes = stream::iter(pending)
            .take_while(move |_| future::ready(!shutdown.load(Ordering::Acquire)))
            .map(|unit| {
                let owned = unit.keys().len();
                in_flight.fetch_add(1, Ordering::AcqRel);
                async move { (owned, worker(unit).await) }
            })
            .buffer_unordered(self.workers);

        let mut done = 0usize;
        while let Some((owned, outcome)) = outcomes.next().await {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            summary.tasks += 1;

            match outcome {
                TaskOutcome::Recorded(records) => {
                    for (key, record) in records {
                        if record.is_error() {
                            summary.failed_terminal += 1;
                        } else {
                            summary.completed += 1;
                        }
                        cache.set(key, record);
                    }
                }
                TaskOutcome::Unresolved { keys, error } => {
                    warn!(
                        phase,
                        keys = keys.len(),
                        kind = error.kind(),
                        error = %error,
                        "Task left its keys unresolved"
                    );
                    summary.unresolved += keys.len();
                }
            }

            done += owned;
            checkpoint.record(done, cache);
        }
        drop(outcomes);

        summary.interrupted = self.is_shutdown_requested();
        summary.abandoned = total.saturating_sub(done);
        if summary.interrupted {
            warn!(
                phase,
                abandoned = summary.abandoned,
                "Shutdown requested, stopped dispatching"
            );
        }

        checkpoint.finish(cache).await;
        summary.checkpoints = checkpoint.snapshots();

        info!(
            phase,
            completed = summary.completed,
            failed = summary.failed_terminal,
            unresolved = summary.unresolved,
            abandoned = summary.abandoned,
            progress = %format!("{done}/{total}"),
            "Phase finished"
        );
        summary
    }
}
