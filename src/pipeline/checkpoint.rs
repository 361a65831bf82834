use std::path::{Path, PathBuf};

use futures_util::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::cache::{CacheImage, CacheResult, ResultCache};

/// How often to snapshot during a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckpointInterval {
    /// After every `n` completed units.
    Every(usize),
    /// After every `percent`% of the run's units (at least one unit).
    Percent(f64),
}

impl CheckpointInterval {
    fn step(&self, total: usize) -> usize {
        match *self {
            CheckpointInterval::Every(n) => n.max(1),
            CheckpointInterval::Percent(pct) => {
                ((total as f64 * pct / 100.0).floor() as usize).max(1)
            }
        }
    }
}

/// Persists a cache whenever the completed count crosses an interval boundary, and once
/// more at the end of the run.
///
/// Writes run on the blocking pool, at most one at a time, so the caller keeps polling its
/// workers. A boundary crossed while a write is in flight marks the cache dirty and a fresh
/// image is written once that write lands.
///
/// Snapshot failures are logged and do not stop the run; the next checkpoint retries.
#[derive(Debug)]
pub struct CheckpointScheduler {
    path: PathBuf,
    interval: CheckpointInterval,
    step: usize,
    total: usize,
    last_mark: usize,
    snapshots: usize,
    failures: usize,
    writing: Option<JoinHandle<CacheResult<usize>>>,
    dirty: bool,
}

impl CheckpointScheduler {
    pub fn new(path: impl Into<PathBuf>, interval: CheckpointInterval) -> Self {
        Self {
            path: path.into(),
            interval,
            step: interval.step(0),
            total: 0,
            last_mark: 0,
            snapshots: 0,
            failures: 0,
            writing: None,
            dirty: false,
        }
    }

    /// Sets the number of units expected in this run; resets progress.
    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        self.step = self.interval.step(total);
        self.last_mark = 0;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Successful snapshots written so far.
    pub fn snapshots(&self) -> usize {
        self.snapshots
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn is_writing(&self) -> bool {
        self.writing.is_some()
    }

    /// Reports `completed` units done. Never waits on a write.
    ///
    /// Returns `true` if a snapshot write was started.
    pub fn record(&mut self, completed: usize, cache: &ResultCache) -> bool {
        self.reap();

        let mark = completed / self.step;
        if mark > self.last_mark {
            self.last_mark = mark;
            self.dirty = true;
            info!(
                cache = cache.name(),
                completed,
                total = self.total,
                "Progress checkpoint"
            );
        }

        if self.dirty && self.writing.is_none() {
            self.start(cache.image());
            return true;
        }
        false
    }

    /// Waits for the in-flight write, if any.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.writing.take() {
            let result = handle.await;
            self.account(result);
        }
    }

    /// Final unconditional snapshot, after any in-flight write.
    pub async fn finish(&mut self, cache: &ResultCache) -> bool {
        self.settle().await;
        self.start(cache.image());
        let before = self.snapshots;
        self.settle().await;
        self.snapshots > before
    }

    fn start(&mut self, image: CacheImage) {
        let path = self.path.clone();
        self.dirty = false;
        self.writing = Some(tokio::task::spawn_blocking(move || image.write(&path)));
    }

    fn reap(&mut self) {
        let Some(mut handle) = self.writing.take() else {
            return;
        };
        // A finished handle can still report pending once the task budget is spent.
        match handle.is_finished().then(|| (&mut handle).now_or_never()).flatten() {
            Some(result) => self.account(result),
            None => self.writing = Some(handle),
        }
    }

    fn account(&mut self, result: Result<CacheResult<usize>, JoinError>) {
        match result {
            Ok(Ok(records)) => {
                self.snapshots += 1;
                info!(records, path = %self.path.display(), "Checkpoint saved");
            }
            Ok(Err(e)) => {
                self.failures += 1;
                error!(path = %self.path.display(), error = %e, "Checkpoint failed");
            }
            Err(e) => {
                self.failures += 1;
                error!(path = %self.path.display(), error = %e, "Checkpoint task failed");
            }
        }
    }
}
