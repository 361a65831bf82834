use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::checkpoint::{CheckpointInterval, CheckpointScheduler};
use super::coordinator::Coordinator;
use super::error::{PipelineError, PipelineResult};
use crate::cache::ResultCache;
use crate::config::PipelineConfig;
use crate::fetch::FetchCapability;
use crate::nli::InferenceCapability;
use crate::retry::RetryableExecutor;

/// Everything a phase needs, passed explicitly to each one.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub executor: RetryableExecutor,
    pub fetcher: Arc<dyn FetchCapability>,
    pub classifier: Option<Arc<dyn InferenceCapability>>,
    shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .field("classifier", &self.classifier.is_some())
            .field("shutdown", &self.is_shutdown_requested())
            .finish()
    }
}

impl PipelineContext {
    pub fn new(config: PipelineConfig, fetcher: Arc<dyn FetchCapability>) -> Self {
        Self {
            executor: RetryableExecutor::new(config.retry_policy()),
            config,
            fetcher,
            classifier: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn InferenceCapability>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Replaces the shutdown flag, e.g. with one already wired to a signal handler.
    pub fn with_shutdown_flag(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Shared flag; setting it stops every coordinator built from this context.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn coordinator(&self, workers: usize) -> Coordinator {
        Coordinator::new(workers, self.shutdown_flag())
    }

    pub fn classifier(&self) -> PipelineResult<Arc<dyn InferenceCapability>> {
        self.classifier
            .clone()
            .ok_or(PipelineError::ClassifierUnavailable)
    }

    /// Loads a phase cache (empty if no snapshot exists) with its checkpoint scheduler.
    pub fn open_cache(
        &self,
        name: &str,
        path: &Path,
        interval: CheckpointInterval,
    ) -> PipelineResult<(ResultCache, CheckpointScheduler)> {
        let cache = ResultCache::load(name, path)?;
        Ok((cache, CheckpointScheduler::new(path, interval)))
    }

    /// Default interval for fetch phases.
    pub fn fetch_interval(&self) -> CheckpointInterval {
        CheckpointInterval::Every(self.config.checkpoint_every)
    }
}
