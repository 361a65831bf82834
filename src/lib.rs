//! Citeflow library crate (used by the binary and integration tests).
//!
//! Enriches a journal's article list with the works that cite each article, their Crossref
//! metadata, and NLI scores relating each citing abstract to the cited one.
//!
//! # Core
//! - [`ResultCache`] - durable key to record map, one per phase
//! - [`RetryableExecutor`], [`RetryPolicy`], [`RemoteError`] - bounded retry with backoff
//! - [`Batcher`] - premise-homogeneous batching for inference
//! - [`Coordinator`], [`CheckpointScheduler`] - bounded concurrency and periodic snapshots
//!
//! # Capabilities
//! - [`FetchCapability`] / [`ReqwestFetcher`] - HTTP
//! - [`InferenceCapability`] / [`NliClassifier`] - NLI
//!
//! # Phases
//! [`phases`] runs citations, articles, crossref and scoring; [`export`] writes the tables.
//!
//! ## Test/Mock Support
//! `MockFetcher` and `MockClassifier` are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod batch;
pub mod cache;
pub mod config;
pub mod constants;
pub mod export;
pub mod fetch;
pub mod nli;
pub mod parse;
pub mod phases;
pub mod pipeline;
pub mod retry;
pub mod storage;

pub use batch::{Batch, Batcher, ScoreItem};
pub use cache::{
    ArticleRecord, CacheError, CacheImage, CacheKey, CacheResult, CitationRecord, FetchRecord,
    ResultCache, ResultRecord, ScoreRecord,
};
pub use config::{ConfigError, PipelineConfig};
pub use export::{ExportSummary, InputArticle, ScoredRow, UnifiedRow};
#[cfg(any(test, feature = "mock"))]
pub use fetch::MockFetcher;
pub use fetch::{FetchCapability, HttpResponse, ReqwestFetcher};
#[cfg(any(test, feature = "mock"))]
pub use nli::MockClassifier;
pub use nli::{InferenceCapability, NliClassifier, NliConfig, NliError, NliScores};
pub use pipeline::{
    CheckpointInterval, CheckpointScheduler, Coordinator, PipelineContext, PipelineError,
    PipelineResult, RunSummary, TaskOutcome, UnitStatus, WorkUnit,
};
pub use retry::{Execution, Outcome, RemoteError, RetryPolicy, RetryableExecutor};
pub use storage::{StorageError, StorageResult};
