//! Cross-cutting, shared constants.
//!
//! Defaults mirror the limits the remote services tolerate in practice: a small worker pool,
//! a 15 second base wait that doubles up to three minutes, and five attempts per call.

/// Default number of concurrent fetch workers.
pub const DEFAULT_FETCH_WORKERS: usize = 5;
/// Default number of concurrent inference batches.
pub const DEFAULT_INFERENCE_WORKERS: usize = 1;
/// Default number of hypotheses submitted with one premise.
pub const DEFAULT_BATCH_SIZE: usize = 16;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_WAIT_SECS: u64 = 15;
pub const DEFAULT_CAP_WAIT_SECS: u64 = 180;

/// Per-request timeout for HTML pages and CSV exports.
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 15;
/// Per-request timeout for the Crossref API.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Completed units between two cache snapshots.
pub const DEFAULT_CHECKPOINT_EVERY: usize = 100;

/// Citing abstracts shorter than this are dropped from the unified table.
pub const DEFAULT_MIN_ABSTRACT_CHARS: usize = 25;

/// Decimal places kept for each NLI probability.
pub const SCORE_DECIMALS: i32 = 4;
/// Allowed deviation of an NLI triple's sum from 1.0.
pub const SCORE_SUM_TOLERANCE: f32 = 1e-3;

/// Maximum token length of a premise/hypothesis pair.
pub const NLI_MAX_SEQ_LEN: usize = 512;

pub const DOI_URL_PREFIX: &str = "https://doi.org/";
pub const CROSSREF_WORKS_URL: &str = "https://api.crossref.org/works/";

pub const DEFAULT_USER_AGENT: &str = concat!("citeflow/", env!("CARGO_PKG_VERSION"));

/// Snapshot file names, one per cache instance.
pub const CITATIONS_SNAPSHOT: &str = "citations.rkyv";
pub const ARTICLES_SNAPSHOT: &str = "articles.rkyv";
pub const CROSSREF_SNAPSHOT: &str = "crossref.rkyv";
pub const SCORES_SNAPSHOT: &str = "scores.rkyv";
pub const UNIFIED_ARCHIVE: &str = "unified.rkyv";

/// CSV outputs.
pub const CITATIONS_CSV: &str = "citations.csv";
pub const ARTICLES_CSV: &str = "articles.csv";
pub const CROSSREF_CSV: &str = "crossref.csv";
pub const UNIFIED_CSV: &str = "unified.csv";
pub const SCORED_CSV: &str = "scored.csv";
