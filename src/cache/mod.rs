//! Resumable result caches.
//!
//! One [`ResultCache`] per pipeline phase, each persisted to its own snapshot file.

pub mod error;
pub mod result_cache;
pub mod types;


pub use error::{CacheError, CacheResult};
pub use result_cache::{CacheImage, ResultCache};
pub use types::{ArticleRecord, CacheKey, CitationRecord, FetchRecord, ResultRecord, ScoreRecord};
