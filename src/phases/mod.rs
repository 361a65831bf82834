//! The four remote phases. Each builds its work units, runs them through a
//! [`Coordinator`](crate::pipeline::Coordinator) and leaves its cache snapshot behind.

pub mod articles;
pub mod citations;
pub mod crossref;
pub mod scoring;


pub use articles::run_articles;
pub use citations::run_citations;
pub use crossref::{crossref_url, run_crossref};
pub use scoring::{pending_score_items, run_scoring};

use std::collections::HashSet;

use tracing::warn;

use crate::cache::CacheKey;
use crate::export::InputArticle;
use crate::pipeline::WorkUnit;

/// One unit per distinct article title. Later rows repeating a title are dropped with a
/// warning so no two units share a cache key.
pub(crate) fn units_by_title(
    phase: &str,
    input: &[InputArticle],
    payload: impl Fn(&InputArticle) -> String,
) -> Vec<WorkUnit<String>> {
    let mut seen = HashSet::with_capacity(input.len());
    input
        .iter()
        .filter(|article| {
            let first = seen.insert(article.title.as_str());
            if !first {
                warn!(phase, title = %article.title, "Duplicate article title, keeping first row");
            }
            first
        })
        .map(|article| WorkUnit::new(CacheKey::single(&article.title), payload(article)))
        .collect()
}
