//! The joined article/citing-work table consumed by the scoring phase.

use std::collections::HashMap;
use std::path::Path;

use rkyv::rancor::Error as RkyvError;
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{info, warn};

use super::input::InputArticle;
use crate::cache::{ResultCache, ScoreRecord};
use crate::pipeline::{PipelineError, PipelineResult};
use crate::storage::{self, StorageError};

const UNIFIED_FORMAT_VERSION: u32 = 1;

/// One citing work paired with the article it cites.
#[derive(Archive, Deserialize, Serialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct UnifiedRow {
    pub article_title: String,
    pub article_doi: Option<String>,
    pub article_pub_year: Option<i32>,
    pub article_pub_month: Option<u8>,
    pub article_total_cited_by_count: Option<u64>,
    /// Citing works of this article that survived filtering.
    pub article_filtered_cited_by_count: u64,
    pub article_abstract: Option<String>,
    pub citing_title: Option<String>,
    pub citing_doi: String,
    pub citing_pub_year: Option<i32>,
    pub citing_pub_month: Option<u8>,
    pub citing_abstract: String,
}

#[derive(Archive, Deserialize, Serialize, Debug)]
struct UnifiedArchive {
    format_version: u32,
    rows: Vec<UnifiedRow>,
}

/// Joins error-free Crossref records whose abstract has at least `min_abstract_chars`
/// characters with the article metadata, sorted by article title.
pub fn build_unified_rows(
    input: &[InputArticle],
    articles: &ResultCache,
    crossref: &ResultCache,
    min_abstract_chars: usize,
) -> Vec<UnifiedRow> {
    let by_title: HashMap<&str, &InputArticle> =
        input.iter().map(|a| (a.title.as_str(), a)).collect();

    let mut rows: Vec<UnifiedRow> = crossref
        .entries()
        .into_iter()
        .filter_map(|(key, record)| {
            let citing = record.as_fetch()?;
            if record.is_error() {
                return None;
            }
            let citing_abstract = citing.abstract_text.clone()?;
            if citing_abstract.chars().count() < min_abstract_chars {
                return None;
            }
            let citing_doi = key.secondary.clone()?;

            let article = articles
                .get(&crate::cache::CacheKey::single(key.primary.as_str()))
                .and_then(|r| r.as_article().cloned())
                .unwrap_or_default();
            let source = by_title.get(key.primary.as_str());

            Some(UnifiedRow {
                article_doi: article.doi,
                article_pub_year: article.pub_year,
                article_pub_month: article.pub_month,
                article_total_cited_by_count: source.and_then(|a| a.cited_by_count),
                article_filtered_cited_by_count: 0,
                article_abstract: source
                    .map(|a| a.abstract_text.clone())
                    .filter(|a| !a.is_empty()),
                citing_title: citing.title.clone(),
                citing_doi,
                citing_pub_year: citing.pub_year,
                citing_pub_month: citing.pub_month,
                citing_abstract,
                article_title: key.primary,
            })
        })
        .collect();

    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in &rows {
        *counts.entry(row.article_title.clone()).or_default() += 1;
    }
    for row in &mut rows {
        row.article_filtered_cited_by_count = counts[&row.article_title];
    }

    rows.sort_by(|a, b| {
        a.article_title
            .cmp(&b.article_title)
            .then_with(|| a.citing_doi.cmp(&b.citing_doi))
    });

    info!(
        rows = rows.len(),
        articles = counts.len(),
        min_abstract_chars,
        "Built unified table"
    );
    rows
}

pub fn save_unified(rows: &[UnifiedRow], path: &Path) -> PipelineResult<()> {
    let archive = UnifiedArchive {
        format_version: UNIFIED_FORMAT_VERSION,
        rows: rows.to_vec(),
    };
    let bytes = rkyv::to_bytes::<RkyvError>(&archive)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    storage::write_atomic(path, &bytes)?;
    Ok(())
}

/// Loads the unified archive, which must exist.
pub fn load_unified(path: &Path) -> PipelineResult<Vec<UnifiedRow>> {
    let bytes = storage::read_aligned(path)?.ok_or_else(|| PipelineError::MissingPrerequisite {
        what: "unified table",
        path: path.to_path_buf(),
    })?;

    let archive = rkyv::from_bytes::<UnifiedArchive, RkyvError>(&bytes).map_err(|e| {
        StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    if archive.format_version != UNIFIED_FORMAT_VERSION {
        return Err(StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "unified archive version {} (expected {UNIFIED_FORMAT_VERSION})",
                archive.format_version
            ),
        }
        .into());
    }
    Ok(archive.rows)
}

/// A unified row with its NLI probabilities first; unscored pairs leave them blank.
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub contradiction: Option<f32>,
    pub neutral: Option<f32>,
    pub entailment: Option<f32>,
    pub article_title: String,
    pub article_doi: Option<String>,
    pub article_pub_year: Option<i32>,
    pub article_pub_month: Option<u8>,
    pub article_total_cited_by_count: Option<u64>,
    pub article_filtered_cited_by_count: u64,
    pub article_abstract: Option<String>,
    pub citing_title: Option<String>,
    pub citing_doi: String,
    pub citing_pub_year: Option<i32>,
    pub citing_pub_month: Option<u8>,
    pub citing_abstract: String,
}

impl ScoredRow {
    pub fn new(row: UnifiedRow, score: Option<ScoreRecord>) -> Self {
        Self {
            contradiction: score.map(|s| s.contradiction),
            neutral: score.map(|s| s.neutral),
            entailment: score.map(|s| s.entailment),
            article_title: row.article_title,
            article_doi: row.article_doi,
            article_pub_year: row.article_pub_year,
            article_pub_month: row.article_pub_month,
            article_total_cited_by_count: row.article_total_cited_by_count,
            article_filtered_cited_by_count: row.article_filtered_cited_by_count,
            article_abstract: row.article_abstract,
            citing_title: row.citing_title,
            citing_doi: row.citing_doi,
            citing_pub_year: row.citing_pub_year,
            citing_pub_month: row.citing_pub_month,
            citing_abstract: row.citing_abstract,
        }
    }
}

/// Attaches scores to every unified row. Returns the rows and how many had no score.
pub fn attach_scores(rows: Vec<UnifiedRow>, scores: &ResultCache) -> (Vec<ScoredRow>, usize) {
    let mut missing = 0usize;
    let scored: Vec<ScoredRow> = rows
        .into_iter()
        .map(|row| {
            let key = crate::cache::CacheKey::pair(row.article_title.as_str(), row.citing_doi.as_str());
            let score = scores.get(&key).and_then(|r| r.as_score().copied());
            if score.is_none() {
                missing += 1;
            }
            ScoredRow::new(row, score)
        })
        .collect();

    if missing > 0 {
        warn!(missing, total = scored.len(), "Pairs without scores left blank");
    }
    (scored, missing)
}
