//! Input loading and tabular outputs.

pub mod input;
pub mod tables;
pub mod unified;


pub use input::{InputArticle, load_input};
pub use tables::{
    citation_table, write_articles_csv, write_citations_csv, write_crossref_csv, write_rows,
};
pub use unified::{
    ScoredRow, UnifiedRow, attach_scores, build_unified_rows, load_unified, save_unified,
};

use tracing::{info, warn};

use crate::cache::ResultCache;
use crate::config::PipelineConfig;
use crate::pipeline::PipelineResult;

/// Outcome of [`export_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub citation_rows: usize,
    pub articles: usize,
    pub crossref_records: usize,
    pub unified_rows: usize,
}

/// Writes every per-phase table plus the unified CSV and archive.
pub fn export_all(
    config: &PipelineConfig,
    input: &[InputArticle],
) -> PipelineResult<ExportSummary> {
    let citations = ResultCache::load("citations", &config.citations_snapshot())?;
    let articles = ResultCache::load("articles", &config.articles_snapshot())?;
    let crossref = ResultCache::load("crossref", &config.crossref_snapshot())?;

    let rows = build_unified_rows(input, &articles, &crossref, config.min_abstract_chars);
    if rows.is_empty() {
        warn!("No Crossref record passed the unified-table filter");
    }

    let summary = ExportSummary {
        citation_rows: write_citations_csv(&citations, &config.citations_csv())?,
        articles: write_articles_csv(&articles, &config.articles_csv())?,
        crossref_records: write_crossref_csv(&crossref, &config.crossref_csv())?,
        unified_rows: write_rows(&config.unified_csv(), &rows)?,
    };
    save_unified(&rows, &config.unified_archive())?;

    info!(?summary, "Export finished");
    Ok(summary)
}

/// Writes the scored table from the unified archive and the score cache.
///
/// Returns `(rows written, rows without scores)`.
pub fn export_scored(config: &PipelineConfig) -> PipelineResult<(usize, usize)> {
    let rows = load_unified(&config.unified_archive())?;
    let scores = ResultCache::load("scores", &config.scores_snapshot())?;
    let (scored, missing) = attach_scores(rows, &scores);
    let written = write_rows(&config.scored_csv(), &scored)?;
    Ok((written, missing))
}
