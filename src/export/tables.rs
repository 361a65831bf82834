//! CSV renditions of the phase caches.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::cache::ResultCache;
use crate::pipeline::{PipelineError, PipelineResult};

fn writer(path: &Path) -> PipelineResult<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    csv::Writer::from_path(path).map_err(|e| PipelineError::csv(path, e))
}

/// Serializes `rows` with a header row. Returns the number of rows written.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> PipelineResult<usize> {
    let mut out = writer(path)?;
    for row in rows {
        out.serialize(row).map_err(|e| PipelineError::csv(path, e))?;
    }
    out.flush().map_err(|e| PipelineError::io(path, e))?;
    info!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(rows.len())
}

/// One column per article, padded with `""` to the longest list.
///
/// Returns `(columns, rows)`.
pub fn citation_table(citations: &ResultCache) -> (Vec<String>, Vec<Vec<String>>) {
    let columns: Vec<(String, Vec<String>)> = citations
        .entries()
        .into_iter()
        .filter_map(|(key, record)| {
            let dois = record.as_citations()?.dois.clone();
            Some((key.primary, dois))
        })
        .collect();

    let height = columns.iter().map(|(_, d)| d.len()).max().unwrap_or(0);
    let rows = (0..height)
        .map(|i| {
            columns
                .iter()
                .map(|(_, dois)| dois.get(i).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    (columns.into_iter().map(|(title, _)| title).collect(), rows)
}

pub fn write_citations_csv(citations: &ResultCache, path: &Path) -> PipelineResult<usize> {
    let (header, rows) = citation_table(citations);
    let mut out = writer(path)?;
    out.write_record(&header)
        .map_err(|e| PipelineError::csv(path, e))?;
    for row in &rows {
        out.write_record(row)
            .map_err(|e| PipelineError::csv(path, e))?;
    }
    out.flush().map_err(|e| PipelineError::io(path, e))?;
    info!(path = %path.display(), articles = header.len(), rows = rows.len(), "Wrote citation table");
    Ok(rows.len())
}

#[derive(Debug, Serialize)]
struct ArticleRow {
    title: String,
    doi: Option<String>,
    pub_year: Option<i32>,
    pub_month: Option<u8>,
    error: Option<String>,
}

pub fn write_articles_csv(articles: &ResultCache, path: &Path) -> PipelineResult<usize> {
    let rows: Vec<ArticleRow> = articles
        .entries()
        .into_iter()
        .filter_map(|(key, record)| {
            let article = record.as_article()?.clone();
            Some(ArticleRow {
                title: key.primary,
                doi: article.doi,
                pub_year: article.pub_year,
                pub_month: article.pub_month,
                error: article.error,
            })
        })
        .collect();
    write_rows(path, &rows)
}

#[derive(Debug, Serialize)]
struct CrossrefRow {
    article_title: String,
    citing_doi: String,
    citing_title: Option<String>,
    citing_pub_year: Option<i32>,
    citing_pub_month: Option<u8>,
    citing_abstract: Option<String>,
    error: Option<String>,
}

pub fn write_crossref_csv(crossref: &ResultCache, path: &Path) -> PipelineResult<usize> {
    let rows: Vec<CrossrefRow> = crossref
        .entries()
        .into_iter()
        .filter_map(|(key, record)| {
            let work = record.as_fetch()?.clone();
            Some(CrossrefRow {
                article_title: key.primary,
                citing_doi: key.secondary.unwrap_or_default(),
                citing_title: work.title,
                citing_pub_year: work.pub_year,
                citing_pub_month: work.pub_month,
                citing_abstract: work.abstract_text,
                error: work.error,
            })
        })
        .collect();
    write_rows(path, &rows)
}
