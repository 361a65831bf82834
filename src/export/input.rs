use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::pipeline::{PipelineError, PipelineResult};

/// One article row of the journal's search export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputArticle {
    pub title: String,
    #[serde(default)]
    pub article_link: String,
    #[serde(default)]
    pub all_citing_papers_link: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub cited_by_count: Option<u64>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
}

impl InputArticle {
    fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            article_link: self.article_link.trim().to_string(),
            all_citing_papers_link: self.all_citing_papers_link.trim().to_string(),
            cited_by_count: self.cited_by_count,
            abstract_text: self.abstract_text.trim().to_string(),
        }
    }
}

/// Loads the input CSV. Extra columns are ignored; an input without rows aborts the run.
pub fn load_input(path: &Path) -> PipelineResult<Vec<InputArticle>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| PipelineError::csv(path, e))?;

    let articles = reader
        .deserialize::<InputArticle>()
        .map(|row| row.map(InputArticle::trimmed))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PipelineError::csv(path, e))?;

    if articles.is_empty() {
        return Err(PipelineError::EmptyInput {
            path: path.to_path_buf(),
        });
    }

    info!(path = %path.display(), articles = articles.len(), "Loaded input articles");
    Ok(articles)
}
