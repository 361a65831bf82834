//! Extraction of structured values from fetched bodies.
//!
//! Every function here is pure; the phases decide what a missing value means.

pub mod article;
pub mod citations;
pub mod crossref;


pub use article::{ArticlePage, extract_article_page};
pub use citations::{CitationList, extract_citation_dois};
pub use crossref::extract_crossref_work;

use crate::constants::DOI_URL_PREFIX;

/// Strips the `https://doi.org/` prefix, removes `;` and trims. `None` if nothing is left.
pub fn normalize_doi(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let bare = raw.strip_prefix(DOI_URL_PREFIX).unwrap_or(raw);
    let doi = bare.replace(';', "");
    let doi = doi.trim();
    (!doi.is_empty()).then(|| doi.to_string())
}

/// Collapses runs of whitespace to single spaces and trims.
pub(crate) fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
