use std::collections::BTreeSet;

use reqwest::Url;
use tracing::info;

use crate::cache::{CacheKey, FetchRecord, ResultCache};
use crate::constants::CROSSREF_WORKS_URL;
use crate::fetch::fetch_with_retry;
use crate::parse::{extract_crossref_work, normalize_doi};
use crate::pipeline::{PipelineContext, PipelineResult, RunSummary, TaskOutcome, WorkUnit};
use crate::retry::RemoteError;

/// Crossref `works` URL for a bare DOI, with the polite-pool contact if known.
///
/// The contact is form-encoded into the query string.
pub fn crossref_url(doi: &str, mailto: Option<&str>) -> Result<String, RemoteError> {
    let base = format!("{CROSSREF_WORKS_URL}{doi}");
    let url = match mailto {
        Some(email) if !email.is_empty() => Url::parse_with_params(&base, &[("mailto", email)]),
        _ => Url::parse(&base),
    }
    .map_err(|e| RemoteError::validation(format!("invalid Crossref URL for {doi}: {e}")))?;
    Ok(url.into())
}

/// `(article title, bare DOI)` pairs from every successful citation record.
fn citing_pairs(citations: &ResultCache) -> BTreeSet<(String, String)> {
    citations
        .entries()
        .into_iter()
        .filter(|(_, record)| !record.is_error())
        .filter_map(|(key, record)| Some((key.primary, record.as_citations()?.dois.clone())))
        .flat_map(|(title, dois)| {
            dois.into_iter()
                .filter_map(|doi| normalize_doi(&doi))
                .map(move |doi| (title.clone(), doi))
        })
        .collect()
}

/// Resolves title, abstract and publication date for every citing DOI.
///
/// Requires the citations snapshot from [`run_citations`](super::run_citations).
pub async fn run_crossref(ctx: &PipelineContext) -> PipelineResult<RunSummary> {
    let config = &ctx.config;
    let citations = ResultCache::load_required("citations", &config.citations_snapshot())?;
    let (cache, mut checkpoint) = ctx.open_cache(
        "crossref",
        &config.crossref_snapshot(),
        ctx.fetch_interval(),
    )?;

    let mailto = config.crossref_mailto.as_deref();
    let units: Vec<WorkUnit<Result<String, RemoteError>>> = citing_pairs(&citations)
        .into_iter()
        .map(|(title, doi)| {
            let url = crossref_url(&doi, mailto);
            WorkUnit::new(CacheKey::pair(title, doi), url)
        })
        .collect();

    info!(pairs = units.len(), "Collected citing DOIs");

    let summary = ctx
        .coordinator(config.fetch_workers)
        .run("crossref", units, &cache, &mut checkpoint, |unit| async move {
            let result = match &unit.payload {
                Ok(url) => fetch_with_retry(
                    &ctx.executor,
                    ctx.fetcher.as_ref(),
                    url,
                    config.api_timeout,
                )
                .await
                .into_result(),
                Err(err) => Err(err.clone()),
            };

            let record = match result.and_then(|response| extract_crossref_work(&response.body)) {
                Ok(record) => record,
                Err(err) => FetchRecord {
                    error: Some(err.to_string()),
                    ..Default::default()
                },
            };
            TaskOutcome::single(unit.key, record)
        })
        .await;

    Ok(summary)
}
