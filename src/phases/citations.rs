use tracing::debug;

use super::units_by_title;
use crate::cache::CitationRecord;
use crate::export::InputArticle;
use crate::fetch::fetch_with_retry;
use crate::parse::extract_citation_dois;
use crate::pipeline::{PipelineContext, PipelineResult, RunSummary, TaskOutcome};
use crate::retry::Outcome;

/// Harvests citing DOIs from each article's "cited by" CSV export.
pub async fn run_citations(
    ctx: &PipelineContext,
    input: &[InputArticle],
) -> PipelineResult<RunSummary> {
    let config = &ctx.config;
    let (cache, mut checkpoint) = ctx.open_cache(
        "citations",
        &config.citations_snapshot(),
        ctx.fetch_interval(),
    )?;

    let units = units_by_title("citations", input, |a| a.all_citing_papers_link.clone());

    let summary = ctx
        .coordinator(config.fetch_workers)
        .run("citations", units, &cache, &mut checkpoint, |unit| async move {
            if unit.payload.is_empty() {
                return TaskOutcome::single(
                    unit.key,
                    CitationRecord {
                        dois: Vec::new(),
                        error: Some("no citing-papers link".to_string()),
                    },
                );
            }

            let exec = fetch_with_retry(
                &ctx.executor,
                ctx.fetcher.as_ref(),
                &unit.payload,
                config.page_timeout,
            )
            .await;

            let record = match exec.outcome {
                Outcome::Success(response) => {
                    let list = extract_citation_dois(&response.body);
                    debug!(
                        article = %unit.key,
                        dois = list.dois.len(),
                        rejected = list.rejected,
                        "Parsed citation export"
                    );
                    CitationRecord {
                        dois: list.dois,
                        error: None,
                    }
                }
                Outcome::Terminal(err) => CitationRecord {
                    dois: Vec::new(),
                    error: Some(err.to_string()),
                },
            };
            TaskOutcome::single(unit.key, record)
        })
        .await;

    Ok(summary)
}
