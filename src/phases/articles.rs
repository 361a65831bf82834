use super::units_by_title;
use crate::cache::ArticleRecord;
use crate::export::InputArticle;
use crate::fetch::fetch_with_retry;
use crate::parse::extract_article_page;
use crate::pipeline::{PipelineContext, PipelineResult, RunSummary, TaskOutcome};
use crate::retry::Outcome;

/// Scrapes each article's landing page for its DOI and publication date.
pub async fn run_articles(
    ctx: &PipelineContext,
    input: &[InputArticle],
) -> PipelineResult<RunSummary> {
    let config = &ctx.config;
    let (cache, mut checkpoint) = ctx.open_cache(
        "articles",
        &config.articles_snapshot(),
        ctx.fetch_interval(),
    )?;

    let units = units_by_title("articles", input, |a| a.article_link.clone());

    let summary = ctx
        .coordinator(config.fetch_workers)
        .run("articles", units, &cache, &mut checkpoint, |unit| async move {
            if unit.payload.is_empty() {
                return TaskOutcome::single(
                    unit.key,
                    ArticleRecord {
                        error: Some("no article link".to_string()),
                        ..Default::default()
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
                    let page = extract_article_page(&response.body);
                    let error = page
                        .doi
                        .is_none()
                        .then(|| format!("no DOI link found on {}", unit.payload));
                    ArticleRecord {
                        doi: page.doi,
                        pub_year: page.pub_year,
                        pub_month: page.pub_month,
                        error,
                    }
                }
                Outcome::Terminal(err) => ArticleRecord {
                    error: Some(err.to_string()),
                    ..Default::default()
                },
            };
            TaskOutcome::single(unit.key, record)
        })
        .await;

    Ok(summary)
}
