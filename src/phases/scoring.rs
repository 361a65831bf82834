use std::sync::Arc;

use tracing::{info, warn};

use crate::batch::{Batch, Batcher, ScoreItem};
use crate::cache::{CacheKey, ResultCache};
use crate::export::{UnifiedRow, load_unified};
use crate::nli::{InferenceCapability, NliScores};
use crate::pipeline::{
    CheckpointInterval, PipelineContext, PipelineError, PipelineResult, RunSummary, TaskOutcome,
};
use crate::retry::{Outcome, RemoteError, RetryableExecutor};

/// Score items for rows not yet resolved in `scores`, in row order.
///
/// Rows without an article abstract cannot be scored and are skipped.
pub fn pending_score_items(rows: &[UnifiedRow], scores: &ResultCache) -> Vec<ScoreItem> {
    let mut no_premise = 0usize;
    let items: Vec<ScoreItem> = rows
        .iter()
        .filter_map(|row| {
            let key = CacheKey::pair(row.article_title.as_str(), row.citing_doi.as_str());
            if scores.is_resolved(&key) {
                return None;
            }
            let Some(premise) = row.article_abstract.as_deref() else {
                no_premise += 1;
                return None;
            };
            Some(ScoreItem::new(key, premise, row.citing_abstract.as_str()))
        })
        .collect();

    if no_premise > 0 {
        warn!(rows = no_premise, "Rows without an article abstract were not scored");
    }
    items
}

/// Runs one batch through the classifier on the blocking pool, under the retry policy.
async fn classify_batch(
    executor: &RetryableExecutor,
    classifier: &Arc<dyn InferenceCapability>,
    batch: &Batch,
) -> Outcome<Vec<NliScores>> {
    let label = format!("nli:{}", batch.keys()[0].primary);
    executor
        .execute(&label, || {
            let classifier = Arc::clone(classifier);
            let premise = batch.premise().to_string();
            let hypotheses = batch.hypotheses().to_vec();
            async move {
                tokio::task::spawn_blocking(move || classifier.classify(&premise, &hypotheses))
                    .await
                    .map_err(|e| RemoteError::inference(format!("inference task failed: {e}")))?
            }
        })
        .await
        .outcome
}

/// Scores every (article abstract, citing abstract) pair of the unified table.
///
/// Requires the unified archive written by the export step and a model-backed classifier on
/// the context; the lexical stub is refused so its scores never become resolved records.
pub async fn run_scoring(ctx: &PipelineContext) -> PipelineResult<RunSummary> {
    let config = &ctx.config;
    let classifier = ctx.classifier()?;
    if classifier.is_placeholder() {
        return Err(PipelineError::ClassifierUnavailable);
    }
    let rows = load_unified(&config.unified_archive())?;
    let (cache, mut checkpoint) = ctx.open_cache(
        "scores",
        &config.scores_snapshot(),
        CheckpointInterval::Percent(1.0),
    )?;

    let resolved = rows
        .iter()
        .filter(|row| {
            cache.is_resolved(&CacheKey::pair(
                row.article_title.as_str(),
                row.citing_doi.as_str(),
            ))
        })
        .count();
    let items = pending_score_items(&rows, &cache);
    let batches = Batcher::new(config.batch_size).plan(items);

    info!(
        rows = rows.len(),
        batches = batches.len(),
        batch_size = config.batch_size,
        "Scoring unified rows"
    );

    let classifier = &classifier;
    let mut summary = ctx
        .coordinator(config.inference_workers)
        .run("scores", batches, &cache, &mut checkpoint, |batch| async move {
            match classify_batch(&ctx.executor, classifier, &batch).await {
                Outcome::Success(scores) => match batch.distribute(scores) {
                    Ok(records) => TaskOutcome::Recorded(
                        records
                            .into_iter()
                            .map(|(key, score)| (key, score.into()))
                            .collect(),
                    ),
                    Err(error) => TaskOutcome::Unresolved {
                        keys: batch.keys().to_vec(),
                        error,
                    },
                },
                Outcome::Terminal(error) => TaskOutcome::Unresolved {
                    keys: batch.keys().to_vec(),
                    error,
                },
            }
        })
        .await;

    summary.skipped += resolved;
    Ok(summary)
}
