use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::classifier::lexical_scores;
use super::{InferenceCapability, NliScores};
use crate::retry::RemoteError;

/// Scriptable [`InferenceCapability`] for tests.
///
/// Scores come from the lexical heuristic. `drop_outputs` makes every call return that many
/// triples fewer than requested; `fail_next` queues transient inference errors.
#[derive(Default)]
pub struct MockClassifier {
    drop_outputs: usize,
    pending_failures: AtomicUsize,
    calls: Mutex<Vec<(String, usize)>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropping_outputs(drop_outputs: usize) -> Self {
        Self {
            drop_outputs,
            ..Default::default()
        }
    }

    pub fn fail_next(&self, times: usize) {
        self.pending_failures.store(times, Ordering::SeqCst);
    }

    /// `(premise, batch size)` for every call made, failures included.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl InferenceCapability for MockClassifier {
    fn classify(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<NliScores>, RemoteError> {
        self.calls
            .lock()
            .push((premise.to_string(), hypotheses.len()));

        if self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RemoteError::inference("simulated runtime failure"));
        }

        let keep = hypotheses.len().saturating_sub(self.drop_outputs);
        Ok(hypotheses
            .iter()
            .take(keep)
            .map(|h| lexical_scores(premise, h))
            .collect())
    }
}
