//! Groups scoring work that shares a premise so one inference call serves many pairs.


use tracing::{debug, error};

use crate::cache::{CacheKey, ScoreRecord};
use crate::nli::NliScores;
use crate::retry::RemoteError;

/// One premise/hypothesis pair waiting to be scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreItem {
    pub key: CacheKey,
    pub premise: String,
    pub hypothesis: String,
}

impl ScoreItem {
    pub fn new(key: CacheKey, premise: impl Into<String>, hypothesis: impl Into<String>) -> Self {
        Self {
            key,
            premise: premise.into(),
            hypothesis: hypothesis.into(),
        }
    }
}

/// Items sharing exactly one premise, at most `batch_size` of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    premise: String,
    keys: Vec<CacheKey>,
    hypotheses: Vec<String>,
}

impl Batch {
    fn open(item: ScoreItem) -> Self {
        Self {
            premise: item.premise,
            keys: vec![item.key],
            hypotheses: vec![item.hypothesis],
        }
    }

    fn push(&mut self, item: ScoreItem) {
        self.keys.push(item.key);
        self.hypotheses.push(item.hypothesis);
    }

    pub fn premise(&self) -> &str {
        &self.premise
    }

    pub fn keys(&self) -> &[CacheKey] {
        &self.keys
    }

    pub fn hypotheses(&self) -> &[String] {
        &self.hypotheses
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Pairs output `i` with item `i`.
    ///
    /// A length mismatch is a [`RemoteError::ContractViolation`] and nothing is returned for
    /// any item. A triple that is not a valid distribution fails the whole batch as a
    /// [`RemoteError::Validation`].
    pub fn distribute(
        &self,
        scores: Vec<NliScores>,
    ) -> Result<Vec<(CacheKey, ScoreRecord)>, RemoteError> {
        if scores.len() != self.len() {
            error!(
                expected = self.len(),
                actual = scores.len(),
                premise_len = self.premise.len(),
                first_key = %self.keys[0],
                "Classifier returned the wrong number of outputs; batch left unresolved"
            );
            return Err(RemoteError::ContractViolation {
                expected: self.len(),
                actual: scores.len(),
            });
        }

        self.keys
            .iter()
            .zip(scores)
            .map(|(key, s)| {
                ScoreRecord::from_probabilities(s.contradiction, s.neutral, s.entailment)
                    .map(|record| (key.clone(), record))
                    .map_err(|reason| RemoteError::validation(format!("{key}: {reason}")))
            })
            .collect()
    }
}

/// Splits items into premise-homogeneous batches.
#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    batch_size: usize,
}

impl Batcher {
    /// `batch_size` is raised to 1 if zero.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Walks `items` in order, flushing when the premise changes or the batch is full.
    /// A premise that reappears later starts a new batch.
    pub fn plan(&self, items: impl IntoIterator<Item = ScoreItem>) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current: Option<Batch> = None;

        for item in items {
            match current.as_mut() {
                Some(batch) if batch.premise == item.premise && batch.len() < self.batch_size => {
                    batch.push(item);
                }
                _ => {
                    if let Some(full) = current.replace(Batch::open(item)) {
                        batches.push(full);
                    }
                }
            }
        }
        batches.extend(current);

        debug!(
            batches = batches.len(),
            batch_size = self.batch_size,
            "Planned inference batches"
        );
        batches
    }
}
