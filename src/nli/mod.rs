//! Natural-language-inference capability.
//!
//! [`InferenceCapability`] is what the scoring phase calls; [`NliClassifier`] implements it with
//! a candle sequence classifier (or a lexical stub when no model is configured).

pub mod classifier;
pub mod config;
pub mod device;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod tokenizer;


pub use classifier::{LabelOrder, NliClassifier};
pub use config::NliConfig;
pub use error::NliError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockClassifier;

use crate::retry::RemoteError;

/// Class probabilities for one premise/hypothesis pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NliScores {
    pub contradiction: f32,
    pub neutral: f32,
    pub entailment: f32,
}

impl NliScores {
    /// Softmax over `[contradiction, neutral, entailment]` logits.
    pub fn from_logits(logits: [f32; 3]) -> Self {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp = logits.map(|l| (l - max).exp());
        let total: f32 = exp.iter().sum();
        Self {
            contradiction: exp[0] / total,
            neutral: exp[1] / total,
            entailment: exp[2] / total,
        }
    }

    pub fn sum(&self) -> f32 {
        self.contradiction + self.neutral + self.entailment
    }
}

/// Classifies hypotheses against one shared premise.
///
/// Implementations must return exactly one triple per hypothesis, in input order. The call is
/// blocking; async callers run it on the blocking pool.
pub trait InferenceCapability: Send + Sync {
    fn classify(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<NliScores>, RemoteError>;

    /// `true` for heuristic stand-ins whose scores must never reach the score cache.
    fn is_placeholder(&self) -> bool {
        false
    }
}
