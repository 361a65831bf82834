use std::collections::HashSet;
use std::path::Path;

use candle_core::{D, Device, Tensor};
use tokenizers::{EncodeInput, Tokenizer};
use tracing::{debug, info, warn};

use super::config::NliConfig;
use super::device::select_device;
use super::error::NliError;
use super::model::{NUM_LABELS, SequenceClassifier};
use super::tokenizer::load_pair_tokenizer;
use super::{InferenceCapability, NliScores};
use crate::retry::RemoteError;

/// Position of each class in the model's logits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelOrder {
    pub contradiction: usize,
    pub neutral: usize,
    pub entailment: usize,
}

impl Default for LabelOrder {
    fn default() -> Self {
        Self {
            contradiction: 0,
            neutral: 1,
            entailment: 2,
        }
    }
}

impl LabelOrder {
    /// Reads `id2label` from a model `config.json` document; falls back to the default order if
    /// the mapping is absent or does not name all three classes.
    pub fn from_config_json(config: &serde_json::Value) -> Self {
        let Some(map) = config.get("id2label").and_then(|v| v.as_object()) else {
            return Self::default();
        };

        let (mut c, mut n, mut e) = (None, None, None);
        for (id, label) in map {
            let (Ok(idx), Some(label)) = (id.parse::<usize>(), label.as_str()) else {
                continue;
            };
            match label.to_ascii_lowercase().as_str() {
                "contradiction" => c = Some(idx),
                "neutral" => n = Some(idx),
                "entailment" => e = Some(idx),
                _ => {}
            }
        }

        match (c, n, e) {
            (Some(contradiction), Some(neutral), Some(entailment))
                if [contradiction, neutral, entailment]
                    .iter()
                    .all(|i| *i < NUM_LABELS) =>
            {
                Self {
                    contradiction,
                    neutral,
                    entailment,
                }
            }
            _ => {
                warn!("id2label does not name all three NLI classes, using default order");
                Self::default()
            }
        }
    }

    fn pick(&self, probs: &[f32]) -> NliScores {
        NliScores {
            contradiction: probs[self.contradiction],
            neutral: probs[self.neutral],
            entailment: probs[self.entailment],
        }
    }
}

/// Premise/hypothesis classifier.
///
/// Without a model path it runs a deterministic lexical heuristic instead of the network.
pub struct NliClassifier {
    device: Device,
    config: NliConfig,
    labels: LabelOrder,
    model: Option<SequenceClassifier>,
    tokenizer: Option<Tokenizer>,
}

impl std::fmt::Debug for NliClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NliClassifier")
            .field("device", &format!("{:?}", self.device))
            .field("config", &self.config)
            .field("labels", &self.labels)
            .field("model_loaded", &self.is_model_loaded())
            .finish()
    }
}

impl NliClassifier {
    pub fn load(config: NliConfig) -> Result<Self, NliError> {
        if let Err(reason) = config.validate() {
            return Err(NliError::InvalidConfig { reason });
        }

        let device = select_device()?;

        let Some(model_path) = config.model_path.clone() else {
            info!("No NLI model path configured, operating in stub mode");
            return Ok(Self {
                device,
                config,
                labels: LabelOrder::default(),
                model: None,
                tokenizer: None,
            });
        };

        if !model_path.exists() {
            return Err(NliError::ModelNotFound { path: model_path });
        }
        for required in ["config.json", "model.safetensors", "tokenizer.json"] {
            if !model_path.join(required).exists() {
                return Err(NliError::ModelLoadFailed {
                    reason: format!("Missing {required} in {}", model_path.display()),
                });
            }
        }

        info!(model_path = %model_path.display(), "Loading NLI model");

        let labels = read_label_order(&model_path)?;
        let model = SequenceClassifier::load(&model_path, &device).map_err(|e| {
            NliError::ModelLoadFailed {
                reason: format!("Failed to load sequence classifier: {e}"),
            }
        })?;
        let tokenizer = load_pair_tokenizer(&model_path, config.max_seq_len)?;

        info!(
            ?labels,
            architecture = ?model.architecture(),
            max_seq_len = config.max_seq_len,
            "NLI model loaded"
        );

        Ok(Self {
            device,
            config,
            labels,
            model: Some(model),
            tokenizer: Some(tokenizer),
        })
    }

    pub fn stub() -> Result<Self, NliError> {
        Self::load(NliConfig::stub())
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn config(&self) -> &NliConfig {
        &self.config
    }

    /// Classifies every hypothesis against `premise`; one triple per hypothesis, in order.
    pub fn classify_batch(
        &self,
        premise: &str,
        hypotheses: &[String],
    ) -> Result<Vec<NliScores>, NliError> {
        debug!(
            premise_len = premise.len(),
            batch = hypotheses.len(),
            model_loaded = self.is_model_loaded(),
            "Classifying batch"
        );

        if hypotheses.is_empty() {
            return Ok(Vec::new());
        }

        match (&self.model, &self.tokenizer) {
            (Some(model), Some(tokenizer)) => self.run_model(model, tokenizer, premise, hypotheses),
            _ => Ok(hypotheses
                .iter()
                .map(|h| lexical_scores(premise, h))
                .collect()),
        }
    }

    fn run_model(
        &self,
        model: &SequenceClassifier,
        tokenizer: &Tokenizer,
        premise: &str,
        hypotheses: &[String],
    ) -> Result<Vec<NliScores>, NliError> {
        let inputs: Vec<EncodeInput> = hypotheses
            .iter()
            .map(|h| (premise.to_string(), h.clone()).into())
            .collect();
        let encodings =
            tokenizer
                .encode_batch(inputs, true)
                .map_err(|e| NliError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        let batch = encodings.len();
        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());

        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut type_ids = Vec::with_capacity(batch * seq_len);
        let mut mask = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            if encoding.get_ids().len() != seq_len {
                return Err(NliError::TokenizationFailed {
                    reason: "batch encodings are not padded to equal length".to_string(),
                });
            }
            ids.extend_from_slice(encoding.get_ids());
            type_ids.extend_from_slice(encoding.get_type_ids());
            mask.extend_from_slice(encoding.get_attention_mask());
        }

        let shape = (batch, seq_len);
        let ids = Tensor::from_vec(ids, shape, &self.device)?;
        // Single-segment encoders (RoBERTa) carry one token type.
        let type_ids = Tensor::from_vec(type_ids, shape, &self.device)?.zeros_like()?;
        let mask = Tensor::from_vec(mask, shape, &self.device)?;

        let logits = model.forward(&ids, &type_ids, &mask)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?.to_vec2::<f32>()?;

        Ok(probs.iter().map(|row| self.labels.pick(row)).collect())
    }
}

impl InferenceCapability for NliClassifier {
    fn classify(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<NliScores>, RemoteError> {
        Ok(self.classify_batch(premise, hypotheses)?)
    }

    fn is_placeholder(&self) -> bool {
        !self.is_model_loaded()
    }
}

fn read_label_order(model_path: &Path) -> Result<LabelOrder, NliError> {
    let raw = std::fs::read_to_string(model_path.join("config.json"))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| NliError::ModelLoadFailed {
            reason: format!("Failed to parse config.json: {e}"),
        })?;
    Ok(LabelOrder::from_config_json(&value))
}

const NEGATIONS: [&str; 6] = ["not", "no", "never", "none", "nobody", "nothing"];

fn content_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Word-overlap stand-in for the network: overlap pushes towards entailment, a negation
/// present on only one side pushes towards contradiction.
pub(crate) fn lexical_scores(premise: &str, hypothesis: &str) -> NliScores {
    let p = content_words(premise);
    let h = content_words(hypothesis);

    let union = p.union(&h).count();
    let overlap = if union == 0 {
        0.0
    } else {
        p.intersection(&h).count() as f32 / union as f32
    };

    let negated = |words: &HashSet<String>| NEGATIONS.iter().any(|n| words.contains(*n));
    let negation_mismatch = negated(&p) != negated(&h);

    let entailment = if negation_mismatch { 0.0 } else { 4.0 * overlap };
    let contradiction = if negation_mismatch {
        1.0 + 3.0 * overlap
    } else {
        0.5 * (1.0 - overlap)
    };
    let neutral = 1.0 + (1.0 - overlap);

    NliScores::from_logits([contradiction, neutral, entailment])
}
