//! Three-way sequence classifiers on top of candle's BERT and RoBERTa encoders.

use std::path::Path;
use std::sync::Arc;

use candle_core::{DType, Device, IndexOp, Module, Result, Tensor};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as RobertaConfig, XLMRobertaForSequenceClassification,
};
use serde_json::Value;

/// Number of NLI classes.
pub const NUM_LABELS: usize = 3;

/// Which encoder family a checkpoint's weights belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    /// `roberta.*` weights; position ids are offset past the padding index.
    Roberta,
    /// `bert.*` weights (or an unprefixed BERT encoder).
    Bert,
}

impl Architecture {
    /// Picks the architecture from the tensor names in the checkpoint, falling back to
    /// `model_type` in `config.json`.
    pub fn detect(has_tensor: impl Fn(&str) -> bool, config: &Value) -> Self {
        if has_tensor("roberta.embeddings.word_embeddings.weight") {
            return Architecture::Roberta;
        }
        if has_tensor("bert.embeddings.word_embeddings.weight") {
            return Architecture::Bert;
        }
        match config.get("model_type").and_then(Value::as_str) {
            Some("roberta" | "xlm-roberta") => Architecture::Roberta,
            _ => Architecture::Bert,
        }
    }
}

/// Fills keys that older RoBERTa `config.json` files omit.
pub(crate) fn roberta_config(mut config: Value) -> std::result::Result<RobertaConfig, String> {
    if let Some(map) = config.as_object_mut() {
        map.entry("position_embedding_type")
            .or_insert_with(|| Value::from("absolute"));
        map.entry("use_cache").or_insert(Value::Bool(true));
    }
    serde_json::from_value(config).map_err(|e| format!("Failed to parse RoBERTa config: {e}"))
}

enum Classifier {
    Roberta(XLMRobertaForSequenceClassification),
    Bert { encoder: BertModel, head: Linear },
}

/// Encoder plus classification head, cheap to clone.
#[derive(Clone)]
pub struct SequenceClassifier {
    inner: Arc<Classifier>,
    architecture: Architecture,
}

impl SequenceClassifier {
    /// Loads `config.json` and `model.safetensors` from `model_dir`.
    pub fn load(model_dir: &Path, device: &Device) -> Result<Self> {
        let config_content = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: Value = serde_json::from_str(&config_content)
            .map_err(|e| candle_core::Error::Msg(format!("Failed to parse config: {e}")))?;

        let weights = model_dir.join("model.safetensors");
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device)? };

        let architecture = Architecture::detect(|name| vb.contains_tensor(name), &config);
        let inner = match architecture {
            Architecture::Roberta => {
                let config = roberta_config(config).map_err(candle_core::Error::Msg)?;
                Classifier::Roberta(XLMRobertaForSequenceClassification::new(
                    NUM_LABELS, &config, vb,
                )?)
            }
            Architecture::Bert => {
                let config: BertConfig = serde_json::from_value(config).map_err(|e| {
                    candle_core::Error::Msg(format!("Failed to parse BERT config: {e}"))
                })?;
                let encoder = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
                    BertModel::load(vb.pp("bert"), &config)?
                } else {
                    BertModel::load(vb.clone(), &config)?
                };
                let head = candle_nn::linear(config.hidden_size, NUM_LABELS, vb.pp("classifier"))?;
                Classifier::Bert { encoder, head }
            }
        };

        Ok(Self {
            inner: Arc::new(inner),
            architecture,
        })
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Returns logits of shape `(batch, NUM_LABELS)`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        match self.inner.as_ref() {
            Classifier::Roberta(model) => model.forward(input_ids, attention_mask, token_type_ids),
            Classifier::Bert { encoder, head } => {
                let hidden = encoder.forward(input_ids, token_type_ids, Some(attention_mask))?;
                head.forward(&hidden.i((.., 0, ..))?)
            }
        }
    }
}
