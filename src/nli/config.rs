use std::path::PathBuf;

use crate::constants::NLI_MAX_SEQ_LEN;

#[derive(Debug, Clone)]
pub struct NliConfig {
    /// Directory holding `config.json`, `model.safetensors` and `tokenizer.json`.
    /// `None` runs the lexical stub.
    pub model_path: Option<PathBuf>,

    /// Token limit for one premise/hypothesis pair.
    pub max_seq_len: usize,
}

impl Default for NliConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            max_seq_len: NLI_MAX_SEQ_LEN,
        }
    }
}

impl NliConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Default::default()
        }
    }

    pub fn stub() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_seq_len == 0 {
            return Err("max_seq_len must be at least 1".to_string());
        }

        if let Some(ref path) = self.model_path
            && path.as_os_str().is_empty()
        {
            return Err("model_path cannot be empty when provided".to_string());
        }

        Ok(())
    }
}
