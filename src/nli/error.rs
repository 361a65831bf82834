use std::path::PathBuf;
use thiserror::Error;

use crate::retry::RemoteError;

#[derive(Debug, Error)]
pub enum NliError {
    #[error("NLI model not found at path: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("failed to load NLI model: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("{device} device unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    #[error("NLI inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("invalid NLI configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<candle_core::Error> for NliError {
    fn from(err: candle_core::Error) -> Self {
        NliError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for NliError {
    fn from(err: std::io::Error) -> Self {
        NliError::ModelLoadFailed {
            reason: err.to_string(),
        }
    }
}

impl From<NliError> for RemoteError {
    fn from(err: NliError) -> Self {
        RemoteError::inference(err.to_string())
    }
}
