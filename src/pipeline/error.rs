use std::path::PathBuf;
use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::nli::NliError;
use crate::storage::StorageError;

/// Run-level failures. Per-unit failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input {path} contains no records")]
    EmptyInput { path: PathBuf },

    #[error("{what} not found at {path}; run the earlier phase first")]
    MissingPrerequisite { what: &'static str, path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no NLI model configured for the scoring phase (set CITEFLOW_MODEL_PATH)")]
    ClassifierUnavailable,

    #[error(transparent)]
    Classifier(#[from] NliError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        PipelineError::Csv {
            path: path.into(),
            source,
        }
    }
}
