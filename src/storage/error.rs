use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt archive at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

pub type StorageResult<T> = Result<T, StorageError>;
