use std::path::PathBuf;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("snapshot not found at {path}")]
    SnapshotNotFound { path: PathBuf },

    #[error("unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

pub type CacheResult<T> = Result<T, CacheError>;
