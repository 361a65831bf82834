//! Durable file primitives shared by cache snapshots and the unified archive.
//!
//! Writes go to `<file>.tmp`, are synced, then renamed over the target so a crash
//! mid-write leaves the previous file intact.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::{StorageError, StorageResult};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rkyv::util::AlignedVec;

const TEMP_SUFFIX: &str = "tmp";

/// Alignment required by archived rkyv roots.
pub const RKYV_ALIGNMENT: usize = 16;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Atomically replaces `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let temp = temp_path(path);
    {
        let mut file = File::create(&temp).map_err(io_err(&temp))?;
        file.write_all(bytes).map_err(io_err(&temp))?;
        file.sync_all().map_err(io_err(&temp))?;
    }

    fs::rename(&temp, path).map_err(io_err(path))?;
    Ok(())
}

/// Reads `path` into a buffer aligned for rkyv access.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_aligned(path: &Path) -> StorageResult<Option<AlignedVec<RKYV_ALIGNMENT>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path)(e)),
    };

    let mut aligned = AlignedVec::<RKYV_ALIGNMENT>::with_capacity(bytes.len());
    aligned.extend_from_slice(&bytes);
    Ok(Some(aligned))
}
