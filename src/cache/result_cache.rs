//! Durable key → result map recording completed work.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use rkyv::rancor::Error as RkyvError;
use tracing::{debug, info, warn};

use super::error::{CacheError, CacheResult};
use super::types::{
    CacheKey, CacheSnapshot, ResultRecord, SNAPSHOT_FORMAT_VERSION, SnapshotEntry,
};
use crate::storage::{self, StorageError};

/// Thread-safe result cache.
///
/// Entries are only ever added or overwritten; the lock guards map mutation alone and is
/// never held across I/O.
pub struct ResultCache {
    name: String,
    entries: RwLock<HashMap<CacheKey, ResultRecord>>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

impl ResultCache {
    /// Creates an empty cache.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Loads a snapshot, or returns an empty cache if none exists yet.
    ///
    /// A snapshot that exists but cannot be decoded is an error.
    pub fn load(name: impl Into<String>, path: &Path) -> CacheResult<Self> {
        let name = name.into();
        match Self::read_snapshot(&name, path)? {
            Some(cache) => Ok(cache),
            None => {
                info!(cache = %name, path = %path.display(), "No existing snapshot, starting empty");
                Ok(Self::new(name))
            }
        }
    }

    /// Loads a snapshot that must exist.
    pub fn load_required(name: impl Into<String>, path: &Path) -> CacheResult<Self> {
        let name = name.into();
        Self::read_snapshot(&name, path)?.ok_or_else(|| CacheError::SnapshotNotFound {
            path: path.to_path_buf(),
        })
    }

    fn read_snapshot(name: &str, path: &Path) -> CacheResult<Option<Self>> {
        let Some(bytes) = storage::read_aligned(path)? else {
            return Ok(None);
        };

        let snapshot = rkyv::from_bytes::<CacheSnapshot, RkyvError>(&bytes).map_err(|e| {
            StorageError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: snapshot.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }

        if snapshot.name != name {
            warn!(
                expected = %name,
                found = %snapshot.name,
                path = %path.display(),
                "Snapshot was written by a differently named cache"
            );
        }

        let entries: HashMap<CacheKey, ResultRecord> = snapshot
            .entries
            .into_iter()
            .map(|entry| (entry.key, entry.record))
            .collect();

        info!(
            cache = %name,
            records = entries.len(),
            path = %path.display(),
            "Loaded cache snapshot"
        );

        Ok(Some(Self {
            name: name.to_string(),
            entries: RwLock::new(entries),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &CacheKey) -> Option<ResultRecord> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns `true` if `key` holds a record without an error; such keys are never reprocessed.
    pub fn is_resolved(&self, key: &CacheKey) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|record| !record.is_error())
    }

    /// Upserts one key and returns the previous record, if any.
    pub fn set(&self, key: CacheKey, record: ResultRecord) -> Option<ResultRecord> {
        self.entries.write().insert(key, record)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copies all entries out, sorted by key.
    pub fn entries(&self) -> Vec<(CacheKey, ResultRecord)> {
        let mut entries: Vec<_> = {
            let guard = self.entries.read();
            guard
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Copies the entries out under the read lock, leaving ordering and encoding to
    /// [`CacheImage::write`].
    pub fn image(&self) -> CacheImage {
        let entries = {
            let guard = self.entries.read();
            guard
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        CacheImage {
            name: self.name.clone(),
            entries,
        }
    }

    /// Writes the full map to `path`, replacing any previous snapshot atomically.
    ///
    /// Blocks for the whole write; async callers take an [`image`](Self::image) and write it
    /// on the blocking pool.
    pub fn snapshot(&self, path: &Path) -> CacheResult<usize> {
        self.image().write(path)
    }
}

/// Point-in-time copy of a cache, detached from its lock.
#[derive(Debug, Clone)]
pub struct CacheImage {
    name: String,
    entries: Vec<(CacheKey, ResultRecord)>,
}

impl CacheImage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorts, archives and atomically writes the image to `path`.
    ///
    /// Returns the number of records written.
    pub fn write(self, path: &Path) -> CacheResult<usize> {
        let CacheImage { name, mut entries } = self;
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let count = entries.len();

        let snapshot = CacheSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            name,
            entries: entries
                .into_iter()
                .map(|(key, record)| SnapshotEntry { key, record })
                .collect(),
        };

        let bytes = rkyv::to_bytes::<RkyvError>(&snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        storage::write_atomic(path, &bytes)?;

        debug!(
            cache = %snapshot.name,
            records = count,
            bytes = bytes.len(),
            path = %path.display(),
            "Wrote cache snapshot"
        );
        Ok(count)
    }
}
