use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::loader::load_file;
use super::model::Dataset;
use crate::error::{DatasetError, Result};

/// Identity of a source file's content: size plus modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSignature {
    len: u64,
    modified: Option<SystemTime>,
}

impl SourceSignature {
    pub fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|e| DatasetError::not_found(path, e))?;
        Ok(SourceSignature {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// Hit / miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub loads: u64,
}

#[derive(Debug)]
struct CacheEntry {
    signature: SourceSignature,
    dataset: Arc<Dataset>,
}

/// Loaded datasets keyed by absolute source path.
///
/// Owned by the application entry point and handed around explicitly.
/// Entries are only replaced through [`get_or_load`](Self::get_or_load)
/// (when the source signature changed) or [`reload`](Self::reload).
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, CacheEntry>,
    stats: CacheStats,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `path`, loading it if it is not cached
    /// or the file changed since it was read.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<Dataset>> {
        let key = cache_key(path)?;
        let signature = SourceSignature::of(&key)?;

        if let Some(entry) = self.entries.get(&key) {
            if entry.signature == signature {
                log::debug!("dataset cache hit for {}", key.display());
                self.stats.hits += 1;
                return Ok(Arc::clone(&entry.dataset));
            }
            log::debug!("dataset {} changed on disk, reloading", key.display());
        }

        self.load_into(key, signature)
    }

    /// Re-read `path` unconditionally and replace the cached entry.
    ///
    /// On failure the stale entry is dropped rather than kept around.
    pub fn reload(&mut self, path: &Path) -> Result<Arc<Dataset>> {
        let key = cache_key(path)?;
        let result = SourceSignature::of(&key).and_then(|sig| self.load_into(key.clone(), sig));
        if result.is_err() {
            self.entries.remove(&key);
        }
        result
    }

    /// Drop the entry for `path`. Returns whether one was cached.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        cache_key(path).is_ok_and(|key| self.entries.remove(&key).is_some())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        cache_key(path).is_ok_and(|key| self.entries.contains_key(&key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn load_into(&mut self, key: PathBuf, signature: SourceSignature) -> Result<Arc<Dataset>> {
        let dataset = Arc::new(load_file(&key)?);
        self.stats.loads += 1;
        self.entries.insert(
            key,
            CacheEntry {
                signature,
                dataset: Arc::clone(&dataset),
            },
        );
        Ok(dataset)
    }
}

/// Absolute form of `path`; does not require the file to exist, so entries
/// of deleted sources can still be dropped.
fn cache_key(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| DatasetError::not_found(path, e))
}
