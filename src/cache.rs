//! Cache of cleaned corpora keyed by input source.
//!
//! Entries never expire on their own. When the underlying source changes the
//! caller calls [`DatasetCache::invalidate`] or [`DatasetCache::refresh`].
//! Cached corpora are shared read-only through `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::cleaner::{CleanedCorpus, RawRecord, clean_records, load_csv};
use crate::error::Result;

/// Identity of an input source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey(String);

impl SourceKey {
    pub fn new(id: impl Into<String>) -> Self {
        SourceKey(id.into())
    }

    /// Key a file by its canonical path, falling back to the path as given.
    pub fn for_path(path: &Path) -> Self {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        SourceKey(canonical.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
pub struct DatasetCache {
    entries: Mutex<HashMap<SourceKey, Arc<CleanedCorpus>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<SourceKey, Arc<CleanedCorpus>>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &SourceKey) -> Option<Arc<CleanedCorpus>> {
        self.entries().get(key).cloned()
    }

    /// Return the cached corpus for `key`, or clean the rows from `load` and
    /// cache them. A failing loader leaves the cache untouched.
    pub fn get_or_load<F>(&self, key: &SourceKey, load: F) -> Result<Arc<CleanedCorpus>>
    where
        F: FnOnce() -> Result<Vec<RawRecord>>,
    {
        if let Some(hit) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for {key}");
            return Ok(hit);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.refresh(key, load)
    }

    /// Always re-clean from `load`, replacing any cached entry.
    pub fn refresh<F>(&self, key: &SourceKey, load: F) -> Result<Arc<CleanedCorpus>>
    where
        F: FnOnce() -> Result<Vec<RawRecord>>,
    {
        let rows = load()?;
        let corpus = Arc::new(clean_records(&rows));
        debug!(
            "Cached {} documents for {key}",
            corpus.documents.len()
        );
        self.entries().insert(key.clone(), Arc::clone(&corpus));
        Ok(corpus)
    }

    /// Load and clean a CSV file, keyed by its canonical path.
    pub fn load_path(&self, path: &Path) -> Result<Arc<CleanedCorpus>> {
        self.get_or_load(&SourceKey::for_path(path), || load_csv(path))
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &SourceKey) -> bool {
        self.entries().remove(key).is_some()
    }

    pub fn invalidate_all(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
