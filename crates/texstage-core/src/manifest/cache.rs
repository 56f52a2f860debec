//! Process-wide response cache for manifests and the asset catalogue.
//!
//! Keyed by request URL. Finished documents live in one map; each key also
//! owns a fetch lock so concurrent callers for the same key wait for one fetch
//! instead of racing. Different keys proceed independently. Optionally
//! mirrored to a JSON file (`key -> document`).

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::ManifestNode;

type FetchLock = Arc<Mutex<()>>;

#[derive(Default)]
pub struct ManifestCache {
    entries: Mutex<BTreeMap<String, ManifestNode>>,
    fetch_locks: Mutex<HashMap<String, FetchLock>>,
    persist_path: Option<PathBuf>,
    persist_lock: Mutex<()>,
}

impl ManifestCache {
    /// In-memory cache with no file mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache mirrored to `path`. Existing entries are loaded; a missing file is an empty cache.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        let entries: BTreeMap<String, ManifestNode> = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parse response cache: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("read response cache: {}", path.display()))
            }
        };
        tracing::debug!(entries = entries.len(), path = %path.display(), "loaded response cache");
        Ok(Self {
            entries: Mutex::new(entries),
            persist_path: Some(path.to_path_buf()),
            ..Default::default()
        })
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, ManifestNode>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fetch_lock(&self, key: &str) -> FetchLock {
        let mut locks = self.fetch_locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Cached document for `key`, if one was fetched already.
    pub fn get(&self, key: &str) -> Option<ManifestNode> {
        self.entries().get(key).cloned()
    }

    /// Returns the cached document for `key`, or runs `fetch` once and stores its result.
    ///
    /// Concurrent callers for the same key block on the key's fetch lock, so
    /// `fetch` runs at most once per key as long as it succeeds. Errors are
    /// returned and not cached.
    pub fn get_or_fetch<E>(
        &self,
        key: &str,
        fetch: impl FnOnce() -> Result<ManifestNode, E>,
    ) -> Result<ManifestNode, E> {
        if let Some(doc) = self.get(key) {
            tracing::trace!(key, "response cache hit");
            return Ok(doc);
        }
        let lock = self.fetch_lock(key);
        let _fetching = lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(doc) = self.get(key) {
            tracing::trace!(key, "response cache hit after wait");
            return Ok(doc);
        }
        let doc = fetch()?;
        self.entries().insert(key.to_string(), doc.clone());
        if let Err(e) = self.persist() {
            tracing::warn!("could not persist response cache: {:#}", e);
        }
        Ok(doc)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> BTreeMap<String, ManifestNode> {
        self.entries().clone()
    }

    /// Rewrites the mirror file (temp file + rename). No-op for in-memory caches.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let _writer = self.persist_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(&self.snapshot()).context("serialize response cache")?;
        let tmp = crate::staging::temp_path(path);
        std::fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("rename to {}", path.display()))?;
        Ok(())
    }
}
