//! Local persistent key-value store.
//!
//! The durability floor: every save lands here synchronously before any
//! remote write is even considered. Mirrors the browser's localStorage
//! contract — synchronous string-keyed reads and writes, survives restarts,
//! treated as effectively instantaneous.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::observability::metrics;

/// Synchronous string-keyed store. Implementations must not block on the
/// network; IO failures are logged, never surfaced to save paths.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store. Used in tests and by embedders that manage their own
/// persistence.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key);
    }
}

/// File-backed store: a concurrent map snapshotted to a JSON file on every
/// mutation. Loaded back on open, so breaker state and cached payloads
/// survive process restarts.
#[derive(Clone)]
pub struct JsonFileStore {
    inner: Arc<DashMap<String, String>>,
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store, loading the existing file if present.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = Arc::new(DashMap::new());

        if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            let map: HashMap<String, String> = serde_json::from_reader(reader)?;
            for (k, v) in map {
                inner.insert(k, v);
            }
            metrics::record_local_store_size(inner.len());
            tracing::info!(path = %path.display(), entries = inner.len(), "Loaded local store");
        }

        Ok(Self { inner, path })
    }

    fn persist(&self) {
        let snapshot: HashMap<_, _> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let result = File::create(&self.path)
            .map(BufWriter::new)
            .and_then(|writer| serde_json::to_writer(writer, &snapshot).map_err(Into::into));

        if let Err(e) = result {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to persist local store");
        }
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.insert(key.to_string(), value.to_string());
        metrics::record_local_store_size(self.inner.len());
        self.persist();
    }

    fn remove(&self, key: &str) {
        if self.inner.remove(key).is_some() {
            self.persist();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("k").is_none());
        store.set("k", "v1");
        assert_eq!(store.get("k").as_deref(), Some("v1"));
        store.set("k", "v2");
        assert_eq!(store.get("k").as_deref(), Some("v2"));
        store.remove("k");
        assert!(store.get("k").is_none());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("vault_breaker_open_until", "12345");
        store.set("vault_projects_p1", "{\"name\":\"demo\"}");

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("vault_breaker_open_until").as_deref(),
            Some("12345")
        );
        assert_eq!(
            reopened.get("vault_projects_p1").as_deref(),
            Some("{\"name\":\"demo\"}")
        );
    }

    #[test]
    fn file_store_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("a", "1");
        store.remove("a");

        let reopened = JsonFileStore::open(&path).unwrap();
        assert!(reopened.get("a").is_none());
    }
}
