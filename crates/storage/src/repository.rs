use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage is unavailable: {0}")]
    Unavailable(String),
}

/// Durable string key/value storage for one learner profile.
///
/// Keys are not namespaced; callers are responsible for keeping them unique.
/// Values are opaque strings (flags are written as `"true"`/`"false"`, aggregates
/// as JSON).
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// Returns `Ok(None)` for a key that was never written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Simple in-memory store for tests and throwaway sessions.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProgressStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// The store behind a trait object, so backends can be swapped at startup.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            progress: Arc::new(InMemoryStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_absent() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("progress_section_0").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let store = InMemoryStore::new();
        store.set("validation_a", "true").await.unwrap();
        store.set("validation_a", "false").await.unwrap();
        assert_eq!(
            store.get("validation_a").await.unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store.set("k", "v").await.unwrap();
        assert_eq!(other.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn storage_bundle_uses_trait_object() {
        let storage = Storage::in_memory();
        storage.progress.set("ledger", "{}").await.unwrap();
        assert_eq!(
            storage.progress.get("ledger").await.unwrap().as_deref(),
            Some("{}")
        );
    }
}
