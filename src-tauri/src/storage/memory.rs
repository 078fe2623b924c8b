//! In-process store for exercising the persistence layer without I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AsyncKeyValueStore, KeyValueStore, StorageError};

/// Process-local store. Counts writes so callers can observe write-backs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, raw: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), raw.to_string());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

#[async_trait]
impl AsyncKeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        KeyValueStore::get(self, key)
    }

    async fn set(&self, key: &str, raw: &str) -> Result<(), StorageError> {
        KeyValueStore::set(self, key, raw)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        KeyValueStore::remove(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_counts_writes() {
        let store = MemoryStore::new();
        KeyValueStore::set(&store, "a", "1").unwrap();
        KeyValueStore::set(&store, "a", "2").unwrap();
        KeyValueStore::remove(&store, "a").unwrap();

        assert_eq!(store.write_count(), 2);
        assert!(KeyValueStore::get(&store, "a").unwrap().is_none());
    }
}
