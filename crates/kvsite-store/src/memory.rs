use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use kvsite_types::StoreKey;

use crate::error::StoreResult;
use crate::traits::{KvStore, Uploader};

/// In-memory, HashMap-based key-value store.
///
/// Intended for tests and embedding. Values are held behind a `RwLock` for
/// safe concurrent access; `Bytes` makes reads cheap clones.
pub struct InMemoryKvStore {
    values: RwLock<HashMap<StoreKey, Bytes>>,
}

impl InMemoryKvStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with the given entries.
    pub fn with_values<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Bytes>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (StoreKey::from_raw(k), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.values
            .read()
            .expect("lock poisoned")
            .values()
            .map(|v| v.len() as u64)
            .sum()
    }

    /// Synchronous read, for assertions.
    pub fn value(&self, key: &str) -> Option<Bytes> {
        self.values.read().expect("lock poisoned").get(key).cloned()
    }

    /// Remove all values from the store.
    pub fn clear(&self) {
        self.values.write().expect("lock poisoned").clear();
    }

    /// Return a sorted list of all keys in the store.
    pub fn keys(&self) -> Vec<StoreKey> {
        let map = self.values.read().expect("lock poisoned");
        let mut keys: Vec<StoreKey> = map.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Uploader for InMemoryKvStore {
    async fn put(&self, key: &StoreKey, value: Bytes) -> StoreResult<()> {
        self.values
            .write()
            .expect("lock poisoned")
            .insert(key.clone(), value);
        Ok(())
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<Bytes>> {
        Ok(self.values.read().expect("lock poisoned").get(key).cloned())
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &self.len())
            .finish()
    }
}
