//! Injectable key-value store behind every cache map.
//!
//! The caches only need `get/set/delete/keys/entries`; [`MemoryStore`] is the
//! in-process implementation. Enumeration follows insertion order.

use std::hash::Hash;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait CacheStore<K, V>: Send + Sync
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V>;

    async fn set(&self, key: K, value: V);

    /// Remove an entry, returning it if present.
    async fn delete(&self, key: &K) -> Option<V>;

    /// Remove the entry only if `pred` holds for its current value.
    ///
    /// The check and the removal are atomic with respect to `set`.
    async fn remove_if(&self, key: &K, pred: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync)) -> Option<V>;

    async fn keys(&self) -> Vec<K>;

    async fn entries(&self) -> Vec<(K, V)>;

    async fn len(&self) -> usize;
}

/// Insertion-ordered map guarded by an async `RwLock`.
pub struct MemoryStore<K, V> {
    map: RwLock<IndexMap<K, V>>,
}

impl<K, V> MemoryStore<K, V> {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(IndexMap::new()),
        }
    }
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> CacheStore<K, V> for MemoryStore<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        self.map.read().await.get(key).cloned()
    }

    async fn set(&self, key: K, value: V) {
        self.map.write().await.insert(key, value);
    }

    async fn delete(&self, key: &K) -> Option<V> {
        self.map.write().await.shift_remove(key)
    }

    async fn remove_if(&self, key: &K, pred: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync)) -> Option<V> {
        let mut map = self.map.write().await;
        if map.get(key).is_some_and(pred) {
            map.shift_remove(key)
        } else {
            None
        }
    }

    async fn keys(&self) -> Vec<K> {
        self.map.read().await.keys().cloned().collect()
    }

    async fn entries(&self) -> Vec<(K, V)> {
        self.map
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    async fn len(&self) -> usize {
        self.map.read().await.len()
    }
}
