//! Cache-aside loader over a [`CacheStore`].

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use guildxp_core::types::Timestamp;

use crate::staleness::{is_evictable, is_stale};
use crate::store::{CacheStore, MemoryStore};

/// A cached value and the moment it was last loaded or written.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry<V> {
    pub value: V,
    pub loaded_at: Timestamp,
}

impl<V> CachedEntry<V> {
    pub fn new(value: V, loaded_at: Timestamp) -> Self {
        Self { value, loaded_at }
    }
}

/// Plain TTL cache: returns fresh entries as-is, reloads missing or stale ones.
pub struct TtlCache<K, V> {
    store: Arc<dyn CacheStore<K, CachedEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), ttl)
    }

    pub fn with_store(store: Arc<dyn CacheStore<K, CachedEntry<V>>>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key`, calling `load` on a miss or when
    /// the entry is stale.
    ///
    /// A miss and a stale hit are handled identically. Errors from `load`
    /// propagate and leave the cache untouched.
    pub async fn get_or_load<F, Fut, E>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(entry) = self.store.get(&key).await {
            if !is_stale(entry.loaded_at, self.ttl, Utc::now()) {
                return Ok(entry.value);
            }
        }

        let value = load().await?;
        self.store
            .set(key, CachedEntry::new(value.clone(), Utc::now()))
            .await;
        Ok(value)
    }

    /// Overwrite the entry for `key` with a freshly stamped value.
    pub async fn set(&self, key: K, value: V) {
        self.store.set(key, CachedEntry::new(value, Utc::now())).await;
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    /// Evict every entry loaded more than ten TTLs before `now`.
    ///
    /// Staleness is re-checked at removal time, so an entry reloaded during
    /// the pass survives.
    pub async fn sweep_at(&self, now: Timestamp) -> usize {
        let ttl = self.ttl;
        let evictable = move |entry: &CachedEntry<V>| is_evictable(entry.loaded_at, ttl, now);
        let mut evicted = 0;
        for key in self.store.keys().await {
            if self.store.remove_if(&key, &evictable).await.is_some() {
                evicted += 1;
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration as TimeDelta;

    use super::*;

    type Entry = CachedEntry<i64>;

    /// Reloads `"busy"` right after the sweep enumerates its keys.
    struct ReloadDuringSweep {
        inner: MemoryStore<&'static str, Entry>,
        reloaded_at: Timestamp,
    }

    #[async_trait]
    impl CacheStore<&'static str, Entry> for ReloadDuringSweep {
        async fn get(&self, key: &&'static str) -> Option<Entry> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &'static str, value: Entry) {
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &&'static str) -> Option<Entry> {
            self.inner.delete(key).await
        }

        async fn remove_if(
            &self,
            key: &&'static str,
            pred: &(dyn for<'a> Fn(&'a Entry) -> bool + Send + Sync),
        ) -> Option<Entry> {
            self.inner.remove_if(key, pred).await
        }

        async fn keys(&self) -> Vec<&'static str> {
            let keys = self.inner.keys().await;
            self.inner.set("busy", CachedEntry::new(2, self.reloaded_at)).await;
            keys
        }

        async fn entries(&self) -> Vec<(&'static str, Entry)> {
            self.inner.entries().await
        }

        async fn len(&self) -> usize {
            self.inner.len().await
        }
    }

    #[tokio::test]
    async fn fresh_hit_skips_loader() {
        let cache: TtlCache<&str, i64> = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_load("guild", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_entry_reloads() {
        let store: Arc<MemoryStore<&str, CachedEntry<i64>>> = Arc::new(MemoryStore::new());
        let cache = TtlCache::with_store(store.clone(), Duration::from_secs(60));
        store
            .set("guild", CachedEntry::new(1, Utc::now() - TimeDelta::seconds(61)))
            .await;

        let value = cache
            .get_or_load("guild", || async { Ok::<_, std::convert::Infallible>(2) })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn loader_error_propagates_and_caches_nothing() {
        let cache: TtlCache<&str, i64> = TtlCache::new(Duration::from_secs(60));
        let result = cache
            .get_or_load("guild", || async { Err::<i64, _>("backend down") })
            .await;
        assert_eq!(result, Err("backend down"));
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn sweep_evicts_only_past_horizon() {
        let store: Arc<MemoryStore<&str, CachedEntry<i64>>> = Arc::new(MemoryStore::new());
        let cache = TtlCache::with_store(store.clone(), Duration::from_secs(60));
        let now = Utc::now();
        store.set("old", CachedEntry::new(1, now - TimeDelta::seconds(601))).await;
        store.set("stale", CachedEntry::new(2, now - TimeDelta::seconds(120))).await;

        assert_eq!(cache.sweep_at(now).await, 1);
        assert_eq!(store.keys().await, vec!["stale"]);
    }

    #[tokio::test]
    async fn sweep_spares_an_entry_reloaded_mid_pass() {
        let now = Utc::now();
        let store = Arc::new(ReloadDuringSweep {
            inner: MemoryStore::new(),
            reloaded_at: now,
        });
        let long_ago = now - TimeDelta::seconds(601);
        store.inner.set("busy", CachedEntry::new(1, long_ago)).await;
        store.inner.set("idle", CachedEntry::new(1, long_ago)).await;
        let cache = TtlCache::with_store(store.clone(), Duration::from_secs(60));

        assert_eq!(cache.sweep_at(now).await, 1);
        assert_eq!(store.inner.keys().await, vec!["busy"]);
        assert_eq!(store.inner.get(&"busy").await.unwrap().value, 2);
    }
}
