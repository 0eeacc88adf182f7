//! Write-behind cache of per-guild profiles.
//!
//! Each entry carries the authoritative in-memory [`Profile`] together with
//! the sparse patch of columns changed since the last successful flush (see
//! [`TrackedProfile`]). Flushes turn that patch into one coalesced update and
//! are rate-limited per key.
//!
//! Every read-modify-write of an entry happens under a per-key async lock:
//! handlers [`checkout`](ProfileCache::checkout) a [`ProfileSession`], run the
//! pipelines against it and [`commit`](ProfileCache::commit) it back. Flushes,
//! sweeps and the flush-all pass take the same lock, so a key never has two
//! writers at once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use guildxp_core::profile::Profile;
use guildxp_core::tracked::TrackedProfile;
use guildxp_core::types::{DbId, Timestamp};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::backend::StoreBackend;
use crate::error::CacheError;
use crate::staleness::{is_evictable, is_stale, within};
use crate::store::{CacheStore, MemoryStore};

// ---------------------------------------------------------------------------
// Keys and entries
// ---------------------------------------------------------------------------

/// Internal (user, guild) id pair identifying one profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub user_id: DbId,
    pub guild_id: DbId,
}

impl ProfileKey {
    pub fn new(user_id: DbId, guild_id: DbId) -> Self {
        Self { user_id, guild_id }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user_id, self.guild_id)
    }
}

#[derive(Debug, Clone)]
pub struct CachedProfile {
    pub tracked: TrackedProfile,
    pub loaded_at: Timestamp,
    /// Time of the last successful flush; drives the write rate limit.
    pub last_wrote_to_db: Option<Timestamp>,
}

impl CachedProfile {
    pub fn loaded(profile: Profile, now: Timestamp) -> Self {
        Self {
            tracked: TrackedProfile::new(profile),
            loaded_at: now,
            last_wrote_to_db: None,
        }
    }

    pub fn profile(&self) -> &Profile {
        self.tracked.profile()
    }

    pub fn is_dirty(&self) -> bool {
        self.tracked.is_dirty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProfileCacheSettings {
    pub ttl: Duration,
    /// Minimum spacing between two persisted writes of the same key.
    pub min_write_interval: Duration,
    /// Change count at which [`ProfileCache::flush_if_due`] writes.
    pub flush_after_changes: u32,
}

impl Default for ProfileCacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            min_write_interval: Duration::from_millis(5000),
            flush_after_changes: 25,
        }
    }
}

/// What a single flush attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No entry cached for the key.
    Missing,
    /// Nothing pending.
    Clean,
    /// Dirty, but the last write was too recent.
    RateLimited,
    /// Dirty, but not enough changes have accumulated yet.
    Deferred,
    Written,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: usize,
    /// Expired entries kept because their final flush failed.
    pub retained: usize,
}

// ---------------------------------------------------------------------------
// ProfileSession
// ---------------------------------------------------------------------------

/// Exclusive, locked view of one cache entry.
///
/// Dropping a session without committing discards its mutations.
pub struct ProfileSession {
    key: ProfileKey,
    entry: CachedProfile,
    _guard: OwnedMutexGuard<()>,
}

impl ProfileSession {
    pub fn key(&self) -> ProfileKey {
        self.key
    }

    pub fn profile(&self) -> &Profile {
        self.entry.profile()
    }

    pub fn tracked(&mut self) -> &mut TrackedProfile {
        &mut self.entry.tracked
    }

    pub fn entry(&self) -> &CachedProfile {
        &self.entry
    }
}

// ---------------------------------------------------------------------------
// ProfileCache
// ---------------------------------------------------------------------------

pub struct ProfileCache {
    store: Arc<dyn CacheStore<ProfileKey, CachedProfile>>,
    backend: Arc<dyn StoreBackend>,
    locks: Mutex<HashMap<ProfileKey, Arc<Mutex<()>>>>,
    settings: ProfileCacheSettings,
}

impl ProfileCache {
    pub fn new(backend: Arc<dyn StoreBackend>, settings: ProfileCacheSettings) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), backend, settings)
    }

    pub fn with_store(
        store: Arc<dyn CacheStore<ProfileKey, CachedProfile>>,
        backend: Arc<dyn StoreBackend>,
        settings: ProfileCacheSettings,
    ) -> Self {
        Self {
            store,
            backend,
            locks: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &ProfileCacheSettings {
        &self.settings
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn dirty_count(&self) -> usize {
        self.store
            .entries()
            .await
            .iter()
            .filter(|(_, entry)| entry.is_dirty())
            .count()
    }

    // -- read / write -------------------------------------------------------

    /// Cache-aside read of the entry for `key`.
    pub async fn get_or_create(&self, key: ProfileKey) -> Result<CachedProfile, CacheError> {
        let _guard = self.lock(key).await;
        self.load_locked(key).await
    }

    /// Replace the entry for `key`, stamping it as freshly loaded.
    ///
    /// The last writer wins; pending changes are not merged.
    pub async fn set(&self, key: ProfileKey, mut entry: CachedProfile) {
        let _guard = self.lock(key).await;
        entry.loaded_at = Utc::now();
        self.store.set(key, entry).await;
    }

    /// Lock `key` and load its entry for mutation.
    pub async fn checkout(&self, key: ProfileKey) -> Result<ProfileSession, CacheError> {
        let guard = self.lock(key).await;
        let entry = self.load_locked(key).await?;
        Ok(ProfileSession {
            key,
            entry,
            _guard: guard,
        })
    }

    /// Store the session's entry and release the key lock.
    pub async fn commit(&self, session: ProfileSession) {
        let ProfileSession {
            key,
            mut entry,
            _guard,
        } = session;
        entry.loaded_at = Utc::now();
        self.store.set(key, entry).await;
    }

    // -- flushing -----------------------------------------------------------

    /// Persist the pending patch for `key`, honouring the write rate limit.
    pub async fn flush(&self, key: ProfileKey) -> Result<FlushOutcome, CacheError> {
        let _guard = self.lock(key).await;
        self.flush_locked(key, false).await
    }

    /// Flush only once enough changes have piled up since the last write.
    pub async fn flush_if_due(&self, key: ProfileKey) -> Result<FlushOutcome, CacheError> {
        let _guard = self.lock(key).await;
        match self.store.get(&key).await {
            Some(entry) if entry.tracked.change_count() < self.settings.flush_after_changes => {
                Ok(if entry.is_dirty() {
                    FlushOutcome::Deferred
                } else {
                    FlushOutcome::Clean
                })
            }
            _ => self.flush_locked(key, false).await,
        }
    }

    /// Flush every dirty entry in enumeration order.
    ///
    /// Failures are logged and counted; they never stop the pass.
    pub async fn flush_all(&self, force: bool) -> FlushReport {
        let mut report = FlushReport::default();
        for key in self.store.keys().await {
            let _guard = self.lock(key).await;
            match self.flush_locked(key, force).await {
                Ok(FlushOutcome::Written) => report.written += 1,
                Ok(_) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(%key, error = %e, "Failed to flush profile");
                }
            }
        }
        if report.written > 0 || report.failed > 0 {
            tracing::debug!(
                written = report.written,
                failed = report.failed,
                "Profile flush pass complete"
            );
        }
        report
    }

    /// Evict entries loaded more than ten TTLs before `now`.
    ///
    /// Dirty entries are flushed first with the rate limit bypassed; an entry
    /// whose flush fails stays cached so its pending changes survive.
    pub async fn sweep_at(&self, now: Timestamp) -> SweepReport {
        let mut report = SweepReport::default();
        for key in self.store.keys().await {
            let guard = self.lock(key).await;
            let Some(entry) = self.store.get(&key).await else {
                continue;
            };
            if !is_evictable(entry.loaded_at, self.settings.ttl, now) {
                continue;
            }
            if entry.is_dirty() {
                if let Err(e) = self.write_locked(key, entry).await {
                    tracing::error!(%key, error = %e, "Failed to flush profile before eviction");
                    report.retained += 1;
                    continue;
                }
            }
            self.store.delete(&key).await;
            drop(guard);
            self.forget_lock(key).await;
            report.evicted += 1;
        }
        report
    }

    // -- internals ----------------------------------------------------------

    async fn lock(&self, key: ProfileKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop the lock slot for an evicted key unless someone is waiting on it.
    async fn forget_lock(&self, key: ProfileKey) {
        let mut locks = self.locks.lock().await;
        if locks.get(&key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&key);
        }
    }

    async fn load_locked(&self, key: ProfileKey) -> Result<CachedProfile, CacheError> {
        if let Some(entry) = self.store.get(&key).await {
            if !is_stale(entry.loaded_at, self.settings.ttl, Utc::now()) {
                return Ok(entry);
            }
            if entry.is_dirty() {
                // Reloading would drop pending changes; the flush returns the
                // persisted row instead.
                return self.write_locked(key, entry).await;
            }
        }

        let profile = self.backend.load_profile(key).await?;
        let entry = CachedProfile::loaded(profile, Utc::now());
        self.store.set(key, entry.clone()).await;
        Ok(entry)
    }

    async fn flush_locked(&self, key: ProfileKey, force: bool) -> Result<FlushOutcome, CacheError> {
        let Some(entry) = self.store.get(&key).await else {
            return Ok(FlushOutcome::Missing);
        };
        if !entry.is_dirty() {
            return Ok(FlushOutcome::Clean);
        }
        if !force {
            if let Some(at) = entry.last_wrote_to_db {
                if within(at, self.settings.min_write_interval, Utc::now()) {
                    return Ok(FlushOutcome::RateLimited);
                }
            }
        }
        self.write_locked(key, entry).await?;
        Ok(FlushOutcome::Written)
    }

    async fn write_locked(
        &self,
        key: ProfileKey,
        mut entry: CachedProfile,
    ) -> Result<CachedProfile, CacheError> {
        let persisted = self
            .backend
            .write_profile(key, entry.tracked.pending())
            .await?;
        let now = Utc::now();
        entry.tracked.mark_persisted(persisted);
        entry.loaded_at = now;
        entry.last_wrote_to_db = Some(now);
        self.store.set(key, entry.clone()).await;
        tracing::debug!(%key, "Profile flushed");
        Ok(entry)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
