//! Background sweep and flush-all passes over the caches.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::guild::GuildCache;
use crate::identity::UserCache;
use crate::profile::{FlushReport, ProfileCache};

/// Drives two timers on one task: a long-interval sweep that evicts entries
/// older than ten TTLs, and a short-interval pass that flushes every dirty
/// profile.
pub struct CacheMaintenance {
    profiles: Arc<ProfileCache>,
    guilds: Arc<GuildCache>,
    users: Arc<UserCache>,
    sweep_interval: Duration,
    flush_interval: Duration,
}

impl CacheMaintenance {
    pub fn new(
        profiles: Arc<ProfileCache>,
        guilds: Arc<GuildCache>,
        users: Arc<UserCache>,
        sweep_interval: Duration,
        flush_interval: Duration,
    ) -> Self {
        Self {
            profiles,
            guilds,
            users,
            sweep_interval,
            flush_interval,
        }
    }

    /// Run both passes until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut sweep = tokio::time::interval(self.sweep_interval);
        let mut flush = tokio::time::interval(self.flush_interval);
        // Both intervals tick immediately; nothing is cached yet at startup.
        sweep.tick().await;
        flush.tick().await;

        tracing::info!(
            sweep_secs = self.sweep_interval.as_secs(),
            flush_secs = self.flush_interval.as_secs(),
            "Cache maintenance started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Cache maintenance cancelled");
                    break;
                }
                _ = sweep.tick() => {
                    self.sweep().await;
                }
                _ = flush.tick() => {
                    self.profiles.flush_all(false).await;
                }
            }
        }
    }

    /// One sweep over all three cache maps. Returns the number of evictions.
    pub async fn sweep(&self) -> usize {
        let profiles = self.profiles.sweep_at(Utc::now()).await;
        let guilds = self.guilds.sweep().await;
        let users = self.users.sweep().await;
        let evicted = profiles.evicted + guilds + users;
        if evicted > 0 || profiles.retained > 0 {
            tracing::info!(
                evicted,
                retained = profiles.retained,
                "Cache sweep complete"
            );
        }
        evicted
    }

    /// Final flush at process exit, bypassing the write rate limit.
    pub async fn shutdown(&self) -> FlushReport {
        let report = self.profiles.flush_all(true).await;
        tracing::info!(
            written = report.written,
            failed = report.failed,
            "Final profile flush complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::profile::{ProfileCacheSettings, ProfileKey};

    fn build(backend: Arc<MemoryBackend>) -> (CacheMaintenance, Arc<ProfileCache>) {
        let profiles = Arc::new(ProfileCache::new(
            backend.clone(),
            ProfileCacheSettings::default(),
        ));
        let guilds = Arc::new(GuildCache::new(backend.clone(), Duration::from_secs(600)));
        let users = Arc::new(UserCache::new(backend, Duration::from_secs(3600)));
        let maintenance = CacheMaintenance::new(
            profiles.clone(),
            guilds,
            users,
            Duration::from_secs(600),
            Duration::from_secs(30),
        );
        (maintenance, profiles)
    }

    #[tokio::test(start_paused = true)]
    async fn flush_timer_persists_dirty_profiles() {
        let backend = Arc::new(MemoryBackend::new());
        let (maintenance, profiles) = build(backend.clone());
        let key = ProfileKey::new(1, 2);

        let mut session = profiles.checkout(key).await.unwrap();
        session.tracked().add_xp(15);
        profiles.commit(session).await;

        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { maintenance.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_secs(31)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(backend.stored_profile(key).unwrap().xp, 15);
    }

    #[tokio::test]
    async fn shutdown_bypasses_rate_limit() {
        let backend = Arc::new(MemoryBackend::new());
        let (maintenance, profiles) = build(backend.clone());
        let key = ProfileKey::new(1, 2);

        for _ in 0..2 {
            let mut session = profiles.checkout(key).await.unwrap();
            session.tracked().add_xp(1);
            profiles.commit(session).await;
            maintenance.shutdown().await;
        }

        assert_eq!(backend.profile_writes().len(), 2);
        assert_eq!(backend.stored_profile(key).unwrap().xp, 2);
    }
}
