use std::sync::Arc;

use guildxp_cache::{
    CacheMaintenance, GuildCache, ProfileCache, ProfileCacheSettings, StoreBackend, UserCache,
};
use guildxp_events::EventBus;
use guildxp_pipeline::{ChatPlatform, SideEffectApplier};

use crate::config::WorkerConfig;

/// Shared state handed to every activity handler.
///
/// Cheap to clone; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct Services {
    pub backend: Arc<dyn StoreBackend>,
    pub profiles: Arc<ProfileCache>,
    pub guilds: Arc<GuildCache>,
    pub users: Arc<UserCache>,
    pub applier: Arc<SideEffectApplier>,
    pub bus: Arc<EventBus>,
}

impl Services {
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        platform: Arc<dyn ChatPlatform>,
        bus: Arc<EventBus>,
        config: &WorkerConfig,
    ) -> Self {
        Self::with_settings(
            backend,
            platform,
            bus,
            config.profile_settings(),
            config.config_ttl,
            config.identity_ttl,
        )
    }

    pub fn with_settings(
        backend: Arc<dyn StoreBackend>,
        platform: Arc<dyn ChatPlatform>,
        bus: Arc<EventBus>,
        profiles: ProfileCacheSettings,
        config_ttl: std::time::Duration,
        identity_ttl: std::time::Duration,
    ) -> Self {
        Self {
            profiles: Arc::new(ProfileCache::new(backend.clone(), profiles)),
            guilds: Arc::new(GuildCache::new(backend.clone(), config_ttl)),
            users: Arc::new(UserCache::new(backend.clone(), identity_ttl)),
            applier: Arc::new(SideEffectApplier::new(platform, bus.clone())),
            backend,
            bus,
        }
    }

    pub fn maintenance(&self, config: &WorkerConfig) -> CacheMaintenance {
        CacheMaintenance::new(
            self.profiles.clone(),
            self.guilds.clone(),
            self.users.clone(),
            config.sweep_interval,
            config.flush_interval,
        )
    }
}
