//! Guild identity and configuration cache.
//!
//! Config is read on every activity and written rarely, so it is a plain TTL
//! cache with no write-behind: admin updates are validated, persisted, and
//! then replace the cache entry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use guildxp_core::config::GuildConfig;
use guildxp_core::types::{DbId, PlatformId};
use guildxp_db::models::guild::Guild;
use serde_json::Value;

use crate::backend::StoreBackend;
use crate::error::CacheError;
use crate::loader::TtlCache;

/// A guild's internal id and its config resolved against the defaults.
#[derive(Debug, Clone)]
pub struct GuildContext {
    pub id: DbId,
    pub discord_guild_id: PlatformId,
    pub config: Arc<GuildConfig>,
    /// The sparse document as stored, used as the base for admin patches.
    pub stored: Arc<Value>,
}

impl GuildContext {
    fn from_guild(guild: Guild) -> Self {
        let config = GuildConfig::from_stored(&guild.config).unwrap_or_else(|e| {
            tracing::warn!(
                guild_id = %guild.discord_guild_id,
                error = %e,
                "Stored guild config is invalid, using defaults"
            );
            GuildConfig::default()
        });
        Self {
            id: guild.id,
            discord_guild_id: guild.discord_guild_id,
            config: Arc::new(config),
            stored: Arc::new(guild.config),
        }
    }
}

pub struct GuildCache {
    cache: TtlCache<PlatformId, GuildContext>,
    backend: Arc<dyn StoreBackend>,
}

impl GuildCache {
    pub fn new(backend: Arc<dyn StoreBackend>, ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(ttl),
            backend,
        }
    }

    /// Resolve a platform guild id, creating the guild row on first sight.
    pub async fn get(&self, discord_guild_id: &str) -> Result<GuildContext, CacheError> {
        let backend = self.backend.clone();
        let id = discord_guild_id.to_string();
        self.cache
            .get_or_load(id.clone(), || async move {
                let guild = backend.upsert_guild(&id).await?;
                Ok::<_, CacheError>(GuildContext::from_guild(guild))
            })
            .await
    }

    /// Deep-merge `patch` over the stored config, validate and persist it.
    ///
    /// Invalid patches fail with [`CoreError::Validation`] and leave both the
    /// stored document and the cache entry untouched.
    ///
    /// [`CoreError::Validation`]: guildxp_core::error::CoreError::Validation
    pub async fn update_config(
        &self,
        discord_guild_id: &str,
        patch: Value,
    ) -> Result<GuildContext, CacheError> {
        let current = self.get(discord_guild_id).await?;
        let (stored, config) = GuildConfig::apply_patch(&current.stored, patch)?;
        self.backend.write_guild_config(current.id, &stored).await?;

        let updated = GuildContext {
            config: Arc::new(config),
            stored: Arc::new(stored),
            ..current
        };
        self.cache
            .set(discord_guild_id.to_string(), updated.clone())
            .await;
        tracing::info!(guild_id = %discord_guild_id, "Guild config updated");
        Ok(updated)
    }

    pub async fn len(&self) -> usize {
        self.cache.len().await
    }

    pub async fn sweep(&self) -> usize {
        self.cache.sweep_at(Utc::now()).await
    }
}
