//! Backing-store collaborator used by the caches on a miss or a flush.

use async_trait::async_trait;
use guildxp_core::profile::{Profile, ProfilePatch};
use guildxp_core::types::DbId;
use guildxp_db::models::guild::Guild;
use guildxp_db::repositories::{GuildRepo, ProfileRepo, UserRepo};
use guildxp_db::DbPool;

use crate::error::CacheError;
use crate::profile::ProfileKey;

#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Fetch or create the guild row for a platform guild id.
    async fn upsert_guild(&self, discord_guild_id: &str) -> Result<Guild, CacheError>;

    /// Fetch or create the user row, returning its internal id.
    async fn upsert_user(&self, discord_user_id: &str) -> Result<DbId, CacheError>;

    /// Fetch or create the profile for `key`.
    ///
    /// A row missing right after its upsert is reported as `NotFound`.
    async fn load_profile(&self, key: ProfileKey) -> Result<Profile, CacheError>;

    /// Persist the columns named in `patch` in one statement and return the
    /// updated row.
    async fn write_profile(
        &self,
        key: ProfileKey,
        patch: &ProfilePatch,
    ) -> Result<Profile, CacheError>;

    /// Replace the stored config document of a guild.
    async fn write_guild_config(
        &self,
        guild_id: DbId,
        config: &serde_json::Value,
    ) -> Result<(), CacheError>;

    /// Cheap reachability check for health reporting.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// [`StoreBackend`] over the Postgres repositories.
#[derive(Clone)]
pub struct PgBackend {
    pool: DbPool,
}

impl PgBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreBackend for PgBackend {
    async fn upsert_guild(&self, discord_guild_id: &str) -> Result<Guild, CacheError> {
        Ok(GuildRepo::upsert(&self.pool, discord_guild_id).await?)
    }

    async fn upsert_user(&self, discord_user_id: &str) -> Result<DbId, CacheError> {
        Ok(UserRepo::upsert(&self.pool, discord_user_id).await?.id)
    }

    async fn load_profile(&self, key: ProfileKey) -> Result<Profile, CacheError> {
        ProfileRepo::get_or_create(&self.pool, key.user_id, key.guild_id)
            .await?
            .map(Profile::from)
            .ok_or_else(|| CacheError::not_found("profile", key))
    }

    async fn write_profile(
        &self,
        key: ProfileKey,
        patch: &ProfilePatch,
    ) -> Result<Profile, CacheError> {
        ProfileRepo::apply_patch(&self.pool, key.user_id, key.guild_id, patch)
            .await?
            .map(Profile::from)
            .ok_or_else(|| CacheError::not_found("profile", key))
    }

    async fn write_guild_config(
        &self,
        guild_id: DbId,
        config: &serde_json::Value,
    ) -> Result<(), CacheError> {
        GuildRepo::update_config(&self.pool, guild_id, config)
            .await?
            .ok_or_else(|| CacheError::not_found("guild", guild_id))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(guildxp_db::health_check(&self.pool).await?)
    }
}
