//! Platform user id to internal user id.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use guildxp_core::types::{DbId, PlatformId};

use crate::backend::StoreBackend;
use crate::error::CacheError;
use crate::loader::TtlCache;

pub struct UserCache {
    cache: TtlCache<PlatformId, DbId>,
    backend: Arc<dyn StoreBackend>,
}

impl UserCache {
    pub fn new(backend: Arc<dyn StoreBackend>, ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(ttl),
            backend,
        }
    }

    /// Resolve the internal id, creating the user row on first sight.
    pub async fn resolve(&self, discord_user_id: &str) -> Result<DbId, CacheError> {
        let backend = self.backend.clone();
        let id = discord_user_id.to_string();
        self.cache
            .get_or_load(id.clone(), || async move { backend.upsert_user(&id).await })
            .await
    }

    pub async fn len(&self) -> usize {
        self.cache.len().await
    }

    pub async fn sweep(&self) -> usize {
        self.cache.sweep_at(Utc::now()).await
    }
}
