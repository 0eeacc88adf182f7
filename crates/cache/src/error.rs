use guildxp_core::error::CoreError;

/// Errors surfaced by the cache layer.
///
/// Backing-store failures are passed through untouched; this layer never
/// retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl CacheError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CacheError::Core(CoreError::NotFound {
            entity,
            id: id.to_string(),
        })
    }
}
