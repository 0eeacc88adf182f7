use guildxp_cache::CacheError;
use guildxp_core::error::CoreError;

/// Failure of an activity handler.
///
/// Domain refusals (cooldowns, insufficient gold, quest state) are not
/// errors; they come back as a refused [`Reply`](crate::handlers::Reply).
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl HandlerError {
    /// Reply shown to the member. Never exposes internals, except for config
    /// validation messages which are meant for the admin who sent the patch.
    pub fn user_message(&self) -> String {
        match self {
            HandlerError::Cache(CacheError::Core(CoreError::Validation(msg))) => {
                format!("Invalid configuration: {msg}")
            }
            HandlerError::Cache(e) => {
                tracing::error!(error = %e, "Activity handler failed");
                "Something went wrong, please try again later.".to_string()
            }
        }
    }
}
