//! Activity handlers over the caches and pipelines, plus the process
//! plumbing of the `guildxp-worker` binary.

pub mod config;
pub mod dry_run;
pub mod error;
pub mod handlers;
pub mod health;
pub mod services;

pub use config::{ConfigError, WorkerConfig};
pub use error::HandlerError;
pub use services::Services;
