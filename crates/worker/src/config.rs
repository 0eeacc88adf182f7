use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use guildxp_cache::ProfileCacheSettings;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Worker configuration loaded from environment variables.
///
/// | Env Var                     | Default   |
/// |-----------------------------|-----------|
/// | `DATABASE_URL`              | required  |
/// | `PROFILE_TTL_SECS`          | `300`     |
/// | `CONFIG_TTL_SECS`           | `600`     |
/// | `IDENTITY_TTL_SECS`         | `3600`    |
/// | `SWEEP_INTERVAL_SECS`       | `600`     |
/// | `FLUSH_INTERVAL_SECS`       | `30`      |
/// | `MIN_WRITE_INTERVAL_MS`     | `5000`    |
/// | `FLUSH_AFTER_CHANGES`       | `25`      |
/// | `EVENT_BATCH_SIZE`          | `100`     |
/// | `EVENT_FLUSH_INTERVAL_SECS` | `10`      |
/// | `HEALTH_HOST`               | `0.0.0.0` |
/// | `HEALTH_PORT`               | `3001`    |
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub database_url: String,
    pub profile_ttl: Duration,
    pub config_ttl: Duration,
    pub identity_ttl: Duration,
    pub sweep_interval: Duration,
    pub flush_interval: Duration,
    pub min_write_interval: Duration,
    pub flush_after_changes: u32,
    pub event_batch_size: usize,
    pub event_flush_interval: Duration,
    pub health_addr: SocketAddr,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let secs = |var: &'static str, default: u64| {
            parse_or(&lookup, var, default).map(Duration::from_secs)
        };

        let host: IpAddr = parse_or(&lookup, "HEALTH_HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port: u16 = parse_or(&lookup, "HEALTH_PORT", 3001)?;

        Ok(Self {
            database_url,
            profile_ttl: secs("PROFILE_TTL_SECS", 300)?,
            config_ttl: secs("CONFIG_TTL_SECS", 600)?,
            identity_ttl: secs("IDENTITY_TTL_SECS", 3600)?,
            sweep_interval: secs("SWEEP_INTERVAL_SECS", 600)?,
            flush_interval: secs("FLUSH_INTERVAL_SECS", 30)?,
            min_write_interval: Duration::from_millis(parse_or(
                &lookup,
                "MIN_WRITE_INTERVAL_MS",
                5000,
            )?),
            flush_after_changes: parse_or(&lookup, "FLUSH_AFTER_CHANGES", 25)?,
            event_batch_size: parse_or(&lookup, "EVENT_BATCH_SIZE", 100)?,
            event_flush_interval: secs("EVENT_FLUSH_INTERVAL_SECS", 10)?,
            health_addr: SocketAddr::new(host, port),
        })
    }

    pub fn profile_settings(&self) -> ProfileCacheSettings {
        ProfileCacheSettings {
            ttl: self.profile_ttl,
            min_write_interval: self.min_write_interval,
            flush_after_changes: self.flush_after_changes,
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
