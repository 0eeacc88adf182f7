//! In-process caches in front of the backing store.
//!
//! Three cache maps share one staleness rule ([`staleness::is_stale`]):
//!
//! - [`UserCache`]: platform user id to internal id.
//! - [`GuildCache`]: platform guild id to internal id plus resolved config.
//! - [`ProfileCache`]: write-behind cache of per-guild profiles with a
//!   sparse pending patch, rate-limited coalesced flushes and per-key locks.
//!
//! [`CacheMaintenance`] drives the background sweep and flush-all passes.

pub mod backend;
pub mod error;
pub mod guild;
pub mod identity;
pub mod loader;
pub mod maintenance;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod profile;
pub mod staleness;
pub mod store;

pub use backend::{PgBackend, StoreBackend};
pub use error::CacheError;
pub use guild::{GuildCache, GuildContext};
pub use identity::UserCache;
pub use loader::{CachedEntry, TtlCache};
pub use maintenance::CacheMaintenance;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryBackend;
pub use profile::{
    CachedProfile, FlushOutcome, FlushReport, ProfileCache, ProfileCacheSettings, ProfileKey,
    ProfileSession, SweepReport,
};
pub use store::{CacheStore, MemoryStore};
