//! Audit event bus and batched persistence.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`GuildEvent`]: the audit event envelope emitted by the reward
//!   pipelines.
//! - [`EventBuffer`]: append-only buffer flushed in batches to an
//!   [`EventSink`], either when it fills or on a timer.
//! - [`EventPersistence`]: background task wiring the bus to the buffer.

pub mod buffer;
pub mod bus;
pub mod persistence;

pub use buffer::{EventBuffer, EventSink, PgEventSink};
pub use bus::{EventBus, GuildEvent};
pub use persistence::EventPersistence;
