//! Durable audit persistence service.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and feeds every received [`GuildEvent`] into an
//! [`EventBuffer`]. The buffer is also flushed on a fixed interval, and once
//! more on shutdown so nothing buffered is lost.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::buffer::EventBuffer;
use crate::bus::GuildEvent;

/// Background service that batches audit events into the database.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop.
    ///
    /// Exits when `cancel` fires or the bus is dropped, flushing whatever is
    /// still buffered before returning.
    pub async fn run(
        buffer: Arc<EventBuffer>,
        mut receiver: broadcast::Receiver<GuildEvent>,
        flush_interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(flush_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event persistence cancelled");
                    break;
                }
                _ = interval.tick() => {
                    buffer.flush().await;
                }
                received = receiver.recv() => match received {
                    Ok(event) => buffer.push(event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            skipped = n,
                            "Event persistence lagged, some events were not persisted"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, persistence shutting down");
                        break;
                    }
                },
            }
        }

        let written = buffer.flush().await;
        tracing::info!(written, "Final audit flush complete");
    }
}
