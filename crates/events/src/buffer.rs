//! Append-only audit buffer with batched flushes.
//!
//! Events accumulate in memory and are written in one batch either when the
//! buffer reaches its batch size or when the persistence timer fires. The two
//! triggers share a single-flight flag so they never write concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use guildxp_db::models::event::CreateEvent;
use guildxp_db::repositories::EventRepo;
use guildxp_db::DbPool;
use tokio::sync::Mutex;

use crate::bus::GuildEvent;

/// Default number of buffered events that triggers a flush.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Hard cap on buffered events while the sink keeps failing.
/// When exceeded, the oldest events are dropped to bound memory.
const MAX_BUFFERED_EVENTS: usize = 10_000;

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Destination for flushed batches.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist a batch, returning the number of events written.
    async fn write_batch(&self, events: &[GuildEvent]) -> Result<u64, sqlx::Error>;
}

/// Writes batches to the `events` table.
pub struct PgEventSink {
    pool: DbPool,
}

impl PgEventSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventSink for PgEventSink {
    async fn write_batch(&self, events: &[GuildEvent]) -> Result<u64, sqlx::Error> {
        let rows: Vec<CreateEvent> = events
            .iter()
            .map(|e| CreateEvent {
                event_type: e.event_type.clone(),
                discord_guild_id: e.guild_id.clone(),
                discord_user_id: e.user_id.clone(),
                payload: e.payload.clone(),
                created_at: e.timestamp,
            })
            .collect();
        EventRepo::insert_batch(&self.pool, &rows).await
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

pub struct EventBuffer {
    pending: Mutex<Vec<GuildEvent>>,
    flushing: AtomicBool,
    batch_size: usize,
    sink: Arc<dyn EventSink>,
}

/// Clears the single-flight flag when a flush ends, however it ends.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl EventBuffer {
    pub fn new(sink: Arc<dyn EventSink>, batch_size: usize) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            flushing: AtomicBool::new(false),
            batch_size: batch_size.max(1),
            sink,
        }
    }

    /// Append an event, flushing if the buffer reached the batch size.
    pub async fn push(&self, event: GuildEvent) {
        let should_flush = {
            let mut pending = self.pending.lock().await;
            pending.push(event);
            pending.len() >= self.batch_size
        };
        if should_flush {
            self.flush().await;
        }
    }

    /// Number of events waiting to be written.
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Write everything buffered so far in one batch.
    ///
    /// Returns the number of events written. Returns 0 without touching the
    /// buffer if another flush is already in flight. A failed write puts the
    /// batch back at the front of the buffer for the next attempt.
    pub async fn flush(&self) -> u64 {
        if self.flushing.swap(true, Ordering::AcqRel) {
            tracing::debug!("Event flush already in progress, skipping");
            return 0;
        }
        let _guard = FlushGuard(&self.flushing);

        let batch = std::mem::take(&mut *self.pending.lock().await);
        if batch.is_empty() {
            return 0;
        }

        match self.sink.write_batch(&batch).await {
            Ok(written) => {
                tracing::debug!(written, "Flushed audit events");
                written
            }
            Err(e) => {
                tracing::error!(error = %e, count = batch.len(), "Failed to flush audit events");
                let mut pending = self.pending.lock().await;
                let newer = std::mem::replace(&mut *pending, batch);
                pending.extend(newer);
                if pending.len() > MAX_BUFFERED_EVENTS {
                    let excess = pending.len() - MAX_BUFFERED_EVENTS;
                    pending.drain(..excess);
                    tracing::warn!(dropped = excess, "Audit buffer full, dropped oldest events");
                }
                0
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Records batch sizes; optionally fails every write.
    #[derive(Default)]
    struct RecordingSink {
        batches: std::sync::Mutex<Vec<usize>>,
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn write_batch(&self, events: &[GuildEvent]) -> Result<u64, sqlx::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(sqlx::Error::PoolTimedOut);
            }
            self.batches.lock().unwrap().push(events.len());
            Ok(events.len() as u64)
        }
    }

    fn event(n: usize) -> GuildEvent {
        GuildEvent::new("xp.granted").with_payload(serde_json::json!({ "n": n }))
    }

    #[tokio::test]
    async fn flushes_when_batch_size_reached() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = EventBuffer::new(sink.clone(), 3);

        buffer.push(event(1)).await;
        buffer.push(event(2)).await;
        assert!(sink.batches.lock().unwrap().is_empty());

        buffer.push(event(3)).await;
        assert_eq!(*sink.batches.lock().unwrap(), vec![3]);
        assert!(buffer.is_empty().await);
    }

    #[tokio::test]
    async fn timer_flush_writes_partial_batch() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = EventBuffer::new(sink.clone(), DEFAULT_BATCH_SIZE);

        buffer.push(event(1)).await;
        assert_eq!(buffer.flush().await, 1);
        assert_eq!(buffer.flush().await, 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_flush_keeps_events_in_order() {
        let sink = Arc::new(RecordingSink::default());
        sink.fail.store(true, Ordering::SeqCst);
        let buffer = EventBuffer::new(sink.clone(), DEFAULT_BATCH_SIZE);

        buffer.push(event(1)).await;
        buffer.push(event(2)).await;
        assert_eq!(buffer.flush().await, 0);
        buffer.push(event(3)).await;

        let pending = buffer.pending.lock().await;
        let order: Vec<_> = pending.iter().map(|e| e.payload["n"].clone()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn in_flight_flag_blocks_second_flush() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = EventBuffer::new(sink.clone(), DEFAULT_BATCH_SIZE);
        buffer.push(event(1)).await;

        buffer.flushing.store(true, Ordering::SeqCst);
        assert_eq!(buffer.flush().await, 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
        assert_eq!(buffer.len().await, 1);

        buffer.flushing.store(false, Ordering::SeqCst);
        assert_eq!(buffer.flush().await, 1);
    }
}
