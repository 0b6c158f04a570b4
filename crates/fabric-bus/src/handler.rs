//! # Event Handlers
//!
//! A handler is the delivery end of a subscription. Handlers are invoked
//! synchronously from `publish`, so they must never block.

use fabric_telemetry::EVENTS_DROPPED;
use fabric_types::Event;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// Non-blocking event sink.
pub trait Handler: Send + Sync {
    /// Accept one event. Must return without waiting.
    fn notify(&self, event: Event);
}

impl<F> Handler for F
where
    F: Fn(Event) + Send + Sync,
{
    fn notify(&self, event: Event) {
        self(event);
    }
}

/// Handler enqueueing into a bounded channel.
///
/// When the channel is full the newest event is dropped and counted.
/// Events sent after the receiver is gone are discarded silently.
#[derive(Debug)]
pub struct ChannelHandler {
    tx: mpsc::Sender<Event>,
    dropped: AtomicU64,
}

impl ChannelHandler {
    /// Number of events dropped because the channel was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Whether the receiving side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Handler for ChannelHandler {
    fn notify(&self, event: Event) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                EVENTS_DROPPED.inc();
                warn!(
                    name = %event.name(),
                    unique_id = %event.unique_id(),
                    dropped,
                    "Delivery channel full, dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Bounded channel wrapped in a [`ChannelHandler`].
#[must_use]
pub fn channel(capacity: usize) -> (Arc<ChannelHandler>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handler = ChannelHandler {
        tx,
        dropped: AtomicU64::new(0),
    };
    (Arc::new(handler), rx)
}
