//! # Memory History Store
//!
//! History backend that keeps recent events in a bounded ring buffer next
//! to a [`BasicBus`].
//!
//! ## Join point
//!
//! Publication appends to the buffer and dispatches while holding the store
//! lock. A history subscription registers its live channel and snapshots the
//! buffer under that same lock, so every event is either replayed or
//! delivered live, exactly once.

use crate::backend::{BusError, HistoryBackend, PubSub};
use crate::basic::BasicBus;
use crate::handler::{channel, Handler};
use crate::subscription::{EventFilter, Subscription, SubscriptionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabric_telemetry::{HISTORY_FETCH_DURATION, HISTORY_RETAINED};
use fabric_types::{CallContext, EntityIdentifiers, Event};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default number of retained events.
pub const DEFAULT_HISTORY_CAPACITY: usize = 4096;

/// Default retention of events in memory.
pub const DEFAULT_HISTORY_RETENTION: Duration = Duration::from_secs(600);

/// Default size of the live buffer of a history subscription.
pub const DEFAULT_LIVE_BUFFER: usize = 1024;

/// Limits of a [`MemoryHistoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of retained events. Oldest are evicted first.
    pub capacity: usize,
    /// Events older than this are evicted.
    pub retention: Duration,
    /// Capacity of the live channel used while replaying history.
    pub live_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            retention: DEFAULT_HISTORY_RETENTION,
            live_buffer: DEFAULT_LIVE_BUFFER,
        }
    }
}

/// In-memory history backend.
#[derive(Clone)]
pub struct MemoryHistoryStore {
    bus: BasicBus,
    buffer: Arc<Mutex<VecDeque<Event>>>,
    config: StoreConfig,
}

impl std::fmt::Debug for MemoryHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHistoryStore")
            .field("bus", &self.bus)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Removes a subscription from the bus when dropped.
struct SubscriptionGuard<'a> {
    bus: &'a BasicBus,
    id: SubscriptionId,
}

impl Drop for SubscriptionGuard<'_> {
    fn drop(&mut self) {
        self.bus.remove_subscription(self.id);
    }
}

impl MemoryHistoryStore {
    pub fn new(bus: BasicBus, config: StoreConfig) -> Self {
        Self {
            bus,
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            config,
        }
    }

    #[must_use]
    pub fn bus(&self) -> &BasicBus {
        &self.bus
    }

    /// Number of events currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut buffer = self.buffer.lock();
        self.evict(&mut buffer, 0);
        buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired events, then the oldest until `reserve` more fit.
    fn evict(&self, buffer: &mut VecDeque<Event>, reserve: usize) {
        let before = buffer.len();
        let cutoff = chrono::Duration::from_std(self.config.retention)
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention));
        if let Some(cutoff) = cutoff {
            while buffer.front().is_some_and(|evt| evt.time() < cutoff) {
                buffer.pop_front();
            }
        }
        let limit = self.config.capacity.saturating_sub(reserve);
        while buffer.len() > limit {
            buffer.pop_front();
        }
        let evicted = before - buffer.len();
        if evicted > 0 {
            HISTORY_RETAINED.sub(evicted as i64);
            debug!(evicted, retained = buffer.len(), "History events evicted");
        }
    }

    fn select(
        &self,
        buffer: &VecDeque<Event>,
        filter: &EventFilter,
        after: Option<DateTime<Utc>>,
        tail: usize,
    ) -> Vec<Event> {
        let registry = self.bus.registry();
        let mut events: Vec<Event> = buffer
            .iter()
            .filter(|evt| after.map_or(true, |after| evt.time() > after))
            .filter(|evt| filter.matches(evt, registry))
            .cloned()
            .collect();
        events.sort_by_key(Event::time);
        if tail > 0 && events.len() > tail {
            events.drain(..events.len() - tail);
        }
        events
    }
}

#[async_trait]
impl PubSub for MemoryHistoryStore {
    fn publish(&self, events: Vec<Event>) {
        if self.config.capacity == 0 {
            self.bus.publish(events);
            return;
        }
        let mut buffer = self.buffer.lock();
        for event in events {
            let event = self.bus.stamp(&event);
            self.evict(&mut buffer, 1);
            buffer.push_back(event.clone());
            HISTORY_RETAINED.inc();
            self.bus.publish_stamped(&event);
        }
    }

    async fn subscribe(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        handler: Arc<dyn Handler>,
    ) -> Result<(), BusError> {
        self.bus.subscribe(ctx, names, identifiers, handler).await
    }
}

#[async_trait]
impl HistoryBackend for MemoryHistoryStore {
    async fn fetch_history(
        &self,
        _ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        after: Option<DateTime<Utc>>,
        tail: usize,
    ) -> Result<Vec<Event>, BusError> {
        let _timer = fabric_telemetry::time_histogram!(HISTORY_FETCH_DURATION);
        let filter = EventFilter::new(names, identifiers);
        let mut buffer = self.buffer.lock();
        self.evict(&mut buffer, 0);
        Ok(self.select(&buffer, &filter, after, tail))
    }

    async fn find_related(
        &self,
        _ctx: &CallContext,
        correlation_id: &str,
    ) -> Result<Vec<Event>, BusError> {
        let mut events: Vec<Event> = {
            let mut buffer = self.buffer.lock();
            self.evict(&mut buffer, 0);
            buffer
                .iter()
                .filter(|evt| evt.has_correlation_id(correlation_id))
                .cloned()
                .collect()
        };
        events.sort_by_key(Event::time);
        Ok(events)
    }

    async fn subscribe_with_history(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        after: Option<DateTime<Utc>>,
        tail: usize,
        handler: Arc<dyn Handler>,
    ) -> Result<(), BusError> {
        if ctx.is_cancelled() {
            return Err(BusError::Cancelled);
        }
        let filter = EventFilter::new(names, identifiers);
        let (live, mut rx) = channel(self.config.live_buffer);

        let (id, replay) = {
            let mut buffer = self.buffer.lock();
            self.evict(&mut buffer, 0);
            let replay = self.select(&buffer, &filter, after, tail);
            let id = self
                .bus
                .add_subscription(Subscription::with_filter(filter, live));
            (id, replay)
        };
        let _guard = SubscriptionGuard { bus: &self.bus, id };

        debug!(subscription_id = %id, replayed = replay.len(), "Replaying history");
        for event in replay {
            handler.notify(event);
        }

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => handler.notify(event),
                    None => break,
                },
            }
        }
        Ok(())
    }
}
