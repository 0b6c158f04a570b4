//! # Basic Bus
//!
//! In-memory publish/subscribe with a copy-on-write subscription list.
//! Publishers take a snapshot of the list and never wait on subscribers.

use crate::backend::{BusError, PubSub};
use crate::handler::Handler;
use crate::subscription::{Subscription, SubscriptionId};
use async_trait::async_trait;
use fabric_telemetry::{EVENTS_DELIVERED, EVENTS_PUBLISHED, SUBSCRIPTIONS_ACTIVE};
use fabric_types::{CallContext, DefinitionRegistry, EntityIdentifiers, Event};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

type SubscriptionList = Arc<Vec<(SubscriptionId, Arc<Subscription>)>>;

struct Inner {
    registry: Arc<DefinitionRegistry>,
    origin: String,
    subscriptions: RwLock<SubscriptionList>,
    next_id: AtomicU64,
    events_published: AtomicU64,
}

/// In-memory bus. Cloning shares the same subscriptions.
#[derive(Clone)]
pub struct BasicBus {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BasicBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicBus")
            .field("origin", &self.inner.origin)
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl BasicBus {
    /// Bus stamping `origin` on events published without one.
    pub fn new(registry: Arc<DefinitionRegistry>, origin: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                origin: origin.into(),
                subscriptions: RwLock::new(Arc::new(Vec::new())),
                next_id: AtomicU64::new(1),
                events_published: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.inner.registry
    }

    /// Register a subscription and return its handle.
    pub fn add_subscription(&self, subscription: Subscription) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Arc::new(subscription);
        {
            let mut list = self.inner.subscriptions.write();
            let mut next = Vec::with_capacity(list.len() + 1);
            next.extend(list.iter().cloned());
            next.push((id, subscription));
            *list = Arc::new(next);
        }
        SUBSCRIPTIONS_ACTIVE.inc();
        debug!(subscription_id = %id, "Subscription added");
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn remove_subscription(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut list = self.inner.subscriptions.write();
            if !list.iter().any(|(sub_id, _)| *sub_id == id) {
                false
            } else {
                let next: Vec<_> = list
                    .iter()
                    .filter(|(sub_id, _)| *sub_id != id)
                    .cloned()
                    .collect();
                *list = Arc::new(next);
                true
            }
        };
        if removed {
            SUBSCRIPTIONS_ACTIVE.dec();
            debug!(subscription_id = %id, "Subscription removed");
        }
        removed
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }

    /// Total events handed to `publish` on this bus.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }

    /// Same event with this bus' origin, if the producer left it empty.
    #[must_use]
    pub fn stamp(&self, event: &Event) -> Event {
        event.with_default_origin(&self.inner.origin)
    }

    /// Count and deliver an event that already carries its origin.
    pub fn publish_stamped(&self, event: &Event) -> usize {
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
        EVENTS_PUBLISHED.inc();
        self.dispatch(event)
    }

    /// Deliver an already stamped event to the current subscriptions.
    ///
    /// Returns the number of subscriptions that received it.
    pub fn dispatch(&self, event: &Event) -> usize {
        let snapshot = Arc::clone(&self.inner.subscriptions.read());
        let mut delivered = 0;
        for (_, subscription) in snapshot.iter() {
            if subscription.matches(event, &self.inner.registry) {
                subscription.handler().notify(event.clone());
                delivered += 1;
            }
        }
        EVENTS_DELIVERED.inc_by(delivered as u64);
        trace!(name = %event.name(), delivered, "Event dispatched");
        delivered
    }
}

#[async_trait]
impl PubSub for BasicBus {
    fn publish(&self, events: Vec<Event>) {
        for event in events {
            self.publish_stamped(&self.stamp(&event));
        }
    }

    async fn subscribe(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        handler: Arc<dyn Handler>,
    ) -> Result<(), BusError> {
        if ctx.is_cancelled() {
            return Err(BusError::Cancelled);
        }
        let id = self.add_subscription(Subscription::new(names, identifiers, handler));
        let bus = self.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            ctx.cancelled().await;
            bus.remove_subscription(id);
        });
        Ok(())
    }
}
