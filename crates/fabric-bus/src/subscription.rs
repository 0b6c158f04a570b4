//! # Subscriptions
//!
//! A subscription pairs a name filter and an identifier filter with a
//! handler. Empty filters accept everything.

use crate::handler::Handler;
use fabric_types::{DefinitionRegistry, EntityIdentifiers, EntityType, Event};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Handle token returned when a subscription is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Name and identifier filters. Empty filters accept everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    names: HashSet<String>,
    identifiers: Vec<EntityIdentifiers>,
}

impl EventFilter {
    pub fn new(names: &[String], identifiers: &[EntityIdentifiers]) -> Self {
        Self {
            names: names.iter().cloned().collect(),
            identifiers: identifiers.to_vec(),
        }
    }

    /// Whether `name` passes the name filter.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.contains(name)
    }

    /// Whether the event passes both filters.
    #[must_use]
    pub fn matches(&self, event: &Event, registry: &DefinitionRegistry) -> bool {
        if !self.matches_name(event.name()) {
            return false;
        }
        if self.identifiers.is_empty() {
            return true;
        }
        let propagates = registry.propagates_to_parent(event.name());
        event.identifiers().iter().any(|evt_id| {
            self.identifiers
                .iter()
                .any(|sub_id| identifiers_match(evt_id, sub_id, propagates))
        })
    }
}

/// Registered interest in events.
pub struct Subscription {
    filter: EventFilter,
    handler: Arc<dyn Handler>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    pub fn new(
        names: &[String],
        identifiers: &[EntityIdentifiers],
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self::with_filter(EventFilter::new(names, identifiers), handler)
    }

    pub fn with_filter(filter: EventFilter, handler: Arc<dyn Handler>) -> Self {
        Self { filter, handler }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    #[must_use]
    pub fn matches(&self, event: &Event, registry: &DefinitionRegistry) -> bool {
        self.filter.matches(event, registry)
    }
}

/// Identifier matching rule.
///
/// Same type and unique id, or an end device under the subscribed
/// application when the event propagates to its parent.
#[must_use]
pub fn identifiers_match(
    event_id: &EntityIdentifiers,
    sub_id: &EntityIdentifiers,
    propagate_to_parent: bool,
) -> bool {
    if event_id.entity_type() == sub_id.entity_type() {
        return event_id.unique_id() == sub_id.unique_id();
    }
    if !propagate_to_parent || sub_id.entity_type() != EntityType::Application {
        return false;
    }
    event_id
        .parent_application()
        .is_some_and(|app| app.application_id == sub_id.unique_id())
}
