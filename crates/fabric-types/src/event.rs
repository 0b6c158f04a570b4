//! # Event Records
//!
//! An [`Event`] is an immutable, cheaply cloned handle to an event record.
//! Records are created once through [`EventBuilder`]; every later "change"
//! (origin stamping, redaction) produces a new record.
//!
//! ## Time
//!
//! `time` is taken from a process-wide monotonic clock at construction, so two
//! events built in sequence never share or invert a timestamp. History
//! backends rely on this to order their results.

use crate::context::{Authentication, CallContext};
use crate::entities::EntityIdentifiers;
use crate::rights::Rights;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

static LAST_EVENT_NANOS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Wall-clock now, strictly greater than any previously returned value.
fn monotonic_now() -> DateTime<Utc> {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX - 1);
    let prev = LAST_EVENT_NANOS
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    Utc.timestamp_nanos(now.max(prev.saturating_add(1)))
}

#[derive(Debug)]
struct EventRecord {
    unique_id: String,
    name: String,
    time: DateTime<Utc>,
    identifiers: Vec<EntityIdentifiers>,
    payload: Option<serde_json::Value>,
    correlation_ids: Vec<String>,
    origin: String,
    visibility: Rights,
    authentication: Option<Authentication>,
    remote_ip: Option<String>,
    user_agent: Option<String>,
    context: CallContext,
}

/// Immutable event handle.
#[derive(Debug, Clone)]
pub struct Event(Arc<EventRecord>);

impl Event {
    /// Start building an event with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EventBuilder {
        EventBuilder::new(name)
    }

    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.0.unique_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn time(&self) -> DateTime<Utc> {
        self.0.time
    }

    /// Entity references in producer order.
    #[must_use]
    pub fn identifiers(&self) -> &[EntityIdentifiers] {
        &self.0.identifiers
    }

    #[must_use]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.0.payload.as_ref()
    }

    #[must_use]
    pub fn correlation_ids(&self) -> &[String] {
        &self.0.correlation_ids
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.0.origin
    }

    /// Required visibility as set by the producer. Empty means the default.
    #[must_use]
    pub fn visibility(&self) -> &Rights {
        &self.0.visibility
    }

    /// Visibility to check callers against, with the default applied.
    #[must_use]
    pub fn effective_visibility(&self) -> Rights {
        if self.0.visibility.is_empty() {
            Rights::default_visibility()
        } else {
            self.0.visibility.clone()
        }
    }

    #[must_use]
    pub fn authentication(&self) -> Option<&Authentication> {
        self.0.authentication.as_ref()
    }

    #[must_use]
    pub fn remote_ip(&self) -> Option<&str> {
        self.0.remote_ip.as_deref()
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.0.user_agent.as_deref()
    }

    /// Context of the producing call.
    #[must_use]
    pub fn context(&self) -> &CallContext {
        &self.0.context
    }

    /// Whether the event carries the given correlation id.
    #[must_use]
    pub fn has_correlation_id(&self, correlation_id: &str) -> bool {
        self.0
            .correlation_ids
            .binary_search_by(|c| c.as_str().cmp(correlation_id))
            .is_ok()
    }

    /// Same record with `origin` set, if it is still empty.
    ///
    /// Returns `self` untouched when an origin is already present.
    #[must_use]
    pub fn with_default_origin(&self, origin: &str) -> Event {
        if !self.0.origin.is_empty() || origin.is_empty() {
            return self.clone();
        }
        Event(Arc::new(EventRecord {
            unique_id: self.0.unique_id.clone(),
            name: self.0.name.clone(),
            time: self.0.time,
            identifiers: self.0.identifiers.clone(),
            payload: self.0.payload.clone(),
            correlation_ids: self.0.correlation_ids.clone(),
            origin: origin.to_string(),
            visibility: self.0.visibility.clone(),
            authentication: self.0.authentication.clone(),
            remote_ip: self.0.remote_ip.clone(),
            user_agent: self.0.user_agent.clone(),
            context: self.0.context.clone(),
        }))
    }

    /// Copy keeping only name, time, identifiers, origin, visibility and
    /// unique id. Payload, correlation ids and caller metadata are stripped.
    #[must_use]
    pub fn redacted(&self) -> Event {
        Event(Arc::new(EventRecord {
            unique_id: self.0.unique_id.clone(),
            name: self.0.name.clone(),
            time: self.0.time,
            identifiers: self.0.identifiers.clone(),
            payload: None,
            correlation_ids: Vec::new(),
            origin: self.0.origin.clone(),
            visibility: self.0.visibility.clone(),
            authentication: None,
            remote_ip: None,
            user_agent: None,
            context: CallContext::new(),
        }))
    }

    /// Whether two handles point at the same record.
    #[must_use]
    pub fn ptr_eq(&self, other: &Event) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Builder for [`Event`].
#[derive(Debug, Default)]
pub struct EventBuilder {
    name: String,
    identifiers: Vec<EntityIdentifiers>,
    payload: Option<serde_json::Value>,
    correlation_ids: Vec<String>,
    origin: String,
    visibility: Rights,
    context: Option<CallContext>,
}

impl EventBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn identifiers<I>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = EntityIdentifiers>,
    {
        self.identifiers.extend(identifiers);
        self
    }

    #[must_use]
    pub fn identifier(mut self, identifier: EntityIdentifiers) -> Self {
        self.identifiers.push(identifier);
        self
    }

    #[must_use]
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn correlation_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.correlation_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    #[must_use]
    pub fn visibility(mut self, visibility: Rights) -> Self {
        self.visibility = visibility;
        self
    }

    /// Capture correlation ids, authentication and client info from `ctx`.
    #[must_use]
    pub fn context(mut self, ctx: &CallContext) -> Self {
        self.correlation_ids
            .extend(ctx.correlation_ids().iter().cloned());
        self.context = Some(ctx.clone());
        self
    }

    /// Assign the unique id and time and freeze the record.
    #[must_use]
    pub fn build(self) -> Event {
        let mut correlation_ids = self.correlation_ids;
        correlation_ids.sort();
        correlation_ids.dedup();

        let context = self.context.unwrap_or_default();
        Event(Arc::new(EventRecord {
            unique_id: Uuid::now_v7().to_string(),
            name: self.name,
            time: monotonic_now(),
            identifiers: self.identifiers,
            payload: self.payload,
            correlation_ids,
            origin: self.origin,
            visibility: self.visibility,
            authentication: context.authentication().cloned(),
            remote_ip: context.remote_ip().map(str::to_string),
            user_agent: context.user_agent().map(str::to_string),
            context,
        }))
    }
}
