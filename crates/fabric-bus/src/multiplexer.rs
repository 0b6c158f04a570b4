//! # Bus Multiplexer
//!
//! Combines a primary backend with auxiliary streams. Events are published
//! on the primary only; subscriptions span the primary and every stream
//! whose matcher accepts one of the requested names.
//!
//! The multiplexer keeps history exactly when its primary does. That is
//! decided once, in [`Multiplexer::into_backend`].

use crate::backend::{Backend, BusError, HistoryBackend, PubSub};
use crate::handler::Handler;
use crate::matcher::Matcher;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabric_types::{CallContext, EntityIdentifiers, Event};
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Auxiliary backend receiving subscriptions for the names it matches.
#[derive(Debug, Clone)]
pub struct AuxStream {
    backend: Backend,
    matcher: Matcher,
}

impl AuxStream {
    pub fn new(backend: Backend, matcher: Matcher) -> Self {
        Self { backend, matcher }
    }

    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

/// Primary backend plus auxiliary streams.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    primary: Backend,
    streams: Vec<AuxStream>,
}

impl Multiplexer {
    pub fn new(primary: Backend) -> Self {
        Self {
            primary,
            streams: Vec::new(),
        }
    }

    /// Add an auxiliary stream.
    #[must_use]
    pub fn with_stream(mut self, backend: Backend, matcher: Matcher) -> Self {
        self.streams.push(AuxStream::new(backend, matcher));
        self
    }

    #[must_use]
    pub fn primary(&self) -> &Backend {
        &self.primary
    }

    #[must_use]
    pub fn streams(&self) -> &[AuxStream] {
        &self.streams
    }

    /// Streams taking part in a subscription to `names`.
    ///
    /// With no names every stream participates.
    pub fn participating<'a>(&'a self, names: &'a [String]) -> impl Iterator<Item = &'a AuxStream> {
        self.streams
            .iter()
            .filter(move |stream| names.is_empty() || stream.matcher.matches_any(names))
    }

    /// Primary followed by the participating stream backends, each with the
    /// names it subscribes to.
    ///
    /// A stream only receives the requested names its matcher accepts. An
    /// empty request stays empty everywhere.
    fn members(&self, names: &[String]) -> Vec<(Backend, Vec<String>)> {
        std::iter::once((self.primary.clone(), names.to_vec()))
            .chain(self.participating(names).map(|stream| {
                let accepted = names
                    .iter()
                    .filter(|name| stream.matcher.matches(name))
                    .cloned()
                    .collect();
                (stream.backend.clone(), accepted)
            }))
            .collect()
    }

    /// Wrap into a [`Backend`] of the same kind as the primary.
    #[must_use]
    pub fn into_backend(self) -> Backend {
        if self.primary.is_history() {
            Backend::History(Arc::new(HistoryMultiplexer { mux: self }))
        } else {
            Backend::Ephemeral(Arc::new(self))
        }
    }
}

#[async_trait]
impl PubSub for Multiplexer {
    fn publish(&self, events: Vec<Event>) {
        self.primary.publish(events);
    }

    async fn subscribe(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        handler: Arc<dyn Handler>,
    ) -> Result<(), BusError> {
        let child = ctx.child();
        for (backend, names) in self.members(names) {
            if let Err(err) = backend
                .subscribe(&child, &names, identifiers, Arc::clone(&handler))
                .await
            {
                warn!(error = %err, "Multiplexed subscription failed");
                child.cancel();
                return Err(err);
            }
        }
        Ok(())
    }
}

/// History-capable view of a [`Multiplexer`] whose primary keeps history.
#[derive(Debug)]
pub struct HistoryMultiplexer {
    mux: Multiplexer,
}

impl HistoryMultiplexer {
    /// Primary and participating streams that keep history.
    fn history_members(&self, names: &[String]) -> Vec<(Arc<dyn HistoryBackend>, Vec<String>)> {
        self.mux
            .members(names)
            .into_iter()
            .filter_map(|(backend, names)| backend.as_history().cloned().map(|b| (b, names)))
            .collect()
    }
}

#[async_trait]
impl PubSub for HistoryMultiplexer {
    fn publish(&self, events: Vec<Event>) {
        self.mux.publish(events);
    }

    async fn subscribe(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        handler: Arc<dyn Handler>,
    ) -> Result<(), BusError> {
        self.mux.subscribe(ctx, names, identifiers, handler).await
    }
}

#[async_trait]
impl HistoryBackend for HistoryMultiplexer {
    async fn fetch_history(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        after: Option<DateTime<Utc>>,
        tail: usize,
    ) -> Result<Vec<Event>, BusError> {
        let members = self.history_members(names);
        let results = try_join_all(
            members
                .iter()
                .map(|(backend, names)| backend.fetch_history(ctx, names, identifiers, after, tail)),
        )
        .await?;

        let mut events: Vec<Event> = results.into_iter().flatten().collect();
        events.sort_by_key(Event::time);
        if tail > 0 && events.len() > tail {
            events.drain(..events.len() - tail);
        }
        Ok(events)
    }

    async fn find_related(
        &self,
        ctx: &CallContext,
        correlation_id: &str,
    ) -> Result<Vec<Event>, BusError> {
        let members = self.history_members(&[]);
        let results = try_join_all(
            members
                .iter()
                .map(|(backend, _)| backend.find_related(ctx, correlation_id)),
        )
        .await?;

        let mut events: Vec<Event> = results.into_iter().flatten().collect();
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
        let child = ctx.child();
        let mut tasks = JoinSet::new();

        for (backend, names) in self.mux.members(names) {
            let ctx = child.clone();
            let identifiers = identifiers.to_vec();
            let handler = Arc::clone(&handler);
            tasks.spawn(async move {
                match backend {
                    Backend::History(backend) => {
                        backend
                            .subscribe_with_history(&ctx, &names, &identifiers, after, tail, handler)
                            .await
                    }
                    Backend::Ephemeral(backend) => {
                        backend.subscribe(&ctx, &names, &identifiers, handler).await?;
                        ctx.cancelled().await;
                        Ok(())
                    }
                }
            });
        }
        debug!(members = tasks.len(), "Multiplexed history subscription started");

        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|err| Err(BusError::Backend(err.to_string())));
            if let Err(err) = result {
                if first_err.is_none() {
                    warn!(error = %err, "Multiplexed history subscription failed");
                    child.cancel();
                    first_err = Some(err);
                }
            }
        }
        child.cancel();
        first_err.map_or(Ok(()), Err)
    }
}
