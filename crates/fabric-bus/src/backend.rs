//! # Backend Capabilities
//!
//! Every backend publishes and subscribes. Some also keep history; the
//! [`Backend`] value records which kind a backend is, so consumers decide
//! once at construction instead of probing on every call.

use crate::handler::Handler;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabric_types::{CallContext, EntityIdentifiers, Event};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors returned by bus backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("storage is not enabled")]
    StorageDisabled,

    #[error("subscription context cancelled")]
    Cancelled,

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Publish/subscribe surface shared by every backend.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Deliver events to matching subscriptions. Never blocks, never fails.
    fn publish(&self, events: Vec<Event>);

    /// Register a subscription that lives until `ctx` is cancelled.
    ///
    /// Returns once the subscription is in place.
    async fn subscribe(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        handler: Arc<dyn Handler>,
    ) -> Result<(), BusError>;
}

/// Backend that retains published events.
#[async_trait]
pub trait HistoryBackend: PubSub {
    /// Matching events, ascending by time.
    ///
    /// Only events after `after` are considered. With `tail > 0` at most the
    /// `tail` most recent are returned.
    async fn fetch_history(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        after: Option<DateTime<Utc>>,
        tail: usize,
    ) -> Result<Vec<Event>, BusError>;

    /// Every retained event carrying `correlation_id`, ascending by time.
    async fn find_related(
        &self,
        ctx: &CallContext,
        correlation_id: &str,
    ) -> Result<Vec<Event>, BusError>;

    /// Replay matching history to `handler`, then deliver live events.
    ///
    /// Blocks until `ctx` is cancelled.
    async fn subscribe_with_history(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        after: Option<DateTime<Utc>>,
        tail: usize,
        handler: Arc<dyn Handler>,
    ) -> Result<(), BusError>;
}

/// A backend together with its capability.
#[derive(Clone)]
pub enum Backend {
    /// Live delivery only.
    Ephemeral(Arc<dyn PubSub>),
    /// Live delivery plus retained history.
    History(Arc<dyn HistoryBackend>),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ephemeral(_) => f.write_str("Backend::Ephemeral"),
            Self::History(_) => f.write_str("Backend::History"),
        }
    }
}

impl Backend {
    pub fn ephemeral(backend: impl PubSub + 'static) -> Self {
        Self::Ephemeral(Arc::new(backend))
    }

    pub fn history(backend: impl HistoryBackend + 'static) -> Self {
        Self::History(Arc::new(backend))
    }

    #[must_use]
    pub fn is_history(&self) -> bool {
        matches!(self, Self::History(_))
    }

    #[must_use]
    pub fn as_history(&self) -> Option<&Arc<dyn HistoryBackend>> {
        match self {
            Self::History(backend) => Some(backend),
            Self::Ephemeral(_) => None,
        }
    }

    pub fn publish(&self, events: Vec<Event>) {
        match self {
            Self::Ephemeral(backend) => backend.publish(events),
            Self::History(backend) => backend.publish(events),
        }
    }

    pub async fn subscribe(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        handler: Arc<dyn Handler>,
    ) -> Result<(), BusError> {
        match self {
            Self::Ephemeral(backend) => backend.subscribe(ctx, names, identifiers, handler).await,
            Self::History(backend) => backend.subscribe(ctx, names, identifiers, handler).await,
        }
    }

    pub async fn fetch_history(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        after: Option<DateTime<Utc>>,
        tail: usize,
    ) -> Result<Vec<Event>, BusError> {
        match self {
            Self::History(backend) => {
                backend
                    .fetch_history(ctx, names, identifiers, after, tail)
                    .await
            }
            Self::Ephemeral(_) => Err(BusError::StorageDisabled),
        }
    }

    pub async fn find_related(
        &self,
        ctx: &CallContext,
        correlation_id: &str,
    ) -> Result<Vec<Event>, BusError> {
        match self {
            Self::History(backend) => backend.find_related(ctx, correlation_id).await,
            Self::Ephemeral(_) => Err(BusError::StorageDisabled),
        }
    }

    /// History subscription, or a plain one held open until `ctx` ends
    /// when this backend keeps no history.
    pub async fn subscribe_with_history(
        &self,
        ctx: &CallContext,
        names: &[String],
        identifiers: &[EntityIdentifiers],
        after: Option<DateTime<Utc>>,
        tail: usize,
        handler: Arc<dyn Handler>,
    ) -> Result<(), BusError> {
        match self {
            Self::History(backend) => {
                backend
                    .subscribe_with_history(ctx, names, identifiers, after, tail, handler)
                    .await
            }
            Self::Ephemeral(backend) => {
                warn!("History requested from a backend without storage, subscribing live only");
                backend.subscribe(ctx, names, identifiers, handler).await?;
                ctx.cancelled().await;
                Ok(())
            }
        }
    }
}
