//! Events frontend: `Stream` and `FindRelated`.
//!
//! Transport agnostic. The HTTP adapter feeds a [`ChannelSink`]; tests and
//! other transports can provide their own [`EventSink`].

use crate::domain::config::StreamConfig;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::{ApiError, ApiResult};
use crate::domain::wire::{
    FindRelatedRequest, FindRelatedResponse, StreamFrame, StreamRequest, WireEvent,
};
use crate::ports::outbound::{Authorizer, VisibilityOracle};
use async_trait::async_trait;
use chrono::Utc;
use fabric_bus::{channel, Backend, BusError, Handler};
use fabric_telemetry::{EVENTS_INVISIBLE, EVENTS_REDACTED, STREAMS_ACTIVE};
use fabric_types::{CallContext, DefinitionRegistry, Event, STREAM_START_EVENT};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// Warning sent when history is requested from a backend without storage.
pub const STORAGE_DISABLED_WARNING: &str = "storage is not enabled";

/// The receiving side of a stream went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream sink closed")]
pub struct SinkClosed;

/// Destination of stream frames.
#[async_trait]
pub trait EventSink: Send {
    async fn warn(&mut self, message: &str) -> Result<(), SinkClosed>;

    async fn send(&mut self, event: WireEvent) -> Result<(), SinkClosed>;
}

/// Sink writing [`StreamFrame`]s into a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<StreamFrame>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<StreamFrame>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn warn(&mut self, message: &str) -> Result<(), SinkClosed> {
        self.tx
            .send(StreamFrame::Warning(message.to_string()))
            .await
            .map_err(|_| SinkClosed)
    }

    async fn send(&mut self, event: WireEvent) -> Result<(), SinkClosed> {
        self.tx
            .send(StreamFrame::Result(event))
            .await
            .map_err(|_| SinkClosed)
    }
}

/// Keeps the active streams gauge in step with open streams.
struct StreamGauge;

impl StreamGauge {
    fn open() -> Self {
        STREAMS_ACTIVE.inc();
        Self
    }
}

impl Drop for StreamGauge {
    fn drop(&mut self) {
        STREAMS_ACTIVE.dec();
    }
}

type HistoryTask = JoinHandle<Result<(), BusError>>;

async fn join_history(task: &mut Option<HistoryTask>) -> Result<Result<(), BusError>, JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

/// Streaming events frontend.
#[derive(Clone)]
pub struct EventsService {
    backend: Backend,
    registry: Arc<DefinitionRegistry>,
    oracle: Arc<dyn VisibilityOracle>,
    authorizer: Arc<dyn Authorizer>,
    stream_config: StreamConfig,
    origin: String,
}

impl EventsService {
    pub fn new(
        backend: Backend,
        registry: Arc<DefinitionRegistry>,
        oracle: Arc<dyn VisibilityOracle>,
        authorizer: Arc<dyn Authorizer>,
        stream_config: StreamConfig,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            registry,
            oracle,
            authorizer,
            stream_config,
            origin: origin.into(),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    /// Stream matching events to `sink` until `ctx` is cancelled.
    ///
    /// The first frame is always the stream start event. A cancelled stream
    /// ends with [`Code::Cancelled`](crate::domain::error::Code::Cancelled).
    pub async fn stream<S: EventSink>(
        &self,
        ctx: &CallContext,
        req: StreamRequest,
        sink: &mut S,
    ) -> ApiResult<()> {
        if req.identifiers.is_empty() {
            return Err(ApiError::invalid_argument("no identifiers"));
        }
        self.authorizer
            .require_any(ctx, &req.identifiers)
            .await
            .map_err(|e| ApiError::permission_denied(e.to_string()))?;

        let names = if req.names.is_empty() {
            Vec::new()
        } else {
            self.registry.expand_patterns(&req.names)?
        };

        let _gauge = StreamGauge::open();
        let tail = req.tail.unwrap_or(0);
        let (live, mut rx) = channel(self.stream_config.buffer_for(tail));
        let handler: Arc<dyn Handler> = live;
        let sub_ctx = ctx.child();

        let mut history_task: Option<HistoryTask> = None;
        match &self.backend {
            Backend::History(_) => {
                let after = match req.after {
                    None if tail == 0 => Some(Utc::now()),
                    after => after,
                };
                let backend = self.backend.clone();
                let ctx = sub_ctx.clone();
                let names = names.clone();
                let identifiers = req.identifiers.clone();
                history_task = Some(tokio::spawn(async move {
                    backend
                        .subscribe_with_history(&ctx, &names, &identifiers, after, tail, handler)
                        .await
                }));
            }
            Backend::Ephemeral(_) => {
                if req.wants_history() && sink.warn(STORAGE_DISABLED_WARNING).await.is_err() {
                    return Err(ApiError::cancelled());
                }
                if let Err(err) = self
                    .backend
                    .subscribe(&sub_ctx, &names, &req.identifiers, handler)
                    .await
                {
                    sub_ctx.cancel();
                    return Err(err.into());
                }
            }
        }

        let outcome = self
            .pump(ctx, &req, &names, sink, &mut rx, &mut history_task)
            .await;

        sub_ctx.cancel();
        if let Some(task) = history_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "History subscription ended with error"),
                Err(err) => warn!(error = %err, "History subscription task failed"),
            }
        }
        info!(
            identifiers = req.identifiers.len(),
            names = names.len(),
            result = ?outcome.as_ref().err().map(|e| e.code),
            "Event stream closed"
        );
        outcome
    }

    async fn pump<S: EventSink>(
        &self,
        ctx: &CallContext,
        req: &StreamRequest,
        names: &[String],
        sink: &mut S,
        rx: &mut mpsc::Receiver<Event>,
        history_task: &mut Option<HistoryTask>,
    ) -> ApiResult<()> {
        let mut start = Event::builder(STREAM_START_EVENT)
            .identifiers(req.identifiers.iter().cloned())
            .origin(self.origin.clone())
            .correlation_ids(ctx.correlation_ids().iter().cloned())
            .correlation_ids([CorrelationId::for_stream().to_string()]);
        if !names.is_empty() {
            start = start.payload(serde_json::json!({ "names": names }));
        }
        if sink.send(WireEvent::from(&start.build())).await.is_err() {
            return Err(ApiError::cancelled());
        }
        debug!(identifiers = req.identifiers.len(), "Event stream started");

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(ApiError::cancelled()),
                joined = join_history(history_task), if history_task.is_some() => {
                    *history_task = None;
                    return match joined {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(err)) => Err(err.into()),
                        Err(err) => Err(ApiError::internal(err.to_string())),
                    };
                }
                event = rx.recv() => {
                    let Some(event) = event else {
                        return Ok(());
                    };
                    match self.oracle.is_visible(&event, ctx).await {
                        Ok(true) => {}
                        Ok(false) => {
                            EVENTS_INVISIBLE.inc();
                            continue;
                        }
                        Err(err) => {
                            if let Err(auth) = self.authorizer.require_any(ctx, &req.identifiers).await {
                                return Err(ApiError::permission_denied(auth.to_string()));
                            }
                            warn!(
                                name = %event.name(),
                                unique_id = %event.unique_id(),
                                error = %err,
                                "Failed to check event visibility"
                            );
                            continue;
                        }
                    }
                    if sink.send(WireEvent::from(&event)).await.is_err() {
                        return Err(ApiError::cancelled());
                    }
                }
            }
        }
    }

    /// Events sharing `correlation_id`, redacted where the caller lacks rights.
    pub async fn find_related(
        &self,
        ctx: &CallContext,
        req: FindRelatedRequest,
    ) -> ApiResult<FindRelatedResponse> {
        if !self.backend.is_history() {
            return Err(BusError::StorageDisabled.into());
        }
        if ctx.authentication().is_none() {
            return Err(ApiError::unauthenticated("no authentication info present"));
        }
        if req.correlation_id.is_empty() {
            return Err(ApiError::invalid_argument("no correlation id"));
        }

        let found = self.backend.find_related(ctx, &req.correlation_id).await?;
        let mut events = Vec::with_capacity(found.len());
        for event in &found {
            match self.oracle.is_visible(event, ctx).await {
                Ok(true) => events.push(WireEvent::from(event)),
                Ok(false) => {
                    EVENTS_REDACTED.inc();
                    events.push(WireEvent::from(&event.redacted()));
                }
                Err(err) => warn!(
                    name = %event.name(),
                    unique_id = %event.unique_id(),
                    error = %err,
                    "Failed to check event visibility"
                ),
            }
        }
        debug!(
            correlation_id = %req.correlation_id,
            found = found.len(),
            returned = events.len(),
            "Related events found"
        );
        Ok(FindRelatedResponse { events })
    }
}
