//! HTTP and WebSocket transport for the events frontend.
//!
//! - `GET /api/v3/events`: WebSocket. The first client message is a
//!   [`StreamRequest`]; the server answers with [`StreamFrame`]s and closes
//!   after a final `error` frame.
//! - `POST /api/v3/events/related`: [`FindRelatedRequest`] in,
//!   [`FindRelatedResponse`] out.
//! - `GET /metrics`: Prometheus text format.

use crate::domain::correlation::{parse_header, CorrelationId};
use crate::domain::error::{ApiError, GatewayError};
use crate::domain::wire::{FindRelatedRequest, FindRelatedResponse, StreamFrame, StreamRequest};
use crate::service::{ChannelSink, EventsService};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fabric_types::{Authentication, CallContext};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Header carrying caller correlation ids, comma separated.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Frames buffered between a stream and its socket.
const FRAME_BUFFER: usize = 64;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: EventsService,
    /// Cancelled on shutdown; every stream runs in a child scope.
    pub shutdown: CancellationToken,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(serde_json::json!({ "error": self }))).into_response()
    }
}

/// Build the per-call context from request metadata.
pub fn call_context(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    cancel: CancellationToken,
) -> CallContext {
    let mut ctx = CallContext::new().with_cancellation(cancel);

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|subject| !subject.is_empty());
    if let Some(subject) = bearer {
        ctx = ctx.with_authentication(Authentication::bearer(subject));
    }

    let mut correlation_ids = headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(parse_header)
        .unwrap_or_default();
    correlation_ids.push(CorrelationId::for_request().to_string());
    ctx = ctx.with_correlation_ids(correlation_ids);

    if let Some(agent) = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        ctx = ctx.with_user_agent(agent);
    }
    if let Some(peer) = peer {
        ctx = ctx.with_remote_ip(peer.ip().to_string());
    }
    ctx
}

/// Router with the events API, metrics and health endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v3/events", get(stream_events))
        .route("/api/v3/events/related", post(find_related))
        .route("/metrics", get(metrics))
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `addr` until `state.shutdown` is cancelled.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), GatewayError> {
    let shutdown = state.shutdown.clone();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(GatewayError::Bind)?;
    info!(addr = %addr, "Serving events API");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(GatewayError::Serve)
}

async fn find_related(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<FindRelatedRequest>,
) -> Result<Json<FindRelatedResponse>, ApiError> {
    let ctx = call_context(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.shutdown.child_token(),
    );
    state.service.find_related(&ctx, req).await.map(Json)
}

async fn metrics() -> Response {
    match fabric_telemetry::encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => ApiError::internal(e.to_string()).into_response(),
    }
}

async fn stream_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let ctx = call_context(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.shutdown.child_token(),
    );
    ws.on_upgrade(move |socket| handle_socket(state.service, ctx, socket))
}

fn encode(frame: &StreamFrame) -> Message {
    match serde_json::to_string(frame) {
        Ok(text) => Message::Text(text),
        Err(e) => Message::Text(format!(
            r#"{{"error":{{"code":"internal","message":"{}"}}}}"#,
            e.to_string().replace('"', "'")
        )),
    }
}

async fn read_request(socket: &mut WebSocket) -> Result<StreamRequest, ApiError> {
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text)
                    .map_err(|e| ApiError::invalid_argument(e.to_string()));
            }
            Some(Ok(Message::Binary(data))) => {
                return serde_json::from_slice(&data)
                    .map_err(|e| ApiError::invalid_argument(e.to_string()));
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                return Err(ApiError::cancelled());
            }
        }
    }
}

async fn handle_socket(service: EventsService, ctx: CallContext, mut socket: WebSocket) {
    let req = match read_request(&mut socket).await {
        Ok(req) => req,
        Err(err) => {
            debug!(error = %err, "Rejected stream request");
            let _ = socket.send(encode(&StreamFrame::Error(err))).await;
            let _ = socket.close().await;
            return;
        }
    };

    let (tx, mut frames) = mpsc::channel(FRAME_BUFFER);
    let stream_ctx = ctx.clone();
    let task = tokio::spawn(async move {
        let mut sink = ChannelSink::new(tx);
        service.stream(&stream_ctx, req, &mut sink).await
    });

    let (mut sender, mut receiver) = socket.split();
    let mut client_open = true;
    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sender.send(encode(&frame)).await {
                        debug!(error = %e, "Client went away");
                        client_open = false;
                        ctx.cancel();
                    }
                }
                None => break,
            },
            msg = receiver.next(), if client_open => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    client_open = false;
                    ctx.cancel();
                }
                Some(Ok(_)) => {}
            },
        }
    }

    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => Err(ApiError::internal(e.to_string())),
    };
    if let Err(err) = outcome {
        if client_open {
            if let Err(e) = sender.send(encode(&StreamFrame::Error(err))).await {
                warn!(error = %e, "Failed to send final stream frame");
            }
        }
    }
    if client_open {
        let _ = sender.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rights::{RightsVisibilityOracle, StaticRightsFetcher};
    use crate::domain::config::StreamConfig;
    use axum::body::Body;
    use axum::http::Request;
    use fabric_bus::{Backend, BasicBus, MemoryHistoryStore, PubSub, StoreConfig};
    use fabric_types::{DefinitionRegistry, EntityIdentifiers, Event, EventDefinition, Right};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(backend: Backend, registry: Arc<DefinitionRegistry>) -> AppState {
        let fetcher = Arc::new(StaticRightsFetcher::new());
        fetcher.grant(
            "alice",
            &EntityIdentifiers::application("app"),
            &[Right::ApplicationAll].into_iter().collect(),
        );
        let oracle = Arc::new(RightsVisibilityOracle::new(fetcher));
        AppState {
            service: EventsService::new(
                backend,
                registry,
                oracle.clone(),
                oracle,
                StreamConfig::default(),
                "test-host",
            ),
            shutdown: CancellationToken::new(),
        }
    }

    fn registry() -> Arc<DefinitionRegistry> {
        let mut registry = DefinitionRegistry::new();
        registry
            .define(EventDefinition::new("test.evt", "test"))
            .unwrap();
        Arc::new(registry)
    }

    fn related_request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/api/v3/events/related")
            .header(header::CONTENT_TYPE, "application/json")
            .header(CORRELATION_HEADER, "req:7");
        if let Some(subject) = auth {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {subject}"));
        }
        builder
            .body(Body::from(r#"{"correlation_id":"corr:1"}"#))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_call_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer alice".parse().unwrap());
        headers.insert(CORRELATION_HEADER, "b, a".parse().unwrap());
        headers.insert(header::USER_AGENT, "test-agent/1".parse().unwrap());
        let peer: SocketAddr = "192.0.2.1:4000".parse().unwrap();

        let ctx = call_context(&headers, Some(peer), CancellationToken::new());
        assert_eq!(ctx.authentication().unwrap().subject, "alice");
        assert_eq!(ctx.user_agent(), Some("test-agent/1"));
        assert_eq!(ctx.remote_ip(), Some("192.0.2.1"));
        let ids = ctx.correlation_ids();
        assert!(ids.contains(&"a".to_string()) && ids.contains(&"b".to_string()));
        assert!(ids.iter().any(|id| id.starts_with("events:request:")));
    }

    #[test]
    fn test_call_context_without_auth() {
        let ctx = call_context(&HeaderMap::new(), None, CancellationToken::new());
        assert!(ctx.authentication().is_none());
        assert!(ctx.remote_ip().is_none());
    }

    #[tokio::test]
    async fn test_related_on_ephemeral_backend() {
        let app = router(state(
            Backend::ephemeral(BasicBus::new(registry(), "h")),
            registry(),
        ));
        let resp = app.oneshot(related_request(Some("alice"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "failed_precondition");
    }

    #[tokio::test]
    async fn test_related_requires_auth() {
        let store = MemoryHistoryStore::new(BasicBus::new(registry(), "h"), StoreConfig::default());
        let app = router(state(Backend::history(store), registry()));
        let resp = app.oneshot(related_request(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_related_returns_events() {
        let store = MemoryHistoryStore::new(BasicBus::new(registry(), "h"), StoreConfig::default());
        store.publish(vec![Event::builder("test.evt")
            .identifier(EntityIdentifiers::application("app"))
            .correlation_ids(["corr:1"])
            .build()]);
        let app = router(state(Backend::history(store), registry()));

        let resp = app.oneshot(related_request(Some("alice"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["events"][0]["name"], "test.evt");
        assert_eq!(json["events"][0]["origin"], "h");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        fabric_telemetry::register_metrics().unwrap();
        let app = router(state(
            Backend::ephemeral(BasicBus::new(registry(), "h")),
            registry(),
        ));
        let resp = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
