//! Streaming frontend for the event fabric.
//!
//! Exposes a backend (plain bus, history store or multiplexer) to remote
//! callers over WebSocket streams and a related-events lookup.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       fabric-gateway                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  adapters::http         WS /api/v3/events                     │
//! │                         POST /api/v3/events/related           │
//! │        │                                                      │
//! │  service::EventsService ── ports::VisibilityOracle            │
//! │        │                ── ports::Authorizer                  │
//! │        ▼                                                      │
//! │  fabric_bus::Backend (Ephemeral | History)                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stream opens with an `events.stream.start` frame. Events the caller
//! may not see are dropped from streams and redacted in related lookups.

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{router, serve, AppState, RightsVisibilityOracle, StaticRightsFetcher};
pub use domain::config::GatewayConfig;
pub use domain::error::{ApiError, ApiResult, Code, GatewayError};
pub use service::{ChannelSink, EventSink, EventsService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
