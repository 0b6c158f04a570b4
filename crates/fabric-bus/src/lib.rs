//! # Fabric Bus
//!
//! In-process event distribution for the event fabric.
//!
//! ## Layers
//!
//! ```text
//!             ┌─────────────────────┐
//!  publish ──▶│     Multiplexer     │──▶ auxiliary streams (by Matcher)
//!             └──────────┬──────────┘
//!                        ▼
//!             ┌─────────────────────┐
//!             │ MemoryHistoryStore  │  ring buffer + join point
//!             └──────────┬──────────┘
//!                        ▼
//!             ┌─────────────────────┐
//!             │      BasicBus       │──▶ Handler ──▶ mpsc channel
//!             └─────────────────────┘
//! ```
//!
//! Each layer is a [`Backend`]: either ephemeral (publish/subscribe only)
//! or history-capable.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod backend;
pub mod basic;
pub mod handler;
pub mod matcher;
pub mod multiplexer;
pub mod store;
pub mod subscription;

pub use backend::{Backend, BusError, HistoryBackend, PubSub};
pub use basic::BasicBus;
pub use handler::{channel, ChannelHandler, Handler};
pub use matcher::Matcher;
pub use multiplexer::{AuxStream, HistoryMultiplexer, Multiplexer};
pub use store::{MemoryHistoryStore, StoreConfig};
pub use subscription::{identifiers_match, EventFilter, Subscription, SubscriptionId};

/// Default capacity of a subscription delivery channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
