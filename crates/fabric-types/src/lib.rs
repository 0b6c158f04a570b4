//! # Fabric Types Crate
//!
//! Domain values shared by every crate of the event fabric.
//!
//! ## Design Principles
//!
//! - **Immutable events**: an [`Event`] is frozen at construction; changes
//!   produce new records.
//! - **Explicit context**: correlation ids, authentication and cancellation
//!   travel in a [`CallContext`] value, never in ambient state.
//! - **Explicit registry**: event definitions live in a
//!   [`DefinitionRegistry`] that is passed to whoever needs it.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod context;
pub mod definitions;
pub mod entities;
pub mod errors;
pub mod event;
pub mod rights;

pub use context::{Authentication, CallContext};
pub use definitions::{DefinitionRegistry, EventDefinition};
pub use entities::{EntityIdentifiers, EntityType};
pub use errors::{AuthError, DefinitionError};
pub use event::{Event, EventBuilder};
pub use rights::{Right, Rights};

/// Name of the synthetic event sent at the start of every stream.
pub const STREAM_START_EVENT: &str = "events.stream.start";
