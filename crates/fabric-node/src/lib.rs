//! # Fabric Node
//!
//! Wiring for the event fabric binary.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file given on the command line or `FABRIC_CONFIG`)
//! 2. Initialize telemetry
//! 3. Build the definition registry
//! 4. Wire bus → history store → multiplexer → events service
//! 5. Serve until Ctrl+C

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod definitions;
pub mod wiring;

pub use definitions::builtin_registry;
pub use wiring::{build_backend, build_service, rights_fetcher};
