//! Adapters for the outbound ports and the HTTP transport.

pub mod http;
pub mod rights;

pub use http::{router, serve, AppState};
pub use rights::{RightsVisibilityOracle, StaticRightsFetcher};
