//! Ports the service depends on.

pub mod outbound;

pub use outbound::{Authorizer, OracleError, RightsFetcher, VisibilityOracle};
