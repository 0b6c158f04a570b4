//! # Error Types
//!
//! Errors shared by the bus and the gateway.

use crate::entities::EntityIdentifiers;
use thiserror::Error;

/// Errors from event definitions and name pattern expansion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// Event names must not be empty.
    #[error("event name must not be empty")]
    EmptyName,

    /// The name is already defined.
    #[error("event `{0}` is already defined")]
    Duplicate(String),

    /// The pattern does not match any defined event.
    #[error("no event matches pattern `{0}`")]
    UnknownPattern(String),

    /// The pattern is not a valid glob.
    #[error("invalid event name pattern `{0}`")]
    InvalidPattern(String),
}

/// Errors from rights checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The call carries no authentication.
    #[error("no authentication info present")]
    Unauthenticated,

    /// The caller holds no right on any of the identifiers.
    #[error("no rights on any of {}", format_identifiers(.0))]
    PermissionDenied(Vec<EntityIdentifiers>),

    /// The rights store failed.
    #[error("rights lookup failed: {0}")]
    Lookup(String),
}

fn format_identifiers(ids: &[EntityIdentifiers]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
