//! Outbound ports of the events frontend.
//!
//! The frontend asks these for authorization decisions; it never looks at
//! rights itself.

use async_trait::async_trait;
use fabric_types::entities::{
    ApplicationIdentifiers, ClientIdentifiers, GatewayIdentifiers, OrganizationIdentifiers,
    UserIdentifiers,
};
use fabric_types::{AuthError, CallContext, EntityIdentifiers, Event, Rights};
use thiserror::Error;

/// Visibility check failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("no authentication info present")]
    Unauthenticated,

    #[error("rights lookup failed: {0}")]
    Lookup(String),
}

impl From<AuthError> for OracleError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthenticated => OracleError::Unauthenticated,
            other => OracleError::Lookup(other.to_string()),
        }
    }
}

/// Decides whether the caller may see an event.
#[async_trait]
pub trait VisibilityOracle: Send + Sync {
    async fn is_visible(&self, event: &Event, ctx: &CallContext) -> Result<bool, OracleError>;
}

/// Admits callers to a set of entities.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Succeeds iff the caller holds any right on at least one identifier.
    async fn require_any(
        &self,
        ctx: &CallContext,
        identifiers: &[EntityIdentifiers],
    ) -> Result<(), AuthError>;
}

/// Rights of the caller on single entities.
#[async_trait]
pub trait RightsFetcher: Send + Sync {
    async fn application_rights(
        &self,
        ctx: &CallContext,
        ids: &ApplicationIdentifiers,
    ) -> Result<Rights, AuthError>;

    async fn client_rights(
        &self,
        ctx: &CallContext,
        ids: &ClientIdentifiers,
    ) -> Result<Rights, AuthError>;

    async fn gateway_rights(
        &self,
        ctx: &CallContext,
        ids: &GatewayIdentifiers,
    ) -> Result<Rights, AuthError>;

    async fn organization_rights(
        &self,
        ctx: &CallContext,
        ids: &OrganizationIdentifiers,
    ) -> Result<Rights, AuthError>;

    async fn user_rights(&self, ctx: &CallContext, ids: &UserIdentifiers)
        -> Result<Rights, AuthError>;
}
