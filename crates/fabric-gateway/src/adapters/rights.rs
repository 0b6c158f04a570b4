//! Rights based visibility and authorization.
//!
//! End devices have no rights of their own and authorize through their
//! application.

use crate::ports::outbound::{Authorizer, OracleError, RightsFetcher, VisibilityOracle};
use async_trait::async_trait;
use fabric_types::entities::{
    ApplicationIdentifiers, ClientIdentifiers, GatewayIdentifiers, OrganizationIdentifiers,
    UserIdentifiers,
};
use fabric_types::{AuthError, CallContext, EntityIdentifiers, EntityType, Event, Rights};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Oracle and authorizer backed by a [`RightsFetcher`].
#[derive(Clone)]
pub struct RightsVisibilityOracle {
    fetcher: Arc<dyn RightsFetcher>,
}

impl RightsVisibilityOracle {
    pub fn new(fetcher: Arc<dyn RightsFetcher>) -> Self {
        Self { fetcher }
    }

    /// Caller rights on one entity, closed under implication.
    pub async fn rights_on(
        &self,
        ctx: &CallContext,
        ids: &EntityIdentifiers,
    ) -> Result<Rights, AuthError> {
        let rights = match ids {
            EntityIdentifiers::Application(app) => self.fetcher.application_rights(ctx, app).await?,
            EntityIdentifiers::EndDevice(dev) => {
                self.fetcher
                    .application_rights(ctx, &dev.application_ids)
                    .await?
            }
            EntityIdentifiers::Client(cli) => self.fetcher.client_rights(ctx, cli).await?,
            EntityIdentifiers::Gateway(gtw) => self.fetcher.gateway_rights(ctx, gtw).await?,
            EntityIdentifiers::Organization(org) => {
                self.fetcher.organization_rights(ctx, org).await?
            }
            EntityIdentifiers::User(usr) => self.fetcher.user_rights(ctx, usr).await?,
        };
        Ok(rights.implied())
    }
}

#[async_trait]
impl VisibilityOracle for RightsVisibilityOracle {
    async fn is_visible(&self, event: &Event, ctx: &CallContext) -> Result<bool, OracleError> {
        let required = event.effective_visibility();
        for ids in event.identifiers() {
            let rights = self.rights_on(ctx, ids).await?;
            if rights.intersects(&required) {
                return Ok(true);
            }
        }
        debug!(name = %event.name(), unique_id = %event.unique_id(), "Event not visible");
        Ok(false)
    }
}

#[async_trait]
impl Authorizer for RightsVisibilityOracle {
    async fn require_any(
        &self,
        ctx: &CallContext,
        identifiers: &[EntityIdentifiers],
    ) -> Result<(), AuthError> {
        if ctx.authentication().is_none() {
            return Err(AuthError::Unauthenticated);
        }
        for ids in identifiers {
            if !self.rights_on(ctx, ids).await?.is_empty() {
                return Ok(());
            }
        }
        Err(AuthError::PermissionDenied(identifiers.to_vec()))
    }
}

type GrantKey = (String, EntityType, String);

/// In-memory rights table keyed by subject and entity.
#[derive(Debug, Default)]
pub struct StaticRightsFetcher {
    grants: RwLock<HashMap<GrantKey, Rights>>,
}

impl StaticRightsFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `rights` for `subject` on `entity`, merging with earlier grants.
    pub fn grant(&self, subject: impl Into<String>, entity: &EntityIdentifiers, rights: &Rights) {
        let key = (subject.into(), entity.entity_type(), entity.unique_id());
        let mut grants = self.grants.write();
        let entry = grants.entry(key).or_default();
        for right in rights {
            entry.insert(*right);
        }
    }

    /// Drop every right of `subject` on `entity`.
    pub fn revoke(&self, subject: &str, entity: &EntityIdentifiers) -> bool {
        let key = (subject.to_string(), entity.entity_type(), entity.unique_id());
        self.grants.write().remove(&key).is_some()
    }

    fn lookup(
        &self,
        ctx: &CallContext,
        entity_type: EntityType,
        unique_id: &str,
    ) -> Result<Rights, AuthError> {
        let auth = ctx.authentication().ok_or(AuthError::Unauthenticated)?;
        let key = (auth.subject.clone(), entity_type, unique_id.to_string());
        Ok(self.grants.read().get(&key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl RightsFetcher for StaticRightsFetcher {
    async fn application_rights(
        &self,
        ctx: &CallContext,
        ids: &ApplicationIdentifiers,
    ) -> Result<Rights, AuthError> {
        self.lookup(ctx, EntityType::Application, &ids.application_id)
    }

    async fn client_rights(
        &self,
        ctx: &CallContext,
        ids: &ClientIdentifiers,
    ) -> Result<Rights, AuthError> {
        self.lookup(ctx, EntityType::Client, &ids.client_id)
    }

    async fn gateway_rights(
        &self,
        ctx: &CallContext,
        ids: &GatewayIdentifiers,
    ) -> Result<Rights, AuthError> {
        self.lookup(ctx, EntityType::Gateway, &ids.gateway_id)
    }

    async fn organization_rights(
        &self,
        ctx: &CallContext,
        ids: &OrganizationIdentifiers,
    ) -> Result<Rights, AuthError> {
        self.lookup(ctx, EntityType::Organization, &ids.organization_id)
    }

    async fn user_rights(
        &self,
        ctx: &CallContext,
        ids: &UserIdentifiers,
    ) -> Result<Rights, AuthError> {
        self.lookup(ctx, EntityType::User, &ids.user_id)
    }
}
