//! # Entity Identifiers
//!
//! Typed references to the entities an event can be scoped to.
//!
//! ## Kinds
//!
//! - **Application**, **Client**, **Gateway**, **Organization**, **User**:
//!   a single identifier, unique within its type.
//! - **End device**: a device identifier embedded in its parent application.
//!   The unique id is `"<application_id>.<device_id>"`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity type tag carried by every identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Application,
    Client,
    EndDevice,
    Gateway,
    Organization,
    User,
}

impl EntityType {
    /// Human readable name, as used in log fields and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Client => "client",
            Self::EndDevice => "end device",
            Self::Gateway => "gateway",
            Self::Organization => "organization",
            Self::User => "user",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationIdentifiers {
    pub application_id: String,
}

/// OAuth client reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientIdentifiers {
    pub client_id: String,
}

/// End device reference. Always scoped to its application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndDeviceIdentifiers {
    pub application_ids: ApplicationIdentifiers,
    pub device_id: String,
    /// Optional LoRaWAN DevEUI, hex encoded. Not part of the unique id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_eui: Option<String>,
}

/// Gateway reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GatewayIdentifiers {
    pub gateway_id: String,
    /// Optional gateway EUI, hex encoded. Not part of the unique id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eui: Option<String>,
}

/// Organization reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrganizationIdentifiers {
    pub organization_id: String,
}

/// User reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserIdentifiers {
    pub user_id: String,
}

/// A typed reference to any entity an event may concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum EntityIdentifiers {
    Application(ApplicationIdentifiers),
    Client(ClientIdentifiers),
    EndDevice(EndDeviceIdentifiers),
    Gateway(GatewayIdentifiers),
    Organization(OrganizationIdentifiers),
    User(UserIdentifiers),
}

impl EntityIdentifiers {
    /// Application reference.
    #[must_use]
    pub fn application(application_id: impl Into<String>) -> Self {
        Self::Application(ApplicationIdentifiers {
            application_id: application_id.into(),
        })
    }

    /// Client reference.
    #[must_use]
    pub fn client(client_id: impl Into<String>) -> Self {
        Self::Client(ClientIdentifiers {
            client_id: client_id.into(),
        })
    }

    /// End device reference inside `application_id`.
    #[must_use]
    pub fn end_device(application_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self::EndDevice(EndDeviceIdentifiers {
            application_ids: ApplicationIdentifiers {
                application_id: application_id.into(),
            },
            device_id: device_id.into(),
            dev_eui: None,
        })
    }

    /// Gateway reference.
    #[must_use]
    pub fn gateway(gateway_id: impl Into<String>) -> Self {
        Self::Gateway(GatewayIdentifiers {
            gateway_id: gateway_id.into(),
            eui: None,
        })
    }

    /// Organization reference.
    #[must_use]
    pub fn organization(organization_id: impl Into<String>) -> Self {
        Self::Organization(OrganizationIdentifiers {
            organization_id: organization_id.into(),
        })
    }

    /// User reference.
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User(UserIdentifiers {
            user_id: user_id.into(),
        })
    }

    /// The entity type tag.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Application(_) => EntityType::Application,
            Self::Client(_) => EntityType::Client,
            Self::EndDevice(_) => EntityType::EndDevice,
            Self::Gateway(_) => EntityType::Gateway,
            Self::Organization(_) => EntityType::Organization,
            Self::User(_) => EntityType::User,
        }
    }

    /// Identifier that is unique within the entity type.
    #[must_use]
    pub fn unique_id(&self) -> String {
        match self {
            Self::Application(ids) => ids.application_id.clone(),
            Self::Client(ids) => ids.client_id.clone(),
            Self::EndDevice(ids) => {
                format!("{}.{}", ids.application_ids.application_id, ids.device_id)
            }
            Self::Gateway(ids) => ids.gateway_id.clone(),
            Self::Organization(ids) => ids.organization_id.clone(),
            Self::User(ids) => ids.user_id.clone(),
        }
    }

    /// The application an end device belongs to. `None` for every other kind.
    #[must_use]
    pub fn parent_application(&self) -> Option<&ApplicationIdentifiers> {
        match self {
            Self::EndDevice(ids) => Some(&ids.application_ids),
            _ => None,
        }
    }
}

impl fmt::Display for EntityIdentifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type(), self.unique_id())
    }
}
