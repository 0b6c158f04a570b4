//! # Rights and Visibility Tokens
//!
//! Capability tokens a caller may hold on an entity, and the visibility mask
//! an event requires.
//!
//! ## Implication
//!
//! - `<type>_all` implies every right of that entity type.
//! - `all` implies every right.

use crate::entities::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single capability token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Right {
    ApplicationAll,
    ApplicationInfo,
    ApplicationTrafficRead,
    ApplicationDevicesRead,
    ClientAll,
    ClientInfo,
    GatewayAll,
    GatewayInfo,
    GatewayStatusRead,
    GatewayTrafficRead,
    OrganizationAll,
    OrganizationInfo,
    UserAll,
    UserInfo,
    All,
}

impl Right {
    /// Every known right.
    pub const ALL_RIGHTS: [Right; 15] = [
        Right::ApplicationAll,
        Right::ApplicationInfo,
        Right::ApplicationTrafficRead,
        Right::ApplicationDevicesRead,
        Right::ClientAll,
        Right::ClientInfo,
        Right::GatewayAll,
        Right::GatewayInfo,
        Right::GatewayStatusRead,
        Right::GatewayTrafficRead,
        Right::OrganizationAll,
        Right::OrganizationInfo,
        Right::UserAll,
        Right::UserInfo,
        Right::All,
    ];

    /// Entity type the right applies to. `None` for the universal right.
    ///
    /// End devices have no rights of their own; they authorize through the
    /// application rights.
    #[must_use]
    pub fn entity_type(&self) -> Option<EntityType> {
        match self {
            Self::ApplicationAll
            | Self::ApplicationInfo
            | Self::ApplicationTrafficRead
            | Self::ApplicationDevicesRead => Some(EntityType::Application),
            Self::ClientAll | Self::ClientInfo => Some(EntityType::Client),
            Self::GatewayAll
            | Self::GatewayInfo
            | Self::GatewayStatusRead
            | Self::GatewayTrafficRead => Some(EntityType::Gateway),
            Self::OrganizationAll | Self::OrganizationInfo => Some(EntityType::Organization),
            Self::UserAll | Self::UserInfo => Some(EntityType::User),
            Self::All => None,
        }
    }

    /// The broad "all" token of an entity type.
    #[must_use]
    pub fn all_for(entity_type: EntityType) -> Right {
        match entity_type {
            EntityType::Application | EntityType::EndDevice => Self::ApplicationAll,
            EntityType::Client => Self::ClientAll,
            EntityType::Gateway => Self::GatewayAll,
            EntityType::Organization => Self::OrganizationAll,
            EntityType::User => Self::UserAll,
        }
    }

    fn is_type_all(&self) -> bool {
        matches!(
            self,
            Self::ApplicationAll
                | Self::ClientAll
                | Self::GatewayAll
                | Self::OrganizationAll
                | Self::UserAll
        )
    }
}

/// An ordered set of rights.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rights(BTreeSet<Right>);

impl Rights {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The visibility applied to events that do not specify their own:
    /// any of the per-entity-type "all" tokens.
    #[must_use]
    pub fn default_visibility() -> Self {
        [
            Right::ApplicationAll,
            Right::ClientAll,
            Right::GatewayAll,
            Right::OrganizationAll,
            Right::UserAll,
        ]
        .into_iter()
        .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn contains(&self, right: Right) -> bool {
        self.0.contains(&right)
    }

    pub fn insert(&mut self, right: Right) -> bool {
        self.0.insert(right)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Right> {
        self.0.iter()
    }

    /// Closure of the set under implication.
    #[must_use]
    pub fn implied(&self) -> Rights {
        let mut out = self.0.clone();
        for right in &self.0 {
            if *right == Right::All {
                out.extend(Right::ALL_RIGHTS);
            } else if right.is_type_all() {
                out.extend(
                    Right::ALL_RIGHTS
                        .iter()
                        .filter(|r| r.entity_type() == right.entity_type()),
                );
            }
        }
        Rights(out)
    }

    /// Rights present in both sets.
    #[must_use]
    pub fn intersect(&self, other: &Rights) -> Rights {
        Rights(self.0.intersection(&other.0).copied().collect())
    }

    /// Whether the two sets share at least one right.
    #[must_use]
    pub fn intersects(&self, other: &Rights) -> bool {
        self.0.iter().any(|r| other.0.contains(r))
    }
}

impl FromIterator<Right> for Rights {
    fn from_iter<I: IntoIterator<Item = Right>>(iter: I) -> Self {
        Rights(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Rights {
    type Item = &'a Right;
    type IntoIter = std::collections::btree_set::Iter<'a, Right>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
