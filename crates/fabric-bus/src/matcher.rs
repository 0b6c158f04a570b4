//! # Name Matchers
//!
//! Pure predicates over event names, used to route subscriptions to the
//! auxiliary streams of a multiplexer.

use fabric_types::{DefinitionError, DefinitionRegistry};
use std::collections::HashSet;

/// Predicate over event names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Accepts every name.
    All,
    /// Accepts no name.
    None,
    /// Accepts exactly the listed names.
    Names(HashSet<String>),
}

impl Matcher {
    #[must_use]
    pub fn all() -> Self {
        Self::All
    }

    #[must_use]
    pub fn none() -> Self {
        Self::None
    }

    #[must_use]
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    /// Expand glob patterns against `registry`.
    ///
    /// Fails if any pattern matches no defined name.
    pub fn patterns<S: AsRef<str>>(
        registry: &DefinitionRegistry,
        patterns: &[S],
    ) -> Result<Self, DefinitionError> {
        Ok(Self::names(registry.expand_patterns(patterns)?))
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Names(names) => names.contains(name),
        }
    }

    /// Whether at least one of `names` is accepted.
    #[must_use]
    pub fn matches_any<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|n| self.matches(n.as_ref()))
    }
}
