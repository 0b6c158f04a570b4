//! # Event Definitions
//!
//! Every event name a producer may emit is defined once in a
//! [`DefinitionRegistry`]. The registry is passed explicitly to whatever needs
//! it (bus matching, pattern expansion); there is no global registry.

use crate::errors::DefinitionError;
use crate::event::EventBuilder;
use crate::rights::Rights;
use glob::Pattern;
use std::collections::{BTreeMap, BTreeSet};

/// A known event name and its delivery properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    name: String,
    description: String,
    propagate_to_parent: bool,
    visibility: Rights,
}

impl EventDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            propagate_to_parent: false,
            visibility: Rights::new(),
        }
    }

    /// End-device events of this kind also match subscriptions on the
    /// parent application.
    #[must_use]
    pub fn with_propagate_to_parent(mut self) -> Self {
        self.propagate_to_parent = true;
        self
    }

    /// Visibility applied to events built from this definition.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Rights) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn propagate_to_parent(&self) -> bool {
        self.propagate_to_parent
    }

    #[must_use]
    pub fn visibility(&self) -> &Rights {
        &self.visibility
    }

    /// Builder for an event of this definition, with the default visibility applied.
    #[must_use]
    pub fn builder(&self) -> EventBuilder {
        EventBuilder::new(self.name.clone()).visibility(self.visibility.clone())
    }
}

/// Registry of known event definitions.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: BTreeMap<String, EventDefinition>,
}

impl DefinitionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Names must be unique and non-empty.
    pub fn define(
        &mut self,
        definition: EventDefinition,
    ) -> Result<&EventDefinition, DefinitionError> {
        if definition.name.is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if self.definitions.contains_key(&definition.name) {
            return Err(DefinitionError::Duplicate(definition.name));
        }
        let name = definition.name.clone();
        Ok(self.definitions.entry(name).or_insert(definition))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EventDefinition> {
        self.definitions.get(name)
    }

    /// Whether `name` is defined with the propagate-to-parent flag.
    #[must_use]
    pub fn propagates_to_parent(&self, name: &str) -> bool {
        self.definitions
            .get(name)
            .is_some_and(EventDefinition::propagate_to_parent)
    }

    /// All defined names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Expand shell-style patterns (`*`, `?`, `[...]`, `[!...]`) into the
    /// sorted set of defined names they match. `*` crosses dots.
    ///
    /// Fails if a pattern is malformed or matches no defined name.
    pub fn expand_patterns<S: AsRef<str>>(
        &self,
        patterns: &[S],
    ) -> Result<Vec<String>, DefinitionError> {
        let mut out: BTreeSet<&str> = BTreeSet::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Pattern::new(pattern)
                .map_err(|_| DefinitionError::InvalidPattern(pattern.to_string()))?;
            let mut matched = false;
            for name in self.definitions.keys().filter(|n| glob.matches(n.as_str())) {
                out.insert(name.as_str());
                matched = true;
            }
            if !matched {
                return Err(DefinitionError::UnknownPattern(pattern.to_string()));
            }
        }
        Ok(out.into_iter().map(str::to_string).collect())
    }
}
