//! Name-keyed registry of ability types

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::description::{AbilityDescription, Activation};

/// Registry failures; all are startup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A type with the same name is already registered
    #[error("ability '{0}' is already registered")]
    DuplicateAbility(String),

    /// No type with this name is registered
    #[error("unknown ability '{0}'")]
    UnknownAbility(String),
}

/// Insertion-ordered set of ability types, keyed by name
#[derive(Debug, Default, Clone)]
pub struct AbilityRegistry {
    descriptions: Vec<Arc<AbilityDescription>>,
    by_name: HashMap<String, usize>,
}

impl AbilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; names must be unique
    pub fn register(&mut self, description: Arc<AbilityDescription>) -> Result<(), RegistryError> {
        let name = description.name().to_string();
        if self.by_name.contains_key(&name) {
            log::warn!("Rejected duplicate ability registration '{name}'");
            return Err(RegistryError::DuplicateAbility(name));
        }
        self.by_name.insert(name, self.descriptions.len());
        self.descriptions.push(description);
        Ok(())
    }

    /// Look a type up by name
    pub fn get(&self, name: &str) -> Option<&Arc<AbilityDescription>> {
        self.by_name.get(name).map(|&index| &self.descriptions[index])
    }

    /// Look a type up by name, failing if it is unknown
    pub fn require(&self, name: &str) -> Result<&Arc<AbilityDescription>, RegistryError> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownAbility(name.to_string()))
    }

    /// All types in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AbilityDescription>> {
        self.descriptions.iter()
    }

    /// Types that are always on while their user is eligible
    pub fn passives(&self) -> impl Iterator<Item = &Arc<AbilityDescription>> {
        self.iter()
            .filter(|desc| desc.is_activated_by(Activation::PASSIVE))
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::Probe;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = AbilityRegistry::new();
        registry.register(AbilityDescription::builder("FireBlast", Probe::factory).build()).unwrap();
        registry.register(AbilityDescription::builder("AirShield", Probe::factory).build()).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("AirShield").unwrap().name(), "AirShield");
        assert!(registry.get("WaterSpout").is_none());
        let names: Vec<_> = registry.iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, ["FireBlast", "AirShield"]);
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut registry = AbilityRegistry::new();
        registry.register(AbilityDescription::builder("FireBlast", Probe::factory).build()).unwrap();
        let err = registry
            .register(AbilityDescription::builder("FireBlast", Probe::factory).build())
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateAbility("FireBlast".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_require_unknown() {
        let registry = AbilityRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.require("Nope").unwrap_err(),
            RegistryError::UnknownAbility("Nope".into())
        );
    }

    #[test]
    fn test_passives() {
        let mut registry = AbilityRegistry::new();
        registry.register(AbilityDescription::builder("FireBlast", Probe::factory)
            .activation(Activation::ATTACK)
            .build()).unwrap();
        registry.register(AbilityDescription::builder("GracefulDescent", Probe::factory)
            .activation(Activation::PASSIVE)
            .build()).unwrap();

        let passives: Vec<_> = registry.passives().map(|d| d.name()).collect();
        assert_eq!(passives, ["GracefulDescent"]);
    }
}
