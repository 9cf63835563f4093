//! Ability type descriptions
//!
//! A description is the immutable identity of an ability type. Collision
//! registrations match on it and the manager creates instances from it.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;

use super::instance::Ability;

bitflags! {
    /// Ways an ability can be triggered
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Activation: u16 {
        /// Left click / primary attack
        const ATTACK = 1 << 0;
        /// Right click on anything
        const INTERACT = 1 << 1;
        /// Right click on an entity
        const INTERACT_ENTITY = 1 << 2;
        /// Right click on a block
        const INTERACT_BLOCK = 1 << 3;
        /// Start sneaking
        const SNEAK = 1 << 4;
        /// Stop sneaking
        const SNEAK_RELEASE = 1 << 5;
        /// Landing after a fall
        const FALL = 1 << 6;
        /// Completing a combo sequence
        const SEQUENCE = 1 << 7;
        /// Always on while the user is eligible
        const PASSIVE = 1 << 8;
    }
}

/// Creates a fresh, inactive instance of an ability type
pub type AbilityFactory = fn(Arc<AbilityDescription>) -> Box<dyn Ability>;

/// Immutable identity of an ability type
///
/// Equality and hashing use the name only; names are unique within an
/// [`AbilityRegistry`](super::AbilityRegistry).
pub struct AbilityDescription {
    name: String,
    activation: Activation,
    cooldown: Duration,
    factory: AbilityFactory,
}

impl AbilityDescription {
    /// Start building a description
    pub fn builder(name: impl Into<String>, factory: AbilityFactory) -> AbilityDescriptionBuilder {
        AbilityDescriptionBuilder {
            name: name.into(),
            activation: Activation::empty(),
            cooldown: Duration::ZERO,
            factory,
        }
    }

    /// Unique name of the ability type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All activation methods this type responds to
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Whether `method` triggers this ability type
    pub fn is_activated_by(&self, method: Activation) -> bool {
        self.activation.intersects(method)
    }

    /// Default cooldown applied when an instance ends
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Create a new inactive instance of this type
    pub fn create_ability(self: &Arc<Self>) -> Box<dyn Ability> {
        (self.factory)(Arc::clone(self))
    }
}

impl PartialEq for AbilityDescription {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for AbilityDescription {}

impl Hash for AbilityDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for AbilityDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityDescription")
            .field("name", &self.name)
            .field("activation", &self.activation)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for AbilityDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for [`AbilityDescription`]
pub struct AbilityDescriptionBuilder {
    name: String,
    activation: Activation,
    cooldown: Duration,
    factory: AbilityFactory,
}

impl AbilityDescriptionBuilder {
    /// Add activation methods
    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation |= activation;
        self
    }

    /// Set the default cooldown
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Finish the description
    pub fn build(self) -> Arc<AbilityDescription> {
        Arc::new(AbilityDescription {
            name: self.name,
            activation: self.activation,
            cooldown: self.cooldown,
            factory: self.factory,
        })
    }
}
