//! Layered declaration of collision registrations
//!
//! Ability types are grouped into layers of increasing strength:
//!
//! - types in the same layer cancel each other out (both removed)
//! - a type in a lower layer is removed by any type in a higher layer,
//!   which survives the hit
//!
//! Explicit pairs take precedence over anything the layers generate.

use std::sync::Arc;

use crate::ability::AbilityDescription;
use super::collision_system::RegisteredCollision;

/// Builder producing [`RegisteredCollision`]s from layers and explicit pairs
#[derive(Debug, Default, Clone)]
pub struct CollisionLayers {
    layers: Vec<Vec<Arc<AbilityDescription>>>,
    explicit: Vec<RegisteredCollision>,
}

impl CollisionLayers {
    /// Start with no layers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer stronger than every layer added before it
    pub fn layer(mut self, abilities: impl IntoIterator<Item = Arc<AbilityDescription>>) -> Self {
        self.layers.push(abilities.into_iter().collect());
        self
    }

    /// Add an explicit pair
    pub fn add(
        mut self,
        first: Arc<AbilityDescription>,
        second: Arc<AbilityDescription>,
        remove_first: bool,
        remove_second: bool,
    ) -> Self {
        self.explicit
            .push(RegisteredCollision::new(first, second, remove_first, remove_second));
        self
    }

    /// Produce de-duplicated registrations; the first declaration of a pair wins
    pub fn build(self) -> Vec<RegisteredCollision> {
        let mut generated = self.explicit;
        for (index, layer) in self.layers.iter().enumerate() {
            for (i, first) in layer.iter().enumerate() {
                for second in &layer[i..] {
                    generated.push(RegisteredCollision::new(Arc::clone(first), Arc::clone(second), true, true));
                }
            }
            for lower in &self.layers[..index] {
                for weak in lower {
                    for strong in layer {
                        generated.push(RegisteredCollision::new(Arc::clone(weak), Arc::clone(strong), true, false));
                    }
                }
            }
        }

        let mut registrations: Vec<RegisteredCollision> = Vec::with_capacity(generated.len());
        for registration in generated {
            if !registrations.iter().any(|existing| existing.same_pair(&registration)) {
                registrations.push(registration);
            }
        }
        registrations
    }
}
