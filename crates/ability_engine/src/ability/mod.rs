//! Ability types, instances and the per-world scheduler

pub mod description;
pub mod instance;
pub mod manager;
pub mod registry;
pub mod user;

pub use description::{AbilityDescription, AbilityDescriptionBuilder, AbilityFactory, Activation};
pub use instance::{Ability, AbilityError, AbilityState, Updatable, UpdateContext, UpdateResult};
pub use manager::{AbilityManager, InstanceKey, TickStats};
pub use registry::{AbilityRegistry, RegistryError};
pub use user::{User, UserHandle, UserId, WorldId};
