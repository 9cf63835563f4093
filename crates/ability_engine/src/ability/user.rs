//! The user abstraction consumed by the core
//!
//! Players and other ability owners live outside the engine. The scheduler
//! only needs identity and world membership; abilities use the rest for
//! their own eligibility checks.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::foundation::math::Vec3;
use super::description::AbilityDescription;

/// Stable identifier of an ability owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

/// Identifier of a simulation scope (one world)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(pub u64);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// An ability owner
///
/// Implemented by the hosting application. Cooldown bookkeeping is the
/// user's, so `add_cooldown` takes `&self` and implementations use interior
/// mutability.
pub trait User {
    /// Identity of this user
    fn id(&self) -> UserId;

    /// World the user is currently in
    fn world(&self) -> WorldId;

    /// Current location in world space
    fn location(&self) -> Vec3;

    /// Whether the user is still present and able to act
    fn is_valid(&self) -> bool;

    /// Whether the ability type is cooling down for this user
    fn is_on_cooldown(&self, description: &AbilityDescription) -> bool;

    /// Start a cooldown for the ability type
    fn add_cooldown(&self, description: &AbilityDescription, duration: Duration);

    /// Whether the user may use the ability type at all
    fn has_permission(&self, _description: &AbilityDescription) -> bool {
        true
    }

    /// Valid, permitted and not cooling down
    fn can_activate(&self, description: &AbilityDescription) -> bool {
        self.is_valid() && self.has_permission(description) && !self.is_on_cooldown(description)
    }
}

/// Shared handle to a user; the simulation runs on a single thread
pub type UserHandle = Rc<dyn User>;
