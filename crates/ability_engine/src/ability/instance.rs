//! The ability instance contract
//!
//! Every gameplay effect is a small state machine:
//!
//! ```text
//! Inactive --activate()--> Activating --next tick--> Active --REMOVE / teardown--> Destroyed
//!     \--activate() == false: dropped, no further calls
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use crate::physics::collision::Collider;
use crate::physics::collision_system::Collision;
use super::description::{AbilityDescription, Activation};
use super::user::UserHandle;

/// Outcome of a single `update()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Keep running next tick
    Continue,
    /// End the instance; `on_destroy` follows after the current pass
    Remove,
}

/// Lifecycle state of a managed instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityState {
    /// Activated and queued, not yet visible to iteration
    Activating,
    /// Updated every tick
    Active,
    /// Terminal; `on_destroy` has run
    Destroyed,
}

/// Failures reported by an instance during its tick
#[derive(Error, Debug)]
pub enum AbilityError {
    /// Gameplay logic failed
    #[error("ability fault: {0}")]
    Fault(String),

    /// The instance found itself in a state it cannot continue from
    #[error("invalid ability state: {0}")]
    InvalidState(String),
}

/// Per-activation state machine of one gameplay effect
///
/// Owned by the [`AbilityManager`](super::AbilityManager) once added. Calls
/// arrive only from the simulation thread and must never block.
pub trait Ability {
    /// Type identity of this instance
    fn description(&self) -> &Arc<AbilityDescription>;

    /// Validate against the user's state and start
    ///
    /// Returning `false` is a normal decline: the instance is discarded and
    /// receives no further calls.
    fn activate(&mut self, user: UserHandle, method: Activation) -> bool;

    /// Advance one tick
    ///
    /// An `Err` is logged and treated as [`UpdateResult::Remove`].
    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<UpdateResult, AbilityError>;

    /// Called exactly once when the instance is destroyed, whatever the cause
    fn on_destroy(&mut self);

    /// Collision volumes for the current tick
    fn colliders(&self) -> Vec<Collider> {
        Vec::new()
    }

    /// React to a collision with another ability
    ///
    /// The removal flags on `collision` may be changed to override the
    /// registered policy.
    fn on_collision(&mut self, _collision: &mut Collision) {}

    /// The instance was handed to another user
    fn on_user_change(&mut self, _user: UserHandle) {}
}

/// A ticking effect that is not an ability
///
/// Abilities hand these to the manager for effects that should outlive
/// them, such as debris that settles after the ability ended. They have no
/// owner or colliders; returning [`UpdateResult::Remove`] drops them.
pub trait Updatable {
    /// Advance one tick
    fn update(&mut self) -> UpdateResult;
}

/// A spawn requested from inside an `update()` call
pub(crate) struct Spawn {
    pub(crate) owner: UserHandle,
    pub(crate) ability: Box<dyn Ability>,
}

/// Handed to [`Ability::update`]
///
/// Abilities that start other abilities or effects mid-update queue them
/// here; they join the pending queues and run from the next tick on.
pub struct UpdateContext<'a> {
    tick: u64,
    spawns: &'a mut Vec<Spawn>,
    updatables: &'a mut Vec<Box<dyn Updatable>>,
}

impl<'a> UpdateContext<'a> {
    pub(crate) fn new(
        tick: u64,
        spawns: &'a mut Vec<Spawn>,
        updatables: &'a mut Vec<Box<dyn Updatable>>,
    ) -> Self {
        Self { tick, spawns, updatables }
    }

    /// Number of the tick being run
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Queue an already activated instance owned by `user`
    pub fn add_ability(&mut self, user: UserHandle, ability: Box<dyn Ability>) {
        self.spawns.push(Spawn { owner: user, ability });
    }

    /// Queue an effect that keeps ticking on its own
    pub fn add_updatable(&mut self, updatable: Box<dyn Updatable>) {
        self.updatables.push(updatable);
    }
}

/// Run `f`, turning a panic into an error message
pub(crate) fn isolate<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
