//! Arena players

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ability_engine::prelude::*;

/// A scripted player standing in the arena
pub struct ArenaPlayer {
    id: UserId,
    world: WorldId,
    name: String,
    location: Cell<Vec3>,
    facing: Vec3,
    online: Cell<bool>,
    cooldowns: RefCell<HashMap<String, Instant>>,
}

impl ArenaPlayer {
    /// Create a player facing `facing`
    pub fn spawn(id: u64, world: WorldId, name: &str, location: Vec3, facing: Vec3) -> Rc<Self> {
        Rc::new(Self {
            id: UserId(id),
            world,
            name: name.to_string(),
            location: Cell::new(location),
            facing: facing.normalize(),
            online: Cell::new(true),
            cooldowns: RefCell::new(HashMap::new()),
        })
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit view direction
    pub fn facing(&self) -> Vec3 {
        self.facing
    }

    /// Mark the player as gone
    pub fn leave(&self) {
        self.online.set(false);
    }
}

impl User for ArenaPlayer {
    fn id(&self) -> UserId {
        self.id
    }

    fn world(&self) -> WorldId {
        self.world
    }

    fn location(&self) -> Vec3 {
        self.location.get()
    }

    fn is_valid(&self) -> bool {
        self.online.get()
    }

    fn is_on_cooldown(&self, description: &AbilityDescription) -> bool {
        self.cooldowns
            .borrow()
            .get(description.name())
            .is_some_and(|until| *until > Instant::now())
    }

    fn add_cooldown(&self, description: &AbilityDescription, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.cooldowns
            .borrow_mut()
            .insert(description.name().to_string(), Instant::now() + duration);
    }
}
