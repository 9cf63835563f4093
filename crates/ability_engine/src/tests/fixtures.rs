//! Probe abilities and users shared by the test modules

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crate::ability::{
    Ability, AbilityDescription, AbilityError, Activation, Updatable, UpdateContext, UpdateResult,
    User, UserHandle, UserId, WorldId,
};
use crate::foundation::math::Vec3;
use crate::physics::{Collider, Collision};

/// An ability type with `ATTACK` activation backed by [`Probe`]
pub(crate) fn probe_type(name: &str) -> Arc<AbilityDescription> {
    AbilityDescription::builder(name, Probe::factory)
        .activation(Activation::ATTACK)
        .build()
}

/// What a collision handler saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeenCollision {
    pub(crate) other: String,
    pub(crate) other_owner: UserId,
    pub(crate) remove_self: bool,
    pub(crate) remove_other: bool,
}

#[derive(Default)]
struct Counts {
    updates: usize,
    destroys: usize,
    owner_changes: usize,
    collider_queries: usize,
    collisions: Vec<SeenCollision>,
}

/// Shared record of probe callbacks, keyed by ability name
#[derive(Clone, Default)]
pub(crate) struct ProbeLog(Rc<RefCell<HashMap<String, Counts>>>);

impl ProbeLog {
    fn record(&self, name: &str, f: impl FnOnce(&mut Counts)) {
        f(self.0.borrow_mut().entry(name.to_string()).or_default());
    }

    fn read<T>(&self, name: &str, f: impl FnOnce(&Counts) -> T) -> T {
        f(self.0.borrow().get(name).unwrap_or(&Counts::default()))
    }

    pub(crate) fn updates(&self, name: &str) -> usize {
        self.read(name, |c| c.updates)
    }

    pub(crate) fn destroys(&self, name: &str) -> usize {
        self.read(name, |c| c.destroys)
    }

    pub(crate) fn owner_changes(&self, name: &str) -> usize {
        self.read(name, |c| c.owner_changes)
    }

    pub(crate) fn collider_queries(&self, name: &str) -> usize {
        self.read(name, |c| c.collider_queries)
    }

    pub(crate) fn collisions(&self, name: &str) -> usize {
        self.read(name, |c| c.collisions.len())
    }

    pub(crate) fn seen(&self, name: &str) -> Vec<SeenCollision> {
        self.read(name, |c| c.collisions.clone())
    }
}

/// Scripted `update()` outcome
#[derive(Clone)]
pub(crate) enum Behavior {
    Continue,
    /// Return `Remove` on the n-th update
    RemoveAfter(usize),
    Fail,
    Panic,
    /// Spawn one `Continue` probe of the same type for the user, then continue
    SpawnFor(UserHandle),
    /// Leave behind a [`Ticker`] named "Afterglow" lasting n updates, then remove
    HandOff(usize),
}

/// Scriptable ability used across the tests
pub(crate) struct Probe {
    description: Arc<AbilityDescription>,
    log: ProbeLog,
    behavior: Behavior,
    colliders: Vec<Collider>,
    updates: usize,
    spare_other: bool,
    spare_self: bool,
    panic_on_collision: bool,
}

impl Probe {
    pub(crate) fn factory(description: Arc<AbilityDescription>) -> Box<dyn Ability> {
        Box::new(Self::new(description, ProbeLog::default(), Behavior::Continue))
    }

    fn new(description: Arc<AbilityDescription>, log: ProbeLog, behavior: Behavior) -> Self {
        Self {
            description,
            log,
            behavior,
            colliders: Vec::new(),
            updates: 0,
            spare_other: false,
            spare_self: false,
            panic_on_collision: false,
        }
    }

    pub(crate) fn boxed(description: &Arc<AbilityDescription>, log: &ProbeLog, behavior: Behavior) -> Box<Self> {
        Box::new(Self::new(Arc::clone(description), log.clone(), behavior))
    }

    pub(crate) fn with_colliders(mut self: Box<Self>, colliders: Vec<Collider>) -> Box<Self> {
        self.colliders = colliders;
        self
    }

    /// Clear the other side's removal flag on every collision
    pub(crate) fn sparing_other(mut self: Box<Self>) -> Box<Self> {
        self.spare_other = true;
        self
    }

    /// Clear its own removal flag on every collision
    pub(crate) fn sparing_self(mut self: Box<Self>) -> Box<Self> {
        self.spare_self = true;
        self
    }

    pub(crate) fn panicking_on_collision(mut self: Box<Self>) -> Box<Self> {
        self.panic_on_collision = true;
        self
    }
}

impl Ability for Probe {
    fn description(&self) -> &Arc<AbilityDescription> {
        &self.description
    }

    fn activate(&mut self, user: UserHandle, _method: Activation) -> bool {
        user.can_activate(&self.description)
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<UpdateResult, AbilityError> {
        self.updates += 1;
        self.log.record(self.description.name(), |c| c.updates += 1);
        match &self.behavior {
            Behavior::Continue => Ok(UpdateResult::Continue),
            Behavior::RemoveAfter(n) if self.updates >= *n => Ok(UpdateResult::Remove),
            Behavior::RemoveAfter(_) => Ok(UpdateResult::Continue),
            Behavior::Fail => Err(AbilityError::Fault("scripted failure".into())),
            Behavior::Panic => panic!("scripted panic"),
            Behavior::SpawnFor(user) => {
                if self.updates == 1 {
                    let child = Self::boxed(&self.description, &self.log, Behavior::Continue);
                    ctx.add_ability(UserHandle::clone(user), child);
                }
                Ok(UpdateResult::Continue)
            }
            Behavior::HandOff(lifetime) => {
                ctx.add_updatable(Ticker::lasting("Afterglow", &self.log, *lifetime));
                Ok(UpdateResult::Remove)
            }
        }
    }

    fn on_destroy(&mut self) {
        self.log.record(self.description.name(), |c| c.destroys += 1);
    }

    fn colliders(&self) -> Vec<Collider> {
        self.log.record(self.description.name(), |c| c.collider_queries += 1);
        self.colliders.clone()
    }

    fn on_collision(&mut self, collision: &mut Collision) {
        assert!(!self.panic_on_collision, "scripted collision panic");
        self.log.record(self.description.name(), |c| {
            c.collisions.push(SeenCollision {
                other: collision.other().ability.name().to_string(),
                other_owner: collision.other().owner,
                remove_self: collision.remove_self(),
                remove_other: collision.remove_other(),
            });
        });
        if self.spare_other {
            collision.set_remove_other(false);
        }
        if self.spare_self {
            collision.set_remove_self(false);
        }
    }

    fn on_user_change(&mut self, _user: UserHandle) {
        self.log.record(self.description.name(), |c| c.owner_changes += 1);
    }
}

/// Ownerless effect that counts its updates under `name`
pub(crate) struct Ticker {
    name: String,
    log: ProbeLog,
    lifetime: usize,
    panics: bool,
    updates: usize,
}

impl Ticker {
    /// Remove itself on the `lifetime`-th update
    pub(crate) fn lasting(name: &str, log: &ProbeLog, lifetime: usize) -> Box<Self> {
        Box::new(Self { name: name.to_string(), log: log.clone(), lifetime, panics: false, updates: 0 })
    }

    pub(crate) fn panicking(name: &str, log: &ProbeLog) -> Box<Self> {
        let mut ticker = Self::lasting(name, log, usize::MAX);
        ticker.panics = true;
        ticker
    }
}

impl Updatable for Ticker {
    fn update(&mut self) -> UpdateResult {
        self.updates += 1;
        self.log.record(&self.name, |c| c.updates += 1);
        assert!(!self.panics, "scripted updatable panic");
        if self.updates >= self.lifetime {
            UpdateResult::Remove
        } else {
            UpdateResult::Continue
        }
    }
}

/// Valid user with in-memory cooldowns
pub(crate) struct TestUser {
    id: UserId,
    world: WorldId,
    valid: bool,
    cooldowns: RefCell<HashMap<String, Duration>>,
}

impl TestUser {
    pub(crate) fn handle(id: u64, world: u64) -> UserHandle {
        Rc::new(Self {
            id: UserId(id),
            world: WorldId(world),
            valid: true,
            cooldowns: RefCell::new(HashMap::new()),
        })
    }
}

impl User for TestUser {
    fn id(&self) -> UserId {
        self.id
    }

    fn world(&self) -> WorldId {
        self.world
    }

    fn location(&self) -> Vec3 {
        Vec3::zeros()
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn is_on_cooldown(&self, description: &AbilityDescription) -> bool {
        self.cooldowns.borrow().contains_key(description.name())
    }

    fn add_cooldown(&self, description: &AbilityDescription, duration: Duration) {
        self.cooldowns
            .borrow_mut()
            .insert(description.name().to_string(), duration);
    }
}
