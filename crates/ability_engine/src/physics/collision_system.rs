//! Collision detection between ability instances
//!
//! Based on Real-Time Collision Detection (Ericson), Chapter 7 overview:
//! the pass is split into a broad phase and a narrow phase.
//!
//! - Broad phase: only instances whose ability types form a registered pair
//!   are considered, and instances of the same owner never collide.
//! - Narrow phase: every collider of one instance is tested against every
//!   collider of the other with [`Collider::intersects`].
//!
//! Each hit is delivered to both instances as mirrored [`Collision`] views.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::ability::manager::LiveInstance;
use crate::ability::{AbilityDescription, AbilityManager, InstanceKey, UserId};
use crate::physics::collision::Collider;

/// Collision registration errors; raised at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollisionError {
    /// The unordered type pair is already registered
    #[error("collision between '{first}' and '{second}' is already registered")]
    DuplicateRegistration {
        /// First ability type name
        first: String,
        /// Second ability type name
        second: String,
    },
}

/// A pair of ability types that can collide, with the default removal policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCollision {
    /// First ability type
    pub first: Arc<AbilityDescription>,
    /// Second ability type
    pub second: Arc<AbilityDescription>,
    /// Remove the first instance on hit
    pub remove_first: bool,
    /// Remove the second instance on hit
    pub remove_second: bool,
}

impl RegisteredCollision {
    /// Declare a colliding type pair
    pub fn new(
        first: Arc<AbilityDescription>,
        second: Arc<AbilityDescription>,
        remove_first: bool,
        remove_second: bool,
    ) -> Self {
        Self { first, second, remove_first, remove_second }
    }

    /// Whether this registration covers the same unordered type pair as `other`
    pub fn same_pair(&self, other: &Self) -> bool {
        (self.first == other.first && self.second == other.second)
            || (self.first == other.second && self.second == other.first)
    }
}

/// One side of a collision
#[derive(Debug, Clone)]
pub struct CollisionParty {
    /// Instance handle in the world's manager
    pub key: InstanceKey,
    /// Owner of the instance
    pub owner: UserId,
    /// Ability type of the instance
    pub ability: Arc<AbilityDescription>,
    /// The collider that was hit
    pub collider: Collider,
}

impl CollisionParty {
    fn of(live: &LiveInstance, collider: Collider) -> Self {
        Self {
            key: live.key,
            owner: live.owner,
            ability: Arc::clone(&live.ability),
            collider,
        }
    }
}

/// A collision as seen from one of the two instances
///
/// The removal flags start from the registered policy. Handlers may change
/// them; the view handed to the other side reflects those changes.
#[derive(Debug, Clone)]
pub struct Collision {
    own: CollisionParty,
    other: CollisionParty,
    remove_self: bool,
    remove_other: bool,
}

impl Collision {
    /// Build a view for `own`
    pub fn new(own: CollisionParty, other: CollisionParty, remove_self: bool, remove_other: bool) -> Self {
        Self { own, other, remove_self, remove_other }
    }

    /// The receiving instance
    pub fn own(&self) -> &CollisionParty {
        &self.own
    }

    /// The instance it collided with
    pub fn other(&self) -> &CollisionParty {
        &self.other
    }

    /// The receiving instance's collider
    pub fn collider(&self) -> &Collider {
        &self.own.collider
    }

    /// The other instance's collider
    pub fn other_collider(&self) -> &Collider {
        &self.other.collider
    }

    /// Whether the receiving instance will be removed
    pub fn remove_self(&self) -> bool {
        self.remove_self
    }

    /// Whether the other instance will be removed
    pub fn remove_other(&self) -> bool {
        self.remove_other
    }

    /// Override removal of the receiving instance
    pub fn set_remove_self(&mut self, remove: bool) {
        self.remove_self = remove;
    }

    /// Override removal of the other instance
    pub fn set_remove_other(&mut self, remove: bool) {
        self.remove_other = remove;
    }

    /// The same collision seen from the other side
    pub fn mirrored(&self) -> Self {
        Self {
            own: self.other.clone(),
            other: self.own.clone(),
            remove_self: self.remove_other,
            remove_other: self.remove_self,
        }
    }
}

/// Registered type pairs and the per-tick collision pass
///
/// Registrations are setup data; [`Engine`](crate::engine::Engine) clones a
/// template manager into each world.
#[derive(Debug, Clone, Default)]
pub struct CollisionManager {
    registrations: Vec<RegisteredCollision>,
}

impl CollisionManager {
    /// Create a manager with no registrations
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a colliding type pair
    ///
    /// Each unordered pair may only be registered once.
    pub fn register_collision(&mut self, registration: RegisteredCollision) -> Result<(), CollisionError> {
        if self.registrations.iter().any(|existing| existing.same_pair(&registration)) {
            log::warn!(
                "Rejected duplicate collision registration {} / {}",
                registration.first,
                registration.second
            );
            return Err(CollisionError::DuplicateRegistration {
                first: registration.first.name().to_string(),
                second: registration.second.name().to_string(),
            });
        }
        self.registrations.push(registration);
        Ok(())
    }

    /// Register several pairs, stopping at the first rejection
    pub fn register_all(
        &mut self,
        registrations: impl IntoIterator<Item = RegisteredCollision>,
    ) -> Result<(), CollisionError> {
        registrations
            .into_iter()
            .try_for_each(|registration| self.register_collision(registration))
    }

    /// All registrations in registration order
    pub fn registrations(&self) -> &[RegisteredCollision] {
        &self.registrations
    }

    /// Run the collision pass over the manager's live instances
    ///
    /// Instances flagged for removal are destroyed after every registration
    /// has been processed. Returns the number of collisions delivered.
    pub fn run(&self, manager: &mut AbilityManager) -> usize {
        if self.registrations.is_empty() || manager.size() < 2 {
            return 0;
        }

        let snapshot = manager.snapshot();
        let mut cache: HashMap<InstanceKey, Vec<Collider>> = HashMap::new();
        let mut removals = Vec::new();
        let mut flagged = HashSet::new();
        let mut delivered = 0;

        for registration in &self.registrations {
            let firsts: Vec<&LiveInstance> = snapshot
                .iter()
                .filter(|live| live.ability == registration.first)
                .collect();
            if firsts.is_empty() {
                continue;
            }
            let same_type = registration.first == registration.second;
            let seconds: Vec<&LiveInstance> = if same_type {
                firsts.clone()
            } else {
                snapshot
                    .iter()
                    .filter(|live| live.ability == registration.second)
                    .collect()
            };

            for (i, first) in firsts.iter().enumerate() {
                // Same-type pairs are unordered; visit each once
                let start = if same_type { i + 1 } else { 0 };
                for second in &seconds[start..] {
                    if first.owner == second.owner {
                        continue;
                    }
                    for (first_collider, second_collider) in intersecting(manager, &mut cache, first.key, second.key) {
                        let view = Collision::new(
                            CollisionParty::of(first, first_collider),
                            CollisionParty::of(second, second_collider),
                            registration.remove_first,
                            registration.remove_second,
                        );
                        let outcome = deliver(manager, view);
                        delivered += 1;
                        if outcome.remove_self() && flagged.insert(first.key) {
                            removals.push(first.key);
                        }
                        if outcome.remove_other() && flagged.insert(second.key) {
                            removals.push(second.key);
                        }
                    }
                }
            }
        }

        for key in removals {
            manager.destroy_instance(key);
        }
        log::trace!("{}: delivered {delivered} collisions, removed {}", manager.world(), flagged.len());
        delivered
    }
}

/// Collider pairs of two instances that intersect this tick
fn intersecting(
    manager: &AbilityManager,
    cache: &mut HashMap<InstanceKey, Vec<Collider>>,
    first: InstanceKey,
    second: InstanceKey,
) -> Vec<(Collider, Collider)> {
    for key in [first, second] {
        cache.entry(key).or_insert_with(|| manager.colliders_of(key));
    }
    let (Some(firsts), Some(seconds)) = (cache.get(&first), cache.get(&second)) else {
        return Vec::new();
    };
    firsts
        .iter()
        .flat_map(|a| seconds.iter().map(move |b| (*a, *b)))
        .filter(|(a, b)| a.intersects(b))
        .collect()
}

/// Deliver one collision to both sides in turn
///
/// Returns the final view from the first instance's side. A handler that
/// panics is flagged for removal.
fn deliver(manager: &mut AbilityManager, mut view: Collision) -> Collision {
    let first = view.own.key;
    if !manager.notify_collision(first, &mut view) {
        view.set_remove_self(true);
    }
    let mut mirror = view.mirrored();
    let second = mirror.own.key;
    if !manager.notify_collision(second, &mut mirror) {
        mirror.set_remove_self(true);
    }
    mirror.mirrored()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::WorldId;
    use crate::foundation::math::Vec3;
    use crate::physics::collision::Sphere;
    use crate::tests::fixtures::{probe_type, Behavior, Probe, ProbeLog, TestUser};

    fn sphere(x: f64) -> Collider {
        Sphere::new(Vec3::new(x, 0.0, 0.0), 1.0).into()
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let a = probe_type("FireBlast");
        let b = probe_type("AirShield");
        let mut collisions = CollisionManager::new();
        collisions.register_collision(RegisteredCollision::new(a.clone(), b.clone(), true, false)).unwrap();

        let err = collisions
            .register_collision(RegisteredCollision::new(b, a, false, true))
            .unwrap_err();
        assert_eq!(
            err,
            CollisionError::DuplicateRegistration { first: "AirShield".into(), second: "FireBlast".into() }
        );
        assert_eq!(collisions.registrations().len(), 1);
    }

    #[test]
    fn test_collision_mirrors() {
        let desc = probe_type("FireBlast");
        let party = |key, owner, x| CollisionParty {
            key,
            owner: UserId(owner),
            ability: Arc::clone(&desc),
            collider: sphere(x),
        };
        let mut keys = slotmap::SlotMap::<InstanceKey, ()>::with_key();
        let (ka, kb) = (keys.insert(()), keys.insert(()));
        let view = Collision::new(party(ka, 1, 0.0), party(kb, 2, 1.0), true, false);
        let mirror = view.mirrored();
        assert_eq!(mirror.own().key, kb);
        assert_eq!(mirror.other().owner, UserId(1));
        assert!(!mirror.remove_self());
        assert!(mirror.remove_other());
        assert_eq!(*mirror.collider(), sphere(1.0));
    }

    #[test]
    fn test_same_type_pairs_are_visited_once() {
        let log = ProbeLog::default();
        let desc = probe_type("EarthBlast");
        let mut manager = AbilityManager::new(WorldId(1));
        for (user, x) in [(1, 0.0), (2, 0.5), (3, 1.0)] {
            let ability = Probe::boxed(&desc, &log, Behavior::Continue).with_colliders(vec![sphere(x)]);
            manager.add_ability(TestUser::handle(user, 1), ability).unwrap();
        }
        manager.update();

        let mut collisions = CollisionManager::new();
        collisions.register_collision(RegisteredCollision::new(desc.clone(), desc, false, false)).unwrap();

        assert_eq!(collisions.run(&mut manager), 3);
        assert_eq!(log.collisions("EarthBlast"), 6);
        assert_eq!(manager.size(), 3);
    }

    #[test]
    fn test_colliders_are_computed_once_per_tick() {
        let log = ProbeLog::default();
        let blast = probe_type("FireBlast");
        let shield = probe_type("AirShield");
        let wall = probe_type("EarthWall");
        let mut manager = AbilityManager::new(WorldId(1));
        manager.add_ability(TestUser::handle(1, 1), Probe::boxed(&blast, &log, Behavior::Continue).with_colliders(vec![sphere(0.0)])).unwrap();
        manager.add_ability(TestUser::handle(2, 1), Probe::boxed(&shield, &log, Behavior::Continue).with_colliders(vec![sphere(1.0)])).unwrap();
        manager.add_ability(TestUser::handle(3, 1), Probe::boxed(&wall, &log, Behavior::Continue).with_colliders(vec![sphere(-1.0)])).unwrap();
        manager.update();

        let mut collisions = CollisionManager::new();
        collisions.register_all([
            RegisteredCollision::new(blast.clone(), shield, false, false),
            RegisteredCollision::new(blast, wall, false, false),
        ]).unwrap();

        assert_eq!(collisions.run(&mut manager), 2);
        assert_eq!(log.collider_queries("FireBlast"), 1);
    }

    #[test]
    fn test_handler_can_cancel_removal() {
        let log = ProbeLog::default();
        let blast = probe_type("FireBlast");
        let shield = probe_type("AirShield");
        let mut manager = AbilityManager::new(WorldId(1));
        let a = manager.add_ability(TestUser::handle(1, 1), Probe::boxed(&blast, &log, Behavior::Continue).with_colliders(vec![sphere(0.0)])).unwrap();
        let b = manager.add_ability(
            TestUser::handle(2, 1),
            Probe::boxed(&shield, &log, Behavior::Continue)
                .with_colliders(vec![sphere(1.0)])
                .sparing_other(),
        ).unwrap();
        manager.update();

        let mut collisions = CollisionManager::new();
        collisions.register_collision(RegisteredCollision::new(blast, shield, true, false)).unwrap();
        collisions.run(&mut manager);

        assert!(manager.get(a).is_some());
        assert!(manager.get(b).is_some());
    }

    #[test]
    fn test_second_handler_sees_first_handlers_changes() {
        let log = ProbeLog::default();
        let blast = probe_type("FireBlast");
        let shield = probe_type("AirShield");
        let mut manager = AbilityManager::new(WorldId(1));
        let a = manager.add_ability(
            TestUser::handle(1, 1),
            Probe::boxed(&blast, &log, Behavior::Continue)
                .with_colliders(vec![sphere(0.0)])
                .sparing_self(),
        ).unwrap();
        let b = manager.add_ability(TestUser::handle(2, 1), Probe::boxed(&shield, &log, Behavior::Continue).with_colliders(vec![sphere(1.0)])).unwrap();
        manager.update();

        let mut collisions = CollisionManager::new();
        collisions.register_collision(RegisteredCollision::new(blast, shield, true, false)).unwrap();
        assert_eq!(collisions.run(&mut manager), 1);

        let first_views = log.seen("FireBlast");
        assert!(first_views[0].remove_self);
        assert!(!first_views[0].remove_other);
        let second_views = log.seen("AirShield");
        assert_eq!(second_views[0].other, "FireBlast");
        assert!(!second_views[0].remove_self);
        assert!(!second_views[0].remove_other);
        assert!(manager.get(a).is_some());
        assert!(manager.get(b).is_some());
    }

    #[test]
    fn test_panicking_handler_is_removed() {
        let log = ProbeLog::default();
        let blast = probe_type("FireBlast");
        let shield = probe_type("AirShield");
        let mut manager = AbilityManager::new(WorldId(1));
        let a = manager.add_ability(TestUser::handle(1, 1), Probe::boxed(&blast, &log, Behavior::Continue).with_colliders(vec![sphere(0.0)])).unwrap();
        let b = manager.add_ability(
            TestUser::handle(2, 1),
            Probe::boxed(&shield, &log, Behavior::Continue)
                .with_colliders(vec![sphere(1.0)])
                .panicking_on_collision(),
        ).unwrap();
        manager.update();

        let mut collisions = CollisionManager::new();
        collisions.register_collision(RegisteredCollision::new(blast, shield, false, false)).unwrap();
        assert_eq!(collisions.run(&mut manager), 1);

        assert!(manager.get(a).is_some());
        assert!(manager.get(b).is_none());
        assert_eq!(log.destroys("AirShield"), 1);
    }
}
