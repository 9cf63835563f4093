//! Per-world ability scheduler
//!
//! The manager owns every instance in one world and runs them as a
//! two-phase tick:
//!
//! 1. merge the pending queues into the live sets
//! 2. update every live [`Updatable`], then every live instance, collecting
//!    removals instead of mutating
//! 3. detach the collected instances and call `on_destroy` on each
//!
//! Nothing added during a tick (from outside or from inside an `update()`
//! call) becomes live before the next tick.

use std::collections::HashMap;
use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};

use crate::physics::collision::Collider;
use crate::physics::collision_system::Collision;
use super::description::{AbilityDescription, Activation};
use super::instance::{
    isolate, Ability, AbilityState, Spawn, Updatable, UpdateContext, UpdateResult,
};
use super::registry::AbilityRegistry;
use super::user::{UserHandle, UserId, WorldId};

new_key_type! {
    /// Handle to an instance owned by an [`AbilityManager`]
    pub struct InstanceKey;
}

struct Entry {
    owner: UserHandle,
    state: AbilityState,
    ability: Box<dyn Ability>,
}

/// Identity of a live instance, captured for the collision pass
pub(crate) struct LiveInstance {
    pub(crate) key: InstanceKey,
    pub(crate) owner: UserId,
    pub(crate) ability: Arc<AbilityDescription>,
}

/// Counters for one [`AbilityManager::update`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Instances whose `update()` was called
    pub updated: usize,
    /// Instances destroyed at the end of the pass
    pub removed: usize,
    /// Instances and updatables that returned an error or panicked
    pub faulted: usize,
    /// Updatables whose `update()` was called
    pub updatables: usize,
}

/// Scheduler for all ability instances of one world
///
/// Instances are owned here for their whole life. Users reach them only
/// through the query methods, by [`InstanceKey`].
pub struct AbilityManager {
    world: WorldId,
    instances: SlotMap<InstanceKey, Entry>,
    /// Live keys in insertion order
    order: Vec<InstanceKey>,
    /// Live keys per owner
    by_user: HashMap<UserId, Vec<InstanceKey>>,
    /// Activated instances waiting for the next tick
    pending: Vec<InstanceKey>,
    updatables: Vec<Box<dyn Updatable>>,
    /// Updatables waiting for the next tick
    pending_updatables: Vec<Box<dyn Updatable>>,
    tick: u64,
}

impl AbilityManager {
    /// Create an empty manager for `world`
    pub fn new(world: WorldId) -> Self {
        Self {
            world,
            instances: SlotMap::with_key(),
            order: Vec::new(),
            by_user: HashMap::new(),
            pending: Vec::new(),
            updatables: Vec::new(),
            pending_updatables: Vec::new(),
            tick: 0,
        }
    }

    /// World this manager schedules
    pub fn world(&self) -> WorldId {
        self.world
    }

    /// Number of completed update passes
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Queue an activated instance for the next tick
    ///
    /// Returns `None` when the user is in another world; the instance is
    /// then destroyed immediately.
    pub fn add_ability(&mut self, user: UserHandle, mut ability: Box<dyn Ability>) -> Option<InstanceKey> {
        if user.world() != self.world {
            log::warn!(
                "Rejected {} for {}: user is in {}, manager schedules {}",
                ability.description(),
                user.id(),
                user.world(),
                self.world
            );
            destroy_isolated(ability.as_mut());
            return None;
        }
        let key = self.instances.insert(Entry {
            owner: user,
            state: AbilityState::Activating,
            ability,
        });
        self.pending.push(key);
        Some(key)
    }

    /// Create an instance of `description` and activate it for `user`
    ///
    /// Declined activations are dropped silently.
    pub fn activate_ability(
        &mut self,
        user: &UserHandle,
        description: &Arc<AbilityDescription>,
        method: Activation,
    ) -> Option<InstanceKey> {
        let mut ability = description.create_ability();
        if ability.activate(UserHandle::clone(user), method) {
            self.add_ability(UserHandle::clone(user), ability)
        } else {
            None
        }
    }

    /// Queue an effect that ticks until it returns [`UpdateResult::Remove`]
    ///
    /// Like abilities, it first runs on the next tick.
    pub fn add_updatable(&mut self, updatable: Box<dyn Updatable>) {
        self.pending_updatables.push(updatable);
    }

    /// Run one tick
    pub fn update(&mut self) -> TickStats {
        self.tick += 1;
        self.merge_pending();

        let mut stats = TickStats::default();
        self.update_updatables(&mut stats);

        let mut spawns: Vec<Spawn> = Vec::new();
        let mut removals = Vec::new();

        for &key in &self.order {
            let Some(entry) = self.instances.get_mut(key) else {
                continue;
            };
            stats.updated += 1;
            let mut ctx = UpdateContext::new(self.tick, &mut spawns, &mut self.pending_updatables);
            let ability = &mut entry.ability;
            let failure = match isolate(|| ability.update(&mut ctx)) {
                Ok(Ok(UpdateResult::Continue)) => continue,
                Ok(Ok(UpdateResult::Remove)) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(panic) => Some(format!("panicked: {panic}")),
            };
            if let Some(reason) = failure {
                log::error!(
                    "{} of {} failed during tick {}: {reason}",
                    entry.ability.description(),
                    entry.owner.id(),
                    self.tick
                );
                stats.faulted += 1;
            }
            removals.push(key);
        }

        stats.removed = self.destroy_keys(&removals);
        for spawn in spawns {
            self.add_ability(spawn.owner, spawn.ability);
        }

        log::trace!(
            "{} tick {}: updatables {}, updated {}, removed {}, faulted {}, pending {}",
            self.world,
            self.tick,
            stats.updatables,
            stats.updated,
            stats.removed,
            stats.faulted,
            self.pending.len()
        );
        stats
    }

    fn update_updatables(&mut self, stats: &mut TickStats) {
        let tick = self.tick;
        let world = self.world;
        self.updatables.retain_mut(|updatable| {
            stats.updatables += 1;
            match isolate(|| updatable.update()) {
                Ok(UpdateResult::Continue) => true,
                Ok(UpdateResult::Remove) => false,
                Err(panic) => {
                    log::error!("Updatable in {world} panicked during tick {tick}: {panic}");
                    stats.faulted += 1;
                    false
                }
            }
        });
    }

    fn merge_pending(&mut self) {
        self.updatables.append(&mut self.pending_updatables);
        for key in std::mem::take(&mut self.pending) {
            if let Some(entry) = self.instances.get_mut(key) {
                entry.state = AbilityState::Active;
                self.by_user.entry(entry.owner.id()).or_default().push(key);
                self.order.push(key);
            }
        }
    }

    // Queries over the live set

    /// Number of live instances
    pub fn size(&self) -> usize {
        self.order.len()
    }

    /// Number of instances waiting for the next tick
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of live updatables, not counting queued ones
    pub fn updatable_len(&self) -> usize {
        self.updatables.len()
    }

    /// Keys of all live instances in insertion order
    pub fn keys(&self) -> impl Iterator<Item = InstanceKey> + '_ {
        self.order.iter().copied()
    }

    /// All live instances in insertion order
    pub fn instances(&self) -> impl Iterator<Item = &dyn Ability> + '_ {
        self.live(&self.order)
    }

    /// Live instances owned by `user`
    pub fn user_instances(&self, user: UserId) -> impl Iterator<Item = &dyn Ability> + '_ {
        self.live(self.user_keys(user))
    }

    /// Live instances of one ability type
    pub fn instances_of<'a>(
        &'a self,
        description: &'a AbilityDescription,
    ) -> impl Iterator<Item = &'a dyn Ability> + 'a {
        self.instances()
            .filter(move |ability| is_instance_of(*ability, description))
    }

    /// Live instances of one ability type owned by `user`
    pub fn user_instances_of<'a>(
        &'a self,
        user: UserId,
        description: &'a AbilityDescription,
    ) -> impl Iterator<Item = &'a dyn Ability> + 'a {
        self.user_instances(user)
            .filter(move |ability| is_instance_of(*ability, description))
    }

    /// Oldest live instance of one ability type owned by `user`
    pub fn first_instance<'a>(
        &'a self,
        user: UserId,
        description: &'a AbilityDescription,
    ) -> Option<&'a dyn Ability> {
        self.user_instances_of(user, description).next()
    }

    /// Whether `user` has an instance of the type, live or pending
    ///
    /// Sees instances added earlier in the same tick, so an ability can
    /// check for an existing copy of itself before activating.
    pub fn has_ability(&self, user: UserId, description: &AbilityDescription) -> bool {
        self.user_keys(user)
            .iter()
            .chain(&self.pending)
            .filter_map(|&key| self.instances.get(key))
            .any(|entry| entry.owner.id() == user && is_instance_of(entry.ability.as_ref(), description))
    }

    /// A live instance
    pub fn get(&self, key: InstanceKey) -> Option<&dyn Ability> {
        self.instances
            .get(key)
            .filter(|entry| entry.state == AbilityState::Active)
            .map(|entry| entry.ability.as_ref())
    }

    /// A live instance, mutably
    pub fn get_mut(&mut self, key: InstanceKey) -> Option<&mut dyn Ability> {
        match self.instances.get_mut(key) {
            Some(entry) if entry.state == AbilityState::Active => Some(entry.ability.as_mut()),
            _ => None,
        }
    }

    /// Owner of a live or pending instance
    pub fn owner(&self, key: InstanceKey) -> Option<&UserHandle> {
        self.instances.get(key).map(|entry| &entry.owner)
    }

    /// Lifecycle state; pending instances report `Activating`
    pub fn state(&self, key: InstanceKey) -> Option<AbilityState> {
        self.instances.get(key).map(|entry| entry.state)
    }

    fn user_keys(&self, user: UserId) -> &[InstanceKey] {
        self.by_user.get(&user).map_or(&[], Vec::as_slice)
    }

    fn live<'a>(&'a self, keys: &'a [InstanceKey]) -> impl Iterator<Item = &'a dyn Ability> + 'a {
        keys.iter()
            .filter_map(|&key| self.instances.get(key))
            .map(|entry| entry.ability.as_ref())
    }

    // Eager teardown, for use outside the update pass

    /// Destroy one instance, live or pending
    pub fn destroy_instance(&mut self, key: InstanceKey) -> bool {
        self.destroy_keys(&[key]) == 1
    }

    /// Destroy the instances of `user` that match `predicate`
    pub fn destroy_user_instances_where<F>(&mut self, user: UserId, mut predicate: F) -> usize
    where
        F: FnMut(&dyn Ability) -> bool,
    {
        let keys: Vec<InstanceKey> = self
            .user_keys(user)
            .iter()
            .chain(&self.pending)
            .copied()
            .filter(|&key| {
                self.instances
                    .get(key)
                    .is_some_and(|entry| entry.owner.id() == user && predicate(entry.ability.as_ref()))
            })
            .collect();
        self.destroy_keys(&keys)
    }

    /// Destroy every instance of one type owned by `user`
    pub fn destroy_instance_type(&mut self, user: UserId, description: &AbilityDescription) -> usize {
        self.destroy_user_instances_where(user, |ability| is_instance_of(ability, description))
    }

    /// Destroy every instance owned by `user`
    pub fn destroy_user_instances(&mut self, user: UserId) -> usize {
        let destroyed = self.destroy_user_instances_where(user, |_| true);
        if destroyed > 0 {
            log::debug!("Destroyed {destroyed} instances of {user} in {}", self.world);
        }
        destroyed
    }

    /// Destroy every instance in this world
    pub fn destroy_all_instances(&mut self) -> usize {
        let keys: Vec<InstanceKey> = self.order.iter().chain(&self.pending).copied().collect();
        let destroyed = self.destroy_keys(&keys);
        self.updatables.clear();
        self.pending_updatables.clear();
        log::debug!("Destroyed all {destroyed} instances in {}", self.world);
        destroyed
    }

    fn destroy_keys(&mut self, keys: &[InstanceKey]) -> usize {
        let mut detached = Vec::with_capacity(keys.len());
        for &key in keys {
            let Some(mut entry) = self.instances.remove(key) else {
                continue;
            };
            match entry.state {
                AbilityState::Active => {
                    let owner = entry.owner.id();
                    if let Some(owned) = self.by_user.get_mut(&owner) {
                        owned.retain(|&k| k != key);
                        if owned.is_empty() {
                            self.by_user.remove(&owner);
                        }
                    }
                }
                AbilityState::Activating => self.pending.retain(|&k| k != key),
                AbilityState::Destroyed => {}
            }
            entry.state = AbilityState::Destroyed;
            detached.push(entry);
        }
        if !detached.is_empty() {
            let instances = &self.instances;
            self.order.retain(|&key| instances.contains_key(key));
        }
        for entry in &mut detached {
            destroy_isolated(entry.ability.as_mut());
        }
        detached.len()
    }

    // Ownership and passives

    /// Hand a live instance to another user in the same world
    pub fn change_owner(&mut self, key: InstanceKey, user: UserHandle) -> bool {
        if user.world() != self.world {
            log::warn!("Cannot move instance to {}: not in {}", user.id(), self.world);
            return false;
        }
        let Some(entry) = self.instances.get_mut(key) else {
            return false;
        };
        let previous = entry.owner.id();
        if entry.state != AbilityState::Active || previous == user.id() {
            return false;
        }

        if let Some(owned) = self.by_user.get_mut(&previous) {
            owned.retain(|&k| k != key);
            if owned.is_empty() {
                self.by_user.remove(&previous);
            }
        }
        self.by_user.entry(user.id()).or_default().push(key);
        entry.owner = UserHandle::clone(&user);

        let ability = &mut entry.ability;
        if let Err(panic) = isolate(|| ability.on_user_change(user)) {
            log::error!("{} panicked while changing owner: {panic}", entry.ability.description());
        }
        true
    }

    /// Recreate every passive ability `user` is permitted to use
    ///
    /// Existing passive instances of the user are replaced.
    pub fn create_passives(&mut self, user: &UserHandle, registry: &AbilityRegistry) -> usize {
        if user.world() != self.world {
            return 0;
        }
        let mut created = 0;
        for passive in registry.passives() {
            self.destroy_instance_type(user.id(), passive);
            if user.has_permission(passive)
                && self.activate_ability(user, passive, Activation::PASSIVE).is_some()
            {
                created += 1;
            }
        }
        created
    }

    /// Destroy every passive instance owned by `user`
    pub fn clear_passives(&mut self, user: UserId) -> usize {
        self.destroy_user_instances_where(user, |ability| {
            ability.description().is_activated_by(Activation::PASSIVE)
        })
    }

    // Hooks for the collision pass

    /// Owner and type of every live instance
    pub(crate) fn snapshot(&self) -> Vec<LiveInstance> {
        self.order
            .iter()
            .filter_map(|&key| {
                self.instances.get(key).map(|entry| LiveInstance {
                    key,
                    owner: entry.owner.id(),
                    ability: Arc::clone(entry.ability.description()),
                })
            })
            .collect()
    }

    /// Colliders of a live instance; a panicking producer yields none
    pub(crate) fn colliders_of(&self, key: InstanceKey) -> Vec<Collider> {
        let Some(entry) = self.instances.get(key) else {
            return Vec::new();
        };
        isolate(|| entry.ability.colliders()).unwrap_or_else(|panic| {
            log::error!("{} panicked producing colliders: {panic}", entry.ability.description());
            Vec::new()
        })
    }

    /// Deliver a collision; returns false if the handler panicked
    pub(crate) fn notify_collision(&mut self, key: InstanceKey, collision: &mut Collision) -> bool {
        let Some(entry) = self.instances.get_mut(key) else {
            return true;
        };
        let ability = &mut entry.ability;
        match isolate(|| ability.on_collision(collision)) {
            Ok(()) => true,
            Err(panic) => {
                log::error!("{} panicked handling a collision: {panic}", entry.ability.description());
                false
            }
        }
    }
}

fn is_instance_of(ability: &dyn Ability, description: &AbilityDescription) -> bool {
    **ability.description() == *description
}

fn destroy_isolated(ability: &mut dyn Ability) {
    if let Err(panic) = isolate(|| ability.on_destroy()) {
        log::error!("{} panicked while being destroyed: {panic}", ability.description());
    }
}
