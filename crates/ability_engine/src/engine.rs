//! Engine context
//!
//! The engine is the explicit context a host builds once at startup: it
//! holds the configuration, the ability registry, the collision
//! registrations, and one [`WorldContext`] per world.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::ability::{
    Ability, AbilityDescription, AbilityManager, AbilityRegistry, Activation, InstanceKey,
    RegistryError, TickStats, User, UserHandle, WorldId,
};
use crate::config::{Config, ConfigError, EngineConfig};
use crate::physics::{CollisionError, CollisionManager, RegisteredCollision};

/// Engine setup errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded or resolved
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// A collision registration was rejected
    #[error("collision registration: {0}")]
    Collision(#[from] CollisionError),

    /// An ability name is unknown or duplicated
    #[error("ability registry: {0}")]
    Registry(#[from] RegistryError),
}

/// Scheduler and collision pass of one world
pub struct WorldContext {
    abilities: AbilityManager,
    collisions: CollisionManager,
}

impl WorldContext {
    fn new(world: WorldId, collisions: CollisionManager) -> Self {
        Self {
            abilities: AbilityManager::new(world),
            collisions,
        }
    }

    /// The world's scheduler
    pub fn abilities(&self) -> &AbilityManager {
        &self.abilities
    }

    /// The world's scheduler, mutably
    pub fn abilities_mut(&mut self) -> &mut AbilityManager {
        &mut self.abilities
    }

    /// The world's collision registrations
    pub fn collisions(&self) -> &CollisionManager {
        &self.collisions
    }

    /// Run the update pass, then the collision pass if `collide` is set
    pub fn tick(&mut self, collide: bool) -> WorldTick {
        let stats = self.abilities.update();
        let collisions = if collide {
            self.collisions.run(&mut self.abilities)
        } else {
            0
        };
        WorldTick { stats, collisions }
    }
}

/// Outcome of one tick in one world
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldTick {
    /// Update pass counters
    pub stats: TickStats,
    /// Collisions delivered
    pub collisions: usize,
}

/// Outcome of one [`Engine::tick`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Engine tick number
    pub tick: u64,
    /// Per-world results
    pub worlds: BTreeMap<WorldId, WorldTick>,
}

impl TickReport {
    /// Counters summed over all worlds
    pub fn totals(&self) -> WorldTick {
        self.worlds.values().fold(WorldTick::default(), |mut total, world| {
            total.stats.updated += world.stats.updated;
            total.stats.removed += world.stats.removed;
            total.stats.faulted += world.stats.faulted;
            total.stats.updatables += world.stats.updatables;
            total.collisions += world.collisions;
            total
        })
    }
}

/// Owner of every world's simulation state
pub struct Engine {
    config: EngineConfig,
    registry: AbilityRegistry,
    /// Registrations cloned into each new world
    collisions: CollisionManager,
    worlds: BTreeMap<WorldId, WorldContext>,
    tick: u64,
}

impl Engine {
    /// Build an engine, resolving configured collisions against `registry`
    pub fn new(config: EngineConfig, registry: AbilityRegistry) -> Result<Self, EngineError> {
        let mut collisions = CollisionManager::new();
        collisions.register_all(config.collisions.resolve(&registry)?)?;
        log::info!(
            "Engine ready: {} ability types, {} collision pairs, {} ticks/s",
            registry.len(),
            collisions.registrations().len(),
            config.simulation.tick_rate
        );
        Ok(Self {
            config,
            registry,
            collisions,
            worlds: BTreeMap::new(),
            tick: 0,
        })
    }

    /// Build an engine from a `.toml` or `.ron` configuration file
    pub fn from_file(path: impl AsRef<Path>, registry: AbilityRegistry) -> Result<Self, EngineError> {
        Self::new(EngineConfig::load_from_file(path)?, registry)
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered ability types
    pub fn registry(&self) -> &AbilityRegistry {
        &self.registry
    }

    /// Collision registrations shared by all worlds
    pub fn collisions(&self) -> &CollisionManager {
        &self.collisions
    }

    /// Number of ticks run
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Add a collision registration to every world
    pub fn register_collision(&mut self, registration: RegisteredCollision) -> Result<(), EngineError> {
        self.collisions.register_collision(registration.clone())?;
        for world in self.worlds.values_mut() {
            world.collisions.register_collision(registration.clone())?;
        }
        Ok(())
    }

    /// An existing world
    pub fn world(&self, world: WorldId) -> Option<&WorldContext> {
        self.worlds.get(&world)
    }

    /// A world, created on first use
    pub fn world_mut(&mut self, world: WorldId) -> &mut WorldContext {
        let collisions = &self.collisions;
        self.worlds.entry(world).or_insert_with(|| {
            log::debug!("Created context for {world}");
            WorldContext::new(world, collisions.clone())
        })
    }

    /// Ids of all loaded worlds
    pub fn worlds(&self) -> impl Iterator<Item = WorldId> + '_ {
        self.worlds.keys().copied()
    }

    /// Queue an activated instance in its user's world
    pub fn add_ability(&mut self, user: UserHandle, ability: Box<dyn Ability>) -> Option<InstanceKey> {
        self.world_mut(user.world()).abilities.add_ability(user, ability)
    }

    /// Activate an ability type by name for `user`
    ///
    /// Returns `None` for unknown names, ineligible users and declined
    /// activations.
    pub fn activate(&mut self, user: &UserHandle, name: &str, method: Activation) -> Option<InstanceKey> {
        let description: Arc<AbilityDescription> = Arc::clone(self.registry.get(name)?);
        if !description.is_activated_by(method) || !user.can_activate(&description) {
            return None;
        }
        self.world_mut(user.world())
            .abilities
            .activate_ability(user, &description, method)
    }

    /// Recreate the passives of `user` in its world
    pub fn create_passives(&mut self, user: &UserHandle) -> usize {
        let Self { registry, worlds, collisions, .. } = self;
        worlds
            .entry(user.world())
            .or_insert_with(|| WorldContext::new(user.world(), collisions.clone()))
            .abilities
            .create_passives(user, registry)
    }

    /// Run one tick in every world
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let collide = self.config.simulation.collisions_enabled;
        let worlds = self
            .worlds
            .iter_mut()
            .map(|(&id, world)| (id, world.tick(collide)))
            .collect();
        let report = TickReport { tick: self.tick, worlds };
        log::trace!("Tick {}: {:?}", self.tick, report.totals());
        report
    }

    /// Tear down everything `user` owns
    pub fn disconnect(&mut self, user: &dyn User) -> usize {
        self.worlds
            .get_mut(&user.world())
            .map_or(0, |world| world.abilities.destroy_user_instances(user.id()))
    }

    /// Destroy every instance in `world` and drop its context
    pub fn unload_world(&mut self, world: WorldId) -> usize {
        let Some(mut context) = self.worlds.remove(&world) else {
            return 0;
        };
        let destroyed = context.abilities.destroy_all_instances();
        log::debug!("Unloaded {world} ({destroyed} instances destroyed)");
        destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::UserId;
    use crate::tests::fixtures::{probe_type, Behavior, Probe, ProbeLog, TestUser};

    fn registry() -> AbilityRegistry {
        let mut registry = AbilityRegistry::new();
        registry
            .register(
                AbilityDescription::builder("FireBlast", Probe::factory)
                    .activation(Activation::ATTACK)
                    .build(),
            )
            .unwrap();
        registry
            .register(
                AbilityDescription::builder("GracefulDescent", Probe::factory)
                    .activation(Activation::PASSIVE)
                    .build(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_worlds_are_isolated() {
        let log = ProbeLog::default();
        let desc = probe_type("FireBlast");
        let mut engine = Engine::new(EngineConfig::default(), registry()).unwrap();
        engine.add_ability(TestUser::handle(1, 1), Probe::boxed(&desc, &log, Behavior::Continue)).unwrap();
        engine.add_ability(TestUser::handle(2, 2), Probe::boxed(&desc, &log, Behavior::Continue)).unwrap();

        let report = engine.tick();
        assert_eq!(report.tick, 1);
        assert_eq!(report.worlds.len(), 2);
        assert_eq!(report.totals().stats.updated, 2);
        assert_eq!(engine.world(WorldId(1)).unwrap().abilities().size(), 1);
    }

    #[test]
    fn test_activate_by_name() {
        let mut engine = Engine::new(EngineConfig::default(), registry()).unwrap();
        let user = TestUser::handle(1, 1);

        assert!(engine.activate(&user, "FireBlast", Activation::ATTACK).is_some());
        assert!(engine.activate(&user, "FireBlast", Activation::SNEAK).is_none());
        assert!(engine.activate(&user, "WaterSpout", Activation::ATTACK).is_none());
        assert_eq!(engine.create_passives(&user), 1);
        assert_eq!(engine.world(WorldId(1)).unwrap().abilities().pending_len(), 2);
    }

    #[test]
    fn test_disconnect_and_unload() {
        let log = ProbeLog::default();
        let desc = probe_type("FireBlast");
        let alice = TestUser::handle(1, 1);
        let bob = TestUser::handle(2, 1);
        let mut engine = Engine::new(EngineConfig::default(), registry()).unwrap();
        engine.add_ability(alice.clone(), Probe::boxed(&desc, &log, Behavior::Continue)).unwrap();
        engine.add_ability(bob.clone(), Probe::boxed(&desc, &log, Behavior::Continue)).unwrap();
        engine.tick();

        assert_eq!(engine.disconnect(alice.as_ref()), 1);
        assert_eq!(engine.world(WorldId(1)).unwrap().abilities().user_instances(UserId(2)).count(), 1);
        assert_eq!(engine.unload_world(WorldId(1)), 1);
        assert!(engine.world(WorldId(1)).is_none());
        assert_eq!(log.destroys("FireBlast"), 2);
        assert_eq!(engine.disconnect(bob.as_ref()), 0);
    }

    #[test]
    fn test_unknown_configured_ability_fails_setup() {
        let mut config = EngineConfig::default();
        config.collisions.layers = vec![vec!["WaterSpout".into()]];
        let err = Engine::new(config, registry()).err().unwrap();
        assert!(matches!(err, EngineError::Config(ConfigError::Registry(_))));
    }

    #[test]
    fn test_registration_reaches_existing_worlds() {
        let mut engine = Engine::new(EngineConfig::default(), registry()).unwrap();
        engine.world_mut(WorldId(7));
        let blast = Arc::clone(engine.registry().require("FireBlast").unwrap());
        engine
            .register_collision(RegisteredCollision::new(Arc::clone(&blast), blast, true, true))
            .unwrap();
        assert_eq!(engine.world(WorldId(7)).unwrap().collisions().registrations().len(), 1);
        assert_eq!(engine.collisions().registrations().len(), 1);
    }
}
