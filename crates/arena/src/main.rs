//! Headless ability arena
//!
//! Two scripted players duel in a single world while the engine runs at the
//! configured tick rate.
//!
//! ```text
//! arena [config.toml|config.ron] [ticks]
//! ```
//!
//! Without a path, the `arena.toml` shipped next to this crate's manifest is
//! loaded, whatever the working directory.

mod abilities;
mod players;

use std::rc::Rc;

use ability_engine::config::{CollisionPairConfig, ConfigError};
use ability_engine::foundation::logging;
use ability_engine::prelude::*;

use players::ArenaPlayer;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/arena.toml");
const DEFAULT_TICKS: u64 = 200;
const ARENA: WorldId = WorldId(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let ticks = match args.next() {
        Some(value) => value.parse::<u64>()?,
        None => DEFAULT_TICKS,
    };

    let (config, loaded) = match EngineConfig::load_from_file(&config_path) {
        Ok(config) => (config, true),
        Err(ConfigError::Io(_)) => (default_config(), false),
        Err(err) => return Err(err.into()),
    };
    logging::init_with_filter(&config.logging.filter);
    if loaded {
        log::info!("Loaded configuration from {config_path}");
    } else {
        log::warn!("No configuration at {config_path}, using built-in arena defaults");
    }

    let mut engine = Engine::new(config, abilities::registry()?)?;
    let alice = ArenaPlayer::spawn(1, ARENA, "alice", Vec3::new(-10.0, 0.0, 0.0), Vec3::x());
    let bob = ArenaPlayer::spawn(2, ARENA, "bob", Vec3::new(10.0, 0.0, 0.0), -Vec3::x());
    let players: [Rc<ArenaPlayer>; 2] = [Rc::clone(&alice), Rc::clone(&bob)];
    let handles: Vec<UserHandle> = players.iter().map(|p| Rc::clone(p) as UserHandle).collect();

    for (player, handle) in players.iter().zip(&handles) {
        let passives = engine.create_passives(handle);
        log::info!("{} joined {ARENA} facing {:?} with {passives} passives", player.name(), player.facing());
    }

    let mut clock = TickClock::new(engine.config().simulation.tick_rate);
    let mut collisions = 0;
    for _ in 0..ticks {
        std::thread::sleep(clock.advance());
        script(&mut engine, clock.tick(), &handles, &bob);
        let report = engine.tick();
        let totals = report.totals();
        collisions += totals.collisions;
        if totals.stats.faulted > 0 {
            log::warn!("Tick {}: {} abilities faulted", report.tick, totals.stats.faulted);
        }
    }

    let remaining = engine.world(ARENA).map_or(0, |world| world.abilities().size());
    log::info!(
        "Ran {} ticks in {:.2?}: {collisions} collisions, {remaining} abilities still active",
        engine.tick_count(),
        clock.elapsed()
    );
    engine.unload_world(ARENA);
    Ok(())
}

/// Scripted player input for one tick
fn script(engine: &mut Engine, tick: u64, handles: &[UserHandle], bob: &ArenaPlayer) {
    let [alice_handle, bob_handle] = handles else {
        return;
    };
    let cast = |engine: &mut Engine, user: &UserHandle, name: &str, method: Activation| {
        if engine.activate(user, name, method).is_none() {
            log::debug!("{name} declined for {}", user.id());
        }
    };
    match tick % 100 {
        2 => cast(engine, alice_handle, "FireBlast", Activation::ATTACK),
        4 => cast(engine, bob_handle, "AirShield", Activation::SNEAK),
        40 => cast(engine, bob_handle, "EarthBlast", Activation::SNEAK_RELEASE),
        44 => cast(engine, alice_handle, "Lightning", Activation::SEQUENCE),
        60 => cast(engine, alice_handle, "FireBlast", Activation::ATTACK),
        _ => {}
    }
    if tick == 150 {
        bob.leave();
        let destroyed = engine.disconnect(bob_handle.as_ref());
        log::info!("{} left the arena ({destroyed} abilities ended)", bob.name());
    }
}

/// Arena collisions used when no configuration file is present
fn default_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.collisions.layers = vec![
        vec!["FireBlast".into(), "EarthBlast".into()],
        vec!["AirShield".into()],
    ];
    config.collisions.pairs = vec![
        CollisionPairConfig {
            first: "Lightning".into(),
            second: "EarthBlast".into(),
            remove_first: false,
            remove_second: true,
        },
        CollisionPairConfig {
            first: "Lightning".into(),
            second: "AirShield".into(),
            remove_first: false,
            remove_second: true,
        },
    ];
    config
}
