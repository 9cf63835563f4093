//! # Ability Engine
//!
//! Real-time simulation core for a multiplayer ability system: a per-world
//! tick scheduler for short-lived ability state machines, and a collision
//! pass that detects and resolves hits between the volumes they occupy.
//!
//! ## Features
//!
//! - **Two-phase ticks**: additions and removals never touch the live set mid-pass
//! - **Fault isolation**: a failing or panicking ability is removed, the tick goes on
//! - **Collider geometry**: spheres, boxes, oriented boxes (SAT), rays and disks
//! - **Collision policies**: registered type pairs with per-side removal flags
//! - **Configuration**: TOML or RON, with collision layers by ability name
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ability_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::load_from_file("arena.toml")?;
//!     ability_engine::foundation::logging::init_with_filter(&config.logging.filter);
//!
//!     let registry = AbilityRegistry::new();
//!     let mut engine = Engine::new(config, registry)?;
//!     let mut clock = TickClock::new(engine.config().simulation.tick_rate);
//!     loop {
//!         std::thread::sleep(clock.advance());
//!         engine.tick();
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod ability;
pub mod config;
pub mod engine;
pub mod foundation;
pub mod physics;

#[cfg(test)]
mod tests;

pub use engine::{Engine, EngineError, TickReport, WorldContext, WorldTick};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        ability::{
            Ability, AbilityDescription, AbilityError, AbilityManager, AbilityRegistry, Activation,
            InstanceKey, Updatable, UpdateContext, UpdateResult, User, UserHandle, UserId, WorldId,
        },
        config::{Config, EngineConfig},
        engine::{Engine, EngineError, TickReport},
        foundation::{
            math::{Quat, Vec3},
            time::TickClock,
        },
        physics::{
            Aabb, Collider, Collision, CollisionLayers, CollisionManager, Disk, Obb, Ray,
            RegisteredCollision, Sphere,
        },
    };
}
