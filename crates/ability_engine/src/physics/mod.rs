//! Ability collision detection
//!
//! Geometry lives in [`collision`]; [`collision_system`] runs the per-tick
//! pass over a world's instances and [`collision_layers`] declares which
//! ability types collide.

pub mod collision;
pub mod collision_layers;
pub mod collision_system;

pub use collision::{Aabb, Collider, Disk, Obb, Ray, Sphere};
pub use collision_layers::CollisionLayers;
pub use collision_system::{Collision, CollisionError, CollisionManager, CollisionParty, RegisteredCollision};
