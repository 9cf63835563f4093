//! Collider geometry
//!
//! Immutable collision volumes and the narrow-phase intersection tests
//! between them.
//!
//! # Module Organization
//!
//! - [`primitives`] - Spheres, axis-aligned boxes and rays
//! - [`oriented`] - Oriented boxes and disks
//! - [`shape`] - The [`Collider`] sum type with its pairwise dispatch
//!
//! # Boundary policy
//!
//! `contains` is tolerant by a small epsilon at exact boundaries.
//! `intersects` is not: box faces that only touch do not intersect, while
//! spheres at exactly the sum of their radii do.

pub mod primitives;
pub mod oriented;
pub mod shape;

// Re-export commonly used types
pub use primitives::{Aabb, Ray, Sphere};
pub use oriented::{Disk, Obb};
pub use shape::Collider;
