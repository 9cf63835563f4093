//! Math utilities and types
//!
//! Ability geometry lives in world coordinates, which can be far from the
//! origin, so everything here is double precision.

pub use nalgebra::{Matrix3, Unit, UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// Rotation type
pub type Quat = UnitQuaternion<f64>;

/// Tolerance for point containment and ray coplanarity tests
pub const EPSILON: f64 = 0.01;

/// Padding added to the absolute rotation matrix in the OBB separating axis test.
/// Keeps near-parallel edge cross products from producing false separations.
pub const SAT_EPSILON: f64 = 1e-6;

/// Component-wise absolute value
pub fn abs(v: &Vec3) -> Vec3 {
    v.map(f64::abs)
}

/// Clamp each component of `point` into `[min, max]`
pub fn clamp(point: &Vec3, min: &Vec3, max: &Vec3) -> Vec3 {
    point.sup(min).inf(max)
}
