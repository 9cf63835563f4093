//! Primitive collision volumes and their intersection algorithms
//!
//! Spheres, axis-aligned boxes and rays. Every type is an immutable value:
//! translation returns a new volume, nothing mutates in place.
//!
//! Algorithms follow "Real-Time Collision Detection" (Ericson), chapters 4 and 5.

use crate::foundation::math::{self, Vec3, EPSILON};

/// A sphere volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere (never negative)
    pub radius: f64,
}

impl Sphere {
    /// Creates a new sphere; negative radii are clamped to zero
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    /// Same sphere centered at `point`
    pub fn at(&self, point: Vec3) -> Self {
        Self::new(point, self.radius)
    }

    /// Half extents of the bounding box
    pub fn half_extents(&self) -> Vec3 {
        Vec3::repeat(self.radius)
    }

    /// Point containment, tolerant by [`EPSILON`] at the surface
    pub fn contains(&self, point: &Vec3) -> bool {
        let r = self.radius + EPSILON;
        (point - self.center).norm_squared() <= r * r
    }

    /// Exact point containment used by the narrow phase
    pub(crate) fn contains_exact(&self, point: &Vec3) -> bool {
        (point - self.center).norm_squared() <= self.radius * self.radius
    }

    /// Two spheres touch when their centers are no further apart than the sum of radii
    pub fn intersects_sphere(&self, other: &Sphere) -> bool {
        let radius_sum = self.radius + other.radius;
        (self.center - other.center).norm_squared() <= radius_sum * radius_sum
    }
}

/// An axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from two opposite corners in any order
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Create an AABB centered at a point with the given half extents
    pub fn from_center_extents(center: Vec3, half_extents: Vec3) -> Self {
        let e = math::abs(&half_extents);
        Self {
            min: center - e,
            max: center + e,
        }
    }

    /// The sentinel "no geometry" box; never intersects anything
    pub fn dummy() -> Self {
        Self {
            min: Vec3::zeros(),
            max: Vec3::zeros(),
        }
    }

    /// Whether this is the [`Aabb::dummy`] sentinel
    pub fn is_dummy(&self) -> bool {
        *self == Self::dummy()
    }

    /// Center of the box
    pub fn position(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Same box re-centered at `point`
    pub fn at(&self, point: Vec3) -> Self {
        Self::from_center_extents(point, self.half_extents())
    }

    /// Half size along each axis
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Point containment, tolerant by [`EPSILON`] at the faces
    pub fn contains(&self, point: &Vec3) -> bool {
        let pad = Vec3::repeat(EPSILON);
        let lo = self.min - pad;
        let hi = self.max + pad;
        (0..3).all(|i| point[i] >= lo[i] && point[i] <= hi[i])
    }

    /// Closest point on or in the box to `point`
    pub fn closest_point(&self, point: &Vec3) -> Vec3 {
        math::clamp(point, &self.min, &self.max)
    }

    /// Strict overlap on all three axes; boxes that only share a face do not intersect
    pub fn intersects_aabb(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.max[i] > other.min[i] && self.min[i] < other.max[i])
    }

    /// Clamp the sphere center into the box and test that point against the sphere
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        sphere.contains_exact(&self.closest_point(&sphere.center))
    }
}

/// A ray for ray casting and beam-like abilities
///
/// `direction` is kept as given: its length is the reach of the ray, used by
/// [`Ray::contains`] and [`Ray::half_extents`]. Intersection tests treat the
/// ray as its supporting line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// Direction and reach of the ray
    pub direction: Vec3,
    /// Per-axis inverse direction; `f64::MAX` where the inverse would not be finite
    inv: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let inv = direction.map(|d| {
            let inv = 1.0 / d;
            if inv.is_finite() { inv } else { f64::MAX }
        });
        Self { origin, direction, inv }
    }

    /// Per-axis inverse direction used by the slab test
    pub fn inv(&self) -> Vec3 {
        self.inv
    }

    /// Same ray starting at `point`
    pub fn at(&self, point: Vec3) -> Self {
        Self { origin: point, ..*self }
    }

    /// Half extents of the box spanned by the ray segment
    pub fn half_extents(&self) -> Vec3 {
        math::abs(&self.direction) * 0.5
    }

    /// Whether `point` lies on the segment `origin..origin + direction`
    pub fn contains(&self, point: &Vec3) -> bool {
        let to_point = point - self.origin;
        let length_sq = self.direction.norm_squared();
        if length_sq == 0.0 {
            return to_point.norm_squared() <= EPSILON * EPSILON;
        }
        let t = to_point.dot(&self.direction) / length_sq;
        if !(0.0..=1.0).contains(&t) {
            return false;
        }
        (to_point - self.direction * t).norm_squared() <= EPSILON * EPSILON
    }

    /// Discriminant test `b² - (m·m - r²) >= 0` with `m = origin - center`, `b = m·d`
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let m = self.origin - sphere.center;
        let c = m.norm_squared() - sphere.radius * sphere.radius;
        match self.direction.try_normalize(0.0) {
            Some(d) => {
                let b = m.dot(&d);
                b * b - c >= 0.0
            }
            None => c <= 0.0,
        }
    }

    /// Slab method over the precomputed inverse direction
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if self.direction == Vec3::zeros() {
            return (0..3).all(|i| self.origin[i] >= aabb.min[i] && self.origin[i] <= aabb.max[i]);
        }
        let t0 = (aabb.min - self.origin).component_mul(&self.inv);
        let t1 = (aabb.max - self.origin).component_mul(&self.inv);
        t0.inf(&t1).max() <= t0.sup(&t1).min()
    }

    /// Parallel rays meet when one segment contains the other's origin,
    /// otherwise the supporting lines meet when they are coplanar
    pub fn intersects_ray(&self, other: &Ray) -> bool {
        let cross = self.direction.cross(&other.direction);
        if cross.norm_squared() < EPSILON {
            return self.contains(&other.origin) || other.contains(&self.origin);
        }
        let planar_factor = (other.origin - self.origin).dot(&cross);
        planar_factor.abs() < EPSILON
    }
}
