//! The closed set of collider shapes and their pairwise dispatch

use crate::foundation::math::Vec3;
use super::oriented::{Disk, Obb};
use super::primitives::{Aabb, Ray, Sphere};

/// An immutable collision volume in world space
///
/// Abilities produce these every tick from their current geometry. The
/// narrow phase dispatches over every pair of variants in [`Collider::intersects`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    /// Sphere
    Sphere(Sphere),
    /// Axis-aligned box
    Aabb(Aabb),
    /// Oriented box
    Obb(Obb),
    /// Ray segment
    Ray(Ray),
    /// Box clipped by a sphere
    Disk(Disk),
}

impl Collider {
    /// The "no geometry" collider; intersects nothing, itself included
    pub fn dummy() -> Self {
        Self::Aabb(Aabb::dummy())
    }

    /// Whether this is the [`Collider::dummy`] sentinel
    pub fn is_dummy(&self) -> bool {
        matches!(self, Self::Aabb(aabb) if aabb.is_dummy())
    }

    /// Reference position of the volume
    pub fn position(&self) -> Vec3 {
        match self {
            Self::Sphere(sphere) => sphere.center,
            Self::Aabb(aabb) => aabb.position(),
            Self::Obb(obb) => obb.position(),
            Self::Ray(ray) => ray.origin,
            Self::Disk(disk) => disk.position(),
        }
    }

    /// Translated copy positioned at `point`
    pub fn at(&self, point: Vec3) -> Self {
        match self {
            Self::Sphere(sphere) => Self::Sphere(sphere.at(point)),
            Self::Aabb(aabb) => Self::Aabb(aabb.at(point)),
            Self::Obb(obb) => Self::Obb(obb.at(point)),
            Self::Ray(ray) => Self::Ray(ray.at(point)),
            Self::Disk(disk) => Self::Disk(disk.at(point)),
        }
    }

    /// World-space half extents of the volume's bounding box
    pub fn half_extents(&self) -> Vec3 {
        match self {
            Self::Sphere(sphere) => sphere.half_extents(),
            Self::Aabb(aabb) => aabb.half_extents(),
            Self::Obb(obb) => obb.half_extents(),
            Self::Ray(ray) => ray.half_extents(),
            Self::Disk(disk) => disk.half_extents(),
        }
    }

    /// Point containment with a small tolerance at the boundary
    pub fn contains(&self, point: &Vec3) -> bool {
        match self {
            Self::Sphere(sphere) => sphere.contains(point),
            Self::Aabb(aabb) => aabb.contains(point),
            Self::Obb(obb) => obb.contains(point),
            Self::Ray(ray) => ray.contains(point),
            Self::Disk(disk) => disk.contains(point),
        }
    }

    /// Symmetric intersection test
    ///
    /// Every mixed pair routes to one implementation regardless of argument
    /// order, so `a.intersects(b) == b.intersects(a)`.
    pub fn intersects(&self, other: &Collider) -> bool {
        if self.is_dummy() || other.is_dummy() {
            return false;
        }
        match (self, other) {
            (Self::Sphere(a), Self::Sphere(b)) => a.intersects_sphere(b),
            (Self::Aabb(a), Self::Aabb(b)) => a.intersects_aabb(b),
            (Self::Obb(a), Self::Obb(b)) => a.intersects_obb(b),
            (Self::Ray(a), Self::Ray(b)) => a.intersects_ray(b),
            (Self::Disk(a), Self::Disk(b)) => {
                a.sphere.intersects_sphere(&b.sphere) && a.obb.intersects_obb(&b.obb)
            }

            (Self::Aabb(aabb), Self::Sphere(sphere)) | (Self::Sphere(sphere), Self::Aabb(aabb)) => {
                aabb.intersects_sphere(sphere)
            }
            (Self::Obb(obb), Self::Sphere(sphere)) | (Self::Sphere(sphere), Self::Obb(obb)) => {
                obb.intersects_sphere(sphere)
            }
            (Self::Ray(ray), Self::Sphere(sphere)) | (Self::Sphere(sphere), Self::Ray(ray)) => {
                ray.intersects_sphere(sphere)
            }
            (Self::Aabb(aabb), Self::Obb(obb)) | (Self::Obb(obb), Self::Aabb(aabb)) => {
                obb.intersects_obb(&Obb::from(*aabb))
            }
            (Self::Aabb(aabb), Self::Ray(ray)) | (Self::Ray(ray), Self::Aabb(aabb)) => {
                ray.intersects_aabb(aabb)
            }
            (Self::Obb(obb), Self::Ray(ray)) | (Self::Ray(ray), Self::Obb(obb)) => {
                obb.intersects_ray(ray)
            }

            // A disk meets a volume only when both of its parts do
            (Self::Disk(disk), other) | (other, Self::Disk(disk)) => {
                Self::Sphere(disk.sphere).intersects(other) && Self::Obb(disk.obb).intersects(other)
            }
        }
    }
}

impl From<Sphere> for Collider {
    fn from(sphere: Sphere) -> Self {
        Self::Sphere(sphere)
    }
}

impl From<Aabb> for Collider {
    fn from(aabb: Aabb) -> Self {
        Self::Aabb(aabb)
    }
}

impl From<Obb> for Collider {
    fn from(obb: Obb) -> Self {
        Self::Obb(obb)
    }
}

impl From<Ray> for Collider {
    fn from(ray: Ray) -> Self {
        Self::Ray(ray)
    }
}

impl From<Disk> for Collider {
    fn from(disk: Disk) -> Self {
        Self::Disk(disk)
    }
}
