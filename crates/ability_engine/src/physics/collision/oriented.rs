//! Oriented volumes: boxes with an arbitrary orthonormal basis, and disks
//!
//! The OBB separating axis test follows Ericson, "Real-Time Collision
//! Detection" 4.4.1. A disk is the intersection of an OBB and a sphere
//! (a flat box clipped round by the sphere).

use crate::foundation::math::{self, Mat3, Quat, Vec3, EPSILON, SAT_EPSILON};
use super::primitives::{Aabb, Ray, Sphere};

/// An oriented bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    center: Vec3,
    /// Rows are the local x, y and z axes in world space
    basis: Mat3,
    /// Half extents along the local axes
    e: Vec3,
}

impl Obb {
    /// Create an OBB from its center, local half extents and three orthonormal axes
    pub fn new(center: Vec3, half_extents: Vec3, axes: [Vec3; 3]) -> Self {
        let basis = Mat3::from_rows(&[
            axes[0].transpose(),
            axes[1].transpose(),
            axes[2].transpose(),
        ]);
        Self {
            center,
            basis,
            e: math::abs(&half_extents),
        }
    }

    /// Rotate an AABB about the world origin
    ///
    /// Both the box center and its axes are rotated, so a box away from the
    /// origin orbits around it.
    pub fn from_aabb_rotated(aabb: &Aabb, rotation: &Quat) -> Self {
        let m = rotation.to_rotation_matrix();
        let axes = [
            m * Vec3::x(),
            m * Vec3::y(),
            m * Vec3::z(),
        ];
        Self::new(rotation * aabb.position(), aabb.half_extents(), axes)
    }

    /// Center of the box
    pub fn position(&self) -> Vec3 {
        self.center
    }

    /// Local axis `i` in world space
    pub fn axis(&self, i: usize) -> Vec3 {
        self.basis.row(i).transpose()
    }

    /// Same box centered at `point`
    pub fn at(&self, point: Vec3) -> Self {
        Self { center: point, ..*self }
    }

    /// Same box moved by `offset`
    pub fn translated(&self, offset: Vec3) -> Self {
        self.at(self.center + offset)
    }

    /// World-space half extents of the box's bounding AABB
    pub fn half_extents(&self) -> Vec3 {
        (0..3).fold(Vec3::zeros(), |acc, i| acc + math::abs(&(self.axis(i) * self.e[i])))
    }

    /// World-space bounding AABB
    pub fn outer(&self) -> Aabb {
        Aabb::from_center_extents(self.center, self.half_extents())
    }

    /// Express a world-space vector in this box's local frame
    pub fn local_space(&self, v: &Vec3) -> Vec3 {
        self.basis * v
    }

    /// Closest point on or in the box to `target`
    pub fn closest_point(&self, target: &Vec3) -> Vec3 {
        let t = target - self.center;
        (0..3).fold(self.center, |closest, i| {
            let axis = self.axis(i);
            let dist = t.dot(&axis).clamp(-self.e[i], self.e[i]);
            closest + axis * dist
        })
    }

    /// Point containment, tolerant by [`EPSILON`]
    pub fn contains(&self, point: &Vec3) -> bool {
        (self.closest_point(point) - point).norm_squared() <= EPSILON * EPSILON
    }

    /// Closest point to the sphere center against the squared radius
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        sphere.contains_exact(&self.closest_point(&sphere.center))
    }

    /// Ray in the box's local frame against `[-e, e]`
    pub fn intersects_ray(&self, ray: &Ray) -> bool {
        let local = Ray::new(
            self.local_space(&(ray.origin - self.center)),
            self.local_space(&ray.direction),
        );
        local.intersects_aabb(&Aabb::new(-self.e, self.e))
    }

    /// Separating axis test over the 15 candidate axes
    ///
    /// Boxes whose outer AABBs only touch are rejected first, so face contact
    /// is not an intersection here either.
    pub fn intersects_obb(&self, other: &Obb) -> bool {
        if !self.outer().intersects_aabb(&other.outer()) {
            return false;
        }

        let a = &self.e;
        let b = &other.e;

        // Other box's basis expressed in this box's frame
        let r = self.basis * other.basis.transpose();
        let abs_r = r.map(|x| x.abs() + SAT_EPSILON);
        let t = self.local_space(&(other.center - self.center));

        // This box's face axes
        for i in 0..3 {
            let ra = a[i];
            let rb = b[0] * abs_r[(i, 0)] + b[1] * abs_r[(i, 1)] + b[2] * abs_r[(i, 2)];
            if t[i].abs() > ra + rb {
                return false;
            }
        }

        // Other box's face axes
        for j in 0..3 {
            let ra = a[0] * abs_r[(0, j)] + a[1] * abs_r[(1, j)] + a[2] * abs_r[(2, j)];
            let rb = b[j];
            let dist = t[0] * r[(0, j)] + t[1] * r[(1, j)] + t[2] * r[(2, j)];
            if dist.abs() > ra + rb {
                return false;
            }
        }

        // Edge cross products A_i x B_j
        for i in 0..3 {
            let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
            for j in 0..3 {
                let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
                let ra = a[i1] * abs_r[(i2, j)] + a[i2] * abs_r[(i1, j)];
                let rb = b[j1] * abs_r[(i, j2)] + b[j2] * abs_r[(i, j1)];
                let dist = t[i2] * r[(i1, j)] - t[i1] * r[(i2, j)];
                if dist.abs() > ra + rb {
                    return false;
                }
            }
        }

        true
    }
}

impl From<Aabb> for Obb {
    fn from(aabb: Aabb) -> Self {
        Self::new(
            aabb.position(),
            aabb.half_extents(),
            [Vec3::x(), Vec3::y(), Vec3::z()],
        )
    }
}

/// A disk: the volume shared by an OBB and a sphere
///
/// Typically a thin box clipped by a sphere of the box's half width, which
/// gives a round, flat shield.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disk {
    /// Box part
    pub obb: Obb,
    /// Sphere part
    pub sphere: Sphere,
}

impl Disk {
    /// Create a disk from its two parts
    pub fn new(obb: Obb, sphere: Sphere) -> Self {
        Self { obb, sphere }
    }

    /// Position of the disk (its sphere's center)
    pub fn position(&self) -> Vec3 {
        self.sphere.center
    }

    /// Same disk moved so its sphere is centered at `point`
    pub fn at(&self, point: Vec3) -> Self {
        let offset = point - self.sphere.center;
        Self {
            obb: self.obb.translated(offset),
            sphere: self.sphere.at(point),
        }
    }

    /// World-space half extents of the box part
    pub fn half_extents(&self) -> Vec3 {
        self.obb.half_extents()
    }

    /// A point is inside when both parts contain it
    pub fn contains(&self, point: &Vec3) -> bool {
        self.sphere.contains(point) && self.obb.contains(point)
    }
}
