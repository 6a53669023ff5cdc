//! Hit records produced by intersection queries.

use crate::Material;
use ember_math::{Ray, Vec3};

/// Offset applied to the lower end of every secondary ray interval so a
/// surface does not re-hit itself.
pub const RAY_EPSILON: f32 = 1e-3;

/// Geometric result of a shape intersection, before any material is attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Ray parameter of the hit
    pub t: f32,
    /// World-space hit point
    pub p: Vec3,
    /// Unit normal pointing out of the shape
    pub outward_normal: Vec3,
}

/// Local record of a ray-surface hit, valid for one bounce.
#[derive(Debug, Clone, Copy)]
pub struct Interaction<'a> {
    /// Hit point
    pub p: Vec3,
    /// Unit surface normal, oriented against the incoming ray
    pub normal: Vec3,
    /// Unit direction back toward the ray origin
    pub wo: Vec3,
    /// Ray parameter of the hit
    pub t: f32,
    /// Time carried by the incoming ray
    pub time: f32,
    /// True if the ray hit the outside of the surface
    pub front_face: bool,
    /// Material of the primitive that was hit
    pub material: &'a Material,
    /// Index of the hit primitive in its scene
    pub primitive: usize,
}

impl<'a> Interaction<'a> {
    /// Build an interaction from a geometric hit.
    ///
    /// `ray` must have a unit-length direction.
    pub fn new(ray: &Ray, hit: SurfaceHit, material: &'a Material, primitive: usize) -> Self {
        // If the ray and normal point in the same direction, we're inside
        let front_face = ray.direction.dot(hit.outward_normal) < 0.0;
        let normal = if front_face {
            hit.outward_normal
        } else {
            -hit.outward_normal
        };

        Self {
            p: hit.p,
            normal,
            wo: -ray.direction,
            t: hit.t,
            time: ray.time,
            front_face,
            material,
            primitive,
        }
    }

    /// Ray leaving this hit point in `direction`.
    #[inline]
    pub fn spawn_ray(&self, direction: Vec3) -> Ray {
        Ray::new(self.p, direction, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_interaction_front_face() {
        let material = Material::lambertian(Color::splat(0.5));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, 0.25);
        let hit = SurfaceHit {
            t: 4.0,
            p: Vec3::new(0.0, 0.0, 1.0),
            outward_normal: Vec3::Z,
        };

        let rec = Interaction::new(&ray, hit, &material, 7);
        assert!(rec.front_face);
        assert_eq!(rec.normal, Vec3::Z);
        assert_eq!(rec.wo, Vec3::Z);
        assert_eq!(rec.time, 0.25);
        assert_eq!(rec.primitive, 7);
    }

    #[test]
    fn test_interaction_back_face_flips_normal() {
        let material = Material::lambertian(Color::splat(0.5));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z, 0.0);
        let hit = SurfaceHit {
            t: 1.0,
            p: Vec3::new(0.0, 0.0, 1.0),
            outward_normal: Vec3::Z,
        };

        let rec = Interaction::new(&ray, hit, &material, 0);
        assert!(!rec.front_face);
        assert_eq!(rec.normal, Vec3::NEG_Z);
        assert!(rec.normal.dot(ray.direction) < 0.0);
    }
}
