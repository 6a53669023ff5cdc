//! Ember Math - geometry kernel for the path tracer.
//!
//! Vector types come straight from `glam`; this crate adds the ray-tracing
//! specific pieces on top: rays, parametric intervals, bounding boxes,
//! affine transforms and orthonormal bases.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod onb;
mod ray;
mod transform;

pub use aabb::{Aabb, Bounded};
pub use interval::Interval;
pub use onb::Onb;
pub use ray::Ray;
pub use transform::{Mat4Ext, Transform};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_reexports_compose() {
        let bbox = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let ray = Ray::new(Vec3::new(0.5, 0.5, -1.0), Vec3::Z, 0.0);
        assert!(bbox.hit(&ray, Interval::new(0.0, 10.0)));
    }
}
