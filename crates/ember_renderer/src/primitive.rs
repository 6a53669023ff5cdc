//! A shape paired with its material.

use crate::error::SceneError;
use crate::geometry::{Geometry, Shape};
use crate::interaction::SurfaceHit;
use crate::{Cuboid, Material, Quad, Sphere};
use ember_math::{Aabb, Bounded, Interval, Ray, Vec2, Vec3};
use std::sync::Arc;

/// One renderable object. Many primitives may share a material.
#[derive(Debug, Clone)]
pub struct Primitive {
    shape: Shape,
    material: Arc<Material>,
}

impl Primitive {
    pub fn new(shape: impl Into<Shape>, material: Arc<Material>) -> Self {
        Self {
            shape: shape.into(),
            material,
        }
    }

    /// Convenience constructor for a sphere.
    pub fn sphere(center: Vec3, radius: f32, material: Arc<Material>) -> Result<Self, SceneError> {
        Ok(Self::new(Sphere::new(center, radius)?, material))
    }

    /// Convenience constructor for a quad given by corner and edges.
    pub fn quad(q: Vec3, u: Vec3, v: Vec3, material: Arc<Material>) -> Result<Self, SceneError> {
        Ok(Self::new(Quad::new(q, u, v)?, material))
    }

    /// Convenience constructor for an oriented box.
    pub fn cuboid(center: Vec3, size: Vec3, rotation: Vec3, material: Arc<Material>) -> Result<Self, SceneError> {
        Ok(Self::new(Cuboid::new(center, size, rotation)?, material))
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn is_emissive(&self) -> bool {
        self.material.is_emissive()
    }

    #[inline]
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        self.shape.intersect(ray, ray_t)
    }

    /// Point on the surface for light sampling from `origin`.
    pub fn sample(&self, origin: Vec3, u: Vec2) -> Vec3 {
        self.shape.sample(origin, u)
    }

    /// Solid-angle density of [`Primitive::sample`] for `direction` from `origin`.
    pub fn sample_pdf(&self, origin: Vec3, direction: Vec3) -> f32 {
        self.shape.sample_pdf(origin, direction)
    }

    pub fn solid_angle(&self, origin: Vec3) -> f32 {
        self.shape.solid_angle(origin)
    }
}

impl Bounded for Primitive {
    fn bounding_box(&self) -> Aabb {
        self.shape.bounding_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_primitives_share_material() {
        let material = Arc::new(Material::lambertian(Color::splat(0.5)));
        let a = Primitive::sphere(Vec3::ZERO, 1.0, material.clone()).unwrap();
        let b = Primitive::sphere(Vec3::X * 3.0, 1.0, material.clone()).unwrap();

        assert!(std::ptr::eq(a.material(), b.material()));
        assert_eq!(Arc::strong_count(&material), 3);
    }

    #[test]
    fn test_primitive_dispatch() {
        let light = Arc::new(Material::diffuse_light(Color::ONE));
        let quad = Primitive::quad(Vec3::new(-1.0, -1.0, -2.0), Vec3::X * 2.0, Vec3::Y * 2.0, light).unwrap();
        assert!(quad.is_emissive());
        assert!(matches!(quad.shape(), Shape::Quad(_)));

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);
        let hit = quad.intersect(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!(quad.sample_pdf(Vec3::ZERO, Vec3::NEG_Z) > 0.0);
    }

    #[test]
    fn test_primitive_construction_errors_propagate() {
        let material = Arc::new(Material::lambertian(Color::ONE));
        assert!(Primitive::sphere(Vec3::ZERO, -1.0, material.clone()).is_err());
        assert!(Primitive::cuboid(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, material).is_err());
    }
}
