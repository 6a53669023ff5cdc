//! Shape capability shared by every primitive.
//!
//! A shape answers ray queries and, so that emissive shapes can act as area
//! lights, can sample points on itself and report the density of those
//! samples in solid angle as seen from a reference point.

use crate::interaction::SurfaceHit;
use crate::{Cuboid, Quad, Sphere};
use ember_math::{Aabb, Bounded, Interval, Ray, Vec2, Vec3};

/// Geometry of a renderable shape in world space.
pub trait Geometry: Bounded + Send + Sync {
    /// Closest hit with `t` strictly inside `ray_t`.
    fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit>;

    /// Point on the surface chosen from the uniform sample `u`, distributed
    /// for use as a light seen from `origin`.
    fn sample(&self, origin: Vec3, u: Vec2) -> Vec3;

    /// Solid-angle density with which [`Geometry::sample`] produces the unit
    /// direction `direction` from `origin`. Zero if the direction misses.
    fn sample_pdf(&self, origin: Vec3, direction: Vec3) -> f32;

    /// Solid angle subtended by the shape as seen from `origin`.
    fn solid_angle(&self, origin: Vec3) -> f32;

    /// Total surface area.
    fn area(&self) -> f32;
}

/// Closed set of shapes a [`crate::Primitive`] can hold.
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Quad(Quad),
    Cuboid(Cuboid),
}

impl Shape {
    fn as_geometry(&self) -> &dyn Geometry {
        match self {
            Shape::Sphere(s) => s,
            Shape::Quad(q) => q,
            Shape::Cuboid(c) => c,
        }
    }
}

impl Bounded for Shape {
    fn bounding_box(&self) -> Aabb {
        self.as_geometry().bounding_box()
    }
}

impl Geometry for Shape {
    #[inline]
    fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        match self {
            Shape::Sphere(s) => s.intersect(ray, ray_t),
            Shape::Quad(q) => q.intersect(ray, ray_t),
            Shape::Cuboid(c) => c.intersect(ray, ray_t),
        }
    }

    fn sample(&self, origin: Vec3, u: Vec2) -> Vec3 {
        self.as_geometry().sample(origin, u)
    }

    fn sample_pdf(&self, origin: Vec3, direction: Vec3) -> f32 {
        self.as_geometry().sample_pdf(origin, direction)
    }

    fn solid_angle(&self, origin: Vec3) -> f32 {
        self.as_geometry().solid_angle(origin)
    }

    fn area(&self) -> f32 {
        self.as_geometry().area()
    }
}

impl From<Sphere> for Shape {
    fn from(s: Sphere) -> Self {
        Shape::Sphere(s)
    }
}

impl From<Quad> for Shape {
    fn from(q: Quad) -> Self {
        Shape::Quad(q)
    }
}

impl From<Cuboid> for Shape {
    fn from(c: Cuboid) -> Self {
        Shape::Cuboid(c)
    }
}
