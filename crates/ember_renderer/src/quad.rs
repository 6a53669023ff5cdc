//! Planar parallelogram primitive.
//!
//! A quad is a corner point plus two edge vectors. Ray hits are found by
//! solving against the plane and then checking the planar coordinates of
//! the hit against the unit square.

use crate::error::SceneError;
use crate::geometry::Geometry;
use crate::interaction::SurfaceHit;
use ember_math::{Aabb, Bounded, Interval, Ray, Transform, Vec2, Vec3};

/// Rays closer to parallel than this are treated as missing the plane.
const PARALLEL_EPSILON: f32 = 1e-8;

/// A parallelogram with corner `q` and edges `u`, `v`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    q: Vec3,
    u: Vec3,
    v: Vec3,
    /// Unit normal, `u x v` normalized
    normal: Vec3,
    /// Plane offset, `normal . q`
    d: f32,
    /// `n / (n . n)` with unnormalized `n = u x v`
    w: Vec3,
    area: f32,
    bbox: Aabb,
}

impl Quad {
    /// Quad spanning `q`, `q + u`, `q + u + v`, `q + v`.
    ///
    /// The front face is the side `u x v` points to. Fails for zero area.
    pub fn new(q: Vec3, u: Vec3, v: Vec3) -> Result<Self, SceneError> {
        if !(q.is_finite() && u.is_finite() && v.is_finite()) {
            return Err(SceneError::invalid("quad corner or edges are not finite"));
        }

        let n = u.cross(v);
        let area = n.length();
        if area <= f32::EPSILON {
            return Err(SceneError::invalid("quad has zero area"));
        }

        let normal = n / area;
        let bbox = Aabb::surrounding(
            &Aabb::from_points(q, q + u + v),
            &Aabb::from_points(q + u, q + v),
        );

        Ok(Self {
            q,
            u,
            v,
            normal,
            d: normal.dot(q),
            w: n / n.dot(n),
            area,
            bbox,
        })
    }

    /// Quad of `size` centered at `position`, lying in the local XY plane with
    /// its front face toward local +Z, rotated by Euler XYZ angles (radians).
    pub fn from_transform(position: Vec3, size: Vec2, rotation: Vec3) -> Result<Self, SceneError> {
        let transform = Transform::from_translation_rotation(position, rotation);
        let half = size * 0.5;
        Self::new(
            transform.point(Vec3::new(-half.x, -half.y, 0.0)),
            transform.vector(Vec3::new(size.x, 0.0, 0.0)),
            transform.vector(Vec3::new(0.0, size.y, 0.0)),
        )
    }

    pub fn corner(&self) -> Vec3 {
        self.q
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Center of the parallelogram.
    pub fn center(&self) -> Vec3 {
        self.q + 0.5 * (self.u + self.v)
    }
}

impl Bounded for Quad {
    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Geometry for Quad {
    fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = (self.d - self.normal.dot(ray.origin)) / denom;
        if !ray_t.surrounds(t) {
            return None;
        }

        // Planar coordinates of the hit relative to the corner
        let p = ray.at(t);
        let hp = p - self.q;
        let alpha = self.w.dot(hp.cross(self.v));
        let beta = self.w.dot(self.u.cross(hp));
        let unit = Interval::new(0.0, 1.0);
        if !unit.contains(alpha) || !unit.contains(beta) {
            return None;
        }

        Some(SurfaceHit {
            t,
            p,
            outward_normal: self.normal,
        })
    }

    fn sample(&self, _origin: Vec3, u: Vec2) -> Vec3 {
        self.q + u.x * self.u + u.y * self.v
    }

    fn sample_pdf(&self, origin: Vec3, direction: Vec3) -> f32 {
        let ray = Ray::new(origin, direction, 0.0);
        let Some(hit) = self.intersect(&ray, Interval::new(0.0, f32::INFINITY)) else {
            return 0.0;
        };

        let length2 = direction.length_squared();
        let dist2 = hit.t * hit.t * length2;
        let cosine = self.normal.dot(direction).abs() / length2.sqrt();
        if cosine <= 0.0 {
            return 0.0;
        }
        dist2 / (cosine * self.area)
    }

    fn solid_angle(&self, origin: Vec3) -> f32 {
        let a = self.q - origin;
        let b = a + self.u;
        let c = b + self.v;
        let d = a + self.v;
        triangle_solid_angle(a, b, c) + triangle_solid_angle(a, c, d)
    }

    fn area(&self) -> f32 {
        self.area
    }
}

/// Solid angle of the triangle with corners `a`, `b`, `c` relative to the
/// origin (Van Oosterom and Strackee).
pub(crate) fn triangle_solid_angle(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let (la, lb, lc) = (a.length(), b.length(), c.length());
    let numerator = a.dot(b.cross(c)).abs();
    let denominator = la * lb * lc + a.dot(b) * lc + a.dot(c) * lb + b.dot(c) * la;
    2.0 * numerator.atan2(denominator)
}
