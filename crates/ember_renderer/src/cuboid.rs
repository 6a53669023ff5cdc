//! Oriented box primitive.
//!
//! Stored as half extents in a local frame plus a rigid transform placing
//! that frame in the world. Intersection runs the slab test in local space;
//! as a light the box is the union of its six faces.

use crate::error::SceneError;
use crate::geometry::Geometry;
use crate::interaction::SurfaceHit;
use crate::quad::triangle_solid_angle;
use ember_math::{Aabb, Bounded, Interval, Ray, Transform, Vec2, Vec3};
use std::f32::consts::PI;

/// A box with arbitrary orientation. Named to stay clear of `std::boxed::Box`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    half_extents: Vec3,
    transform: Transform,
    bbox: Aabb,
}

impl Cuboid {
    /// Box of `size` centered at `center`, rotated by Euler XYZ angles (radians).
    pub fn new(center: Vec3, size: Vec3, rotation: Vec3) -> Result<Self, SceneError> {
        if !(size.cmpgt(Vec3::ZERO).all() && size.is_finite()) {
            return Err(SceneError::invalid(format!("box size must be positive, got {size}")));
        }

        let transform = Transform::from_translation_rotation(center, rotation);
        if !transform.is_finite() {
            return Err(SceneError::invalid("box transform is not finite"));
        }

        let half_extents = size * 0.5;
        let bbox = transform.aabb(&Aabb::from_points(-half_extents, half_extents));

        Ok(Self {
            half_extents,
            transform,
            bbox,
        })
    }

    /// Axis-aligned box between two corners.
    pub fn axis_aligned(a: Vec3, b: Vec3) -> Result<Self, SceneError> {
        Self::new((a + b) * 0.5, (b - a).abs(), Vec3::ZERO)
    }

    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    /// Entry and exit distances of a local-space ray, unclipped.
    fn slabs(&self, local: &Ray) -> Option<(f32, usize, f32, usize)> {
        let inv_d = local.direction.recip();
        let t0 = (-self.half_extents - local.origin) * inv_d;
        let t1 = (self.half_extents - local.origin) * inv_d;
        let near = t0.min(t1);
        let far = t0.max(t1);

        let enter_axis = max_axis(near);
        let exit_axis = min_axis(far);
        let (t_enter, t_exit) = (near[enter_axis], far[exit_axis]);
        if !(t_enter <= t_exit) {
            return None;
        }
        Some((t_enter, enter_axis, t_exit, exit_axis))
    }

    /// Area of the face perpendicular to `axis`.
    fn face_area(&self, axis: usize) -> f32 {
        let h = self.half_extents;
        4.0 * h[(axis + 1) % 3] * h[(axis + 2) % 3]
    }

    /// World-space corners of the face on `axis` at side `sign`, in winding order.
    fn face_corners(&self, axis: usize, sign: f32) -> [Vec3; 4] {
        let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
        let h = self.half_extents;
        let corner = |sb: f32, sc: f32| {
            let mut p = Vec3::ZERO;
            p[axis] = sign * h[axis];
            p[b] = sb * h[b];
            p[c] = sc * h[c];
            self.transform.point(p)
        };
        [corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0)]
    }

    fn contains_local(&self, p: Vec3) -> bool {
        p.abs().cmplt(self.half_extents).all()
    }
}

#[inline]
fn max_axis(v: Vec3) -> usize {
    if v.x >= v.y && v.x >= v.z {
        0
    } else if v.y >= v.z {
        1
    } else {
        2
    }
}

#[inline]
fn min_axis(v: Vec3) -> usize {
    if v.x <= v.y && v.x <= v.z {
        0
    } else if v.y <= v.z {
        1
    } else {
        2
    }
}

/// Local-space outward normal of the face on `axis` facing `sign`.
#[inline]
fn axis_normal(axis: usize, sign: f32) -> Vec3 {
    let mut n = Vec3::ZERO;
    n[axis] = sign;
    n
}

impl Bounded for Cuboid {
    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Geometry for Cuboid {
    fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        let local = self.transform.inverse().ray(ray);
        let (t_enter, enter_axis, t_exit, exit_axis) = self.slabs(&local)?;

        // Entering through a face whose normal opposes the ray; leaving through one that agrees
        let (t, local_normal) = if ray_t.surrounds(t_enter) {
            let sign = -local.direction[enter_axis].signum();
            (t_enter, axis_normal(enter_axis, sign))
        } else if ray_t.surrounds(t_exit) {
            let sign = local.direction[exit_axis].signum();
            (t_exit, axis_normal(exit_axis, sign))
        } else {
            return None;
        };

        Some(SurfaceHit {
            t,
            p: ray.at(t),
            outward_normal: self.transform.normal(local_normal),
        })
    }

    fn sample(&self, _origin: Vec3, u: Vec2) -> Vec3 {
        // Pick a face with probability proportional to its area, then reuse
        // the leftover part of u.x as the in-face coordinate
        let total = self.area();
        let mut target = u.x * total;
        let mut chosen = (2, 1.0, u.x);
        'faces: for axis in 0..3 {
            let area = self.face_area(axis);
            for sign in [-1.0, 1.0] {
                if target < area {
                    chosen = (axis, sign, (target / area).clamp(0.0, 1.0));
                    break 'faces;
                }
                target -= area;
            }
        }

        let (axis, sign, s) = chosen;
        let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
        let h = self.half_extents;
        let mut p = Vec3::ZERO;
        p[axis] = sign * h[axis];
        p[b] = (2.0 * s - 1.0) * h[b];
        p[c] = (2.0 * u.y - 1.0) * h[c];
        self.transform.point(p)
    }

    fn sample_pdf(&self, origin: Vec3, direction: Vec3) -> f32 {
        let ray = Ray::new(origin, direction, 0.0);
        let local = self.transform.inverse().ray(&ray);
        let Some((t_enter, enter_axis, t_exit, exit_axis)) = self.slabs(&local) else {
            return 0.0;
        };

        // Every surface point along the ray could have been the sampled one
        let length2 = local.direction.length_squared();
        let length = length2.sqrt();
        let total_area = self.area();
        let density = |t: f32, axis: usize| {
            let cosine = local.direction[axis].abs() / length;
            if t <= 0.0 || cosine <= 0.0 {
                return 0.0;
            }
            t * t * length2 / (cosine * total_area)
        };

        density(t_enter, enter_axis) + density(t_exit, exit_axis)
    }

    fn solid_angle(&self, origin: Vec3) -> f32 {
        let local_origin = self.transform.inverse().point(origin);
        if self.contains_local(local_origin) {
            return 4.0 * PI;
        }

        // Each direction that hits a convex box crosses exactly two faces
        let mut sum = 0.0;
        for axis in 0..3 {
            for sign in [-1.0, 1.0] {
                let [a, b, c, d] = self.face_corners(axis, sign).map(|p| p - origin);
                sum += triangle_solid_angle(a, b, c) + triangle_solid_angle(a, c, d);
            }
        }
        0.5 * sum
    }

    fn area(&self) -> f32 {
        2.0 * (self.face_area(0) + self.face_area(1) + self.face_area(2))
    }
}
