//! Sphere primitive for ray tracing.

use crate::error::SceneError;
use crate::geometry::Geometry;
use crate::interaction::SurfaceHit;
use crate::sampling::{uniform_cone_pdf, uniform_sample_cone, uniform_sample_sphere};
use ember_math::{Aabb, Bounded, Interval, Onb, Ray, Vec2, Vec3};
use std::f32::consts::PI;

/// A sphere given by center and radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    bbox: Aabb,
}

impl Sphere {
    /// Create a new sphere. The radius must be positive and finite.
    pub fn new(center: Vec3, radius: f32) -> Result<Self, SceneError> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(SceneError::invalid(format!("sphere radius must be positive, got {radius}")));
        }
        if !center.is_finite() {
            return Err(SceneError::invalid("sphere center is not finite"));
        }

        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Ok(Self {
            center,
            radius,
            bbox,
        })
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Cosine of the half-angle of the cone the sphere subtends from `origin`,
    /// or `None` when `origin` is inside the sphere.
    fn cos_theta_max(&self, origin: Vec3) -> Option<f32> {
        let dist2 = origin.distance_squared(self.center);
        let r2 = self.radius * self.radius;
        if dist2 <= r2 {
            return None;
        }
        Some((1.0 - r2 / dist2).max(0.0).sqrt())
    }
}

impl Bounded for Sphere {
    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Geometry for Sphere {
    fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        let p = ray.at(root);
        Some(SurfaceHit {
            t: root,
            p,
            outward_normal: (p - self.center) / self.radius,
        })
    }

    fn sample(&self, origin: Vec3, u: Vec2) -> Vec3 {
        let Some(cos_theta_max) = self.cos_theta_max(origin) else {
            // Cone sampling is undefined from inside; sample the whole surface
            return self.center + self.radius * uniform_sample_sphere(u);
        };

        let to_center = self.center - origin;
        let direction = Onb::from_w(to_center).local(uniform_sample_cone(u, cos_theta_max));

        // First crossing of the sampled direction with the sphere. Directions on
        // the cone boundary graze it, where the discriminant rounds to zero.
        let b = direction.dot(to_center);
        let c = to_center.length_squared() - self.radius * self.radius;
        let t = b - (b * b - c).max(0.0).sqrt();
        origin + t * direction
    }

    fn sample_pdf(&self, origin: Vec3, direction: Vec3) -> f32 {
        match self.cos_theta_max(origin) {
            Some(cos_theta_max) => {
                let cos_theta = direction.dot((self.center - origin).normalize());
                if cos_theta < cos_theta_max {
                    return 0.0;
                }
                uniform_cone_pdf(cos_theta_max)
            }
            None => {
                // Uniform area density converted to solid angle
                let ray = Ray::new(origin, direction, 0.0);
                let Some(hit) = self.intersect(&ray, Interval::new(0.0, f32::INFINITY)) else {
                    return 0.0;
                };
                let cosine = hit.outward_normal.dot(direction).abs();
                if cosine <= 0.0 {
                    return 0.0;
                }
                let dist2 = hit.t * hit.t * direction.length_squared();
                dist2 / (cosine * self.area())
            }
        }
    }

    fn solid_angle(&self, origin: Vec3) -> f32 {
        match self.cos_theta_max(origin) {
            Some(cos_theta_max) => 2.0 * PI * (1.0 - cos_theta_max),
            None => 4.0 * PI,
        }
    }

    fn area(&self) -> f32 {
        4.0 * PI * self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::Random;

    fn unit_sphere_at(center: Vec3) -> Sphere {
        Sphere::new(center, 0.5).unwrap()
    }

    #[test]
    fn test_sphere_hit() {
        let sphere = unit_sphere_at(Vec3::new(0.0, 0.0, -1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);

        let hit = sphere.intersect(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
        assert!((hit.t - 0.5).abs() < 1e-5);
        assert!((hit.outward_normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = unit_sphere_at(Vec3::new(0.0, 0.0, -1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::Y, 0.0);
        assert!(sphere.intersect(&ray, Interval::new(0.001, f32::INFINITY)).is_none());
    }

    #[test]
    fn test_sphere_hit_from_inside_uses_far_root() {
        let sphere = Sphere::new(Vec3::ZERO, 2.0).unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::X, 0.0);

        let hit = sphere.intersect(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!((hit.outward_normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_interval_is_open() {
        let sphere = unit_sphere_at(Vec3::new(0.0, 0.0, -1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);

        // Near root is exactly 0.5, far root exactly 1.5
        assert!(sphere.intersect(&ray, Interval::new(0.5, 1.5)).is_none());
        assert!(sphere.intersect(&ray, Interval::new(0.001, 0.5)).is_none());
        let far = sphere.intersect(&ray, Interval::new(0.5, 2.0)).unwrap();
        assert!((far.t - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_rejects_bad_radius() {
        assert!(Sphere::new(Vec3::ZERO, 0.0).is_err());
        assert!(Sphere::new(Vec3::ZERO, -1.0).is_err());
        assert!(Sphere::new(Vec3::ZERO, f32::NAN).is_err());
        assert!(Sphere::new(Vec3::splat(f32::INFINITY), 1.0).is_err());
    }

    #[test]
    fn test_sphere_bounding_box() {
        let sphere = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5).unwrap();
        let bbox = sphere.bounding_box();
        assert_eq!(bbox.min(), Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(bbox.max(), Vec3::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn test_sphere_samples_visible_cap() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -4.0), 1.0).unwrap();
        let origin = Vec3::ZERO;
        let mut rng = Random::new(21);

        for _ in 0..500 {
            let p = sphere.sample(origin, rng.uniform2());
            assert!((p.distance(sphere.center()) - 1.0).abs() < 1e-3);
            // Visible from the origin: the outward normal faces back toward it
            assert!((p - sphere.center()).dot(origin - p) >= -1e-3);

            let dir = (p - origin).normalize();
            let pdf = sphere.sample_pdf(origin, dir);
            assert!(pdf > 0.0);
            assert!((pdf * sphere.solid_angle(origin) - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_sphere_pdf_integrates_to_one() {
        // E_uniform[pdf] * 4pi = integral of pdf over the sphere of directions
        let mut rng = Random::new(22);
        let n = 200_000;

        for (sphere, origin) in [
            (Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0).unwrap(), Vec3::ZERO),
            (Sphere::new(Vec3::ZERO, 2.0).unwrap(), Vec3::new(0.5, 0.3, 0.0)),
        ] {
            let total: f32 = (0..n)
                .map(|_| sphere.sample_pdf(origin, rng.unit_vector()))
                .sum();
            let integral = total / n as f32 * 4.0 * PI;
            assert!((integral - 1.0).abs() < 0.05, "integral {integral}");
        }
    }

    #[test]
    fn test_sphere_sample_from_inside_falls_back_to_area() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0).unwrap();
        let mut rng = Random::new(23);
        for _ in 0..100 {
            let p = sphere.sample(Vec3::new(0.2, 0.0, 0.0), rng.uniform2());
            assert!((p.length() - 1.0).abs() < 1e-4);
        }
        assert!((sphere.solid_angle(Vec3::ZERO) - 4.0 * PI).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_pdf_zero_outside_cone() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -4.0), 1.0).unwrap();
        assert_eq!(sphere.sample_pdf(Vec3::ZERO, Vec3::X), 0.0);
        assert_eq!(sphere.sample_pdf(Vec3::ZERO, Vec3::Z), 0.0);
    }
}
