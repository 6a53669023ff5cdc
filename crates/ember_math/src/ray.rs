use crate::Vec3;

/// Half-line `origin + t * direction` tagged with a time sample.
///
/// The direction does not have to be unit length when the ray is built;
/// [`Ray::normalized`] produces the unit-direction copy the intersection
/// routines expect. The `time` value is carried along for motion blur.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub time: f32,
}

impl Ray {
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3, time: f32) -> Self {
        Self {
            origin,
            direction,
            time,
        }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Copy of this ray with a unit-length direction.
    ///
    /// Returns `None` when the direction has zero length or when the origin or
    /// direction contains NaN/infinity. Callers treat such rays as misses.
    pub fn normalized(&self) -> Option<Ray> {
        if !self.origin.is_finite() {
            return None;
        }
        let direction = self.direction.try_normalize()?;
        Some(Ray::new(self.origin, direction, self.time))
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            time: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X, 0.0);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_getters() {
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let direction = Vec3::new(4.0, 5.0, 6.0);
        let ray = Ray::new(origin, direction, 0.5);

        assert_eq!(ray.origin(), origin);
        assert_eq!(ray.direction(), direction);
        assert_eq!(ray.time(), 0.5);
    }

    #[test]
    fn test_ray_normalized() {
        let ray = Ray::new(Vec3::ONE, Vec3::new(0.0, 3.0, 4.0), 0.25);
        let unit = ray.normalized().unwrap();

        assert!((unit.direction.length() - 1.0).abs() < 1e-6);
        assert_eq!(unit.origin, Vec3::ONE);
        assert_eq!(unit.time, 0.25);
        assert!((unit.direction - Vec3::new(0.0, 0.6, 0.8)).length() < 1e-6);
    }

    #[test]
    fn test_ray_normalized_rejects_degenerate() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO, 0.0).normalized().is_none());
        assert!(Ray::new(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 1.0), 0.0)
            .normalized()
            .is_none());
        assert!(Ray::new(Vec3::splat(f32::INFINITY), Vec3::Z, 0.0)
            .normalized()
            .is_none());
    }
}
