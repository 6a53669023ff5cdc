//! Scene: the primitive collection and its acceleration structure.

use crate::bvh::{Bvh, BvhOptions, TraversalStats};
use crate::error::SceneError;
use crate::interaction::{Interaction, SurfaceHit, RAY_EPSILON};
use crate::Primitive;
use ember_math::{Interval, Ray, Vec3};

/// Owns every primitive and the BVH built over them.
///
/// Call [`Scene::initialize_bvh`] after the last [`Scene::add`]; adding a
/// primitive afterwards discards the hierarchy until it is rebuilt.
#[derive(Debug, Default)]
pub struct Scene {
    primitives: Vec<Primitive>,
    /// Indices of emissive primitives, used for light sampling
    lights: Vec<usize>,
    bvh: Option<Bvh>,
    options: BvhOptions,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BvhOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Add a primitive and return its index. Invalidates the BVH.
    pub fn add(&mut self, primitive: Primitive) -> usize {
        let index = self.primitives.len();
        if primitive.is_emissive() {
            self.lights.push(index);
        }
        self.primitives.push(primitive);
        self.bvh = None;
        index
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive(&self, index: usize) -> &Primitive {
        &self.primitives[index]
    }

    /// Indices of the emissive primitives.
    pub fn lights(&self) -> &[usize] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn options(&self) -> &BvhOptions {
        &self.options
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    /// True once the BVH matches the current primitive set.
    pub fn is_ready(&self) -> bool {
        self.bvh.is_some()
    }

    /// Build (or rebuild) the BVH over the current primitives.
    pub fn initialize_bvh(&mut self) -> Result<(), SceneError> {
        self.bvh = None;
        let bvh = Bvh::build(&self.primitives, self.options)?;
        log::info!(
            "Scene ready: {} primitives, {} lights",
            self.primitives.len(),
            self.lights.len()
        );
        self.bvh = Some(bvh);
        Ok(())
    }

    /// Closest hit along `ray`, excluding the first [`RAY_EPSILON`] of its length.
    ///
    /// The ray is normalized first; the returned `t` is measured along the
    /// unit direction. Degenerate rays (zero or non-finite direction) miss.
    pub fn intersect(&self, ray: &Ray) -> Option<Interaction<'_>> {
        self.intersect_in(ray, Interval::new(RAY_EPSILON, f32::INFINITY))
    }

    /// Closest hit with `t` strictly inside `ray_t`.
    pub fn intersect_in(&self, ray: &Ray, ray_t: Interval) -> Option<Interaction<'_>> {
        let ray = normalize_or_log(ray)?;
        let (index, hit) = match &self.bvh {
            Some(bvh) => bvh.intersect(&ray, ray_t, |i, t| self.primitives[i].intersect(&ray, t)),
            None => {
                log::debug!("Scene queried without a current BVH; falling back to a linear scan");
                self.closest_linear(&ray, ray_t)
            }
        }?;
        Some(self.interaction(&ray, index, hit))
    }

    /// Brute-force closest hit over every primitive. Reference for the BVH.
    pub fn intersect_linear(&self, ray: &Ray, ray_t: Interval) -> Option<Interaction<'_>> {
        let ray = normalize_or_log(ray)?;
        let (index, hit) = self.closest_linear(&ray, ray_t)?;
        Some(self.interaction(&ray, index, hit))
    }

    /// [`Scene::intersect_in`] that also reports the traversal work.
    ///
    /// Without a BVH this counts one primitive test per primitive.
    pub fn intersect_with_stats(&self, ray: &Ray, ray_t: Interval) -> (Option<Interaction<'_>>, TraversalStats) {
        let Some(ray) = normalize_or_log(ray) else {
            return (None, TraversalStats::default());
        };

        let (hit, stats) = match &self.bvh {
            Some(bvh) => bvh.intersect_with_stats(&ray, ray_t, |i, t| self.primitives[i].intersect(&ray, t)),
            None => {
                let stats = TraversalStats {
                    nodes_visited: 0,
                    primitive_tests: self.primitives.len(),
                };
                (self.closest_linear(&ray, ray_t), stats)
            }
        };
        (hit.map(|(index, hit)| self.interaction(&ray, index, hit)), stats)
    }

    /// True if anything lies along `ray` within `ray_t`.
    pub fn occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        let Some(ray) = normalize_or_log(ray) else {
            return false;
        };
        match &self.bvh {
            Some(bvh) => bvh.occluded(&ray, ray_t, |i, t| self.primitives[i].intersect(&ray, t)),
            None => self.primitives.iter().any(|p| p.intersect(&ray, ray_t).is_some()),
        }
    }

    /// Solid-angle density with which light sampling picks `light` (a
    /// primitive index) uniformly among the lights and then produces the unit
    /// `direction` from `origin` on it. Zero for non-emissive primitives.
    pub fn light_pdf(&self, light: usize, origin: Vec3, direction: Vec3) -> f32 {
        if !self.lights.contains(&light) {
            return 0.0;
        }
        self.primitives[light].sample_pdf(origin, direction) / self.lights.len() as f32
    }

    fn closest_linear(&self, ray: &Ray, ray_t: Interval) -> Option<(usize, SurfaceHit)> {
        let mut closest = None;
        let mut t_best = ray_t.max;
        for (i, primitive) in self.primitives.iter().enumerate() {
            if let Some(hit) = primitive.intersect(ray, ray_t.with_max(t_best)) {
                t_best = hit.t;
                closest = Some((i, hit));
            }
        }
        closest
    }

    fn interaction(&self, ray: &Ray, index: usize, hit: SurfaceHit) -> Interaction<'_> {
        Interaction::new(ray, hit, self.primitives[index].material(), index)
    }
}

fn normalize_or_log(ray: &Ray) -> Option<Ray> {
    let normalized = ray.normalized();
    if normalized.is_none() {
        log::trace!("Degenerate ray treated as a miss: {ray:?}");
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Material};
    use std::sync::Arc;

    fn two_sphere_scene() -> Scene {
        let gray = Arc::new(Material::lambertian(Color::splat(0.5)));
        let mut scene = Scene::new();
        scene.add(Primitive::sphere(Vec3::new(0.0, 0.0, -1.0), 0.5, gray.clone()).unwrap());
        scene.add(Primitive::sphere(Vec3::new(0.0, -100.5, -1.0), 100.0, gray).unwrap());
        scene
    }

    #[test]
    fn test_scene_intersect_after_init() {
        let mut scene = two_sphere_scene();
        scene.initialize_bvh().unwrap();
        assert!(scene.is_ready());

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0), 0.0);
        let hit = scene.intersect(&ray).unwrap();
        assert_eq!(hit.primitive, 0);
        // t is measured along the normalized direction
        assert!((hit.t - 0.5).abs() < 1e-5);
        assert!((hit.normal.length() - 1.0).abs() < 1e-5);
        assert!(hit.normal.dot(ray.direction) < 0.0);
        assert_eq!(hit.wo, Vec3::Z);
    }

    #[test]
    fn test_scene_add_marks_bvh_stale() {
        let mut scene = two_sphere_scene();
        scene.initialize_bvh().unwrap();

        let light = Arc::new(Material::diffuse_light(Color::ONE));
        let index = scene
            .add(Primitive::quad(Vec3::new(-1.0, 2.0, -2.0), Vec3::X * 2.0, Vec3::Z * 2.0, light).unwrap());
        assert!(!scene.is_ready());
        assert_eq!(scene.lights(), &[index]);

        scene.initialize_bvh().unwrap();
        assert!(scene.is_ready());
        assert_eq!(scene.bvh().unwrap().stats().primitives, 3);
    }

    #[test]
    fn test_scene_empty_init_fails() {
        let mut scene = Scene::new();
        assert_eq!(scene.initialize_bvh(), Err(SceneError::EmptyScene));
        assert!(!scene.is_ready());
    }

    #[test]
    fn test_scene_degenerate_ray_misses() {
        let mut scene = two_sphere_scene();
        scene.initialize_bvh().unwrap();

        assert!(scene.intersect(&Ray::new(Vec3::ZERO, Vec3::ZERO, 0.0)).is_none());
        assert!(scene.intersect(&Ray::new(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, -1.0), 0.0)).is_none());
        assert!(!scene.occluded(&Ray::new(Vec3::ZERO, Vec3::ZERO, 0.0), Interval::new(0.0, 10.0)));
    }

    #[test]
    fn test_scene_stale_falls_back_to_linear() {
        let scene = two_sphere_scene();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);
        let hit = scene.intersect(&ray).unwrap();
        assert_eq!(hit.primitive, 0);
    }

    #[test]
    fn test_scene_occluded() {
        let mut scene = two_sphere_scene();
        scene.initialize_bvh().unwrap();

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);
        assert!(scene.occluded(&ray, Interval::new(RAY_EPSILON, 1.0)));
        assert!(!scene.occluded(&ray, Interval::new(RAY_EPSILON, 0.4)));
        assert!(!scene.occluded(&Ray::new(Vec3::ZERO, Vec3::Y, 0.0), Interval::new(RAY_EPSILON, f32::INFINITY)));
    }

    #[test]
    fn test_scene_light_pdf_includes_selection() {
        let light = Arc::new(Material::diffuse_light(Color::ONE));
        let gray = Arc::new(Material::lambertian(Color::splat(0.5)));
        let mut scene = Scene::new();
        // 2x2 quad one unit below: pdf straight down is 1/4
        let first = scene.add(Primitive::quad(Vec3::new(-1.0, -1.0, -1.0), Vec3::X * 2.0, Vec3::Y * 2.0, light.clone()).unwrap());
        assert!((scene.light_pdf(first, Vec3::ZERO, Vec3::NEG_Z) - 0.25).abs() < 1e-5);

        // A second light halves the selection probability
        scene.add(Primitive::quad(Vec3::new(-1.0, -1.0, 5.0), Vec3::X * 2.0, Vec3::Y * 2.0, light).unwrap());
        assert!((scene.light_pdf(first, Vec3::ZERO, Vec3::NEG_Z) - 0.125).abs() < 1e-5);

        // Non-emissive primitives are never sampled as lights
        let wall = scene.add(Primitive::sphere(Vec3::new(0.0, 0.0, -3.0), 1.0, gray).unwrap());
        assert_eq!(scene.light_pdf(wall, Vec3::ZERO, Vec3::NEG_Z), 0.0);
    }
}
