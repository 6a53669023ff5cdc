//! Image-level rendering.
//!
//! Implements Monte Carlo path tracing with:
//! - Per-pixel deterministic random streams
//! - Bucket-parallel rendering via rayon
//! - Gamma correction and 8-bit conversion

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::integrator::PathTracer;
use crate::sampling::Random;
use crate::{Background, Camera, Color, RenderError, Scene};

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    /// Maximum number of bounces per path
    pub max_depth: u32,
    /// Terminate low-throughput paths probabilistically
    pub russian_roulette: bool,
    /// Bounce count after which Russian roulette kicks in
    pub roulette_start_depth: u32,
    /// Next-event estimation with multiple importance sampling
    pub light_sampling: bool,
    /// Radiance returned by rays that leave the scene
    pub background: Background,
    /// Global seed; pixel streams are derived from it
    pub seed: u64,
    /// Bucket edge length in pixels
    pub bucket_size: u32,
    /// Render buckets on the rayon thread pool
    pub parallel: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 64,
            max_depth: 16,
            russian_roulette: true,
            roulette_start_depth: 3,
            light_sampling: true,
            background: Background::default(),
            seed: 0,
            bucket_size: DEFAULT_BUCKET_SIZE,
            parallel: true,
        }
    }
}

impl RenderConfig {
    /// Reject settings that cannot produce an image.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidConfig {
                reason: "samples_per_pixel must be at least 1".into(),
            });
        }
        if self.bucket_size == 0 {
            return Err(RenderError::InvalidConfig {
                reason: "bucket_size must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to 8-bit gamma-corrected RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let channel = |c: f32| (255.99 * linear_to_gamma(c).clamp(0.0, 0.999)) as u8;
    [channel(color.x), channel(color.y), channel(color.z), 255]
}

/// Render a single pixel with multi-sampling.
///
/// The pixel draws from its own stream seeded by `config.seed` and the
/// pixel index, so the result does not depend on scheduling.
pub fn render_pixel(
    camera: &Camera,
    scene: &Scene,
    tracer: &PathTracer,
    x: u32,
    y: u32,
    config: &RenderConfig,
) -> Color {
    let pixel_index = y as u64 * camera.image_width as u64 + x as u64;
    let mut rng = Random::for_pixel(config.seed, pixel_index);
    let mut pixel_color = Color::ZERO;

    for _ in 0..config.samples_per_pixel {
        let ray = camera.get_ray(x, y, &mut rng);
        pixel_color += tracer.trace_path(scene, &ray, &mut rng).radiance;
    }

    pixel_color / config.samples_per_pixel.max(1) as f32
}

/// Linear radiance image produced by [`render`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.offset(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let offset = self.offset(x, y);
        self.pixels[offset] = color;
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Copy a finished bucket into the image.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        for ((x, y), color) in result.bucket.pixels().zip(&result.pixels) {
            self.set(x, y, *color);
        }
    }

    /// Mean linear radiance over all pixels.
    pub fn average(&self) -> Color {
        if self.pixels.is_empty() {
            return Color::ZERO;
        }
        self.pixels.iter().copied().sum::<Color>() / self.pixels.len() as f32
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| color_to_rgba(*c)).collect()
    }

    /// Convert to an 8-bit `image` buffer.
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            image::Rgba(color_to_rgba(self.get(x, y)))
        })
    }

    /// Encode as PNG (format inferred from the extension).
    pub fn save(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        self.to_image().save(path)
    }
}

/// Render the scene through `camera`.
///
/// The scene's BVH must have been built with [`Scene::initialize_bvh`].
pub fn render(camera: &Camera, scene: &Scene, config: &RenderConfig) -> Result<ImageBuffer, RenderError> {
    config.validate()?;
    if camera.image_width == 0 || camera.image_height == 0 {
        return Err(RenderError::InvalidConfig {
            reason: format!(
                "resolution must be non-zero, got {}x{}",
                camera.image_width, camera.image_height
            ),
        });
    }
    if !scene.is_ready() {
        return Err(RenderError::SceneNotInitialized);
    }

    let tracer = PathTracer::new(config);
    let buckets = generate_buckets(camera.image_width, camera.image_height, config.bucket_size);
    let total = buckets.len();
    let report_every = (total / 10).max(1);
    let completed = AtomicUsize::new(0);
    let start = Instant::now();

    info!(
        "Rendering {}x{} @ {} spp ({} buckets, {} primitives, {} lights)",
        camera.image_width,
        camera.image_height,
        config.samples_per_pixel,
        total,
        scene.len(),
        scene.lights().len()
    );

    let render_one = |bucket: &Bucket| {
        let result = render_bucket(bucket, camera, scene, &tracer, config);
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Bucket {} done ({}/{})", result.bucket.index, done, total);
        if done % report_every == 0 || done == total {
            info!("Progress: {}%", done * 100 / total);
        }
        result
    };

    let results: Vec<BucketResult> = if config.parallel {
        buckets.par_iter().map(render_one).collect()
    } else {
        buckets.iter().map(render_one).collect()
    };

    let mut image = ImageBuffer::new(camera.image_width, camera.image_height);
    for result in &results {
        image.write_bucket(result);
    }

    info!("Render finished in {:.2?}", start.elapsed());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, Primitive, Vec3};
    use std::sync::Arc;

    fn sphere_scene() -> Scene {
        let mut scene = Scene::new();
        let gray = Arc::new(Material::lambertian(Color::splat(0.5)));
        scene.add(Primitive::sphere(Vec3::new(0.0, 0.0, -1.0), 0.5, gray).unwrap());
        scene.initialize_bvh().unwrap();
        scene
    }

    fn small_config() -> RenderConfig {
        RenderConfig {
            samples_per_pixel: 4,
            max_depth: 5,
            bucket_size: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Color::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Color::ONE), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Color::splat(100.0)), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Color::splat(f32::NAN))[0], 0);
        assert_eq!(color_to_rgba(Color::new(0.25, 0.0, 0.0))[0], 127);
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config: RenderConfig = serde_json::from_str(r#"{"samples_per_pixel": 8}"#).unwrap();
        assert_eq!(config.samples_per_pixel, 8);
        assert_eq!(config.max_depth, RenderConfig::default().max_depth);
        assert!(config.light_sampling);
    }

    #[test]
    fn test_config_validation() {
        assert!(RenderConfig::default().validate().is_ok());

        let config = RenderConfig {
            samples_per_pixel: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RenderError::InvalidConfig { .. })));
    }

    #[test]
    fn test_render_pixel() {
        let scene = sphere_scene();
        let camera = Camera::new().with_resolution(10, 10);
        let config = small_config();
        let tracer = PathTracer::new(&config);

        // Center pixel hits the sphere
        let color = render_pixel(&camera, &scene, &tracer, 5, 5, &config);
        assert!(color.length() > 0.0);

        // Same pixel, same seed, same answer
        let again = render_pixel(&camera, &scene, &tracer, 5, 5, &config);
        assert_eq!(color, again);
    }

    #[test]
    fn test_render_requires_initialized_scene() {
        let mut scene = Scene::new();
        let gray = Arc::new(Material::lambertian(Color::splat(0.5)));
        scene.add(Primitive::sphere(Vec3::ZERO, 1.0, gray).unwrap());

        let camera = Camera::new().with_resolution(4, 4);
        let result = render(&camera, &scene, &small_config());
        assert!(matches!(result, Err(RenderError::SceneNotInitialized)));
    }

    #[test]
    fn test_render_rejects_empty_resolution() {
        let scene = sphere_scene();
        let camera = Camera::new().with_resolution(0, 4);
        let result = render(&camera, &scene, &small_config());
        assert!(matches!(result, Err(RenderError::InvalidConfig { .. })));
    }

    #[test]
    fn test_render_parallel_matches_sequential() {
        let scene = sphere_scene();
        let camera = Camera::new().with_resolution(12, 9);

        let parallel = render(&camera, &scene, &small_config()).unwrap();
        let sequential = render(
            &camera,
            &scene,
            &RenderConfig {
                parallel: false,
                ..small_config()
            },
        )
        .unwrap();

        assert_eq!(parallel, sequential);
        assert!(parallel.pixels.iter().all(|c| c.is_finite() && c.min_element() >= 0.0));
    }

    #[test]
    fn test_image_to_rgba_layout() {
        let mut image = ImageBuffer::new(2, 1);
        image.set(1, 0, Color::ONE);
        assert_eq!(image.to_rgba(), vec![0, 0, 0, 255, 255, 255, 255, 255]);

        let rgba = image.to_image();
        assert_eq!(rgba.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }
}
