//! Tile scheduling.
//!
//! The image is cut into square buckets that rayon renders independently.
//! Buckets are ordered center-out so the middle of the frame finishes first.

use crate::integrator::PathTracer;
use crate::renderer::render_pixel;
use crate::{Camera, Color, RenderConfig, Scene};

/// Default bucket edge length in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 32;

/// A rectangular block of pixels, clipped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Top-left pixel column
    pub x: u32,
    /// Top-left pixel row
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position in the render order
    pub index: usize,
}

impl Bucket {
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Image coordinates covered by this bucket, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }

    fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 * 0.5,
            self.y as f32 + self.height as f32 * 0.5,
        )
    }
}

/// Cover a `width` x `height` image with buckets of at most `bucket_size`
/// pixels per side, nearest to the image center first.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let size = bucket_size.max(1);
    let mut buckets: Vec<Bucket> = (0..height)
        .step_by(size as usize)
        .flat_map(|y| {
            (0..width).step_by(size as usize).map(move |x| Bucket {
                x,
                y,
                width: size.min(width - x),
                height: size.min(height - y),
                index: 0,
            })
        })
        .collect();

    let (cx, cy) = (width as f32 * 0.5, height as f32 * 0.5);
    let distance = |b: &Bucket| {
        let (bx, by) = b.center();
        (bx - cx).powi(2) + (by - cy).powi(2)
    };
    // Stable: equally distant buckets keep row-major order
    buckets.sort_by(|a, b| distance(a).total_cmp(&distance(b)));

    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }
    buckets
}

/// Pixels of one finished bucket.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    /// Linear radiance in the order of [`Bucket::pixels`]
    pub pixels: Vec<Color>,
}

pub fn render_bucket(
    bucket: &Bucket,
    camera: &Camera,
    scene: &Scene,
    tracer: &PathTracer,
    config: &RenderConfig,
) -> BucketResult {
    let pixels = bucket
        .pixels()
        .map(|(x, y)| render_pixel(camera, scene, tracer, x, y, config))
        .collect();

    BucketResult {
        bucket: *bucket,
        pixels,
    }
}
