#![allow(dead_code)]

use ember_renderer::{render, Camera, ImageBuffer, RenderConfig, Scene};

/// Small, quick settings shared by the image-level tests.
pub fn quick_config(samples_per_pixel: u32) -> RenderConfig {
    RenderConfig {
        samples_per_pixel,
        max_depth: 8,
        bucket_size: 8,
        ..RenderConfig::default()
    }
}

/// Builds the BVH and renders, panicking on any error.
pub fn render_simple(mut scene: Scene, camera: &Camera, config: &RenderConfig) -> ImageBuffer {
    scene.initialize_bvh().expect("failed building BVH");
    render(camera, &scene, config).expect("render failed")
}

pub fn assert_valid_image(image: &ImageBuffer) {
    for (i, c) in image.pixels.iter().enumerate() {
        assert!(c.is_finite(), "pixel {i} is not finite: {c:?}");
        assert!(c.min_element() >= 0.0, "pixel {i} is negative: {c:?}");
    }
}
