//! Pinhole camera for primary ray generation.

use crate::sampling::Random;
use ember_math::{Ray, Vec2, Vec3};

/// Camera for generating rays into the scene.
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    /// Vertical field of view in degrees
    vfov: f32,

    // Cached computed values (set by initialize())
    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    w: Vec3,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        let mut camera = Self {
            image_width: 400,
            image_height: 225,
            look_from: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            vup: Vec3::Y,
            vfov: 90.0,
            center: Vec3::ZERO,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            w: Vec3::Z,
        };
        camera.initialize();
        camera
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self.initialize();
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self.initialize();
        self
    }

    /// Recompute the cached viewport after changing settings.
    pub fn initialize(&mut self) {
        self.center = self.look_from;
        let width = self.image_width.max(1) as f32;
        let height = self.image_height.max(1) as f32;

        // Calculate viewport dimensions on the plane one unit in front
        let theta = self.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (width / height);

        // Calculate camera basis vectors
        self.w = (self.look_from - self.look_at).normalize_or_zero();
        let u = self.vup.cross(self.w).normalize_or_zero();
        let v = self.w.cross(u);

        // Calculate viewport vectors
        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        // Calculate pixel delta vectors
        self.pixel_delta_u = viewport_u / width;
        self.pixel_delta_v = viewport_v / height;

        // Upper-left corner of pixel (0, 0)
        self.pixel00_loc = self.center - self.w - viewport_u / 2.0 - viewport_v / 2.0;
    }

    /// Ray through pixel `(x, y)` at sub-pixel position `offset` in `[0, 1)^2`.
    ///
    /// Rows run top to bottom. The direction is not normalized.
    pub fn generate_ray(&self, x: u32, y: u32, offset: Vec2) -> Ray {
        let pixel_sample = self.pixel00_loc
            + (x as f32 + offset.x) * self.pixel_delta_u
            + (y as f32 + offset.y) * self.pixel_delta_v;

        Ray::new(self.center, pixel_sample - self.center, 0.0)
    }

    /// Ray through a uniformly jittered point of pixel `(x, y)`.
    pub fn get_ray(&self, x: u32, y: u32, rng: &mut Random) -> Ray {
        let offset = rng.uniform2();
        self.generate_ray(x, y, offset)
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        -self.w
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
