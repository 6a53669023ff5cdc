//! Seedable random stream and the sample warping functions built on it.
//!
//! Every stochastic decision in the renderer (pixel jitter, BRDF sampling,
//! light sampling, Russian roulette) draws from a [`Random`]. One instance per
//! pixel, seeded from the global seed and the pixel index, keeps renders
//! reproducible no matter how buckets are scheduled across threads.

use glam::{Vec2, Vec3};
use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use ember_math::Onb;

/// Seedable pseudo-random stream of uniform values in `[0, 1)`.
///
/// Identical seeds produce identical sequences.
#[derive(Debug, Clone)]
pub struct Random {
    rng: Pcg64Mcg,
}

impl Random {
    /// Create a stream from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Independent stream for one pixel of a render seeded with `seed`.
    pub fn for_pixel(seed: u64, pixel_index: u64) -> Self {
        Self::new(splitmix64(seed ^ splitmix64(pixel_index)))
    }

    /// Uniform value in `[0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// Two independent uniform values in `[0, 1)`.
    #[inline]
    pub fn uniform2(&mut self) -> Vec2 {
        Vec2::new(self.uniform(), self.uniform())
    }

    /// Uniform point in the unit disk.
    pub fn in_unit_disk(&mut self) -> Vec2 {
        let u = self.uniform2();
        concentric_sample_disk(u)
    }

    /// Uniform direction on the unit sphere.
    pub fn unit_vector(&mut self) -> Vec3 {
        let u = self.uniform2();
        uniform_sample_sphere(u)
    }

    /// Cosine-weighted direction in the hemisphere around `normal`.
    pub fn cosine_direction(&mut self, normal: Vec3) -> Vec3 {
        let local = cosine_sample_hemisphere(self.uniform2());
        Onb::from_w(normal).local(local)
    }
}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// SplitMix64 finalizer, used to decorrelate per-pixel seeds.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

// =============================================================================
// Warping functions: map uniform samples in [0,1)^2 to other domains
// =============================================================================

/// Concentric (Shirley-Chiu) mapping of the unit square onto the unit disk.
pub fn concentric_sample_disk(u: Vec2) -> Vec2 {
    let offset = 2.0 * u - Vec2::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (offset.y, FRAC_PI_2 - FRAC_PI_4 * (offset.x / offset.y))
    };
    r * Vec2::new(theta.cos(), theta.sin())
}

/// Cosine-weighted direction around +Z (Malley's method).
pub fn cosine_sample_hemisphere(u: Vec2) -> Vec3 {
    let d = concentric_sample_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

/// Density of [`cosine_sample_hemisphere`] for a direction at `cos_theta` from the axis.
#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.max(0.0) / PI
}

/// Uniform direction on the unit sphere.
pub fn uniform_sample_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform direction inside a cone around +Z with half-angle `acos(cos_theta_max)`.
pub fn uniform_sample_cone(u: Vec2, cos_theta_max: f32) -> Vec3 {
    let cos_theta = 1.0 + u.x * (cos_theta_max - 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Density of [`uniform_sample_cone`] in solid angle.
#[inline]
pub fn uniform_cone_pdf(cos_theta_max: f32) -> f32 {
    1.0 / (2.0 * PI * (1.0 - cos_theta_max))
}

/// Power heuristic (beta = 2) weight for strategy `f` against strategy `g`.
#[inline]
pub fn power_heuristic(f_pdf: f32, g_pdf: f32) -> f32 {
    let f2 = f_pdf * f_pdf;
    let g2 = g_pdf * g_pdf;
    if f2 + g2 == 0.0 {
        return 0.0;
    }
    f2 / (f2 + g2)
}
