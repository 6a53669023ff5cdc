//! Surface materials.
//!
//! The set of materials is closed, so they are a single enum dispatched by
//! `match`. Materials are shared between primitives through `Arc<Material>`.

use crate::interaction::Interaction;
use crate::sampling::Random;
use ember_math::{Ray, Vec3};
use std::f32::consts::FRAC_1_PI;

/// Color type alias (linear RGB, typically 0-1)
pub type Color = Vec3;

/// Kind of scattering event, used by the integrator to decide whether light
/// sampling applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lobe {
    /// Smooth distribution whose BRDF can be evaluated for any direction
    Diffuse,
    /// Mirror-like or refractive; only the sampled direction carries energy
    Specular,
}

/// Result of a successful scatter.
#[derive(Debug, Clone, Copy)]
pub struct ScatterRecord {
    /// Throughput multiplier for the scattered path (BRDF * cos / pdf)
    pub attenuation: Color,
    /// Outgoing ray, leaving the hit point
    pub scattered: Ray,
    pub lobe: Lobe,
}

/// How light interacts with a surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Ideal diffuse reflector.
    Lambertian { albedo: Color },
    /// Reflective metal; `fuzz` in [0, 1] blurs the mirror direction.
    Metal { albedo: Color, fuzz: f32 },
    /// Glass-like refractor. `tint` scales transmitted and reflected light.
    Dielectric { ior: f32, tint: Color },
    /// Emitter that does not reflect.
    DiffuseLight { emit: Color },
}

impl Material {
    pub fn lambertian(albedo: Color) -> Self {
        Material::Lambertian { albedo }
    }

    /// - `albedo`: The color of the metal
    /// - `fuzz`: Roughness, 0.0 = perfect mirror, 1.0 = very rough
    pub fn metal(albedo: Color, fuzz: f32) -> Self {
        Material::Metal {
            albedo,
            fuzz: fuzz.clamp(0.0, 1.0),
        }
    }

    /// Clear dielectric. `ior`: 1.0 = air, 1.5 = glass, 2.4 = diamond
    pub fn dielectric(ior: f32) -> Self {
        Self::tinted_dielectric(ior, Color::ONE)
    }

    pub fn tinted_dielectric(ior: f32, tint: Color) -> Self {
        Material::Dielectric { ior, tint }
    }

    pub fn diffuse_light(emit: Color) -> Self {
        Material::DiffuseLight { emit }
    }

    /// Scatter an incoming ray.
    ///
    /// Returns `None` if the ray is absorbed. `ray_in` must have a unit direction.
    pub fn scatter(&self, ray_in: &Ray, rec: &Interaction, rng: &mut Random) -> Option<ScatterRecord> {
        match *self {
            Material::Lambertian { albedo } => {
                let direction = rng.cosine_direction(rec.normal);
                Some(ScatterRecord {
                    attenuation: albedo,
                    scattered: rec.spawn_ray(direction),
                    lobe: Lobe::Diffuse,
                })
            }

            Material::Metal { albedo, fuzz } => {
                let reflected = reflect(ray_in.direction, rec.normal);
                let direction = (reflected + fuzz * rng.unit_vector()).try_normalize()?;

                // Only scatter if the reflected ray is in the same hemisphere as the normal
                if direction.dot(rec.normal) <= 0.0 {
                    return None;
                }
                Some(ScatterRecord {
                    attenuation: albedo,
                    scattered: rec.spawn_ray(direction),
                    lobe: Lobe::Specular,
                })
            }

            Material::Dielectric { ior, tint } => {
                let refraction_ratio = if rec.front_face { 1.0 / ior } else { ior };

                let unit_direction = ray_in.direction;
                let cos_theta = (-unit_direction).dot(rec.normal).min(1.0);
                let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

                // Check for total internal reflection
                let cannot_refract = refraction_ratio * sin_theta > 1.0;

                let direction = if cannot_refract || reflectance(cos_theta, refraction_ratio) > rng.uniform() {
                    reflect(unit_direction, rec.normal)
                } else {
                    refract(unit_direction, rec.normal, refraction_ratio)
                };

                Some(ScatterRecord {
                    attenuation: tint,
                    scattered: rec.spawn_ray(direction.normalize_or_zero()),
                    lobe: Lobe::Specular,
                })
            }

            // Lights don't scatter rays
            Material::DiffuseLight { .. } => None,
        }
    }

    /// Radiance emitted from the hit point toward `rec.wo`. Emitters shine
    /// from both sides.
    pub fn emitted(&self, _rec: &Interaction) -> Color {
        match *self {
            Material::DiffuseLight { emit } => emit,
            _ => Color::ZERO,
        }
    }

    pub fn is_emissive(&self) -> bool {
        match *self {
            Material::DiffuseLight { emit } => emit.max_element() > 0.0,
            _ => false,
        }
    }

    /// Density (solid angle) with which [`Material::scatter`] picks `direction`.
    /// Zero for specular materials, whose distributions are not evaluable.
    pub fn scattering_pdf(&self, rec: &Interaction, direction: Vec3) -> f32 {
        match self {
            Material::Lambertian { .. } => rec.normal.dot(direction).max(0.0) * FRAC_1_PI,
            _ => 0.0,
        }
    }

    /// BRDF times cosine for the unit `direction`. Zero for specular materials.
    pub fn evaluate(&self, rec: &Interaction, direction: Vec3) -> Color {
        match *self {
            Material::Lambertian { albedo } => albedo * FRAC_1_PI * rec.normal.dot(direction).max(0.0),
            _ => Color::ZERO,
        }
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface with unit normal `n`.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// Schlick's approximation for reflectance.
#[inline]
pub fn reflectance(cosine: f32, refraction_ratio: f32) -> f32 {
    let r0 = ((1.0 - refraction_ratio) / (1.0 + refraction_ratio)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}
