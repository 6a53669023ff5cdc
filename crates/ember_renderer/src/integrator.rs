//! Path tracing integrator.
//!
//! Estimates the radiance arriving along one camera ray with an iterative
//! random walk:
//! - Emission is accumulated at every hit
//! - Materials pick the next direction by importance sampling
//! - At diffuse hits one light is sampled directly (next event estimation)
//!   and combined with the BRDF sample through the power heuristic
//! - Long paths are ended by Russian roulette and a hard depth limit

use crate::material::Lobe;
use crate::sampling::{power_heuristic, Random};
use crate::{Background, Color, Interaction, RenderConfig, Scene};
use ember_math::{Ray, Vec3};

/// Why a path stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Escaped the scene and picked up the background
    Miss,
    /// The material did not scatter (lights, rejected metal samples)
    Absorbed,
    /// Reached the configured maximum number of bounces
    DepthLimit,
    /// Killed by Russian roulette
    RussianRoulette,
}

/// Position of a path in its life cycle. Terminal states never resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    /// Tracing the camera ray
    Primary,
    /// Tracing a scattered ray
    Scattering,
    Terminated(Termination),
}

/// Outcome of tracing one path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub radiance: Color,
    pub termination: Termination,
    /// Number of scattering events along the path
    pub bounces: u32,
}

/// Settings for the random walk, taken from a [`RenderConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PathTracer {
    pub max_depth: u32,
    pub russian_roulette: bool,
    pub roulette_start_depth: u32,
    pub light_sampling: bool,
    pub background: Background,
}

/// Lowest survival probability Russian roulette will use.
const MIN_SURVIVAL: f32 = 0.05;

impl PathTracer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            russian_roulette: config.russian_roulette,
            roulette_start_depth: config.roulette_start_depth,
            light_sampling: config.light_sampling,
            background: config.background,
        }
    }

    /// Trace one path starting with `ray`.
    ///
    /// A non-finite estimate is replaced by zero so one bad sample cannot
    /// poison a pixel.
    pub fn trace_path(&self, scene: &Scene, ray: &Ray, rng: &mut Random) -> PathSample {
        let mut radiance = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut ray = *ray;
        let mut bounces = 0;
        let mut state = PathState::Primary;

        // Origin and BRDF pdf of the last diffuse bounce when light sampling
        // also covered it; emission hit next must then be MIS weighted
        let mut light_sampled_from: Option<(Vec3, f32)> = None;

        let termination = loop {
            if let PathState::Terminated(termination) = state {
                break termination;
            }

            let Some(rec) = scene.intersect(&ray) else {
                radiance += throughput * self.background.radiance(ray.direction);
                state = PathState::Terminated(Termination::Miss);
                continue;
            };

            let emitted = rec.material.emitted(&rec);
            if emitted != Color::ZERO {
                let weight = match light_sampled_from {
                    Some((origin, brdf_pdf)) => {
                        let light_pdf = scene.light_pdf(rec.primitive, origin, -rec.wo);
                        power_heuristic(brdf_pdf, light_pdf)
                    }
                    None => 1.0,
                };
                radiance += throughput * emitted * weight;
            }

            if bounces >= self.max_depth {
                state = PathState::Terminated(Termination::DepthLimit);
                continue;
            }

            // Scatter expects a unit direction; -wo is the normalized ray direction
            let incoming = Ray::new(ray.origin, -rec.wo, ray.time);
            let Some(scatter) = rec.material.scatter(&incoming, &rec, rng) else {
                state = PathState::Terminated(Termination::Absorbed);
                continue;
            };

            light_sampled_from = None;
            if self.light_sampling && scatter.lobe == Lobe::Diffuse && !scene.lights().is_empty() {
                radiance += throughput * self.sample_light(scene, &rec, rng);
                let brdf_pdf = rec.material.scattering_pdf(&rec, scatter.scattered.direction);
                light_sampled_from = Some((rec.p, brdf_pdf));
            }

            throughput *= scatter.attenuation;
            ray = scatter.scattered;
            bounces += 1;

            if self.russian_roulette && bounces >= self.roulette_start_depth {
                let survival = throughput.max_element().clamp(MIN_SURVIVAL, 1.0);
                if rng.uniform() >= survival {
                    state = PathState::Terminated(Termination::RussianRoulette);
                    continue;
                }
                throughput /= survival;
            }

            state = PathState::Scattering;
        };

        if !radiance.is_finite() {
            log::trace!("Discarding non-finite path sample {radiance:?}");
            radiance = Color::ZERO;
        }

        PathSample {
            radiance,
            termination,
            bounces,
        }
    }

    /// Direct light at a diffuse hit from one uniformly chosen light, MIS
    /// weighted against BRDF sampling.
    fn sample_light(&self, scene: &Scene, rec: &Interaction, rng: &mut Random) -> Color {
        let lights = scene.lights();
        let pick = ((rng.uniform() * lights.len() as f32) as usize).min(lights.len() - 1);
        let light = lights[pick];

        let point = scene.primitive(light).sample(rec.p, rng.uniform2());
        let Some(direction) = (point - rec.p).try_normalize() else {
            return Color::ZERO;
        };

        let f = rec.material.evaluate(rec, direction);
        if f == Color::ZERO {
            return Color::ZERO;
        }

        let light_pdf = scene.light_pdf(light, rec.p, direction);
        if !(light_pdf > 0.0) {
            return Color::ZERO;
        }

        // Only light arriving directly from the chosen emitter counts
        let shadow_ray = rec.spawn_ray(direction);
        let Some(hit) = scene.intersect(&shadow_ray) else {
            return Color::ZERO;
        };
        if hit.primitive != light {
            return Color::ZERO;
        }

        let brdf_pdf = rec.material.scattering_pdf(rec, direction);
        let weight = power_heuristic(light_pdf, brdf_pdf);
        f * hit.material.emitted(&hit) * weight / light_pdf
    }
}

/// Radiance seen along `ray`.
pub fn ray_color(ray: &Ray, scene: &Scene, config: &RenderConfig, rng: &mut Random) -> Color {
    PathTracer::new(config).trace_path(scene, ray, rng).radiance
}
