//! Radiance arriving from directions that hit nothing.

use crate::Color;
use ember_math::Vec3;
use serde::{Deserialize, Serialize};

/// Environment seen by rays that escape the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Background {
    /// Constant color in every direction
    Solid { color: Color },
    /// White at the horizon blending to sky blue overhead
    SkyGradient,
    /// Warm red below blending to deep blue above
    Sunset,
    /// No light from the environment
    Black,
}

impl Default for Background {
    fn default() -> Self {
        Background::SkyGradient
    }
}

impl Background {
    /// Radiance along `direction` (need not be normalized).
    pub fn radiance(&self, direction: Vec3) -> Color {
        let unit_direction = direction.normalize_or_zero();
        match *self {
            Background::Solid { color } => color,
            Background::SkyGradient => {
                let a = 0.5 * (unit_direction.y + 1.0);
                let white = Color::new(1.0, 1.0, 1.0);
                let blue = Color::new(0.5, 0.7, 1.0);
                white * (1.0 - a) + blue * a
            }
            Background::Sunset => {
                let red = Color::new(0.725, 0.268, 0.152);
                let blue = Color::new(0.18, 0.296, 0.952);
                let t = ((unit_direction.y + 0.5) / 1.2).clamp(0.0, 1.0);
                red.lerp(blue, t)
            }
            Background::Black => Color::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sky_gradient_endpoints() {
        let sky = Background::SkyGradient;
        assert!((sky.radiance(Vec3::Y) - Color::new(0.5, 0.7, 1.0)).length() < 1e-5);
        assert!((sky.radiance(Vec3::NEG_Y) - Color::ONE).length() < 1e-5);
        // Unnormalized directions give the same answer
        assert_eq!(sky.radiance(Vec3::Y * 10.0), sky.radiance(Vec3::Y));
    }

    #[test]
    fn test_sunset_saturates() {
        let sunset = Background::Sunset;
        assert!((sunset.radiance(Vec3::Y) - Color::new(0.18, 0.296, 0.952)).length() < 1e-5);
        assert!((sunset.radiance(Vec3::NEG_Y) - Color::new(0.725, 0.268, 0.152)).length() < 1e-5);
    }

    #[test]
    fn test_black_and_solid() {
        assert_eq!(Background::Black.radiance(Vec3::X), Color::ZERO);
        let solid = Background::Solid { color: Color::splat(0.25) };
        assert_eq!(solid.radiance(Vec3::Z), Color::splat(0.25));
    }

    #[test]
    fn test_background_serde() {
        let json = serde_json::to_string(&Background::Sunset).unwrap();
        assert_eq!(json, r#"{"type":"sunset"}"#);

        let solid: Background = serde_json::from_str(r#"{"type":"solid","color":[0.1,0.2,0.3]}"#).unwrap();
        assert_eq!(solid, Background::Solid { color: Color::new(0.1, 0.2, 0.3) });
    }
}
