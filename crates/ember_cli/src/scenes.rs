//! Built-in scenes selectable from the command line.

use std::sync::Arc;

use clap::ValueEnum;
use ember_math::{Vec2, Vec3};
use ember_renderer::{Background, BvhOptions, Camera, Color, Material, Primitive, Quad, Scene, SceneError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Diffuse, metal and glass spheres on a large ground sphere
    Spheres,
    /// Closed box lit by a ceiling quad, with two rotated blocks
    Cornell,
    /// Four small spherical lights above an infinite-looking floor
    Lights,
}

/// A scene ready for rendering plus how to look at it.
pub struct Setup {
    pub scene: Scene,
    pub camera: Camera,
    pub background: Background,
}

impl Preset {
    pub fn build(self, options: BvhOptions, width: Option<u32>, height: Option<u32>) -> Result<Setup, SceneError> {
        let mut setup = match self {
            Preset::Spheres => spheres(options)?,
            Preset::Cornell => cornell(options)?,
            Preset::Lights => lights(options)?,
        };

        if width.is_some() || height.is_some() {
            let w = width.unwrap_or(setup.camera.image_width);
            let h = height.unwrap_or(setup.camera.image_height);
            setup.camera = setup.camera.with_resolution(w, h);
        }

        log::info!("Built '{:?}' scene with {} primitives", self, setup.scene.len());
        setup.scene.initialize_bvh()?;
        Ok(setup)
    }
}

fn spheres(options: BvhOptions) -> Result<Setup, SceneError> {
    let mut scene = Scene::with_options(options);
    let glass = Arc::new(Material::tinted_dielectric(1.52, Color::new(0.7, 0.5, 1.0)));

    scene.add(Primitive::sphere(
        Vec3::new(0.0, 0.0, -1.0),
        0.5,
        Arc::new(Material::lambertian(Color::new(0.8, 0.3, 0.3))),
    )?);
    scene.add(Primitive::sphere(
        Vec3::new(1.0, 0.0, -1.0),
        0.4,
        Arc::new(Material::metal(Color::new(0.8, 0.6, 0.2), 1.0)),
    )?);
    scene.add(Primitive::sphere(
        Vec3::new(-1.0, 0.0, -1.0),
        0.4,
        Arc::new(Material::metal(Color::splat(0.8), 0.3)),
    )?);
    scene.add(Primitive::sphere(Vec3::new(0.25, 0.0, -0.35), 0.1, glass.clone())?);
    scene.add(Primitive::sphere(Vec3::new(-0.35, -0.1, -0.5), 0.1, glass)?);
    scene.add(Primitive::sphere(
        Vec3::new(0.0, -100.5, -1.0),
        100.0,
        Arc::new(Material::lambertian(Color::new(0.8, 0.8, 0.3))),
    )?);

    Ok(Setup {
        scene,
        camera: Camera::new().with_resolution(640, 360),
        background: Background::Sunset,
    })
}

/// Centered quad in its local XY plane, rotated by Euler angles in degrees.
fn quad(position: Vec3, size: Vec2, degrees: Vec3, material: Arc<Material>) -> Result<Primitive, SceneError> {
    let rotation = Vec3::new(degrees.x.to_radians(), degrees.y.to_radians(), degrees.z.to_radians());
    Ok(Primitive::new(Quad::from_transform(position, size, rotation)?, material))
}

fn cornell(options: BvhOptions) -> Result<Setup, SceneError> {
    let mut scene = Scene::with_options(options);
    let white = Arc::new(Material::lambertian(Color::ONE));
    let red = Arc::new(Material::lambertian(Color::new(1.0, 0.0, 0.0)));
    let green = Arc::new(Material::lambertian(Color::new(0.0, 1.0, 0.0)));
    let light = Arc::new(Material::diffuse_light(Color::new(1.0, 0.77, 0.4) * 7.0));

    // Just below the ceiling so the two never tie
    scene.add(quad(Vec3::new(0.0, 5.49, 0.0), Vec2::new(1.3, 1.0), Vec3::new(90.0, 0.0, 0.0), light)?);
    scene.add(quad(Vec3::new(-2.75, 2.75, 0.0), Vec2::new(5.6, 5.5), Vec3::new(0.0, 90.0, 0.0), red)?);
    scene.add(quad(Vec3::new(2.75, 2.75, 0.0), Vec2::new(5.6, 5.5), Vec3::new(0.0, -90.0, 0.0), green)?);
    scene.add(quad(Vec3::new(0.0, 2.75, -2.8), Vec2::splat(5.5), Vec3::ZERO, white.clone())?);
    scene.add(quad(Vec3::new(0.0, 0.0, 0.0), Vec2::new(5.5, 5.6), Vec3::new(-90.0, 0.0, 0.0), white.clone())?);
    scene.add(quad(Vec3::new(0.0, 5.5, 0.0), Vec2::new(5.5, 5.6), Vec3::new(90.0, 0.0, 0.0), white.clone())?);

    scene.add(Primitive::cuboid(
        Vec3::new(-0.9, 1.8, -1.0),
        Vec3::new(1.6, 3.6, 1.6),
        Vec3::new(0.0, 110_f32.to_radians(), 0.0),
        white.clone(),
    )?);
    scene.add(Primitive::cuboid(
        Vec3::new(0.9, 0.8, 1.0),
        Vec3::splat(1.6),
        Vec3::new(0.0, (-20_f32).to_radians(), 0.0),
        white,
    )?);

    let camera = Camera::new()
        .with_resolution(512, 512)
        .with_position(Vec3::new(0.0, 2.75, 10.0), Vec3::new(0.0, 2.75, 0.0), Vec3::Y)
        .with_fov(40.0);

    Ok(Setup {
        scene,
        camera,
        background: Background::Black,
    })
}

fn lights(options: BvhOptions) -> Result<Setup, SceneError> {
    let mut scene = Scene::with_options(options);

    let emitters = [
        (3.0, 0.5, Color::new(0.0, 0.8, 0.9)),
        (1.0, 0.3, Color::new(0.0, 0.8, 0.5)),
        (-1.0, 0.1, Color::new(0.9, 0.9, 0.5)),
        (-3.0, 0.05, Color::splat(0.9)),
    ];
    for (x, radius, emit) in emitters {
        scene.add(Primitive::sphere(
            Vec3::new(x, 5.75, -2.8),
            radius,
            Arc::new(Material::diffuse_light(emit)),
        )?);
    }
    scene.add(quad(
        Vec3::ZERO,
        Vec2::splat(10_000.0),
        Vec3::new(-90.0, 0.0, 0.0),
        Arc::new(Material::lambertian(Color::ONE)),
    )?);

    let camera = Camera::new()
        .with_resolution(512, 512)
        .with_position(Vec3::new(0.0, 2.75, 10.0), Vec3::new(0.0, 2.75, 0.0), Vec3::Y)
        .with_fov(40.0);

    Ok(Setup {
        scene,
        camera,
        background: Background::Black,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_build() {
        for preset in [Preset::Spheres, Preset::Cornell, Preset::Lights] {
            let setup = preset.build(BvhOptions::default(), None, None).unwrap();
            assert!(setup.scene.is_ready());
            assert!(!setup.scene.is_empty());
        }
    }

    #[test]
    fn test_cornell_has_one_light() {
        let setup = Preset::Cornell.build(BvhOptions::default(), None, None).unwrap();
        assert_eq!(setup.scene.lights().len(), 1);
        assert_eq!(setup.scene.len(), 8);
    }

    #[test]
    fn test_resolution_override() {
        let setup = Preset::Spheres.build(BvhOptions::default(), Some(64), None).unwrap();
        assert_eq!(setup.camera.image_width, 64);
        assert_eq!(setup.camera.image_height, 360);
    }
}
