//! Ember - CPU path tracing
//!
//! A Monte Carlo path tracer over spheres, boxes and quads, accelerated by a
//! bounding volume hierarchy. Paths are shaded with next-event estimation,
//! multiple importance sampling and Russian roulette.

mod background;
mod bucket;
mod bvh;
mod camera;
mod cuboid;
mod error;
mod geometry;
mod integrator;
mod interaction;
mod material;
mod primitive;
mod quad;
mod renderer;
mod sampling;
mod scene;
mod sphere;

pub use background::Background;
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::{Bvh, BvhNode, BvhOptions, BvhStats, SplitMethod, TraversalStats};
pub use camera::Camera;
pub use cuboid::Cuboid;
pub use error::{RenderError, SceneError};
pub use geometry::{Geometry, Shape};
pub use integrator::{ray_color, PathSample, PathState, PathTracer, Termination};
pub use interaction::{Interaction, SurfaceHit, RAY_EPSILON};
pub use material::{reflect, reflectance, refract, Color, Lobe, Material, ScatterRecord};
pub use primitive::Primitive;
pub use quad::Quad;
pub use renderer::{color_to_rgba, linear_to_gamma, render, render_pixel, ImageBuffer, RenderConfig};
pub use sampling::{power_heuristic, Random};
pub use scene::Scene;
pub use sphere::Sphere;

/// Re-export common math types from ember_math
pub use ember_math::{Aabb, Interval, Ray, Transform, Vec2, Vec3};
