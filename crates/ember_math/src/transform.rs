// Affine transforms for placing shapes in the world.
//
// glam::Mat4 already provides transform_point3(), transform_vector3() and inverse();
// Transform caches the inverse so ray queries never invert a matrix.

use crate::{Aabb, EulerRot, Mat4, Quat, Ray, Vec3};

/// Extension trait for Mat4 with bounding-box support.
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        let (lo, hi) = (aabb.min(), aabb.max());
        let corners = (0..8).map(|i| {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            self.transform_point3(corner)
        });
        Aabb::enclosing(corners)
    }
}

/// An affine transform with its cached inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Mat4,
    inverse: Mat4,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        matrix: Mat4::IDENTITY,
        inverse: Mat4::IDENTITY,
    };

    /// Wrap a matrix, computing its inverse once.
    pub fn new(matrix: Mat4) -> Self {
        Self {
            matrix,
            inverse: matrix.inverse(),
        }
    }

    /// Pure translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            matrix: Mat4::from_translation(translation),
            inverse: Mat4::from_translation(-translation),
        }
    }

    /// Scale, then rotate (Euler XYZ, radians), then translate.
    pub fn from_translation_rotation_scale(translation: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        let rotation = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
        Self::new(Mat4::from_scale_rotation_translation(scale, rotation, translation))
    }

    /// Rotate (Euler XYZ, radians), then translate.
    pub fn from_translation_rotation(translation: Vec3, rotation: Vec3) -> Self {
        Self::from_translation_rotation_scale(translation, rotation, Vec3::ONE)
    }

    #[inline]
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    #[inline]
    pub fn inverse_matrix(&self) -> &Mat4 {
        &self.inverse
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Transform {
        Transform {
            matrix: self.inverse,
            inverse: self.matrix,
        }
    }

    /// Transform a point (w = 1).
    #[inline]
    pub fn point(&self, p: Vec3) -> Vec3 {
        self.matrix.transform_point3(p)
    }

    /// Transform a direction (w = 0); translation has no effect.
    #[inline]
    pub fn vector(&self, v: Vec3) -> Vec3 {
        self.matrix.transform_vector3(v)
    }

    /// Transform a surface normal with the inverse transpose and renormalize.
    #[inline]
    pub fn normal(&self, n: Vec3) -> Vec3 {
        self.inverse.transpose().transform_vector3(n).normalize_or_zero()
    }

    /// Transform a ray. The parametric distance `t` is preserved because the
    /// direction is transformed without renormalizing.
    #[inline]
    pub fn ray(&self, r: &Ray) -> Ray {
        Ray::new(self.point(r.origin), self.vector(r.direction), r.time)
    }

    /// World bounds of a local-space box.
    pub fn aabb(&self, b: &Aabb) -> Aabb {
        self.matrix.transform_aabb(b)
    }

    /// True if both matrices contain only finite numbers.
    pub fn is_finite(&self) -> bool {
        self.matrix.is_finite() && self.inverse.is_finite()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
