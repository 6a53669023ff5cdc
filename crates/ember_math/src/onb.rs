use crate::Vec3;

/// Orthonormal basis built around a single axis.
///
/// Sampling routines work in a local frame where `w` is "up" (the surface
/// normal, or the direction toward a light) and map results back with [`Onb::local`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Onb {
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Onb {
    /// Build a basis whose `w` axis is `n` (normalized).
    pub fn from_w(n: Vec3) -> Self {
        let w = n.normalize();
        // Pick a helper axis that is not nearly parallel to w
        let helper = if w.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let v = w.cross(helper).normalize();
        let u = w.cross(v);
        Self { u, v, w }
    }

    /// Map local coordinates `(a.x, a.y, a.z)` to `a.x*u + a.y*v + a.z*w`.
    #[inline]
    pub fn local(&self, a: Vec3) -> Vec3 {
        a.x * self.u + a.y * self.v + a.z * self.w
    }
}
