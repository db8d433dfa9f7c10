//! Circle tilt: rotate a flat-plane offset about local X, then about Z.
//!
//! Circles are authored in the X-Z plane. Tilting about X first lifts the
//! disk out of that plane; the Z rotation then spins the tilted disk. The two
//! rotations do not commute, so the order is fixed.
//!
//! Rotated components are rounded half away from zero (`f64::round`), so an
//! offset of exactly `2.5` lands on `3` and `-2.5` on `-3`.

use crate::core::types::{DVec3, IVec3};

/// Precomputed sines and cosines for a circle's rotation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tilt {
    sin_x: f64,
    cos_x: f64,
    sin_z: f64,
    cos_z: f64,
}

impl Tilt {
    /// No rotation
    pub const IDENTITY: Tilt = Tilt { sin_x: 0.0, cos_x: 1.0, sin_z: 0.0, cos_z: 1.0 };

    /// Build from rotation angles in degrees
    pub fn from_degrees(rot_x: f64, rot_z: f64) -> Self {
        let (sin_x, cos_x) = rot_x.to_radians().sin_cos();
        let (sin_z, cos_z) = rot_z.to_radians().sin_cos();
        Self { sin_x, cos_x, sin_z, cos_z }
    }

    /// Rotate the flat offset `(x, 0, z)` without rounding
    pub fn apply(&self, x: i32, z: i32) -> DVec3 {
        let (x, z) = (x as f64, z as f64);

        // About X: the z component tips into y
        let y1 = -z * self.sin_x;
        let z1 = z * self.cos_x;

        // About Z
        DVec3::new(
            x * self.cos_z - y1 * self.sin_z,
            x * self.sin_z + y1 * self.cos_z,
            z1,
        )
    }

    /// Rotate and snap to the nearest lattice offset
    pub fn apply_rounded(&self, x: i32, z: i32) -> IVec3 {
        round_half_away(self.apply(x, z))
    }
}

impl Default for Tilt {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Round each component to the nearest integer, ties away from zero
#[inline]
pub fn round_half_away(v: DVec3) -> IVec3 {
    v.round().as_ivec3()
}
