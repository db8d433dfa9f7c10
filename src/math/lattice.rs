//! Integer lattice keys and deduplicating point sets

use std::collections::HashSet;

use crate::core::types::{DVec3, IVec3};

/// Bits stored per axis in a packed key
pub const AXIS_BITS: u32 = 21;

const AXIS_BIAS: i32 = 1 << (AXIS_BITS - 1);
const AXIS_MASK: u64 = (1 << AXIS_BITS) - 1;

/// Smallest coordinate representable on each axis
pub const LATTICE_MIN: i32 = -AXIS_BIAS;
/// Largest coordinate representable on each axis
pub const LATTICE_MAX: i32 = AXIS_BIAS - 1;

/// Pack a lattice point into a single key.
///
/// Each axis is biased into `0..2^21` and laid out as `x | y | z` from the
/// high bits down, so key order equals lexicographic `(x, y, z)` order.
#[inline]
pub fn pack(p: IVec3) -> u64 {
    debug_assert!(in_range(p), "lattice point out of range: {p}");
    let bias = |v: i32| ((v + AXIS_BIAS) as u64) & AXIS_MASK;
    (bias(p.x) << (2 * AXIS_BITS)) | (bias(p.y) << AXIS_BITS) | bias(p.z)
}

/// Inverse of [`pack`]
#[inline]
pub fn unpack(key: u64) -> IVec3 {
    let unbias = |v: u64| (v & AXIS_MASK) as i32 - AXIS_BIAS;
    IVec3::new(
        unbias(key >> (2 * AXIS_BITS)),
        unbias(key >> AXIS_BITS),
        unbias(key),
    )
}

/// Whether every axis of `p` fits in a packed key
pub fn in_range(p: IVec3) -> bool {
    p.cmpge(IVec3::splat(LATTICE_MIN)).all() && p.cmple(IVec3::splat(LATTICE_MAX)).all()
}

/// Lattice cell containing a continuous point
#[inline]
pub fn floor_to_lattice(p: DVec3) -> IVec3 {
    p.floor().as_ivec3()
}

/// Center of a lattice cell
#[inline]
pub fn cell_center(p: IVec3) -> DVec3 {
    p.as_dvec3() + DVec3::splat(0.5)
}

/// Deduplicating set of lattice points that remembers insertion order
#[derive(Clone, Debug, Default)]
pub struct LatticeSet {
    seen: HashSet<u64>,
    points: Vec<IVec3>,
}

impl LatticeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a point. Returns false if it was already present.
    pub fn insert(&mut self, p: IVec3) -> bool {
        if self.seen.insert(pack(p)) {
            self.points.push(p);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, p: IVec3) -> bool {
        self.seen.contains(&pack(p))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in insertion order
    pub fn into_points(self) -> Vec<IVec3> {
        self.points
    }
}
