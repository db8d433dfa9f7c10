//! 3D Bresenham line rasterization

use crate::core::types::IVec3;
use crate::math::lattice::LatticeSet;

/// Index of the axis with the largest delta. Ties prefer X, then Y.
fn dominant_axis(delta: [i32; 3]) -> usize {
    let [dx, dy, dz] = delta;
    if dx >= dy && dx >= dz {
        0
    } else if dy >= dz {
        1
    } else {
        2
    }
}

/// Voxel path from `start` to `end`, both inclusive, ordered along the line.
///
/// Steps one cell per iteration along the dominant axis. Each minor axis has
/// its own error accumulator seeded with `2·minor - major`. The end point is
/// appended explicitly after the walk.
pub fn rasterize_line(start: IVec3, end: IVec3) -> Vec<IVec3> {
    let from = start.to_array();
    let to = end.to_array();

    let mut delta = [0i32; 3];
    let mut step = [0i32; 3];
    for axis in 0..3 {
        delta[axis] = (to[axis] - from[axis]).abs();
        step[axis] = if from[axis] < to[axis] { 1 } else { -1 };
    }

    let major = dominant_axis(delta);
    let (a, b) = match major {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };

    let mut path = LatticeSet::new();
    let mut p = from;
    let mut err_a = 2 * delta[a] - delta[major];
    let mut err_b = 2 * delta[b] - delta[major];

    while p[major] != to[major] {
        path.insert(IVec3::from_array(p));
        if err_a > 0 {
            p[a] += step[a];
            err_a -= 2 * delta[major];
        }
        if err_b > 0 {
            p[b] += step[b];
            err_b -= 2 * delta[major];
        }
        err_a += 2 * delta[a];
        err_b += 2 * delta[b];
        p[major] += step[major];
    }
    path.insert(end);

    path.into_points()
}

/// Number of voxels [`rasterize_line`] yields: one per step along the
/// dominant axis, both ends included
pub fn line_length(start: IVec3, end: IVec3) -> u64 {
    let delta = (end.as_i64vec3() - start.as_i64vec3()).abs();
    delta.max_element() as u64 + 1
}
