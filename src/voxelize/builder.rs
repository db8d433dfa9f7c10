//! Bounding-box scan that turns circle and sphere parameters into voxels.

use std::collections::HashSet;

use crate::core::types::{DVec3, IVec3};
use crate::math::lattice::{floor_to_lattice, pack, LatticeSet};
use crate::math::rotation::Tilt;
use super::shell::{on_disk_shell, on_sphere_shell};

/// Voxels of one shape, ready to render
///
/// Circles and spheres carry a center marker in addition to their shell.
/// The marker always costs one sample, even when it shares a cell with a
/// shell voxel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoxelSet {
    marker: Option<IVec3>,
    voxels: Vec<IVec3>,
}

impl VoxelSet {
    /// Set without a center marker (lines)
    pub fn from_path(voxels: Vec<IVec3>) -> Self {
        Self { marker: None, voxels }
    }

    fn with_marker(marker: IVec3, shell: LatticeSet) -> Self {
        Self { marker: Some(marker), voxels: shell.into_points() }
    }

    /// Center marker, if the shape has one
    pub fn marker(&self) -> Option<IVec3> {
        self.marker
    }

    /// Deduplicated shell voxels
    pub fn voxels(&self) -> &[IVec3] {
        &self.voxels
    }

    /// Every sample position: the marker first, then the shell
    pub fn iter(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.marker.into_iter().chain(self.voxels.iter().copied())
    }

    /// Samples emitted per render: `|shell| + 1` with a marker, `|path|` without
    pub fn sample_count(&self) -> u64 {
        self.voxels.len() as u64 + u64::from(self.marker.is_some())
    }
}

/// Half-width of the scan region for a diameter
#[inline]
pub fn scan_radius(diameter: f64) -> i32 {
    (diameter / 2.0).ceil() as i32
}

/// Voxelize a (possibly tilted) circle.
///
/// Scans the flat square `[-s, s]²`, keeps offsets on the ring, tilts them
/// and snaps the result to the lattice around the floored center. Tilting
/// can map two flat offsets onto the same cell, hence the set.
pub fn build_circle(center: DVec3, diameter: f64, thickness: u32, tilt: &Tilt) -> VoxelSet {
    let origin = floor_to_lattice(center);
    let radius = diameter / 2.0;
    let s = scan_radius(diameter);

    let mut shell = LatticeSet::new();
    for x in -s..=s {
        for z in -s..=s {
            if on_disk_shell(x, z, radius, thickness) {
                shell.insert(origin + tilt.apply_rounded(x, z));
            }
        }
    }

    VoxelSet::with_marker(origin, shell)
}

/// Voxelize a sphere by scanning the cube `[-s, s]³`
pub fn build_sphere(center: DVec3, diameter: f64, thickness: u32) -> VoxelSet {
    let origin = floor_to_lattice(center);
    let radius = diameter / 2.0;
    let s = scan_radius(diameter);

    let mut shell = LatticeSet::new();
    for x in -s..=s {
        for y in -s..=s {
            for z in -s..=s {
                if on_sphere_shell(x, y, z, radius, thickness) {
                    shell.insert(origin + IVec3::new(x, y, z));
                }
            }
        }
    }

    VoxelSet::with_marker(origin, shell)
}

/// Samples [`build_circle`] would produce, without keeping the voxels
pub fn count_circle(diameter: f64, thickness: u32, tilt: &Tilt) -> u64 {
    let radius = diameter / 2.0;
    let s = scan_radius(diameter);

    let mut offsets = HashSet::new();
    for x in -s..=s {
        for z in -s..=s {
            if on_disk_shell(x, z, radius, thickness) {
                offsets.insert(pack(tilt.apply_rounded(x, z)));
            }
        }
    }
    offsets.len() as u64 + 1
}

/// Samples [`build_sphere`] would produce. Scan offsets are distinct, so
/// nothing needs to be stored.
pub fn count_sphere(diameter: f64, thickness: u32) -> u64 {
    let radius = diameter / 2.0;
    let s = scan_radius(diameter);

    let mut shell = 0u64;
    for x in -s..=s {
        for y in -s..=s {
            shell += (-s..=s).filter(|&z| on_sphere_shell(x, y, z, radius, thickness)).count() as u64;
        }
    }
    shell + 1
}
