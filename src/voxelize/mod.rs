//! Voxelization of shape parameters into lattice cells
//!
//! Circles and spheres are scanned over their bounding square/cube and
//! filtered by the shell test; lines are walked with 3D Bresenham.

pub mod shell;
pub mod builder;
pub mod line;

pub use shell::{on_disk_shell, on_sphere_shell};
pub use builder::{VoxelSet, build_circle, build_sphere, count_circle, count_sphere, scan_radius};
pub use line::{line_length, rasterize_line};
