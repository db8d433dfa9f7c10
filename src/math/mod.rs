//! Lattice and rotation utilities

pub mod lattice;
pub mod rotation;

pub use lattice::{LatticeSet, pack, unpack, floor_to_lattice, cell_center};
pub use rotation::Tilt;
