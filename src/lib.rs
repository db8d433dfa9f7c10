//! Shapefield - persistent voxelized particle shapes
//!
//! Owners place circles, spheres and lines in named worlds. Each shape is
//! voxelized once into lattice cells; every render tick emits one sample per
//! cell to a host-supplied sink. A per-owner sample budget bounds how much a
//! single owner can draw, and every change is saved to a JSON file per owner.

pub mod core;
pub mod math;
pub mod voxelize;
pub mod shape;
pub mod registry;
pub mod storage;
pub mod render;
pub mod world;
