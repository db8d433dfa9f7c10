//! Core type aliases and re-exports

pub use glam::{DVec3, IVec3};

/// Stable identity of a shape owner
pub type OwnerId = uuid::Uuid;

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
