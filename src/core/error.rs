//! Error types for shapefield

use thiserror::Error;

use crate::shape::ShapeKind;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid diameter {0}: must be finite and in (0, {max}]", max = crate::shape::MAX_DIAMETER)]
    InvalidDiameter(f64),

    #[error("Invalid thickness {0}: must be at least 1")]
    InvalidThickness(i64),

    #[error("Rotation {axis} = {degrees} is outside [-90, 90] degrees")]
    RotationOutOfRange { axis: char, degrees: f64 },

    #[error("Coordinate {0} is outside the supported world range")]
    CoordinateOutOfRange(f64),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Budget exceeded: requested {requested} samples, {available} available")]
    BudgetExceeded { available: i64, requested: u64 },

    #[error("No {kind} named '{name}'")]
    NotFound { kind: ShapeKind, name: String },

    #[error("No {kind}s to delete")]
    Empty { kind: ShapeKind },

    #[error("World '{0}' is not loaded")]
    WorldUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Sample sink error: {0}")]
    Sink(String),

    #[error("Config error: {0}")]
    Config(String),
}
