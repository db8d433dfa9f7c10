//! Host-facing sample sink.
//!
//! The host owns the actual particle primitive; the engine only hands it one
//! [`Sample`] per voxel, positioned at the voxel's cell center.

use std::sync::{Mutex, PoisonError};

use crate::core::types::{DVec3, Result};
use crate::shape::Rgb;

/// One rendered point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample<'a> {
    /// World the sample is spawned in
    pub world: &'a str,
    /// Cell center: voxel + (0.5, 0.5, 0.5)
    pub position: DVec3,
    pub color: Rgb,
    pub size: f32,
}

/// Particle-spawning primitive supplied by the host.
///
/// Called concurrently from the render pass for different owners.
pub trait SampleSink: Send + Sync {
    fn spawn_sample(&self, sample: &Sample<'_>) -> Result<()>;
}

/// Owned copy of a [`Sample`]
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedSample {
    pub world: String,
    pub position: DVec3,
    pub color: Rgb,
    pub size: f32,
}

/// Sink that stores every sample it receives
#[derive(Debug, Default)]
pub struct CollectingSink {
    samples: Mutex<Vec<RecordedSample>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples received so far
    pub fn len(&self) -> usize {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the recorded samples
    pub fn take(&self) -> Vec<RecordedSample> {
        std::mem::take(&mut *self.samples.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl SampleSink for CollectingSink {
    fn spawn_sample(&self, sample: &Sample<'_>) -> Result<()> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedSample {
                world: sample.world.to_string(),
                position: sample.position,
                color: sample.color,
                size: sample.size,
            });
        Ok(())
    }
}
