//! One render pass over an owner's shapes.

use std::any::Any;
use std::ops::AddAssign;
use std::panic::{self, AssertUnwindSafe};

use crate::registry::collection::OwnerShapes;
use crate::render::sink::SampleSink;

/// Counters for a render pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub owners: usize,
    pub shapes: usize,
    pub samples: u64,
    /// Shapes whose rendering stopped on a sink error or panic
    pub failures: usize,
}

impl RenderStats {
    pub fn merge(mut self, other: RenderStats) -> RenderStats {
        self += other;
        self
    }
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: RenderStats) {
        self.owners += other.owners;
        self.shapes += other.shapes;
        self.samples += other.samples;
        self.failures += other.failures;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic"
    }
}

/// Render every live shape of one owner.
///
/// A shape whose sink call fails or panics is logged and skipped; the rest
/// still render.
pub fn draw_owner(shapes: &OwnerShapes, sink: &dyn SampleSink, size: f32) -> RenderStats {
    let mut stats = RenderStats { owners: 1, ..Default::default() };
    for (kind, name, shape) in shapes.shapes() {
        stats.shapes += 1;
        match panic::catch_unwind(AssertUnwindSafe(|| shape.render(sink, size))) {
            Ok(Ok(emitted)) => stats.samples += emitted,
            Ok(Err(e)) => {
                stats.failures += 1;
                log::warn!("Render of {kind} '{name}' in {} failed: {e}", shape.world());
            }
            Err(payload) => {
                stats.failures += 1;
                log::error!(
                    "Render of {kind} '{name}' in {} panicked: {}",
                    shape.world(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::core::types::{DVec3, Result};
    use crate::render::sink::{CollectingSink, Sample};
    use crate::shape::{Circle, Line, Rgb, Shape};

    /// Rejects samples in one world
    struct RejectWorld(&'static str, CollectingSink);

    impl SampleSink for RejectWorld {
        fn spawn_sample(&self, sample: &Sample<'_>) -> Result<()> {
            if sample.world == self.0 {
                return Err(Error::Sink(format!("{} is unloading", self.0)));
            }
            self.1.spawn_sample(sample)
        }
    }

    fn owner() -> OwnerShapes {
        let mut owner = OwnerShapes::new();
        owner
            .propose("ring", Shape::new("world", Rgb::LIME, Circle::new(DVec3::ZERO, 10.0)).unwrap(), 1000)
            .unwrap();
        owner
            .propose("beam", Shape::new("nether", Rgb::RED, Line::new(DVec3::ZERO, DVec3::new(4.0, 0.0, 0.0))).unwrap(), 1000)
            .unwrap();
        owner
    }

    #[test]
    fn test_draw_owner_emits_every_sample() {
        let owner = owner();
        let sink = CollectingSink::new();
        let stats = draw_owner(&owner, &sink, 1.5);

        assert_eq!(stats, RenderStats { owners: 1, shapes: 2, samples: 42, failures: 0 });
        assert_eq!(sink.len() as u64, owner.total_samples());
    }

    #[test]
    fn test_failure_does_not_stop_pass() {
        let owner = owner();
        let sink = RejectWorld("nether", CollectingSink::new());
        let stats = draw_owner(&owner, &sink, 1.0);

        assert_eq!(stats.failures, 1);
        assert_eq!(stats.samples, 37);
        assert_eq!(sink.1.len(), 37);
    }

    /// Panics on samples in one world
    struct PanicInWorld(&'static str, CollectingSink);

    impl SampleSink for PanicInWorld {
        fn spawn_sample(&self, sample: &Sample<'_>) -> Result<()> {
            if sample.world == self.0 {
                panic!("{} exploded", self.0);
            }
            self.1.spawn_sample(sample)
        }
    }

    #[test]
    fn test_panicking_shape_counted_as_failure() {
        let owner = owner();
        let sink = PanicInWorld("world", CollectingSink::new());
        let stats = draw_owner(&owner, &sink, 1.0);

        // The circle panics, the line in the nether still renders
        assert_eq!(stats, RenderStats { owners: 1, shapes: 2, samples: 5, failures: 1 });
        assert_eq!(sink.1.len(), 5);
    }

    #[test]
    fn test_merge() {
        let a = RenderStats { owners: 1, shapes: 2, samples: 10, failures: 0 };
        let b = RenderStats { owners: 1, shapes: 1, samples: 5, failures: 1 };
        assert_eq!(a.merge(b), RenderStats { owners: 2, shapes: 3, samples: 15, failures: 1 });
    }
}
