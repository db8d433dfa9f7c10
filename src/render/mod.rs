//! Turning stored shapes into samples for the host

pub mod pass;
pub mod scheduler;
pub mod sink;

pub use pass::{RenderStats, draw_owner};
pub use scheduler::{RenderLoop, RenderReport, RenderSchedule};
pub use sink::{CollectingSink, RecordedSample, Sample, SampleSink};
