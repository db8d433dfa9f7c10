//! Periodic render loop.
//!
//! Waits for the configured start delay, then runs one render pass per
//! interval on the blocking pool. A slow pass pushes the next tick back
//! instead of queueing a burst of catch-up passes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::core::config::Settings;
use crate::registry::ShapeRegistry;
use crate::render::pass::RenderStats;
use crate::render::sink::SampleSink;

/// Start delay and period of the render loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSchedule {
    pub delay: Duration,
    pub interval: Duration,
}

impl RenderSchedule {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            delay: Duration::from_millis(settings.render_delay_ms),
            interval: Duration::from_millis(settings.render_interval_ms),
        }
    }
}

impl Default for RenderSchedule {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Totals after the loop stops
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub ticks: u64,
    pub stats: RenderStats,
}

pub struct RenderLoop {
    registry: Arc<ShapeRegistry>,
    sink: Arc<dyn SampleSink>,
    sample_size: f32,
    schedule: RenderSchedule,
}

/// Resolves once `true` is sent or the sender is dropped
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

impl RenderLoop {
    pub fn new(
        registry: Arc<ShapeRegistry>,
        sink: Arc<dyn SampleSink>,
        sample_size: f32,
        schedule: RenderSchedule,
    ) -> Self {
        Self { registry, sink, sample_size, schedule }
    }

    /// Run until `shutdown` fires or `max_ticks` passes have completed
    pub async fn run(self, mut shutdown: watch::Receiver<bool>, max_ticks: Option<u64>) -> RenderReport {
        let mut report = RenderReport::default();

        tokio::select! {
            _ = tokio::time::sleep(self.schedule.delay) => {}
            _ = stop_requested(&mut shutdown) => return report,
        }

        let mut ticker = tokio::time::interval(self.schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "Render loop started: every {} ms, sample size {}",
            self.schedule.interval.as_millis(),
            self.sample_size
        );

        while max_ticks.is_none_or(|max| report.ticks < max) {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop_requested(&mut shutdown) => break,
            }

            let registry = self.registry.clone();
            let sink = self.sink.clone();
            let size = self.sample_size;
            match tokio::task::spawn_blocking(move || registry.draw(&*sink, size)).await {
                Ok(stats) => {
                    if stats.failures > 0 {
                        log::warn!("Render pass {}: {} shapes failed", report.ticks, stats.failures);
                    }
                    log::trace!("Render pass {}: {:?}", report.ticks, stats);
                    report.stats += stats;
                }
                Err(e) => log::error!("Render pass panicked: {e}"),
            }
            report.ticks += 1;
        }

        log::info!("Render loop stopped after {} passes", report.ticks);
        report
    }
}
