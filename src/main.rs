//! Headless host for the shape registry.
//!
//! Usage: shapefield [OPTIONS]
//!
//! Options:
//!   --config <FILE>   Settings file, created with defaults if missing (default: shapefield.json)
//!   --ticks <N>       Render passes to run before shutting down (default: 10)

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use shapefield::core::logging;
use shapefield::core::types::Result;
use shapefield::core::ConfigFile;
use shapefield::registry::ShapeRegistry;
use shapefield::render::{RenderLoop, RenderSchedule, Sample, SampleSink};
use shapefield::storage::{FlushWorker, ShapeStore};
use shapefield::world::StaticWorlds;

/// Sink that counts samples and traces each one
#[derive(Default)]
struct LoggingSink {
    emitted: AtomicU64,
}

impl SampleSink for LoggingSink {
    fn spawn_sample(&self, sample: &Sample<'_>) -> Result<()> {
        log::trace!(
            "{} {:.1},{:.1},{:.1} {} size {}",
            sample.world,
            sample.position.x,
            sample.position.y,
            sample.position.z,
            sample.color,
            sample.size
        );
        self.emitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let config = parse_str_arg(&args, "--config").map_or_else(|| PathBuf::from("shapefield.json"), PathBuf::from);
    let ticks = parse_u64_arg(&args, "--ticks").unwrap_or(10);

    if let Err(e) = run(config, ticks).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config_path: PathBuf, ticks: u64) -> Result<()> {
    let config = ConfigFile::open(&config_path)?;
    let settings = config.settings().clone();
    log::info!("Using settings from {}", config.path().display());

    let store = ShapeStore::open(&settings.data_dir)?;
    let owners = store.owners()?;
    let flush = Arc::new(FlushWorker::spawn(store)?);

    let worlds = Arc::new(StaticWorlds::new(settings.worlds.iter().cloned()));
    let registry = Arc::new(ShapeRegistry::new(settings.particle_limit, worlds).with_persistence(flush));

    for owner in owners {
        if let Err(e) = registry.join(owner) {
            log::warn!("Skipping {owner}: {e}");
        }
    }
    log::info!("{} owners loaded, limit {} samples each", registry.owner_count(), registry.limit());

    let sink = Arc::new(LoggingSink::default());
    let render = RenderLoop::new(
        registry.clone(),
        sink.clone(),
        settings.sample_size,
        RenderSchedule::from_settings(&settings),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let report = render.run(shutdown_rx, Some(ticks)).await;
    drop(shutdown_tx);

    log::info!(
        "{} passes, {} samples emitted ({} shape failures)",
        report.ticks,
        sink.emitted.load(Ordering::Relaxed),
        report.stats.failures
    );

    registry.shutdown();
    Ok(())
}

fn parse_u64_arg(args: &[String], flag: &str) -> Option<u64> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
