// semaphore_node/src/main.rs

mod capture;
mod classifier;
mod cli;
mod imaging;
mod replay;
mod transport;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use semaphore_core::prelude::{Classifier, Detector, DetectorConfig, FrameObserver, NO_STOP};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::capture::CaptureObserver;
use crate::classifier::{HueVoteClassifier, OfflineClassifier};
use crate::cli::Cli;
use crate::replay::Scenario;
use crate::transport::{topics, DetectorThread};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();

    let config: DetectorConfig = Figment::new()
        .merge(Toml::file(&cli.config))
        .extract()
        .with_context(|| format!("failed to load site config {}", cli.config.display()))?;
    let scenario = Scenario::load(&cli.scenario)?;

    // Fails fast on inconsistent configuration (bad intrinsics, stop-line
    // table shorter than the light count).
    let detector = Detector::new(&config, scenario.lights.len())
        .context("invalid detector configuration")?;
    info!(
        lights = scenario.lights.len(),
        stop_lines = config.stop_line_positions.len(),
        "detector configured"
    );

    let classifier: Box<dyn Classifier + Send> = if cli.ground_truth {
        Box::new(OfflineClassifier)
    } else {
        Box::new(HueVoteClassifier)
    };
    let observer: Option<Box<dyn FrameObserver + Send>> = match &cli.capture_dir {
        Some(dir) => Some(Box::new(
            CaptureObserver::new(dir.clone()).context("failed to set up capture directory")?,
        )),
        None => None,
    };

    let (tx, rx) = topics();
    let (publish_tx, publish_rx) = unbounded();
    let camera = config.camera_info.camera_model();

    let replay = replay::spawn(scenario, camera, tx, cli.frames, 0xC0FFEE);
    let pipeline = DetectorThread::spawn(detector, rx, publish_tx, classifier, observer);

    // The upcoming-red-light topic: one value per processed frame.
    let mut published = 0u64;
    let mut stops = 0u64;
    for waypoint in publish_rx.iter() {
        published += 1;
        if waypoint != NO_STOP {
            stops += 1;
        }
    }

    replay.join().expect("replay thread panicked");
    let detector = pipeline.join();
    info!(
        published,
        stop_frames = stops,
        final_waypoint = detector.published(),
        "replay complete"
    );
    Ok(())
}
