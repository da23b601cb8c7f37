// semaphore_node/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Semaphore: a red-light stop detector for a vehicle on a known waypoint path.
///
/// Runs the detection pipeline against a scripted replay scenario so the full
/// stack can be exercised without a simulator attached.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to replay.
    #[arg(
        short,
        long,
        default_value = "assets/scenarios/highway_loop.toml"
    )]
    pub scenario: PathBuf,

    /// The path to the site configuration (camera intrinsics, stop lines).
    #[arg(short, long, default_value = "assets/config/site.toml")]
    pub config: PathBuf,

    /// Number of camera frames to process before exiting.
    #[arg(short, long, default_value_t = 600)]
    pub frames: u64,

    /// Fall back to ground-truth light states instead of classifying crops.
    #[arg(long, default_value_t = false)]
    pub ground_truth: bool,

    /// Directory for debug/training capture (cropped ROI images + CSV).
    /// Capture is disabled when not set.
    #[arg(long)]
    pub capture_dir: Option<PathBuf>,
}
