// semaphore_core/src/error.rs

use thiserror::Error;

/// Startup configuration errors. These are the only fatal conditions in the
/// system: an inconsistent configuration cannot be guessed around.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("stop line table has {stop_lines} entries but {lights} traffic lights exist")]
    StopLineTableTooShort { stop_lines: usize, lights: usize },

    #[error("camera focal lengths must be positive (got fx={fx}, fy={fy})")]
    BadFocalLength { fx: f64, fy: f64 },

    #[error("image dimensions must be non-zero (got {width}x{height})")]
    BadImageSize { width: u32, height: u32 },

    #[error("{name} must be positive (got {value})")]
    NonPositiveParameter { name: &'static str, value: f64 },

    #[error("state count threshold must be at least 1")]
    ZeroThreshold,
}

/// Raised by the image crop collaborator. A malformed frame or an
/// out-of-bounds box must surface as an error, never as a silent black image.
#[derive(Debug, Error)]
pub enum CropError {
    #[error("crop box ({x_from},{y_from})..({x_to},{y_to}) exceeds the {width}x{height} frame")]
    OutOfBounds {
        x_from: i64,
        y_from: i64,
        x_to: i64,
        y_to: i64,
        width: u32,
        height: u32,
    },

    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    MalformedFrame { expected: usize, actual: usize },
}

/// Raised by the classifier collaborator. Always recoverable: the pipeline
/// falls back to the light's last known ground-truth state.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("region too small to classify ({width}x{height})")]
    RegionTooSmall { width: u32, height: u32 },
}
