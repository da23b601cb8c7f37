// semaphore_core/src/config.rs

//! The validated detector configuration, constructed once at startup.
//!
//! Field names follow the deployed parameter file, so an existing site
//! configuration deserializes without renaming. All defaults are explicit;
//! `validate` fails fast on anything inconsistent.

use crate::debounce::STATE_COUNT_THRESHOLD;
use crate::error::ConfigError;
use crate::projection::CameraModel;
use crate::scanner::ScanParams;
use serde::Deserialize;

/// Raw camera parameters as they appear in the site configuration.
/// Missing principal-point entries default to the image center.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraInfo {
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default = "default_focal_length_x")]
    pub focal_length_x: f64,
    #[serde(default = "default_focal_length_y")]
    pub focal_length_y: f64,
    #[serde(default)]
    pub focal_center_x: Option<f64>,
    #[serde(default)]
    pub focal_center_y: Option<f64>,
    #[serde(default = "default_image_scale")]
    pub image_scale: f64,
    #[serde(default = "default_camera_height")]
    pub camera_height: f64,
}

fn default_focal_length_x() -> f64 {
    2646.0
}

fn default_focal_length_y() -> f64 {
    2647.0
}

fn default_image_scale() -> f64 {
    8000.0
}

fn default_camera_height() -> f64 {
    1.0
}

impl CameraInfo {
    /// Resolves the raw parameters into the camera model used by the
    /// projector.
    pub fn camera_model(&self) -> CameraModel {
        CameraModel {
            fx: self.focal_length_x,
            fy: self.focal_length_y,
            cx: self
                .focal_center_x
                .unwrap_or(self.image_width as f64 / 2.0),
            cy: self
                .focal_center_y
                .unwrap_or(self.image_height as f64 / 2.0),
            image_width: self.image_width,
            image_height: self.image_height,
            roi_scale: self.image_scale,
            mount_height: self.camera_height,
        }
    }
}

/// The full detector configuration: camera intrinsics, the stop-line table
/// (one fixed 2D world coordinate per traffic light, index-aligned with the
/// light list) and the pipeline tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    pub camera_info: CameraInfo,
    pub stop_line_positions: Vec<[f64; 2]>,
    #[serde(default = "default_threshold")]
    pub state_count_threshold: u32,
    #[serde(default = "default_horizon")]
    pub scan_horizon_m: f64,
    #[serde(default = "default_proximity")]
    pub light_proximity_m: f64,
}

fn default_threshold() -> u32 {
    STATE_COUNT_THRESHOLD
}

fn default_horizon() -> f64 {
    120.0
}

fn default_proximity() -> f64 {
    30.0
}

impl DetectorConfig {
    /// Startup validation. `light_count` is the number of traffic lights the
    /// deployment expects; a stop-line table shorter than that is a
    /// precondition violation the system cannot guess around.
    pub fn validate(&self, light_count: usize) -> Result<(), ConfigError> {
        let cam = &self.camera_info;
        if cam.image_width == 0 || cam.image_height == 0 {
            return Err(ConfigError::BadImageSize {
                width: cam.image_width,
                height: cam.image_height,
            });
        }
        if cam.focal_length_x <= 0.0 || cam.focal_length_y <= 0.0 {
            return Err(ConfigError::BadFocalLength {
                fx: cam.focal_length_x,
                fy: cam.focal_length_y,
            });
        }
        if cam.image_scale <= 0.0 {
            return Err(ConfigError::NonPositiveParameter {
                name: "image_scale",
                value: cam.image_scale,
            });
        }
        if self.scan_horizon_m <= 0.0 {
            return Err(ConfigError::NonPositiveParameter {
                name: "scan_horizon_m",
                value: self.scan_horizon_m,
            });
        }
        if self.light_proximity_m <= 0.0 {
            return Err(ConfigError::NonPositiveParameter {
                name: "light_proximity_m",
                value: self.light_proximity_m,
            });
        }
        if self.state_count_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.stop_line_positions.len() < light_count {
            return Err(ConfigError::StopLineTableTooShort {
                stop_lines: self.stop_line_positions.len(),
                lights: light_count,
            });
        }
        Ok(())
    }

    pub fn scan_params(&self) -> ScanParams {
        ScanParams {
            horizon_m: self.scan_horizon_m,
            proximity_m: self.light_proximity_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn minimal_toml() -> DetectorConfig {
        // Only the required fields; everything else must default.
        let toml = r#"
            stop_line_positions = [[10.0, 0.0], [200.0, 5.0]]

            [camera_info]
            image_width = 800
            image_height = 600
        "#;
        toml::from_str(toml).expect("config should parse")
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = minimal_toml();
        assert_eq!(cfg.state_count_threshold, 3);
        assert_abs_diff_eq!(cfg.scan_horizon_m, 120.0);
        assert_abs_diff_eq!(cfg.light_proximity_m, 30.0);
        let cam = cfg.camera_info.camera_model();
        assert_abs_diff_eq!(cam.fx, 2646.0);
        assert_abs_diff_eq!(cam.cx, 400.0);
        assert_abs_diff_eq!(cam.cy, 300.0);
        assert_abs_diff_eq!(cam.roi_scale, 8000.0);
        assert_abs_diff_eq!(cam.mount_height, 1.0);
    }

    #[test]
    fn validate_accepts_a_matching_stop_line_table() {
        assert!(minimal_toml().validate(2).is_ok());
        assert!(minimal_toml().validate(1).is_ok());
    }

    #[test]
    fn validate_rejects_a_short_stop_line_table() {
        let err = minimal_toml().validate(3).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::StopLineTableTooShort {
                stop_lines: 2,
                lights: 3
            }
        ));
    }

    #[test]
    fn validate_rejects_degenerate_camera() {
        let mut cfg = minimal_toml();
        cfg.camera_info.image_width = 0;
        assert!(matches!(
            cfg.validate(0),
            Err(ConfigError::BadImageSize { .. })
        ));

        let mut cfg = minimal_toml();
        cfg.camera_info.focal_length_x = -1.0;
        assert!(matches!(
            cfg.validate(0),
            Err(ConfigError::BadFocalLength { .. })
        ));
    }
}
