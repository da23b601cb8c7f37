// semaphore_core/src/pipeline.rs

//! The per-frame detection pipeline and the collaborator contracts it drives.
//!
//! The [`Detector`] is an explicit context object: it owns the tracker and
//! debouncer state plus the latest pose/path/light snapshots, and every stage
//! is invoked from [`Detector::process_frame`] in a fixed order. Nothing here
//! is ambient or global, and a frame is processed to completion before the
//! next one is meaningful (the debouncer is an ordered state machine).

use crate::config::DetectorConfig;
use crate::debounce::{StateDebouncer, NO_STOP};
use crate::error::{ClassifierError, ConfigError, CropError};
use crate::path::{CyclicPath, WaypointTracker};
use crate::projection::CameraModel;
use crate::scanner::{scan, ScanHit, ScanParams};
use crate::types::{CameraImage, LightColor, Pose, TrafficLight, Waypoint};
use tracing::{debug, info, warn};

// =========================================================================
// == Collaborator Contracts ==
// =========================================================================

/// Crops a pixel box out of a raw frame. Failures (malformed frame,
/// out-of-bounds box) must be surfaced, never papered over with black pixels.
pub trait FrameCropper {
    fn crop(
        &self,
        frame: &CameraImage,
        roi: &crate::types::PixelBox,
    ) -> Result<CameraImage, CropError>;
}

/// Maps a cropped light image to a color label. May be unavailable, in which
/// case the pipeline falls back to the light's last known ground-truth state.
pub trait Classifier {
    fn classify(&mut self, roi: &CameraImage) -> Result<LightColor, ClassifierError>;
}

/// Receives the published waypoint index once per processed frame.
pub trait OutputSink {
    fn publish(&mut self, waypoint: i64);
}

/// Post-decision tap for debug/training capture. Strictly an observer: the
/// pipeline's control flow never depends on it.
pub trait FrameObserver {
    fn on_decision(&mut self, tap: &FrameTap<'_>);
}

/// Everything an observer may want to know about one processed frame.
#[derive(Debug)]
pub struct FrameTap<'a> {
    pub frame_index: u64,
    /// The committed scan candidate, if any.
    pub hit: Option<&'a ScanHit>,
    /// Cropped ROI, present when cropping succeeded.
    pub crop: Option<&'a CameraImage>,
    /// Ground-truth state of the committed light.
    pub ground_truth: LightColor,
    /// Raw color fed to the debouncer this frame.
    pub observed: LightColor,
    /// Value published this frame, if the debouncer emitted one.
    pub published: Option<i64>,
}

/// The pipeline's external collaborators, borrowed for one frame.
pub struct DetectorIo<'a> {
    pub cropper: &'a dyn FrameCropper,
    pub classifier: &'a mut dyn Classifier,
    pub sink: &'a mut dyn OutputSink,
    pub observer: Option<&'a mut dyn FrameObserver>,
}

// =========================================================================
// == Detector ==
// =========================================================================

/// The end-to-end red-light stop detector.
pub struct Detector {
    camera: CameraModel,
    stop_lines: Vec<[f64; 2]>,
    scan_params: ScanParams,
    tracker: WaypointTracker,
    debouncer: StateDebouncer,
    pose: Option<Pose>,
    path: Option<CyclicPath>,
    lights: Vec<TrafficLight>,
    frame_index: u64,
}

impl Detector {
    /// Builds a detector from a validated configuration. `light_count` is
    /// re-checked here so a detector can never exist with a stop-line table
    /// it might index out of bounds.
    pub fn new(config: &DetectorConfig, light_count: usize) -> Result<Self, ConfigError> {
        config.validate(light_count)?;
        Ok(Self {
            camera: config.camera_info.camera_model(),
            stop_lines: config.stop_line_positions.clone(),
            scan_params: config.scan_params(),
            tracker: WaypointTracker::new(),
            debouncer: StateDebouncer::new(config.state_count_threshold),
            pose: None,
            path: None,
            lights: Vec::new(),
            frame_index: 0,
        })
    }

    /// Latest-value-wins pose update.
    pub fn on_pose(&mut self, pose: Pose) {
        self.pose = Some(pose);
    }

    /// The full cyclic waypoint sequence, replaced wholesale.
    pub fn on_waypoints(&mut self, waypoints: Vec<Waypoint>) {
        info!(count = waypoints.len(), "reference waypoints received");
        self.path = Some(CyclicPath::new(waypoints));
    }

    /// The full traffic-light list, replaced wholesale. Identity across
    /// refreshes is positional. A list longer than the stop-line table is the
    /// same precondition violation `validate` rejects at startup.
    pub fn on_lights(&mut self, lights: Vec<TrafficLight>) -> Result<(), ConfigError> {
        if lights.len() > self.stop_lines.len() {
            return Err(ConfigError::StopLineTableTooShort {
                stop_lines: self.stop_lines.len(),
                lights: lights.len(),
            });
        }
        self.lights = lights;
        Ok(())
    }

    /// Runs one camera frame through the pipeline: tracker refresh, forward
    /// scan, classification, debounce, publish.
    ///
    /// Returns the published waypoint for this frame, or `None` when the
    /// cycle was skipped (missing pose/waypoints) or the debouncer withheld
    /// its output on a raw-color change. Skipped cycles touch neither the
    /// tracker seed nor the debounce counters.
    pub fn process_frame(&mut self, frame: &CameraImage, io: &mut DetectorIo<'_>) -> Option<i64> {
        let (Some(pose), Some(path)) = (self.pose, self.path.as_ref()) else {
            debug!("frame skipped: pose or waypoints not yet available");
            return None;
        };
        if path.is_empty() {
            debug!("frame skipped: empty waypoint list");
            return None;
        }
        self.frame_index += 1;

        let current_idx = self.tracker.locate(&pose, path);
        let hit = scan(
            current_idx,
            path,
            &self.lights,
            &pose,
            &self.camera,
            &self.stop_lines,
            &self.scan_params,
        );

        let mut crop = None;
        let mut ground_truth = LightColor::Unknown;
        let (raw_waypoint, raw_color) = match &hit {
            Some(hit) => {
                ground_truth = self.lights[hit.light_idx].state;
                let color = match io.cropper.crop(frame, &hit.projection.roi) {
                    Ok(cropped) => {
                        let color = match io.classifier.classify(&cropped) {
                            Ok(color) => color,
                            Err(err) => {
                                warn!(%err, "classifier failed; using ground-truth state");
                                ground_truth
                            }
                        };
                        crop = Some(cropped);
                        color
                    }
                    Err(err) => {
                        warn!(%err, "crop failed; using ground-truth state");
                        ground_truth
                    }
                };
                (hit.stop_waypoint as i64, color)
            }
            None => (NO_STOP, LightColor::Unknown),
        };

        let published = self.debouncer.update(raw_color, raw_waypoint);
        if let Some(waypoint) = published {
            io.sink.publish(waypoint);
        }

        if let Some(observer) = io.observer.as_deref_mut() {
            observer.on_decision(&FrameTap {
                frame_index: self.frame_index,
                hit: hit.as_ref(),
                crop: crop.as_ref(),
                ground_truth,
                observed: raw_color,
                published,
            });
        }
        published
    }

    /// Last committed waypoint index, or [`NO_STOP`].
    pub fn published(&self) -> i64 {
        self.debouncer.published()
    }

    /// The waypoint index the tracker currently considers at or ahead of the
    /// vehicle.
    pub fn current_waypoint(&self) -> usize {
        self.tracker.current()
    }
}
