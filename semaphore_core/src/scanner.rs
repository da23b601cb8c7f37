// semaphore_core/src/scanner.rs

//! Forward scan along the path for the next relevant traffic light.
//!
//! The scanner walks the cyclic waypoint sequence from the tracked index,
//! accumulating travel distance up to a bounded horizon. The first light
//! found within the proximity radius of a visited waypoint is THE light
//! governing this stretch of road: the scan commits to it whether or not it
//! turns out to be visible, and never considers a second candidate.

use crate::geometry::dist_3d;
use crate::path::{nearest_stop_waypoint, CyclicPath};
use crate::projection::{project, CameraModel, Projection};
use crate::types::{Pose, TrafficLight};
use tracing::debug;

/// Forward-scan bounds. Defaults match the tuned deployment values.
#[derive(Debug, Clone, Copy)]
pub struct ScanParams {
    /// Maximum forward travel distance scanned per cycle, meters.
    pub horizon_m: f64,
    /// A light closer than this to a path waypoint governs that waypoint.
    pub proximity_m: f64,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            horizon_m: 120.0,
            proximity_m: 30.0,
        }
    }
}

/// A visible candidate found by [`scan`].
#[derive(Debug, Clone, Copy)]
pub struct ScanHit {
    /// Index into the current traffic-light list.
    pub light_idx: usize,
    /// Path waypoint nearest the light's stop line.
    pub stop_waypoint: usize,
    pub projection: Projection,
}

/// Walks forward from `current_idx` looking for the first visible light.
///
/// Returns `None` when no light is proximate within the horizon, or when the
/// committed light failed the visibility test this frame.
///
/// Precondition: `stop_lines` has at least as many entries as `lights`
/// (validated at startup).
pub fn scan(
    current_idx: usize,
    path: &CyclicPath,
    lights: &[TrafficLight],
    pose: &Pose,
    camera: &CameraModel,
    stop_lines: &[[f64; 2]],
    params: &ScanParams,
) -> Option<ScanHit> {
    if path.is_empty() {
        return None;
    }

    let mut travel = 0.0;
    for step in 0..path.len() {
        let idx = path.wrap((current_idx + step) as i64);
        travel += path.segment_len(idx);
        if travel > params.horizon_m {
            break;
        }

        for (light_idx, light) in lights.iter().enumerate() {
            let wp_light_dist = dist_3d(&light.position, path.point(idx));
            if wp_light_dist >= params.proximity_m {
                continue;
            }
            // Committed: only one light is considered per waypoint, and the
            // outer walk stops here regardless of the visibility outcome.
            let hit = project(&light.position, pose, camera)
                .filter(|proj| proj.visible)
                .map(|projection| ScanHit {
                    light_idx,
                    stop_waypoint: nearest_stop_waypoint(
                        path,
                        &stop_lines[light_idx],
                        current_idx,
                    ),
                    projection,
                });
            match &hit {
                Some(h) => debug!(
                    light_idx,
                    stop_waypoint = h.stop_waypoint,
                    "visible light committed"
                ),
                None => debug!(light_idx, "proximate light not visible this frame"),
            }
            return hit;
        }
    }
    None
}
