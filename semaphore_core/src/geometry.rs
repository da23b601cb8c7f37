// semaphore_core/src/geometry.rs

//! Stateless geometric helpers shared by the tracker, matcher and projector.

use nalgebra::{Point3, UnitQuaternion};
use std::f64::consts::{PI, TAU};

/// 3D Euclidean distance between two world points.
pub fn dist_3d(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    nalgebra::distance(a, b)
}

/// Planar distance from a world point to a fixed 2D coordinate
/// (stop lines are configured without a height).
pub fn dist_2d(a: &Point3<f64>, xy: &[f64; 2]) -> f64 {
    let dx = xy[0] - a.x;
    let dy = xy[1] - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Extracts (roll, pitch, yaw) from a unit quaternion. Downstream code only
/// trusts the yaw component; roll and pitch from the pose source are noisy.
pub fn roll_pitch_yaw(q: &UnitQuaternion<f64>) -> (f64, f64, f64) {
    q.euler_angles()
}

/// Absolute angular difference between two headings, wrapped into [0, pi].
pub fn heading_gap(a: f64, b: f64) -> f64 {
    let gap = ((a - b).abs()) % TAU;
    gap.min(TAU - gap)
}

/// True if `heading` deviates from `yaw` by more than 45 degrees, i.e. the
/// target is behind (or well off to the side of) the vehicle's nose.
pub fn is_behind(yaw: f64, heading: f64) -> bool {
    heading_gap(yaw, heading) > PI / 4.0
}
