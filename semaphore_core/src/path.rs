// semaphore_core/src/path.rs

//! The cyclic waypoint sequence and the two nearest-point searches that run
//! against it: the incremental vehicle tracker and the stop-line matcher.
//!
//! All wrap-around arithmetic lives here so the tracker, matcher and scanner
//! cannot drift apart on modulo conventions.

use crate::geometry::{dist_2d, dist_3d, is_behind, roll_pitch_yaw};
use crate::types::{Pose, Waypoint};
use nalgebra::Point3;
use tracing::debug;

/// Once the best candidate is closer than this, the search is allowed to
/// terminate early on clear departure.
const LOCK_IN_DIST: f64 = 5.0;
/// Departure heuristic: with a locked-in minimum, a candidate this many times
/// farther away means we are monotonically leaving the best region.
const DEPARTURE_FACTOR: f64 = 10.0;

// =========================================================================
// == Cyclic Path ==
// =========================================================================

/// An immutable, ordered, cyclic sequence of waypoints. Set once at startup;
/// the path loops, so every index is taken modulo the sequence length.
#[derive(Debug, Clone)]
pub struct CyclicPath {
    waypoints: Vec<Waypoint>,
}

impl CyclicPath {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Maps any (possibly negative) index onto [0, len).
    pub fn wrap(&self, idx: i64) -> usize {
        let len = self.waypoints.len() as i64;
        debug_assert!(len > 0, "wrap on an empty path");
        idx.rem_euclid(len) as usize
    }

    pub fn point(&self, idx: usize) -> &Point3<f64> {
        &self.waypoints[idx].position
    }

    /// Arc length of the path segment ending at `idx` (from its cyclic
    /// predecessor).
    pub fn segment_len(&self, idx: usize) -> f64 {
        let prev = self.wrap(idx as i64 - 1);
        dist_3d(self.point(prev), self.point(idx))
    }

    /// Nearest-waypoint search over one full lap starting at `start`,
    /// measured by `metric`. Terminates early once a sub-`LOCK_IN_DIST`
    /// minimum has been found and the current candidate sits
    /// `DEPARTURE_FACTOR` times farther out.
    pub fn nearest_forward<F>(&self, start: usize, metric: F) -> usize
    where
        F: Fn(&Point3<f64>) -> f64,
    {
        let mut min_dist = f64::INFINITY;
        let mut min_idx = start;
        for step in 0..self.len() {
            let idx = self.wrap((start + step) as i64);
            let cur_dist = metric(self.point(idx));
            if cur_dist < min_dist {
                min_dist = cur_dist;
                min_idx = idx;
            }
            if min_dist < LOCK_IN_DIST && cur_dist > DEPARTURE_FACTOR * min_dist {
                break;
            }
        }
        min_idx
    }
}

// =========================================================================
// == Waypoint Tracker ==
// =========================================================================

/// Tracks the index of the path waypoint at or ahead of the vehicle.
/// The previous result seeds the next search, so steady-state updates touch
/// only a handful of waypoints.
#[derive(Debug, Clone, Default)]
pub struct WaypointTracker {
    current: usize,
}

impl WaypointTracker {
    pub fn new() -> Self {
        Self { current: 0 }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Refreshes the tracked index for a new pose. Searches a window that
    /// opens two waypoints behind the previous index and wraps forward for at
    /// most one lap, then resolves the ahead/behind ambiguity: a nearest
    /// waypoint more than 45 degrees off the vehicle's yaw is behind us, so
    /// the index advances by one.
    pub fn locate(&mut self, pose: &Pose, path: &CyclicPath) -> usize {
        if path.is_empty() {
            return self.current;
        }

        let start = path.wrap(self.current as i64 - 2);
        let nearest = path.nearest_forward(start, |p| dist_3d(p, &pose.position));

        let wp = path.point(nearest);
        let heading = (wp.y - pose.position.y).atan2(wp.x - pose.position.x);
        let (_roll, _pitch, yaw) = roll_pitch_yaw(&pose.orientation);
        self.current = if is_behind(yaw, heading) {
            path.wrap(nearest as i64 + 1)
        } else {
            nearest
        };
        debug!(index = self.current, "tracker refreshed");
        self.current
    }
}

// =========================================================================
// == Stop-Line Matcher ==
// =========================================================================

/// Index of the path waypoint nearest a fixed 2D stop-line coordinate,
/// searching strictly forward from `current_idx` across one lap.
///
/// Precondition: `path` is non-empty; the caller guards.
pub fn nearest_stop_waypoint(path: &CyclicPath, stop_line: &[f64; 2], current_idx: usize) -> usize {
    path.nearest_forward(current_idx, |p| dist_2d(p, stop_line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Pose, Waypoint};
    use nalgebra::Point3;

    /// A straight path along +x with 1 m spacing.
    fn straight_path(n: usize) -> CyclicPath {
        CyclicPath::new((0..n).map(|i| Waypoint::new(i as f64, 0.0, 0.0)).collect())
    }

    #[test]
    fn wrap_handles_negative_indices() {
        let path = straight_path(10);
        assert_eq!(path.wrap(-1), 9);
        assert_eq!(path.wrap(-2), 8);
        assert_eq!(path.wrap(10), 0);
        assert_eq!(path.wrap(23), 3);
    }

    #[test]
    fn locate_returns_index_in_range() {
        let path = straight_path(50);
        let mut tracker = WaypointTracker::new();
        for x in [0.0, 12.3, 48.9, 120.0, -30.0] {
            let pose = Pose::with_yaw(Point3::new(x, 0.0, 0.0), 0.0);
            let idx = tracker.locate(&pose, &path);
            assert!(idx < path.len(), "index {} out of range for x={}", idx, x);
        }
    }

    #[test]
    fn locate_converges_for_a_static_pose() {
        let path = straight_path(100);
        let mut tracker = WaypointTracker::new();
        let pose = Pose::with_yaw(Point3::new(30.4, 0.0, 0.0), 0.0);
        let first = tracker.locate(&pose, &path);
        for _ in 0..5 {
            assert_eq!(tracker.locate(&pose, &path), first);
        }
    }

    #[test]
    fn locate_advances_past_a_waypoint_behind_the_vehicle() {
        let path = straight_path(100);
        let mut tracker = WaypointTracker::new();
        // Just past waypoint 30; the nearest waypoint sits behind the nose.
        let pose = Pose::with_yaw(Point3::new(30.4, 0.0, 0.0), 0.0);
        assert_eq!(tracker.locate(&pose, &path), 31);
    }

    #[test]
    fn locate_keeps_a_waypoint_ahead_of_the_vehicle() {
        let path = straight_path(100);
        let mut tracker = WaypointTracker::new();
        let pose = Pose::with_yaw(Point3::new(29.6, 0.0, 0.0), 0.0);
        assert_eq!(tracker.locate(&pose, &path), 30);
    }

    #[test]
    fn locate_tracks_incrementally_as_the_vehicle_moves() {
        let path = straight_path(200);
        let mut tracker = WaypointTracker::new();
        let mut x = 0.0;
        while x < 150.0 {
            let pose = Pose::with_yaw(Point3::new(x, 0.0, 0.0), 0.0);
            let idx = tracker.locate(&pose, &path);
            assert!((idx as f64 - x).abs() <= 1.5, "idx {} vs x {}", idx, x);
            x += 0.7;
        }
    }

    #[test]
    fn locate_without_waypoints_keeps_previous_index() {
        let path = CyclicPath::new(Vec::new());
        let mut tracker = WaypointTracker::new();
        let pose = Pose::with_yaw(Point3::new(5.0, 0.0, 0.0), 0.0);
        assert_eq!(tracker.locate(&pose, &path), 0);
    }

    #[test]
    fn stop_line_match_is_forward_only() {
        let path = straight_path(100);
        // Stop line behind the current index: the forward-only search wraps a
        // whole lap and still reports the true nearest waypoint.
        assert_eq!(nearest_stop_waypoint(&path, &[20.0, 0.0], 50), 20);
        // Stop line ahead.
        assert_eq!(nearest_stop_waypoint(&path, &[72.4, 0.0], 50), 72);
    }

    #[test]
    fn stop_line_match_returns_index_in_range() {
        let path = straight_path(37);
        for start in [0, 5, 36] {
            let idx = nearest_stop_waypoint(&path, &[400.0, -3.0], start);
            assert!(idx < path.len());
        }
    }
}
