// semaphore_core/src/types.rs

use nalgebra::{Point3, UnitQuaternion};
use serde::Deserialize;

// =========================================================================
// == Core Data Structures ==
// =========================================================================

/// The color state of a traffic light, as reported by the light-state source
/// or produced by a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    Red,
    Yellow,
    Green,
    #[default]
    Unknown,
}

impl LightColor {
    /// The wire/log encoding used by the upstream message definition
    /// (RED=0, YELLOW=1, GREEN=2, UNKNOWN=4).
    pub fn code(self) -> u8 {
        match self {
            LightColor::Red => 0,
            LightColor::Yellow => 1,
            LightColor::Green => 2,
            LightColor::Unknown => 4,
        }
    }
}

/// An immutable vehicle pose snapshot in the world/path frame.
/// Replaced wholesale on each update from the pose source.
#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Convenience constructor for a pose with a yaw-only orientation.
    pub fn with_yaw(position: Point3<f64>, yaw: f64) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
        }
    }
}

/// A single fixed point on the reference path. Its index in the cyclic
/// waypoint sequence is implicit (see [`crate::path::CyclicPath`]).
#[derive(Debug, Clone, Copy)]
pub struct Waypoint {
    pub position: Point3<f64>,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Point3::new(x, y, z),
        }
    }
}

/// A traffic light snapshot: 3D world position plus the current
/// ground-truth/observed color. The full list is replaced wholesale on each
/// update; identity across refreshes is positional.
#[derive(Debug, Clone, Copy)]
pub struct TrafficLight {
    pub position: Point3<f64>,
    pub state: LightColor,
}

/// A raw RGB8 camera frame (row-major, 3 bytes per pixel).
#[derive(Debug, Clone)]
pub struct CameraImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl CameraImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// An all-black frame of the given dimensions.
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 3],
        }
    }

    pub fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 3
    }
}

/// An axis-aligned pixel bounding box, half-open in neither axis: the box
/// spans `[x_from, x_to)` x `[y_from, y_to)` with `x_to = x_from + edge`.
/// Coordinates may lie outside the image; visibility is decided separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x_from: i64,
    pub y_from: i64,
    pub x_to: i64,
    pub y_to: i64,
}

impl PixelBox {
    /// Edge length of the (square) box in pixels.
    pub fn edge(&self) -> i64 {
        self.x_to - self.x_from
    }

    /// True if the whole box lies inside a `width` x `height` image.
    pub fn in_frame(&self, width: u32, height: u32) -> bool {
        self.x_from >= 0
            && self.x_to < width as i64
            && self.y_from >= 0
            && self.y_to < height as i64
    }
}
