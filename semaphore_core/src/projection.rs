// semaphore_core/src/projection.rs

//! Projects a traffic light's world position into the vehicle's camera frame
//! and decides whether it lands in a usable region of the image.
//!
//! The projection is recomputed from scratch every frame: ego pose and light
//! positions move relative to each other, so nothing here may be cached.

use crate::geometry::roll_pitch_yaw;
use crate::types::{PixelBox, Pose};
use nalgebra::{Matrix3, Point3, Vector3};

/// Minimum ROI edge length for a light to be worth classifying.
const MIN_ROI_EDGE: i64 = 32;

/// Pinhole camera intrinsics plus the depth-to-ROI scale factor.
#[derive(Debug, Clone, Copy)]
pub struct CameraModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub image_width: u32,
    pub image_height: u32,
    /// ROI edge length is `roi_scale / depth`, rounded to whole pixels.
    pub roi_scale: f64,
    /// Camera height above the pose origin, in meters.
    pub mount_height: f64,
}

/// The outcome of projecting one light into the current camera frame.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    /// Square region of interest centered on the projected light.
    pub roi: PixelBox,
    /// Light offset in the camera frame (lateral, vertical, depth), meters.
    /// Kept for the debug capture log.
    pub camera_offset: Vector3<f64>,
    /// True iff the ROI is large enough and lies fully inside the image.
    pub visible: bool,
}

/// Projects `light` into the camera frame of `pose`.
///
/// Returns `None` on geometric degeneracy: a rank-deficient rotation or a
/// non-positive depth (light at or behind the camera plane). Both mean "not
/// visible", never an error.
pub fn project(light: &Point3<f64>, pose: &Pose, camera: &CameraModel) -> Option<Projection> {
    // World-frame offset from the camera (pose origin plus mount height).
    let dx_world = light.x - pose.position.x;
    let dy_world = light.y - pose.position.y;
    let dz_world = light.z - (pose.position.z + camera.mount_height);

    // Roll and pitch from the pose source are unreliable; force them to zero
    // and rotate by yaw alone. With roll = pitch = 0 the full Euler rotation
    // matrix collapses to a rotation about z.
    let (_roll, _pitch, yaw) = roll_pitch_yaw(&pose.orientation);
    let (s_y, c_y) = yaw.sin_cos();
    #[rustfmt::skip]
    let rotation = Matrix3::new(
        c_y, -s_y, 0.0,
        s_y,  c_y, 0.0,
        0.0,  0.0, 1.0,
    );
    // try_inverse is the rank check: a singular matrix has no inverse.
    let inv_rotation = rotation.try_inverse()?;
    let vehicle = inv_rotation * Vector3::new(dx_world, dy_world, dz_world);

    // Vehicle axes (x forward, y left, z up) to camera axes
    // (x right, y down, z depth).
    let lateral = -vehicle.y;
    let vertical = -vehicle.z;
    let depth = vehicle.x;
    if depth <= 0.0 {
        return None;
    }

    let edge = (camera.roi_scale / depth).round();
    let u = (camera.fx * (lateral / depth) + camera.cx).round();
    let v = (camera.fy * (vertical / depth) + camera.cy).round();
    if !edge.is_finite() || !u.is_finite() || !v.is_finite() {
        return None;
    }

    let edge = edge as i64;
    let x_from = u as i64 - edge / 2;
    let y_from = v as i64 - edge / 2;
    let roi = PixelBox {
        x_from,
        y_from,
        x_to: x_from + edge,
        y_to: y_from + edge,
    };
    let visible = roi.edge() >= MIN_ROI_EDGE && roi.in_frame(camera.image_width, camera.image_height);

    Some(Projection {
        roi,
        camera_offset: Vector3::new(lateral, vertical, depth),
        visible,
    })
}
