// semaphore_node/src/imaging.rs

//! RGB8 frame utilities: the crop collaborator used by the pipeline and the
//! synthetic frame renderer used by the replay driver.

use rand::Rng;
use semaphore_core::prelude::{
    project, CameraImage, CameraModel, FrameCropper, LightColor, PixelBox, Pose, TrafficLight,
};
use semaphore_core::error::CropError;

/// Crops a pixel box out of an RGB8 frame. Out-of-bounds boxes and
/// mis-sized buffers are surfaced as [`CropError`], never as black pixels.
pub struct RgbCropper;

impl FrameCropper for RgbCropper {
    fn crop(&self, frame: &CameraImage, roi: &PixelBox) -> Result<CameraImage, CropError> {
        if frame.data.len() != frame.expected_len() {
            return Err(CropError::MalformedFrame {
                expected: frame.expected_len(),
                actual: frame.data.len(),
            });
        }
        if !roi.in_frame(frame.width, frame.height) {
            return Err(CropError::OutOfBounds {
                x_from: roi.x_from,
                y_from: roi.y_from,
                x_to: roi.x_to,
                y_to: roi.y_to,
                width: frame.width,
                height: frame.height,
            });
        }

        let edge = roi.edge() as usize;
        let stride = frame.width as usize * 3;
        let mut data = Vec::with_capacity(edge * edge * 3);
        for row in roi.y_from..roi.y_to {
            let offset = row as usize * stride + roi.x_from as usize * 3;
            data.extend_from_slice(&frame.data[offset..offset + edge * 3]);
        }
        Ok(CameraImage::new(edge as u32, edge as u32, data))
    }
}

/// Nominal RGB rendering of each light color.
fn color_rgb(color: LightColor) -> [u8; 3] {
    match color {
        LightColor::Red => [230, 30, 30],
        LightColor::Yellow => [230, 210, 40],
        LightColor::Green => [40, 220, 60],
        LightColor::Unknown => [60, 60, 60],
    }
}

/// Renders a synthetic camera frame for the replay driver: a dark background
/// with each visible light painted into its projected ROI, plus per-pixel
/// sensor noise so the classifier sees something imperfect.
pub fn render_frame<R: Rng>(
    camera: &CameraModel,
    pose: &Pose,
    lights: &[TrafficLight],
    rng: &mut R,
) -> CameraImage {
    let mut frame = CameraImage::black(camera.image_width, camera.image_height);
    for light in lights {
        let Some(projection) = project(&light.position, pose, camera) else {
            continue;
        };
        if !projection.visible {
            continue;
        }
        paint_box(&mut frame, &projection.roi, color_rgb(light.state), rng);
    }
    frame
}

fn paint_box<R: Rng>(frame: &mut CameraImage, roi: &PixelBox, rgb: [u8; 3], rng: &mut R) {
    let stride = frame.width as usize * 3;
    for row in roi.y_from..roi.y_to {
        for col in roi.x_from..roi.x_to {
            let offset = row as usize * stride + col as usize * 3;
            for (i, &channel) in rgb.iter().enumerate() {
                let noise: i16 = rng.gen_range(-25..=25);
                frame.data[offset + i] = (channel as i16 + noise).clamp(0, 255) as u8;
            }
        }
    }
}

/// Paints a single light's crop directly, used by tests.
#[cfg(test)]
pub fn solid_crop(edge: u32, color: LightColor) -> CameraImage {
    let rgb = color_rgb(color);
    let mut data = Vec::with_capacity((edge * edge * 3) as usize);
    for _ in 0..edge * edge {
        data.extend_from_slice(&rgb);
    }
    CameraImage::new(edge, edge, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn crop_extracts_the_requested_box() {
        let mut frame = CameraImage::black(8, 8);
        // Mark pixel (3, 2) red.
        frame.data[(2 * 8 + 3) * 3] = 255;
        let roi = PixelBox {
            x_from: 3,
            y_from: 2,
            x_to: 5,
            y_to: 4,
        };
        let crop = RgbCropper.crop(&frame, &roi).unwrap();
        assert_eq!(crop.width, 2);
        assert_eq!(crop.height, 2);
        assert_eq!(crop.data[0], 255);
        assert_eq!(crop.data.len(), 12);
    }

    #[test]
    fn crop_rejects_out_of_bounds_boxes() {
        let frame = CameraImage::black(8, 8);
        let roi = PixelBox {
            x_from: 6,
            y_from: 0,
            x_to: 9,
            y_to: 3,
        };
        assert!(matches!(
            RgbCropper.crop(&frame, &roi),
            Err(CropError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn crop_rejects_malformed_buffers() {
        let frame = CameraImage::new(8, 8, vec![0; 10]);
        let roi = PixelBox {
            x_from: 0,
            y_from: 0,
            x_to: 2,
            y_to: 2,
        };
        assert!(matches!(
            RgbCropper.crop(&frame, &roi),
            Err(CropError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn rendered_light_lands_in_the_frame() {
        let camera = CameraModel {
            fx: 2646.0,
            fy: 2647.0,
            cx: 400.0,
            cy: 300.0,
            image_width: 800,
            image_height: 600,
            roi_scale: 8000.0,
            mount_height: 1.0,
        };
        let pose = Pose::with_yaw(Point3::new(0.0, 0.0, 0.0), 0.0);
        let lights = [TrafficLight {
            position: Point3::new(25.0, 0.0, 1.0),
            state: LightColor::Red,
        }];
        let mut rng = rand::thread_rng();
        let frame = render_frame(&camera, &pose, &lights, &mut rng);
        // Principal point sits inside the painted ROI: red channel dominates.
        let center = ((300 * 800 + 400) * 3) as usize;
        assert!(frame.data[center] > 100);
        assert!(frame.data[center] > frame.data[center + 1]);
    }
}
