// semaphore_core/tests/pipeline.rs

//! End-to-end pipeline scenarios: a vehicle on a straight stretch of a long
//! cyclic path approaching a single traffic light.

use nalgebra::Point3;
use semaphore_core::prelude::*;

/// Cropper stub: bounds-checked like the real one, but the pixel content is
/// irrelevant to these tests.
struct StubCropper;

impl FrameCropper for StubCropper {
    fn crop(&self, frame: &CameraImage, roi: &PixelBox) -> Result<CameraImage, CropError> {
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
        let edge = roi.edge() as u32;
        Ok(CameraImage::black(edge, edge))
    }
}

/// Classifier stub returning a fixed color.
struct FixedClassifier(LightColor);

impl Classifier for FixedClassifier {
    fn classify(&mut self, _roi: &CameraImage) -> Result<LightColor, ClassifierError> {
        Ok(self.0)
    }
}

/// Classifier stub that is never available, to exercise the ground-truth
/// fallback.
struct DownClassifier;

impl Classifier for DownClassifier {
    fn classify(&mut self, _roi: &CameraImage) -> Result<LightColor, ClassifierError> {
        Err(ClassifierError::Unavailable("model not loaded".into()))
    }
}

#[derive(Default)]
struct VecSink(Vec<i64>);

impl OutputSink for VecSink {
    fn publish(&mut self, waypoint: i64) {
        self.0.push(waypoint);
    }
}

fn site_config() -> DetectorConfig {
    toml::from_str(
        r#"
        stop_line_positions = [[22.0, 0.0]]

        [camera_info]
        image_width = 800
        image_height = 600
        "#,
    )
    .unwrap()
}

/// Detector on a 200-waypoint straight path (1 m spacing) with one light
/// `light_x` meters down the road, and the vehicle just short of waypoint 1.
fn detector_with_light(light_x: f64, state: LightColor) -> Detector {
    let mut detector = Detector::new(&site_config(), 1).unwrap();
    detector.on_waypoints((0..200).map(|i| Waypoint::new(i as f64, 0.0, 0.0)).collect());
    detector
        .on_lights(vec![TrafficLight {
            position: Point3::new(light_x, 0.0, 1.5),
            state,
        }])
        .unwrap();
    detector.on_pose(Pose::with_yaw(Point3::new(0.5, 0.0, 0.0), 0.0));
    detector
}

fn run_frames(
    detector: &mut Detector,
    classifier: &mut dyn Classifier,
    frames: usize,
) -> (Vec<Option<i64>>, Vec<i64>) {
    let frame = CameraImage::black(800, 600);
    let mut sink = VecSink::default();
    let mut outputs = Vec::new();
    for _ in 0..frames {
        let mut io = DetectorIo {
            cropper: &StubCropper,
            classifier: &mut *classifier,
            sink: &mut sink,
            observer: None,
        };
        outputs.push(detector.process_frame(&frame, &mut io));
    }
    (outputs, sink.0)
}

#[test]
fn red_light_ahead_commits_the_stop_waypoint() {
    let mut detector = detector_with_light(25.0, LightColor::Red);
    let (outputs, published) = run_frames(&mut detector, &mut FixedClassifier(LightColor::Red), 6);

    // First frame flips the pending color (skipped publish tick), the next
    // two re-publish the startup value, then the counter reaches the
    // threshold and the stop waypoint commits.
    assert_eq!(outputs[0], None);
    assert_eq!(outputs[1], Some(NO_STOP));
    assert_eq!(outputs[2], Some(NO_STOP));
    assert_eq!(outputs[3], Some(22));
    assert_eq!(detector.published(), 22);
    assert_eq!(published.last(), Some(&22));
}

#[test]
fn green_light_ahead_keeps_no_stop_published() {
    let mut detector = detector_with_light(25.0, LightColor::Green);
    let (_, published) = run_frames(&mut detector, &mut FixedClassifier(LightColor::Green), 6);

    assert!(published.iter().all(|&wp| wp == NO_STOP));
    assert_eq!(detector.published(), NO_STOP);
}

#[test]
fn classifier_outage_falls_back_to_ground_truth() {
    let mut detector = detector_with_light(25.0, LightColor::Red);
    let (_, published) = run_frames(&mut detector, &mut DownClassifier, 6);

    // Ground truth is red, so the stop still commits.
    assert_eq!(published.last(), Some(&22));
}

#[test]
fn light_beyond_the_horizon_is_never_reported() {
    let mut detector = detector_with_light(150.0, LightColor::Red);
    let (_, published) = run_frames(&mut detector, &mut FixedClassifier(LightColor::Red), 10);

    // The scanner never reaches the light, so every raw frame is Unknown and
    // the startup value keeps publishing.
    assert!(published.iter().all(|&wp| wp == NO_STOP));
    assert_eq!(detector.published(), NO_STOP);
}

#[test]
fn outlier_red_frame_inside_a_green_run_is_suppressed() {
    let mut detector = detector_with_light(25.0, LightColor::Green);

    let mut green = FixedClassifier(LightColor::Green);
    let mut red = FixedClassifier(LightColor::Red);
    let (_, first) = run_frames(&mut detector, &mut green, 5);
    let (_, outlier) = run_frames(&mut detector, &mut red, 1);
    let (_, rest) = run_frames(&mut detector, &mut green, 10);

    assert!(first.iter().all(|&wp| wp == NO_STOP));
    // The outlier tick is the skipped publish; nothing red ever commits.
    assert!(outlier.is_empty());
    assert!(rest.iter().all(|&wp| wp == NO_STOP));
}

#[test]
fn frames_before_pose_and_waypoints_are_skipped() {
    let mut detector = Detector::new(&site_config(), 1).unwrap();
    let frame = CameraImage::black(800, 600);
    let mut sink = VecSink::default();
    let mut classifier = FixedClassifier(LightColor::Red);
    for _ in 0..3 {
        let mut io = DetectorIo {
            cropper: &StubCropper,
            classifier: &mut classifier,
            sink: &mut sink,
            observer: None,
        };
        assert_eq!(detector.process_frame(&frame, &mut io), None);
    }
    // Nothing was published and the debouncer was never touched.
    assert!(sink.0.is_empty());
    assert_eq!(detector.published(), NO_STOP);
}

#[test]
fn mismatched_light_list_is_rejected() {
    let mut detector = Detector::new(&site_config(), 1).unwrap();
    let lights = vec![
        TrafficLight {
            position: Point3::new(25.0, 0.0, 1.5),
            state: LightColor::Red,
        };
        2
    ];
    assert!(matches!(
        detector.on_lights(lights),
        Err(ConfigError::StopLineTableTooShort {
            stop_lines: 1,
            lights: 2
        })
    ));
}

#[test]
fn short_stop_line_table_fails_at_startup() {
    assert!(matches!(
        Detector::new(&site_config(), 2),
        Err(ConfigError::StopLineTableTooShort { .. })
    ));
}
