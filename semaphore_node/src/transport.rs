// semaphore_node/src/transport.rs

//! Channel plumbing between the sources and the single pipeline thread.
//!
//! State topics (pose, waypoints, lights) are latest-value-wins: the pipeline
//! drains them non-blockingly before each frame and keeps only the newest
//! snapshot. Camera frames are the trigger: the pipeline blocks on the frame
//! channel and processes frames strictly in arrival order, which is what the
//! debouncer's ordered state machine requires. All detector state is owned by
//! this one thread, so no further locking is needed.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use semaphore_core::prelude::{
    CameraImage, Classifier, Detector, DetectorIo, FrameObserver, OutputSink, Pose, TrafficLight,
    Waypoint, NO_STOP,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

use crate::imaging::RgbCropper;

/// Capacity of the camera-frame channel. Small on purpose: a slow pipeline
/// back-pressures the source instead of processing stale frames.
const FRAME_QUEUE_DEPTH: usize = 4;

pub struct TopicSenders {
    pub pose: Sender<Pose>,
    pub waypoints: Sender<Vec<Waypoint>>,
    pub lights: Sender<Vec<TrafficLight>>,
    pub frames: Sender<CameraImage>,
}

pub struct TopicReceivers {
    pub pose: Receiver<Pose>,
    pub waypoints: Receiver<Vec<Waypoint>>,
    pub lights: Receiver<Vec<TrafficLight>>,
    pub frames: Receiver<CameraImage>,
}

/// Builds the full topic fabric.
pub fn topics() -> (TopicSenders, TopicReceivers) {
    let (pose_tx, pose_rx) = unbounded();
    let (wp_tx, wp_rx) = unbounded();
    let (light_tx, light_rx) = unbounded();
    let (frame_tx, frame_rx) = bounded(FRAME_QUEUE_DEPTH);
    (
        TopicSenders {
            pose: pose_tx,
            waypoints: wp_tx,
            lights: light_tx,
            frames: frame_tx,
        },
        TopicReceivers {
            pose: pose_rx,
            waypoints: wp_rx,
            lights: light_rx,
            frames: frame_rx,
        },
    )
}

/// The output sink: forwards every published value downstream and logs
/// stop-line transitions.
pub struct PublishSink {
    tx: Sender<i64>,
    last: i64,
}

impl PublishSink {
    pub fn new(tx: Sender<i64>) -> Self {
        Self { tx, last: NO_STOP }
    }
}

impl OutputSink for PublishSink {
    fn publish(&mut self, waypoint: i64) {
        if waypoint != self.last {
            if waypoint == NO_STOP {
                info!("stop released");
            } else {
                info!(waypoint, "red light: stopping at waypoint");
            }
            self.last = waypoint;
        }
        // A closed downstream just means nobody is listening anymore.
        let _ = self.tx.send(waypoint);
    }
}

/// Handle to the pipeline thread.
pub struct DetectorThread {
    handle: JoinHandle<Detector>,
}

impl DetectorThread {
    /// Spawns the single sequential pipeline thread. It drains the state
    /// topics, then runs one full detection cycle per received frame, until
    /// every frame sender is dropped.
    pub fn spawn(
        mut detector: Detector,
        rx: TopicReceivers,
        publish_tx: Sender<i64>,
        mut classifier: Box<dyn Classifier + Send>,
        mut observer: Option<Box<dyn FrameObserver + Send>>,
    ) -> Self {
        let handle = thread::spawn(move || {
            let mut sink = PublishSink::new(publish_tx);
            loop {
                let frame = match rx.frames.recv_timeout(Duration::from_millis(200)) {
                    Ok(frame) => frame,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                };

                // Latest value wins for every state topic.
                while let Ok(pose) = rx.pose.try_recv() {
                    detector.on_pose(pose);
                }
                while let Ok(waypoints) = rx.waypoints.try_recv() {
                    detector.on_waypoints(waypoints);
                }
                while let Ok(lights) = rx.lights.try_recv() {
                    if let Err(err) = detector.on_lights(lights) {
                        // Precondition violation: the deployment is
                        // inconsistent and detection cannot continue safely.
                        error!(%err, "rejecting light update");
                        return detector;
                    }
                }

                let observer_tap: Option<&mut dyn FrameObserver> = match observer.as_deref_mut() {
                    Some(o) => Some(o),
                    None => None,
                };
                let mut io = DetectorIo {
                    cropper: &RgbCropper,
                    classifier: classifier.as_mut(),
                    sink: &mut sink,
                    observer: observer_tap,
                };
                detector.process_frame(&frame, &mut io);
            }
            info!("frame sources closed; pipeline thread exiting");
            detector
        });
        Self { handle }
    }

    /// Waits for the pipeline thread and returns the final detector state.
    pub fn join(self) -> Detector {
        self.handle.join().expect("pipeline thread panicked")
    }
}
