// semaphore_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::pipeline::{Classifier, Detector, DetectorIo, FrameCropper, FrameObserver, FrameTap, OutputSink};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::types::{CameraImage, LightColor, PixelBox, Pose, TrafficLight, Waypoint};

// --- Stages (Exported for callers that drive them directly) ---
pub use crate::config::{CameraInfo, DetectorConfig};
pub use crate::debounce::{StateDebouncer, NO_STOP, STATE_COUNT_THRESHOLD};
pub use crate::error::{ClassifierError, ConfigError, CropError};
pub use crate::path::{nearest_stop_waypoint, CyclicPath, WaypointTracker};
pub use crate::projection::{project, CameraModel, Projection};
pub use crate::scanner::{scan, ScanHit, ScanParams};
