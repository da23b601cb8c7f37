// semaphore_core/src/debounce.rs

//! Converts noisy per-frame classifications into a stable published signal.
//!
//! A state transition is only trusted after the same raw color has been seen
//! on enough consecutive frames; a single outlier frame resets the count and
//! never reaches the output.

use crate::types::LightColor;
use tracing::debug;

/// Default consecutive-agreement threshold.
pub const STATE_COUNT_THRESHOLD: u32 = 3;

/// Published value meaning "no red-light stop pending".
pub const NO_STOP: i64 = -1;

/// The per-frame debounce state machine. Mutated exactly once per processed
/// frame; frames must be fed in arrival order.
#[derive(Debug, Clone)]
pub struct StateDebouncer {
    threshold: u32,
    /// Last observed raw color (the pending, not-yet-trusted state).
    pending: LightColor,
    /// Consecutive frames the pending color has been observed.
    count: u32,
    /// Last color that survived debouncing.
    stable: LightColor,
    /// Last committed waypoint index, or [`NO_STOP`].
    published: i64,
}

impl Default for StateDebouncer {
    fn default() -> Self {
        Self::new(STATE_COUNT_THRESHOLD)
    }
}

impl StateDebouncer {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            pending: LightColor::Unknown,
            count: 0,
            stable: LightColor::Unknown,
            published: NO_STOP,
        }
    }

    /// Feeds one frame's raw result and returns the value to publish this
    /// tick, if any.
    ///
    /// A raw-color change adopts the new pending color, resets the agreement
    /// counter and publishes nothing that tick. (Deliberate: this skipped
    /// publish is carried over from the reference behavior; downstream
    /// consumers treat the publish stream as a heartbeat and tolerate the
    /// gap.) Once the counter has reached the threshold the pending color is
    /// committed: `raw_waypoint` for red, [`NO_STOP`] for everything else.
    /// Below the threshold the previously committed value is re-published.
    pub fn update(&mut self, raw_color: LightColor, raw_waypoint: i64) -> Option<i64> {
        let out = if raw_color != self.pending {
            self.count = 0;
            self.pending = raw_color;
            None
        } else if self.count >= self.threshold {
            self.stable = self.pending;
            self.published = if raw_color == LightColor::Red {
                raw_waypoint
            } else {
                NO_STOP
            };
            debug!(waypoint = self.published, color = ?self.stable, "committed");
            Some(self.published)
        } else {
            Some(self.published)
        };
        self.count += 1;
        out
    }

    /// Last color that survived debouncing.
    pub fn stable_color(&self) -> LightColor {
        self.stable
    }

    /// Last committed waypoint index, or [`NO_STOP`].
    pub fn published(&self) -> i64 {
        self.published
    }
}
