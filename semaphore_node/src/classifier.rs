// semaphore_node/src/classifier.rs

//! Light-color classifiers. The pipeline only sees the [`Classifier`] trait;
//! which implementation runs is a deployment decision.

use semaphore_core::error::ClassifierError;
use semaphore_core::prelude::{CameraImage, Classifier, LightColor};

/// Fraction of pixels that must vote for a color before it wins. Crops are
/// mostly housing and sky, so the bar is low.
const MIN_VOTE_SHARE: f64 = 0.05;

/// Classifies a cropped light by per-pixel hue voting: each sufficiently
/// bright pixel votes red, yellow or green based on channel dominance, and
/// the largest vote wins.
#[derive(Debug, Default)]
pub struct HueVoteClassifier;

impl HueVoteClassifier {
    fn vote(r: u8, g: u8, b: u8) -> Option<LightColor> {
        let (r, g, b) = (r as i32, g as i32, b as i32);
        // Ignore dark pixels; a lit lamp is bright in at least one channel.
        if r.max(g).max(b) < 140 {
            return None;
        }
        if r > g + 60 && r > b + 60 {
            Some(LightColor::Red)
        } else if g > r + 60 && g > b + 60 {
            Some(LightColor::Green)
        } else if r > b + 60 && g > b + 60 {
            Some(LightColor::Yellow)
        } else {
            None
        }
    }
}

impl Classifier for HueVoteClassifier {
    fn classify(&mut self, roi: &CameraImage) -> Result<LightColor, ClassifierError> {
        let pixels = (roi.width as usize) * (roi.height as usize);
        if pixels == 0 || roi.data.len() < pixels * 3 {
            return Err(ClassifierError::RegionTooSmall {
                width: roi.width,
                height: roi.height,
            });
        }

        let mut votes = [0usize; 3]; // red, yellow, green
        for px in roi.data.chunks_exact(3) {
            match Self::vote(px[0], px[1], px[2]) {
                Some(LightColor::Red) => votes[0] += 1,
                Some(LightColor::Yellow) => votes[1] += 1,
                Some(LightColor::Green) => votes[2] += 1,
                _ => {}
            }
        }

        let quorum = ((pixels as f64) * MIN_VOTE_SHARE) as usize;
        let (winner, &count) = votes
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)
            .expect("votes is non-empty");
        if count <= quorum {
            return Ok(LightColor::Unknown);
        }
        Ok(match winner {
            0 => LightColor::Red,
            1 => LightColor::Yellow,
            _ => LightColor::Green,
        })
    }
}

/// A classifier that is permanently unavailable. Selecting it makes the
/// pipeline use its documented ground-truth fallback, which is how the system
/// runs while a trained model is absent.
#[derive(Debug, Default)]
pub struct OfflineClassifier;

impl Classifier for OfflineClassifier {
    fn classify(&mut self, _roi: &CameraImage) -> Result<LightColor, ClassifierError> {
        Err(ClassifierError::Unavailable("no model deployed".into()))
    }
}
