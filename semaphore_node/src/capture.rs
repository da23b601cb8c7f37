// semaphore_node/src/capture.rs

//! Debug/training capture. Purely an observer behind [`FrameObserver`]: it
//! runs after the core decision and the pipeline never waits on it.
//!
//! Output layout in the capture directory:
//!   traffic_light_<idx>.png  -- cropped ROI, every K-th decision frame
//!   params.csv               -- <idx>,<dx>,<dy>,<dz>,<state code> per image
//! plus a warning counter for classifier results disagreeing with ground
//! truth. The image index resumes from whatever is already on disk.

use semaphore_core::prelude::{FrameObserver, FrameTap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Dump every K-th decision frame.
const DUMP_EVERY: u64 = 10;

pub struct CaptureObserver {
    dir: PathBuf,
    next_image_idx: u64,
    misclassifications: u64,
}

impl CaptureObserver {
    /// Creates the capture directory if needed and resumes the image index
    /// from existing files.
    pub fn new(dir: PathBuf) -> std::io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let next_image_idx = highest_existing_index(&dir)?.map_or(0, |max| max + 1);
        info!(dir = %dir.display(), next_image_idx, "debug capture enabled");
        Ok(Self {
            dir,
            next_image_idx,
            misclassifications: 0,
        })
    }

    fn dump(&mut self, tap: &FrameTap<'_>) {
        let (Some(hit), Some(crop)) = (tap.hit, tap.crop) else {
            return;
        };
        let path = self
            .dir
            .join(format!("traffic_light_{}.png", self.next_image_idx));
        let Some(img) =
            image::RgbImage::from_raw(crop.width, crop.height, crop.data.clone())
        else {
            warn!("crop buffer size mismatch; skipping dump");
            return;
        };
        if let Err(err) = img.save(&path) {
            warn!(%err, path = %path.display(), "failed to write capture image");
            return;
        }

        let offset = hit.projection.camera_offset;
        let row = format!(
            "{},{},{},{},{}\n",
            self.next_image_idx,
            offset.x,
            offset.y,
            offset.z,
            tap.ground_truth.code()
        );
        if let Err(err) = append_csv(&self.dir.join("params.csv"), &row) {
            warn!(%err, "failed to append capture csv");
        }
        self.next_image_idx += 1;
    }
}

impl FrameObserver for CaptureObserver {
    fn on_decision(&mut self, tap: &FrameTap<'_>) {
        if tap.hit.is_some() && tap.observed != tap.ground_truth {
            self.misclassifications += 1;
            warn!(
                expected = ?tap.ground_truth,
                got = ?tap.observed,
                total = self.misclassifications,
                "light misclassified"
            );
        }
        if tap.frame_index % DUMP_EVERY == 0 {
            self.dump(tap);
        }
    }
}

fn append_csv(path: &Path, row: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(row.as_bytes())
}

/// Largest `<number>` among `traffic_light_<number>.png` files in `dir`.
fn highest_existing_index(dir: &Path) -> std::io::Result<Option<u64>> {
    let mut max = None;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(idx) = name
            .strip_prefix("traffic_light_")
            .and_then(|rest| rest.strip_suffix(".png"))
            .and_then(|digits| digits.parse::<u64>().ok())
        else {
            continue;
        };
        max = Some(max.map_or(idx, |m: u64| m.max(idx)));
    }
    Ok(max)
}
