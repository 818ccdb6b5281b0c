//! Frame sources

use crate::{CameraError, VideoFrame};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Anything that yields frames one at a time.
///
/// `Ok(None)` means the source is exhausted; the monitoring loop stops on it.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Reads still images from a directory in file-name order
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    cursor: usize,
    opened_at: Instant,
}

impl ImageSequenceSource {
    /// Open a directory of frames
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "{}: no image frames found",
                dir.display()
            )));
        }

        info!("Opened image sequence {} ({} frames)", dir.display(), files.len());
        Ok(Self {
            files,
            cursor: 0,
            opened_at: Instant::now(),
        })
    }

    /// Number of frames not yet read
    pub fn remaining(&self) -> usize {
        self.files.len() - self.cursor
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };

        let img = image::open(path).map_err(|e| CameraError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!("Read frame {}", path.display());

        let sequence = self.cursor as u32;
        self.cursor += 1;

        Ok(Some(VideoFrame::from_rgb_image(
            img.to_rgb8(),
            self.opened_at.elapsed().as_nanos() as u64,
            sequence,
        )))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
