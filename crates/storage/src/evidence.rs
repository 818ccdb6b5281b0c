//! Evidence Store Implementation

use crate::StorageError;
use camera_capture::VideoFrame;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persists an evidence frame and returns where it landed
pub trait EvidenceStore: Send + Sync {
    fn save(&self, frame: &VideoFrame, taken_at: DateTime<Local>) -> Result<PathBuf, StorageError>;
}

/// Writes JPEG frames under a local directory as `fall_<YYYYmmdd_HHMMSS>.jpg`
pub struct LocalEvidenceStore {
    dir: PathBuf,
}

impl LocalEvidenceStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!("Evidence directory: {}", dir.display());
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First free file name for this timestamp; falls within one second get a suffix
    fn file_path(&self, taken_at: DateTime<Local>) -> PathBuf {
        let stem = format!("fall_{}", taken_at.format("%Y%m%d_%H%M%S"));
        let mut path = self.dir.join(format!("{}.jpg", stem));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{}_{}.jpg", stem, n));
            n += 1;
        }
        path
    }
}

impl EvidenceStore for LocalEvidenceStore {
    fn save(&self, frame: &VideoFrame, taken_at: DateTime<Local>) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::Io {
            path: self.dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let jpeg = frame
            .encode_jpeg()
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let path = self.file_path(taken_at);
        fs::write(&path, &jpeg).map_err(|e| StorageError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!("Wrote {} bytes to {}", jpeg.len(), path.display());
        Ok(path)
    }
}
