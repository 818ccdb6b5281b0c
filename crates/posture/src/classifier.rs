//! Frame classifier adapters

use crate::{Detection, PostureError};
use camera_capture::VideoFrame;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Produces the detections for one frame
pub trait FrameClassifier {
    fn classify(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>, PostureError>;
}

/// Replays detections recorded as JSON lines, one array of detections per frame.
///
/// Frames past the end of the recording get no detections.
pub struct ReplayClassifier {
    frames: VecDeque<Vec<Detection>>,
}

impl ReplayClassifier {
    /// Load a recording from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PostureError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| PostureError::Replay(format!("{}: {}", path.display(), e)))?;

        let mut frames = VecDeque::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| PostureError::Replay(e.to_string()))?;
            let line = line.trim();
            if line.is_empty() {
                frames.push_back(Vec::new());
                continue;
            }
            let detections: Vec<Detection> = serde_json::from_str(line).map_err(|e| {
                PostureError::Replay(format!("{} line {}: {}", path.display(), index + 1, e))
            })?;
            frames.push_back(detections);
        }

        info!("Loaded {} recorded frames from {}", frames.len(), path.display());
        Ok(Self { frames })
    }

    /// Build a replay from in-memory frames
    pub fn new(frames: impl IntoIterator<Item = Vec<Detection>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameClassifier for ReplayClassifier {
    fn classify(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>, PostureError> {
        let detections = self.frames.pop_front().unwrap_or_default();
        debug!("Frame {}: {} recorded detections", frame.sequence, detections.len());
        Ok(detections)
    }
}
