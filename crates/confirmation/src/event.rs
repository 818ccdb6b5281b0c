//! Confirmed fall events

use camera_capture::VideoFrame;
use chrono::{DateTime, Local};

/// A confirmed, debounced fall ready for dispatch
#[derive(Debug, Clone)]
pub struct FallEvent {
    /// Confidence on a 0-100 scale
    pub confidence: f32,
    /// When the fall was confirmed
    pub timestamp: DateTime<Local>,
    /// Frame that completed the streak
    pub image: Option<VideoFrame>,
}

impl FallEvent {
    pub fn new(confidence: f32, image: Option<VideoFrame>) -> Self {
        Self {
            confidence,
            timestamp: Local::now(),
            image,
        }
    }

    /// Confidence normalized to 0-1
    pub fn normalized_confidence(&self) -> f64 {
        f64::from(self.confidence) / 100.0
    }
}
