//! Posture evaluation and per-frame fall signal

use crate::{Detection, PostureConfig};
use crate::detection::BoundingBox;
use serde::{Deserialize, Serialize};

/// Outcome of evaluating one bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostureVerdict {
    Fallen,
    NotFallen,
}

impl PostureVerdict {
    pub fn is_fallen(self) -> bool {
        self == PostureVerdict::Fallen
    }
}

/// A box wider than it is tall is a lying-down posture. Ties are not fallen.
pub fn evaluate(bbox: &BoundingBox) -> PostureVerdict {
    if bbox.width() > bbox.height() {
        PostureVerdict::Fallen
    } else {
        PostureVerdict::NotFallen
    }
}

/// Summary of one frame's detections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameAssessment {
    /// Detections that passed the label and confidence filter
    pub qualifying: usize,
    /// Qualifying detections with a fallen verdict
    pub fallen: usize,
}

impl FrameAssessment {
    /// True iff at least one qualifying detection is fallen
    pub fn fall_signal(&self) -> bool {
        self.fallen > 0
    }
}

fn qualifies(detection: &Detection, config: &PostureConfig) -> bool {
    detection.label == config.person_label && detection.confidence > config.confidence_threshold
}

/// Filter and evaluate every detection of a frame
pub fn assess_frame(detections: &[Detection], config: &PostureConfig) -> FrameAssessment {
    detections
        .iter()
        .filter(|d| qualifies(d, config))
        .fold(FrameAssessment::default(), |mut acc, d| {
            acc.qualifying += 1;
            if evaluate(&d.bbox).is_fallen() {
                acc.fallen += 1;
            }
            acc
        })
}

/// FrameFallSignal for a set of detections
pub fn frame_fall_signal(detections: &[Detection], config: &PostureConfig) -> bool {
    assess_frame(detections, config).fall_signal()
}
