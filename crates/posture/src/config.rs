//! Posture configuration

use serde::{Deserialize, Serialize};

/// Posture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostureConfig {
    /// A detection qualifies only when its confidence (0-100) is strictly above this
    pub confidence_threshold: f32,

    /// Label of the monitored subject class
    pub person_label: String,

    /// Square model input size in pixels
    pub input_size: u32,

    /// Raw model score (0-1) below which candidates are dropped before NMS
    pub score_floor: f32,

    /// IoU above which overlapping candidates of the same class are merged
    pub nms_iou: f32,

    /// Model paths
    pub model_path: Option<String>,
    pub labels_path: Option<String>,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 80.0,
            person_label: "person".to_string(),
            input_size: 640,
            score_floor: 0.25,
            nms_iou: 0.45,
            model_path: None,
            labels_path: None,
        }
    }
}
