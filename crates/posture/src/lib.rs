//! Posture Analysis
//!
//! Turns a video frame into a per-frame fall signal:
//! - Frame classification (YOLO ONNX model or recorded detections)
//! - Person filtering by label and confidence
//! - Bounding-box posture evaluation

pub mod classifier;
pub mod config;
pub mod detection;
pub mod evaluator;
pub mod yolo;

pub use classifier::{FrameClassifier, ReplayClassifier};
pub use config::PostureConfig;
pub use detection::{BoundingBox, Detection};
pub use evaluator::{assess_frame, evaluate, frame_fall_signal, FrameAssessment, PostureVerdict};
pub use yolo::YoloClassifier;

use camera_capture::CameraError;
use thiserror::Error;

/// Posture error types
#[derive(Error, Debug)]
pub enum PostureError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] CameraError),

    #[error("Replay file error: {0}")]
    Replay(String),
}
