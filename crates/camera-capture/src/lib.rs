//! Camera Capture Library for the Fall Monitor
//!
//! Provides the frame types and frame sources consumed by the monitoring loop.
//! Supports:
//! - Decoded RGB frames with resize and JPEG encoding
//! - Live V4L2 cameras (MJPG or YUYV, behind the `v4l2` feature)
//! - Image-sequence sources (a directory of still frames)

pub mod frame;
pub mod pixel;
pub mod source;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use frame::VideoFrame;
pub use source::{FrameSource, ImageSequenceSource};
#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Source;

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Failed to read frame: {0}")]
    Capture(String),

    #[error("Failed to decode frame {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid frame buffer: expected {expected} bytes, got {actual}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Not available in this build: {0}")]
    Unavailable(String),
}

/// Live camera configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Device node, e.g. `/dev/video0`
    pub device: String,
    /// Requested pixel format, `MJPG` or `YUYV`
    pub fourcc: String,
    /// Requested capture size; the driver may pick the closest it supports
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            fourcc: "MJPG".to_string(),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Live camera
    Camera(CaptureConfig),
    /// Directory of still frames, read in file-name order
    Directory(String),
}

/// Frame source configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Working width frames are resized to before classification
    pub width: u32,
    /// Working height frames are resized to before classification
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Camera(CaptureConfig::default()),
            width: 980,
            height: 740,
        }
    }
}

/// Open the source described by `config`
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    match &config.kind {
        SourceKind::Directory(dir) => Ok(Box::new(ImageSequenceSource::open(dir)?)),
        SourceKind::Camera(capture) => open_camera(capture),
    }
}

#[cfg(feature = "v4l2")]
fn open_camera(capture: &CaptureConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    Ok(Box::new(V4l2Source::open(capture)?))
}

#[cfg(not(feature = "v4l2"))]
fn open_camera(capture: &CaptureConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    tracing::warn!("Camera {} requested", capture.device);
    Err(CameraError::Unavailable(format!(
        "{}: live capture needs the `v4l2` feature",
        capture.device
    )))
}
