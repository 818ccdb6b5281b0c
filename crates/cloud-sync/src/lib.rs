//! Cloud Synchronization Module
//!
//! Outbound HTTP for confirmed falls:
//! - Fall alert notification to the caregiver backend
//! - Evidence image upload to an image host

mod image_host;
mod notifier;
mod payload;

pub use image_host::{CloudinaryConfig, CloudinaryUploader, ImageHost, SignatureAlgorithm};
pub use notifier::{HttpNotifier, Notifier, NotifierConfig};
pub use payload::{AlertPayload, NotifyReceipt};

use thiserror::Error;

/// Cloud sync error types
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CloudError {
    /// Map a transport error onto the connection/timeout/other split
    pub(crate) fn from_transport(err: reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            CloudError::Timeout(timeout)
        } else if err.is_connect() {
            CloudError::Connection(err.to_string())
        } else {
            CloudError::Request(err.to_string())
        }
    }
}
