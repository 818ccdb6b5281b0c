//! Storage Layer
//!
//! Persists the frame that confirmed a fall so it can be attached to the alert.

mod evidence;

pub use evidence::{EvidenceStore, LocalEvidenceStore};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("Encoding error: {0}")]
    Encoding(String),
}
