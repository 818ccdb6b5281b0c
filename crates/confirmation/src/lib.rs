//! Fall Confirmation
//!
//! Debounces the noisy per-frame fall signal: a fall is confirmed only after
//! a run of consecutive positive frames, and each confirmation emits one
//! [`FallEvent`].

mod event;
mod state;

pub use event::FallEvent;
pub use state::{ConfirmationState, FallConfirmation};
