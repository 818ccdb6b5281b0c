//! Alerting System
//!
//! Provides the cooldown gate, evidence capture, and notification dispatch
//! for confirmed falls.

mod cooldown;
mod dispatcher;

pub use cooldown::{AlertConfig, AlertCooldown};
pub use dispatcher::{AlertDispatcher, DispatchOutcome, EvidenceReport};
