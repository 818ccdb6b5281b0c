//! Confirmation state machine

use crate::FallEvent;
use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Where the current streak stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationState {
    /// No positive frames in a row
    Idle,
    /// Streak in progress
    Accumulating { frames: u32 },
}

/// Counts consecutive fall frames and fires once per completed streak
#[derive(Debug, Clone)]
pub struct FallConfirmation {
    threshold: u32,
    event_confidence: f32,
    counter: u32,
}

impl FallConfirmation {
    /// `threshold` is the number of consecutive frames required (at least 1).
    /// `event_confidence` is stamped on every emitted event (0-100 scale).
    pub fn new(threshold: u32, event_confidence: f32) -> Self {
        Self {
            threshold: threshold.max(1),
            event_confidence,
            counter: 0,
        }
    }

    /// Feed one processed frame's signal. Returns the event on the confirming frame.
    ///
    /// The counter resets as soon as an event fires, so an uninterrupted fall
    /// confirms again every `threshold` frames.
    pub fn observe(&mut self, signal: bool, frame: Option<&VideoFrame>) -> Option<FallEvent> {
        let (counter, fired) = transition(self.counter, self.threshold, signal);
        self.counter = counter;

        if fired {
            info!("Fall confirmed ({} consecutive frames)", self.threshold);
            return Some(FallEvent::new(self.event_confidence, frame.cloned()));
        }
        if counter > 0 {
            debug!("Confirming fall... {}/{}", counter, self.threshold);
        }
        None
    }

    pub fn state(&self) -> ConfirmationState {
        match self.counter {
            0 => ConfirmationState::Idle,
            frames => ConfirmationState::Accumulating { frames },
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

/// Next counter value and whether the event fires on this tick
fn transition(counter: u32, threshold: u32, signal: bool) -> (u32, bool) {
    if !signal {
        return (0, false);
    }
    let next = counter + 1;
    if next >= threshold {
        (0, true)
    } else {
        (next, false)
    }
}
