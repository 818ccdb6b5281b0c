//! Monitoring session
//!
//! Owns all mutable pipeline state for one monitored subject and advances it
//! one frame at a time.

use alerting::{AlertDispatcher, DispatchOutcome};
use camera_capture::VideoFrame;
use confirmation::{FallConfirmation, FallEvent};
use posture::{assess_frame, FrameClassifier, PostureConfig};
use tracing::{debug, info, warn};

pub const FRAMES_TOTAL: &str = "fall_monitor_frames_total";
pub const FALL_FRAMES_TOTAL: &str = "fall_monitor_fall_frames_total";
pub const FALL_EVENTS_TOTAL: &str = "fall_monitor_fall_events_total";
pub const ALERTS_TOTAL: &str = "fall_monitor_alerts_total";

/// What one frame did to the session
#[derive(Debug)]
pub enum FrameReport {
    /// Classification failed; confirmation state untouched
    Skipped,
    /// Frame evaluated, no fall confirmed on it
    Observed { fall_signal: bool },
    /// Frame completed a streak and the resulting event was dispatched
    Confirmed(DispatchOutcome),
}

impl FrameReport {
    pub fn outcome(&self) -> Option<&DispatchOutcome> {
        match self {
            FrameReport::Confirmed(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Per-subject pipeline state: classifier, confirmation counter, dispatcher
pub struct MonitorSession {
    posture: PostureConfig,
    frame_size: Option<(u32, u32)>,
    classifier: Box<dyn FrameClassifier>,
    confirmation: FallConfirmation,
    dispatcher: AlertDispatcher,
    frames: u64,
}

impl MonitorSession {
    pub fn new(
        posture: PostureConfig,
        classifier: Box<dyn FrameClassifier>,
        confirmation: FallConfirmation,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            posture,
            frame_size: None,
            classifier,
            confirmation,
            dispatcher,
            frames: 0,
        }
    }

    /// Resize every frame to `width`x`height` before classification
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    pub fn confirmation(&self) -> &FallConfirmation {
        &self.confirmation
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Classify, evaluate, confirm, and dispatch one frame
    pub async fn process_frame(&mut self, frame: VideoFrame) -> FrameReport {
        self.frames += 1;
        metrics::counter!(FRAMES_TOTAL).increment(1);

        let frame = match self.frame_size {
            Some((width, height)) => match frame.resize(width, height) {
                Ok(resized) => resized,
                Err(e) => {
                    warn!("Frame {} could not be resized, skipping: {}", frame.sequence, e);
                    return FrameReport::Skipped;
                }
            },
            None => frame,
        };

        let detections = match self.classifier.classify(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Classification failed on frame {}, skipping: {}", frame.sequence, e);
                return FrameReport::Skipped;
            }
        };

        let assessment = assess_frame(&detections, &self.posture);
        let fall_signal = assessment.fall_signal();
        debug!(
            "Frame {}: {} detections, {} qualifying, {} fallen",
            frame.sequence,
            detections.len(),
            assessment.qualifying,
            assessment.fallen
        );
        if fall_signal {
            metrics::counter!(FALL_FRAMES_TOTAL).increment(1);
        }

        match self.confirmation.observe(fall_signal, Some(&frame)) {
            Some(event) => FrameReport::Confirmed(self.dispatch(event).await),
            None => FrameReport::Observed { fall_signal },
        }
    }

    async fn dispatch(&mut self, event: FallEvent) -> DispatchOutcome {
        info!("Fall detected! Sending alert...");
        metrics::counter!(FALL_EVENTS_TOTAL).increment(1);

        let outcome = self.dispatcher.dispatch(&event).await;
        metrics::counter!(ALERTS_TOTAL, "outcome" => outcome.label()).increment(1);
        outcome
    }
}
