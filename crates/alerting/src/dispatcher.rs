//! Alert Dispatcher Implementation

use crate::{AlertConfig, AlertCooldown};
use chrono::SecondsFormat;
use cloud_sync::{AlertPayload, CloudError, ImageHost, Notifier};
use confirmation::FallEvent;
use std::path::PathBuf;
use std::time::Duration;
use storage::EvidenceStore;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// What happened to the evidence frame of a dispatched event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceReport {
    /// Local copy, if the write succeeded
    pub saved_path: Option<PathBuf>,
    /// Hosted copy, if an image host is configured and the upload succeeded
    pub image_url: Option<String>,
}

/// Result of one dispatch attempt
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The notification service accepted the alert
    Delivered {
        fall_alert_id: Option<i64>,
        evidence: EvidenceReport,
    },
    /// Still inside the cooldown window; nothing was attempted
    Suppressed { remaining: Duration },
    /// Notification failed; the cooldown was left untouched
    Failed {
        error: CloudError,
        evidence: EvidenceReport,
    },
}

impl DispatchOutcome {
    /// True iff the notification was actually sent
    pub fn delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Delivered { .. } => "delivered",
            DispatchOutcome::Suppressed { .. } => "suppressed",
            DispatchOutcome::Failed { .. } => "failed",
        }
    }
}

/// Gates confirmed falls through the cooldown and delivers them
pub struct AlertDispatcher {
    config: AlertConfig,
    cooldown: AlertCooldown,
    notifier: Box<dyn Notifier>,
    evidence: Box<dyn EvidenceStore>,
    image_host: Option<Box<dyn ImageHost>>,
}

impl AlertDispatcher {
    /// Create a dispatcher without remote image hosting
    pub fn new(
        config: AlertConfig,
        notifier: Box<dyn Notifier>,
        evidence: Box<dyn EvidenceStore>,
    ) -> Self {
        info!("Creating alert dispatcher with config: {:?}", config);
        Self {
            cooldown: AlertCooldown::new(config.cooldown()),
            config,
            notifier,
            evidence,
            image_host: None,
        }
    }

    /// Upload evidence frames through `host`
    pub fn with_image_host(mut self, host: Box<dyn ImageHost>) -> Self {
        self.image_host = Some(host);
        self
    }

    pub fn cooldown(&self) -> &AlertCooldown {
        &self.cooldown
    }

    /// Deliver one confirmed fall, at most once per cooldown window.
    ///
    /// The cooldown check comes first so a suppressed event costs no I/O.
    /// Only a delivered alert starts a new cooldown window.
    pub async fn dispatch(&mut self, event: &FallEvent) -> DispatchOutcome {
        let now = Instant::now();
        if let Some(remaining) = self.cooldown.remaining(now) {
            info!("Cooldown active. {}s remaining", remaining.as_secs());
            return DispatchOutcome::Suppressed { remaining };
        }

        let evidence = self.capture_evidence(event).await;

        let payload = AlertPayload {
            user_id: self.config.subject_id,
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            confidence: event.normalized_confidence(),
            image_url: evidence.image_url.clone(),
        };

        match self.notifier.notify(&payload).await {
            Ok(receipt) => {
                self.cooldown.record(now);
                match receipt.fall_alert_id {
                    Some(id) => info!("Fall alert sent successfully (id {})", id),
                    None => info!("Fall alert sent successfully"),
                }
                DispatchOutcome::Delivered {
                    fall_alert_id: receipt.fall_alert_id,
                    evidence,
                }
            }
            Err(e) => {
                match &e {
                    CloudError::Connection(_) => error!("Backend server not reachable: {}", e),
                    CloudError::Timeout(_) => error!("Backend took too long to respond: {}", e),
                    _ => error!("Failed to send fall alert: {}", e),
                }
                DispatchOutcome::Failed { error: e, evidence }
            }
        }
    }

    /// Save the frame locally, then upload it when a host is configured.
    /// Both steps fail soft.
    async fn capture_evidence(&self, event: &FallEvent) -> EvidenceReport {
        let Some(frame) = &event.image else {
            return EvidenceReport::default();
        };

        let path = match self.evidence.save(frame, event.timestamp) {
            Ok(path) => {
                info!("Frame saved: {}", path.display());
                path
            }
            Err(e) => {
                warn!("Could not save evidence frame, alerting without image: {}", e);
                return EvidenceReport::default();
            }
        };

        let image_url = match &self.image_host {
            None => {
                warn!("Image hosting not configured, evidence stored locally only");
                None
            }
            Some(host) => match host.upload(&path, self.config.subject_id).await {
                Ok(url) => {
                    info!("Evidence uploaded: {}", url);
                    Some(url)
                }
                Err(e) => {
                    warn!("Evidence upload failed, alerting without image: {}", e);
                    None
                }
            },
        };

        EvidenceReport {
            saved_path: Some(path),
            image_url,
        }
    }
}
