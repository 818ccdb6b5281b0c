//! Fall Monitor
//!
//! Wires the frame source, classifier, confirmation state machine, and alert
//! dispatcher into one sequential monitoring loop.

pub mod session;
pub mod settings;

pub use session::{FrameReport, MonitorSession};
pub use settings::{ClassifierSource, MonitorSettings, SettingsError};

use alerting::AlertDispatcher;
use anyhow::Context;
use camera_capture::{open_source, FrameSource, SourceKind};
use cloud_sync::{CloudinaryUploader, HttpNotifier};
use confirmation::FallConfirmation;
use metrics_exporter_prometheus::PrometheusBuilder;
use posture::{FrameClassifier, ReplayClassifier, YoloClassifier};
use std::net::SocketAddr;
use storage::LocalEvidenceStore;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let level: Level = level
        .parse()
        .with_context(|| format!("invalid log level `{}`", level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("failed to set tracing subscriber")
}

fn install_metrics(addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics_addr `{}`", addr))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    info!("Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}

fn build_classifier(settings: &MonitorSettings) -> anyhow::Result<Box<dyn FrameClassifier>> {
    let classifier: Box<dyn FrameClassifier> = match settings.classifier_source()? {
        ClassifierSource::Model(_) => Box::new(YoloClassifier::new(&settings.posture_config())?),
        ClassifierSource::Replay(path) => {
            info!("Replaying detections from {}", path);
            Box::new(ReplayClassifier::from_path(&path)?)
        }
    };
    Ok(classifier)
}

fn build_dispatcher(settings: &MonitorSettings) -> anyhow::Result<AlertDispatcher> {
    let notifier = HttpNotifier::new(settings.notifier_config())?;
    let store = LocalEvidenceStore::new(&settings.evidence_dir);
    let dispatcher =
        AlertDispatcher::new(settings.alert_config(), Box::new(notifier), Box::new(store));

    Ok(match settings.cloudinary_config() {
        Some(cloudinary) => dispatcher.with_image_host(Box::new(CloudinaryUploader::new(cloudinary)?)),
        None => {
            warn!("Cloudinary not configured, evidence will be stored locally only");
            dispatcher
        }
    })
}

/// Build a session from `settings` and run it until the source is exhausted
/// or the process is interrupted
pub async fn run(settings: MonitorSettings) -> anyhow::Result<()> {
    info!("Backend URL: {}", settings.backend_url);
    info!("Monitoring user {}", settings.user_id);
    info!(
        "Cooldown {}s, confirmation after {} consecutive frames",
        settings.cooldown_seconds, settings.consecutive_frames
    );

    if let Some(addr) = &settings.metrics_addr {
        install_metrics(addr)?;
    }

    let source_config = settings.source_config();
    match &source_config.kind {
        SourceKind::Camera(capture) => info!("Watching camera {}", capture.device),
        SourceKind::Directory(dir) => info!("Replaying frames from {}", dir),
    }
    let mut source = open_source(&source_config).context("failed to open frame source")?;

    let classifier = build_classifier(&settings)?;
    let dispatcher = build_dispatcher(&settings)?;
    let confirmation =
        FallConfirmation::new(settings.consecutive_frames, settings.confidence_threshold);

    let mut session = MonitorSession::new(
        settings.posture_config(),
        classifier,
        confirmation,
        dispatcher,
    )
    .with_frame_size(source_config.width, source_config.height);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current frame");
            let _ = stop_tx.send(true);
        }
    });

    run_session(&mut session, source.as_mut(), stop_rx).await;
    Ok(())
}

/// Feed frames to `session` one at a time.
///
/// The stop flag is checked between frames only; an in-flight dispatch is
/// never cancelled.
pub async fn run_session<S: FrameSource + ?Sized>(
    session: &mut MonitorSession,
    source: &mut S,
    stop: watch::Receiver<bool>,
) {
    info!("Monitoring started");
    loop {
        if *stop.borrow() {
            break;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Frame source exhausted");
                break;
            }
            Err(e) => {
                error!("Failed to read frame: {}", e);
                break;
            }
        };

        session.process_frame(frame).await;
    }
    info!("Monitoring stopped after {} frames", session.frames_processed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::AlertConfig;
    use async_trait::async_trait;
    use camera_capture::{CameraError, VideoFrame};
    use chrono::{DateTime, Local};
    use cloud_sync::{AlertPayload, CloudError, Notifier, NotifyReceipt};
    use posture::{BoundingBox, Detection, PostureConfig};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use storage::{EvidenceStore, StorageError};

    struct VecSource {
        frames: VecDeque<Result<VideoFrame, CameraError>>,
    }

    impl VecSource {
        fn blank(count: u32) -> Self {
            Self {
                frames: (0..count).map(|seq| Ok(VideoFrame::blank(8, 8, seq))).collect(),
            }
        }
    }

    impl FrameSource for VecSource {
        fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            self.frames.pop_front().transpose()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<AlertPayload>>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, payload: &AlertPayload) -> Result<NotifyReceipt, CloudError> {
            self.sent.lock().unwrap().push(payload.clone());
            Ok(NotifyReceipt::default())
        }
    }

    struct NullStore;

    impl EvidenceStore for NullStore {
        fn save(&self, _frame: &VideoFrame, _taken_at: DateTime<Local>) -> Result<PathBuf, StorageError> {
            Ok(PathBuf::from("alerts/fall.jpg"))
        }
    }

    fn session(notifier: RecordingNotifier) -> MonitorSession {
        let lying = vec![Detection::new(BoundingBox::new(0, 0, 300, 100), "person", 95.0)];
        let dispatcher =
            AlertDispatcher::new(AlertConfig::default(), Box::new(notifier), Box::new(NullStore));
        MonitorSession::new(
            PostureConfig::default(),
            Box::new(ReplayClassifier::new(vec![lying; 5])),
            FallConfirmation::new(5, 80.0),
            dispatcher,
        )
    }

    #[tokio::test]
    async fn test_runs_until_source_exhausted() {
        let notifier = RecordingNotifier::default();
        let mut session = session(notifier.clone());
        let (_stop_tx, stop_rx) = watch::channel(false);

        run_session(&mut session, &mut VecSource::blank(7), stop_rx).await;

        assert_eq!(session.frames_processed(), 7);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_error_ends_the_run() {
        let mut session = session(RecordingNotifier::default());
        let mut source = VecSource::blank(2);
        source.frames.push_back(Err(CameraError::Capture("device unplugged".to_string())));
        source.frames.push_back(Ok(VideoFrame::blank(8, 8, 3)));
        let (_stop_tx, stop_rx) = watch::channel(false);

        run_session(&mut session, &mut source, stop_rx).await;

        assert_eq!(session.frames_processed(), 2);
        assert_eq!(source.frames.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_flag_halts_before_next_frame() {
        let mut session = session(RecordingNotifier::default());
        let (stop_tx, stop_rx) = watch::channel(false);
        stop_tx.send(true).unwrap();

        run_session(&mut session, &mut VecSource::blank(3), stop_rx).await;

        assert_eq!(session.frames_processed(), 0);
    }
}
