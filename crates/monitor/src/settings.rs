//! Monitor settings
//!
//! Loaded from an optional `fall-monitor.toml` and then the process
//! environment, later sources overriding earlier ones.

use alerting::AlertConfig;
use camera_capture::{CaptureConfig, SourceConfig, SourceKind};
use cloud_sync::{CloudinaryConfig, NotifierConfig, SignatureAlgorithm};
use config::{Config, ConfigError, Environment, File};
use posture::PostureConfig;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Environment variable naming an alternative settings file
pub const CONFIG_PATH_VAR: &str = "FALL_MONITOR_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "fall-monitor.toml";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Missing setting `{0}`")]
    Missing(&'static str),
}

/// Where detections come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierSource {
    /// ONNX YOLO model
    Model(String),
    /// JSON-lines recording of detections
    Replay(String),
}

/// Monitor settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub backend_url: String,
    pub fall_alert_token: String,
    pub user_id: i64,
    /// 0-100 scale, strict `>`
    pub confidence_threshold: f32,
    pub cooldown_seconds: u64,
    pub consecutive_frames: u32,
    pub request_timeout_seconds: u64,
    pub evidence_dir: String,

    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    /// `sha1` (account default) or `sha256`
    pub cloudinary_signature_algorithm: String,

    /// Replay a directory of stills instead of the camera
    pub source_dir: Option<String>,
    pub camera_device: String,
    pub camera_fourcc: String,
    pub camera_width: u32,
    pub camera_height: u32,
    pub camera_fps: u32,
    pub frame_width: u32,
    pub frame_height: u32,

    pub model_path: Option<String>,
    pub labels_path: Option<String>,
    pub detections_path: Option<String>,

    pub log_level: String,
    pub json_logs: bool,
    pub metrics_addr: Option<String>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        let notifier = NotifierConfig::default();
        let alert = AlertConfig::default();
        let source = SourceConfig::default();
        let camera = CaptureConfig::default();
        Self {
            backend_url: notifier.backend_url,
            fall_alert_token: notifier.api_key,
            user_id: alert.subject_id,
            confidence_threshold: PostureConfig::default().confidence_threshold,
            cooldown_seconds: alert.cooldown_seconds,
            consecutive_frames: 5,
            request_timeout_seconds: notifier.timeout.as_secs(),
            evidence_dir: "alerts".to_string(),
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            cloudinary_signature_algorithm: "sha1".to_string(),
            source_dir: None,
            camera_device: camera.device,
            camera_fourcc: camera.fourcc,
            camera_width: camera.width,
            camera_height: camera.height,
            camera_fps: camera.fps,
            frame_width: source.width,
            frame_height: source.height,
            model_path: None,
            labels_path: None,
            detections_path: None,
            log_level: "info".to_string(),
            json_logs: false,
            metrics_addr: None,
        }
    }
}

/// Treat empty strings as unset
fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl MonitorSettings {
    /// Load from the settings file (if any) and the process environment.
    ///
    /// Environment values stay strings until serde asks for a typed field, so
    /// secrets such as `007` keep their leading zeros.
    pub fn load() -> Result<Self, SettingsError> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(&path, Environment::default())
    }

    fn from_sources(path: &str, environment: Environment) -> Result<Self, SettingsError> {
        let settings: Self = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.backend_url.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "backend_url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.consecutive_frames < 1 {
            return Err(SettingsError::Invalid {
                key: "consecutive_frames",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&self.confidence_threshold) {
            return Err(SettingsError::Invalid {
                key: "confidence_threshold",
                reason: format!("{} is outside 0-100", self.confidence_threshold),
            });
        }
        if self.request_timeout_seconds < 1 {
            return Err(SettingsError::Invalid {
                key: "request_timeout_seconds",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Err(e) = self.cloudinary_signature_algorithm.parse::<SignatureAlgorithm>() {
            return Err(SettingsError::Invalid {
                key: "cloudinary_signature_algorithm",
                reason: e.to_string(),
            });
        }
        if self.camera_fourcc.len() != 4 {
            return Err(SettingsError::Invalid {
                key: "camera_fourcc",
                reason: format!("`{}` is not a four-character code", self.camera_fourcc),
            });
        }
        if self.camera_fps < 1 {
            return Err(SettingsError::Invalid {
                key: "camera_fps",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(SettingsError::Invalid {
                key: "frame_width",
                reason: "frame dimensions must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn notifier_config(&self) -> NotifierConfig {
        NotifierConfig {
            backend_url: self.backend_url.clone(),
            api_key: self.fall_alert_token.clone(),
            timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }

    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            subject_id: self.user_id,
            cooldown_seconds: self.cooldown_seconds,
        }
    }

    pub fn posture_config(&self) -> PostureConfig {
        PostureConfig {
            confidence_threshold: self.confidence_threshold,
            model_path: non_empty(&self.model_path),
            labels_path: non_empty(&self.labels_path),
            ..PostureConfig::default()
        }
    }

    /// The camera unless `source_dir` is set
    pub fn source_config(&self) -> SourceConfig {
        let kind = match non_empty(&self.source_dir) {
            Some(dir) => SourceKind::Directory(dir),
            None => SourceKind::Camera(CaptureConfig {
                device: self.camera_device.clone(),
                fourcc: self.camera_fourcc.to_ascii_uppercase(),
                width: self.camera_width,
                height: self.camera_height,
                fps: self.camera_fps,
            }),
        };
        SourceConfig {
            kind,
            width: self.frame_width,
            height: self.frame_height,
        }
    }

    /// Image hosting is enabled only when all three credentials are present
    pub fn cloudinary_config(&self) -> Option<CloudinaryConfig> {
        let cloud_name = non_empty(&self.cloudinary_cloud_name);
        let api_key = non_empty(&self.cloudinary_api_key);
        let api_secret = non_empty(&self.cloudinary_api_secret);

        match (cloud_name, api_key, api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => {
                let mut config = CloudinaryConfig::new(cloud_name, api_key, api_secret);
                config.signature_algorithm = self
                    .cloudinary_signature_algorithm
                    .parse()
                    .unwrap_or_default();
                Some(config)
            }
            (Some(_), _, _) => {
                warn!("Cloudinary credentials incomplete, evidence upload disabled");
                None
            }
            _ => None,
        }
    }

    /// The model wins when both a model and a recording are configured
    pub fn classifier_source(&self) -> Result<ClassifierSource, SettingsError> {
        match (non_empty(&self.model_path), non_empty(&self.detections_path)) {
            (Some(model), replay) => {
                if replay.is_some() {
                    warn!("Both model_path and detections_path set, using the model");
                }
                Ok(ClassifierSource::Model(model))
            }
            (None, Some(replay)) => Ok(ClassifierSource::Replay(replay)),
            (None, None) => Err(SettingsError::Missing("model_path or detections_path")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().source(Some(map))
    }

    fn load(vars: &[(&str, &str)]) -> Result<MonitorSettings, SettingsError> {
        MonitorSettings::from_sources("/nonexistent/fall-monitor", env(vars))
    }

    #[test]
    fn test_defaults() {
        let settings = load(&[]).unwrap();
        assert_eq!(settings.backend_url, "http://localhost:4000");
        assert_eq!(settings.fall_alert_token, "secret_token_for_fall_detection");
        assert_eq!(settings.user_id, 1);
        assert_eq!(settings.confidence_threshold, 80.0);
        assert_eq!(settings.cooldown_seconds, 30);
        assert_eq!(settings.consecutive_frames, 5);
        assert_eq!(settings.request_timeout_seconds, 10);
        assert_eq!(settings.evidence_dir, "alerts");
        assert_eq!((settings.frame_width, settings.frame_height), (980, 740));
        assert!(!settings.json_logs);
    }

    #[test]
    fn test_environment_overrides() {
        let settings = load(&[
            ("BACKEND_URL", "http://backend:5000"),
            ("USER_ID", "42"),
            ("COOLDOWN_SECONDS", "60"),
            ("CONSECUTIVE_FRAMES", "3"),
            ("JSON_LOGS", "true"),
        ])
        .unwrap();

        assert_eq!(settings.backend_url, "http://backend:5000");
        assert_eq!(settings.alert_config().subject_id, 42);
        assert_eq!(settings.alert_config().cooldown(), Duration::from_secs(60));
        assert_eq!(settings.consecutive_frames, 3);
        assert!(settings.json_logs);
    }

    #[test]
    fn test_settings_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fall-monitor.toml");
        std::fs::write(&path, "user_id = 7\nevidence_dir = \"evidence\"\n").unwrap();

        let settings =
            MonitorSettings::from_sources(path.to_str().unwrap(), env(&[("USER_ID", "8")])).unwrap();
        assert_eq!(settings.evidence_dir, "evidence");
        // environment wins over the file
        assert_eq!(settings.user_id, 8);
    }

    #[test]
    fn test_zero_frame_threshold_is_rejected() {
        let err = load(&[("CONSECUTIVE_FRAMES", "0")]).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "consecutive_frames", .. }));
    }

    #[test]
    fn test_empty_backend_is_rejected() {
        let mut settings = MonitorSettings::default();
        settings.backend_url = "  ".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { key: "backend_url", .. })
        ));
    }

    #[test]
    fn test_cloudinary_requires_all_credentials() {
        let mut settings = MonitorSettings::default();
        assert!(settings.cloudinary_config().is_none());

        settings.cloudinary_cloud_name = Some("demo".to_string());
        settings.cloudinary_api_key = Some("123".to_string());
        assert!(settings.cloudinary_config().is_none());

        settings.cloudinary_api_secret = Some("shh".to_string());
        let config = settings.cloudinary_config().unwrap();
        assert_eq!(config.cloud_name, "demo");
        assert_eq!(config.api_key, "123");
    }

    #[test]
    fn test_classifier_source_prefers_model() {
        let mut settings = MonitorSettings::default();
        assert!(matches!(
            settings.classifier_source(),
            Err(SettingsError::Missing(_))
        ));

        settings.detections_path = Some("detections.jsonl".to_string());
        assert_eq!(
            settings.classifier_source().unwrap(),
            ClassifierSource::Replay("detections.jsonl".to_string())
        );

        settings.model_path = Some("yolov8n.onnx".to_string());
        assert_eq!(
            settings.classifier_source().unwrap(),
            ClassifierSource::Model("yolov8n.onnx".to_string())
        );
    }

    #[test]
    fn test_camera_is_the_default_source() {
        let settings = load(&[("CAMERA_DEVICE", "/dev/video2"), ("CAMERA_FOURCC", "yuyv")]).unwrap();
        let source = settings.source_config();
        assert_eq!((source.width, source.height), (980, 740));
        assert_eq!(
            source.kind,
            SourceKind::Camera(CaptureConfig {
                device: "/dev/video2".to_string(),
                fourcc: "YUYV".to_string(),
                ..CaptureConfig::default()
            })
        );
    }

    #[test]
    fn test_source_dir_replaces_the_camera() {
        let settings = load(&[("SOURCE_DIR", "frames/")]).unwrap();
        assert_eq!(
            settings.source_config().kind,
            SourceKind::Directory("frames/".to_string())
        );
    }

    #[test]
    fn test_signature_algorithm_setting() {
        let settings = load(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
            ("CLOUDINARY_SIGNATURE_ALGORITHM", "sha256"),
        ])
        .unwrap();
        assert_eq!(
            settings.cloudinary_config().unwrap().signature_algorithm,
            SignatureAlgorithm::Sha256
        );

        let err = load(&[("CLOUDINARY_SIGNATURE_ALGORITHM", "md5")]).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid { key: "cloudinary_signature_algorithm", .. }
        ));
    }

    #[test]
    fn test_bad_fourcc_is_rejected() {
        let err = load(&[("CAMERA_FOURCC", "MJPEG")]).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "camera_fourcc", .. }));
    }

    #[test]
    fn test_numeric_secrets_keep_leading_zeros() {
        let settings = load(&[
            ("FALL_ALERT_TOKEN", "007"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "000123456789"),
            ("CLOUDINARY_API_SECRET", "0042"),
        ])
        .unwrap();

        assert_eq!(settings.fall_alert_token, "007");
        assert_eq!(settings.notifier_config().api_key, "007");
        let cloudinary = settings.cloudinary_config().unwrap();
        assert_eq!(cloudinary.api_key, "000123456789");
        assert_eq!(cloudinary.api_secret, "0042");
        assert_eq!(cloudinary.signature_algorithm, SignatureAlgorithm::Sha1);
    }
}
