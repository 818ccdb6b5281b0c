//! Evidence image upload

use crate::CloudError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Hosts an evidence image and returns its public URL
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, path: &Path, subject_id: i64) -> Result<String, CloudError>;
}

/// Digest the account verifies upload signatures with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// Cloudinary's account default
    #[default]
    Sha1,
    Sha256,
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(SignatureAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(SignatureAlgorithm::Sha256),
            other => Err(CloudError::Upload(format!(
                "unknown signature algorithm `{}`",
                other
            ))),
        }
    }
}

/// Cloudinary credentials
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Must match the account's signature setting
    pub signature_algorithm: SignatureAlgorithm,
    /// API root, overridable for tests
    pub api_base: String,
    pub timeout: Duration,
}

impl CloudinaryConfig {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            cloud_name,
            api_key,
            api_secret,
            signature_algorithm: SignatureAlgorithm::default(),
            api_base: "https://api.cloudinary.com".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Signed uploads to Cloudinary, one folder per monitored subject
pub struct CloudinaryUploader {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

impl CloudinaryUploader {
    pub fn new(config: CloudinaryConfig) -> Result<Self, CloudError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CloudError::Request(e.to_string()))?;
        info!("Evidence uploads enabled for cloud {}", config.cloud_name);
        Ok(Self { config, client })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name
        )
    }
}

/// Folder evidence for a subject is filed under
pub fn subject_folder(subject_id: i64) -> String {
    format!("fall_alerts/user_{}", subject_id)
}

/// Upload signature over every sent parameter except `file` and `api_key`:
/// sorted `key=value` pairs joined with `&`, secret appended, hex digest
fn sign(params: &[(&str, String)], api_secret: &str, algorithm: SignatureAlgorithm) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);
    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let to_sign = format!("{}{}", joined, api_secret);

    match algorithm {
        SignatureAlgorithm::Sha1 => hex::encode(Sha1::digest(to_sign.as_bytes())),
        SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(to_sign.as_bytes())),
    }
}

#[async_trait]
impl ImageHost for CloudinaryUploader {
    async fn upload(&self, path: &Path, subject_id: i64) -> Result<String, CloudError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CloudError::Io(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fall.jpg".to_string());

        let signed = [
            ("folder", subject_folder(subject_id)),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let signature = sign(
            &signed,
            &self.config.api_secret,
            self.config.signature_algorithm,
        );

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")
            .map_err(|e| CloudError::Upload(e.to_string()))?;
        let form = signed
            .into_iter()
            .fold(Form::new().part("file", part), |form, (key, value)| {
                form.text(key, value)
            })
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| CloudError::from_transport(e, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CloudError::Upload(format!("status {}: {}", status, body)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| CloudError::Serialization(e.to_string()))?;
        debug!("Uploaded {} to {}", path.display(), uploaded.secure_url);
        Ok(uploaded.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Bytes, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;

    async fn spawn_host(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn uploader(api_base: String) -> CloudinaryUploader {
        let mut config = CloudinaryConfig::new(
            "demo".to_string(),
            "key".to_string(),
            "secret".to_string(),
        );
        config.api_base = api_base;
        config.timeout = Duration::from_millis(500);
        CloudinaryUploader::new(config).unwrap()
    }

    fn evidence_file() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        file
    }

    fn signed_params() -> [(&'static str, String); 2] {
        [
            ("timestamp", "1700000000".to_string()),
            ("folder", "fall_alerts/user_1".to_string()),
        ]
    }

    #[test]
    fn test_default_signature_is_sha1_of_sorted_params() {
        let expected = hex::encode(Sha1::digest(
            b"folder=fall_alerts/user_1&timestamp=1700000000secret",
        ));
        let signature = sign(&signed_params(), "secret", SignatureAlgorithm::default());
        assert_eq!(signature, expected);
        assert_eq!(signature.len(), 40);
    }

    #[test]
    fn test_sha256_signature_when_configured() {
        let expected = hex::encode(Sha256::digest(
            b"folder=fall_alerts/user_1&timestamp=1700000000secret",
        ));
        assert_eq!(
            sign(&signed_params(), "secret", SignatureAlgorithm::Sha256),
            expected
        );
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("SHA256".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Sha256);
        assert_eq!("sha1".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Sha1);
        assert!("md5".parse::<SignatureAlgorithm>().is_err());
    }

    #[tokio::test]
    async fn test_upload_returns_secure_url() {
        let app = Router::new().route(
            "/v1_1/demo/image/upload",
            post(|body: Bytes| async move {
                let text = String::from_utf8_lossy(&body);
                assert!(text.contains("fall_alerts/user_9"));
                assert!(text.contains("name=\"signature\""));
                // the algorithm is an account setting, never a form field
                assert!(!text.contains("signature_algorithm"));
                Json(json!({"secure_url": "https://res.example/fall.jpg"}))
            }),
        );
        let base = spawn_host(app).await;
        let file = evidence_file();

        let url = uploader(base).upload(file.path(), 9).await.unwrap();
        assert_eq!(url, "https://res.example/fall.jpg");
    }

    #[tokio::test]
    async fn test_host_error_is_upload_error() {
        let app = Router::new().route(
            "/v1_1/demo/image/upload",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad signature") }),
        );
        let base = spawn_host(app).await;
        let file = evidence_file();

        let err = uploader(base).upload(file.path(), 1).await.unwrap_err();
        assert!(matches!(err, CloudError::Upload(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = uploader("http://127.0.0.1:9".to_string())
            .upload(Path::new("/nonexistent/fall.jpg"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Io(_)));
    }
}
