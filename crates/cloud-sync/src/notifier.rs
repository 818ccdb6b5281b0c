//! Fall alert notification client

use crate::{AlertPayload, CloudError, NotifyReceipt};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, warn};

const FALL_ALERT_PATH: &str = "/api/notify/fall-alert";

/// Delivers a fall alert to the notification service
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, payload: &AlertPayload) -> Result<NotifyReceipt, CloudError>;
}

/// Notification endpoint configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Backend base URL, e.g. `http://localhost:4000`
    pub backend_url: String,
    /// Shared secret sent as `X-API-KEY`
    pub api_key: String,
    /// Bound on the whole request
    pub timeout: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:4000".to_string(),
            api_key: "secret_token_for_fall_detection".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// `reqwest`-backed notifier. Only 201 Created counts as delivered.
pub struct HttpNotifier {
    config: NotifierConfig,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(config: NotifierConfig) -> Result<Self, CloudError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CloudError::Request(e.to_string()))?;
        let endpoint = format!("{}{}", config.backend_url.trim_end_matches('/'), FALL_ALERT_PATH);
        info!("Fall alerts will be posted to {}", endpoint);

        Ok(Self {
            config,
            endpoint,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, payload: &AlertPayload) -> Result<NotifyReceipt, CloudError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| CloudError::from_transport(e, self.config.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CloudError::from_transport(e, self.config.timeout))?;

        if status != StatusCode::CREATED {
            warn!("Fall alert rejected: {} {}", status, body);
            return Err(CloudError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Fall alert response: {}", body);
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn spawn_backend(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn record(
        State(received): State<Received>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (axum::http::StatusCode, Json<Value>) {
        let key = headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        received.lock().unwrap().push((key.clone(), body));

        if key.as_deref() == Some("test-secret") {
            (
                axum::http::StatusCode::CREATED,
                Json(json!({"message": "Fall alert saved", "fallAlertId": 7})),
            )
        } else {
            (
                axum::http::StatusCode::FORBIDDEN,
                Json(json!({"error": "Forbidden"})),
            )
        }
    }

    fn payload() -> AlertPayload {
        AlertPayload {
            user_id: 1,
            timestamp: "2024-03-09T14:05:07+00:00".to_string(),
            confidence: 0.8,
            image_url: None,
        }
    }

    fn notifier(backend_url: String, api_key: &str) -> HttpNotifier {
        HttpNotifier::new(NotifierConfig {
            backend_url,
            api_key: api_key.to_string(),
            timeout: Duration::from_millis(500),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_created_is_delivered() {
        let received: Received = Arc::default();
        let app = Router::new()
            .route(FALL_ALERT_PATH, post(record))
            .with_state(received.clone());
        let url = spawn_backend(app).await;

        let receipt = notifier(format!("{}/", url), "test-secret")
            .notify(&payload())
            .await
            .unwrap();
        assert_eq!(receipt.fall_alert_id, Some(7));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0.as_deref(), Some("test-secret"));
        assert_eq!(
            received[0].1,
            json!({"userId": 1, "timestamp": "2024-03-09T14:05:07+00:00", "confidence": 0.8})
        );
    }

    #[test]
    fn test_endpoint_ignores_trailing_slash() {
        let plain = notifier("http://backend:4000".to_string(), "k");
        let slashed = notifier("http://backend:4000/".to_string(), "k");
        assert_eq!(plain.endpoint(), "http://backend:4000/api/notify/fall-alert");
        assert_eq!(slashed.endpoint(), plain.endpoint());
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected() {
        let received: Received = Arc::default();
        let app = Router::new()
            .route(FALL_ALERT_PATH, post(record))
            .with_state(received);
        let url = spawn_backend(app).await;

        let err = notifier(url, "wrong").notify(&payload()).await.unwrap_err();
        assert!(matches!(err, CloudError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_ok_status_is_not_success() {
        let app = Router::new().route(FALL_ALERT_PATH, post(|| async { "ok" }));
        let url = spawn_backend(app).await;

        let err = notifier(url, "test-secret").notify(&payload()).await.unwrap_err();
        assert!(matches!(err, CloudError::Rejected { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = notifier(format!("http://{}", addr), "test-secret")
            .notify(&payload())
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Connection(_)));
    }

    #[tokio::test]
    async fn test_slow_backend_is_timeout() {
        let app = Router::new().route(
            FALL_ALERT_PATH,
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                axum::http::StatusCode::CREATED
            }),
        );
        let url = spawn_backend(app).await;

        let err = notifier(url, "test-secret").notify(&payload()).await.unwrap_err();
        assert!(matches!(err, CloudError::Timeout(_)));
    }
}
