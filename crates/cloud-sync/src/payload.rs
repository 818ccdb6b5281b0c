//! Wire types for the fall alert endpoint

use serde::{Deserialize, Serialize};

/// Body of `POST /api/notify/fall-alert`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    /// Monitored subject
    pub user_id: i64,
    /// ISO-8601 time of the confirmed fall
    pub timestamp: String,
    /// Confidence on a 0-1 scale
    pub confidence: f64,
    /// Hosted evidence image, omitted when there is none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Fields the backend returns on 201; all optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyReceipt {
    pub fall_alert_id: Option<i64>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_without_image_omits_field() {
        let payload = AlertPayload {
            user_id: 1,
            timestamp: "2024-03-09T14:05:07.000+00:00".to_string(),
            confidence: 0.8,
            image_url: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "userId": 1,
                "timestamp": "2024-03-09T14:05:07.000+00:00",
                "confidence": 0.8,
            })
        );
    }

    #[test]
    fn test_payload_with_image_uses_camel_case() {
        let payload = AlertPayload {
            user_id: 3,
            timestamp: "t".to_string(),
            confidence: 0.8,
            image_url: Some("https://img/1.jpg".to_string()),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["imageUrl"], "https://img/1.jpg");
    }

    #[test]
    fn test_receipt_tolerates_extra_and_missing_fields() {
        let receipt: NotifyReceipt = serde_json::from_str(
            r#"{"message":"saved","fallAlertId":12,"notificationsSent":{"emails":1}}"#,
        )
        .unwrap();
        assert_eq!(receipt.fall_alert_id, Some(12));

        let empty: NotifyReceipt = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, NotifyReceipt::default());
    }
}
