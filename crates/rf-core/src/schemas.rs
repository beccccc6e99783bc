//! JSON bodies exchanged between the client and the relay.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GenerationResult {
    pub fn succeeded(video_url: impl Into<String>, job_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            video_url: Some(video_url.into()),
            job_id,
            error: None,
            message: Some(message.into()),
        }
    }

    pub fn failed(error: impl Into<String>, message: Option<String>) -> Self {
        Self {
            success: false,
            video_url: None,
            job_id: None,
            error: Some(error.into()),
            message,
        }
    }

    /// `success` only counts when a playable URL came with it.
    pub fn is_complete(&self) -> bool {
        self.success && self.video_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    pub fn display_message(&self, fallback: &str) -> String {
        first_present(&self.message, &self.error, fallback)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProceedRequest {
    pub video_url: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProceedResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendering_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProceedResult {
    pub fn initiated(video_url: impl Into<String>, rendering_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some("3D rendering process initiated".to_string()),
            video_url: Some(video_url.into()),
            rendering_id: Some(rendering_id.into()),
            error: None,
        }
    }

    pub fn display_message(&self, fallback: &str) -> String {
        first_present(&self.message, &self.error, fallback)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

impl HealthStatus {
    pub fn ok_at(now: DateTime<Utc>) -> Self {
        Self {
            status: "OK".to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Body of every non-2xx relay response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Upstream payload kept for diagnosis when it did not match the expected shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: None,
            raw: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Locally minted placeholder id for a 3D hand-off; nothing downstream knows it.
pub fn rendering_id_at(now: DateTime<Utc>) -> String {
    format!("3d_{}", now.timestamp_millis())
}

fn first_present(message: &Option<String>, error: &Option<String>, fallback: &str) -> String {
    [message, error]
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn success_serializes_camel_case_without_nulls() {
        let result = GenerationResult::succeeded("https://cdn/v.mp4", Some("job-1".into()), "done");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"success": true, "videoUrl": "https://cdn/v.mp4", "jobId": "job-1", "message": "done"})
        );
    }

    #[test]
    fn error_envelope_decodes_as_failed_result() {
        let body = json!({"error": "Failed to generate video", "message": "quota exceeded"});
        let result: GenerationResult = serde_json::from_value(body).unwrap();
        assert!(!result.success);
        assert!(!result.is_complete());
        assert_eq!(result.display_message("fallback"), "quota exceeded");
    }

    #[test]
    fn success_without_url_is_incomplete() {
        let result: GenerationResult = serde_json::from_value(json!({"success": true, "videoUrl": ""})).unwrap();
        assert!(!result.is_complete());
        assert_eq!(result.display_message("Failed to generate video"), "Failed to generate video");
    }

    #[test]
    fn display_falls_back_to_error_field() {
        let result = GenerationResult::failed("Prompt is required", None);
        assert_eq!(result.display_message("x"), "Prompt is required");
    }

    #[test]
    fn rendering_id_is_millis_prefixed() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(rendering_id_at(at), "3d_1700000000123");
    }

    #[test]
    fn health_timestamp_is_rfc3339_millis() {
        let at = Utc.timestamp_millis_opt(0).unwrap();
        let health = HealthStatus::ok_at(at);
        assert_eq!(health.status, "OK");
        assert_eq!(health.timestamp, "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn envelope_omits_empty_optionals() {
        let body = serde_json::to_value(ErrorEnvelope::new("Video URL is required")).unwrap();
        assert_eq!(body, json!({"success": false, "error": "Video URL is required"}));
    }
}
