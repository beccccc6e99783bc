use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rf_core::ErrorEnvelope;
use rf_core::InputError;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),
    #[error("Upload storage failed: {0}")]
    Upload(#[from] std::io::Error),
    #[error("Video service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
        raw: Option<Value>,
    },
    #[error("Unexpected response from video service: {detail}")]
    UnexpectedSchema { detail: String, raw: Value },
    #[error("Video generation timed out after {polls} status checks")]
    PollTimeout { polls: u32 },
    #[error("Request cancelled before the video was ready")]
    Cancelled,
}

impl From<InputError> for RelayError {
    fn from(e: InputError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PollTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wraps the error in the response envelope; `context` names the failed
    /// operation for everything except validation and timeouts.
    pub fn into_api(self, context: &str) -> ApiError {
        let status = self.status_code();
        let body = match self {
            Self::Validation(msg) => {
                warn!("Rejected request: {msg}");
                ErrorEnvelope::new(msg)
            }
            Self::PollTimeout { .. } => {
                warn!("{}", self);
                ErrorEnvelope::new("Video generation timed out").with_message(self.to_string())
            }
            Self::UnexpectedSchema { ref raw, .. } | Self::Upstream { raw: Some(ref raw), .. } => {
                error!("{}: {}", context, self);
                ErrorEnvelope::new(context).with_message(self.to_string()).with_raw(raw.clone())
            }
            _ => {
                error!("{}: {}", context, self);
                ErrorEnvelope::new(context).with_message(self.to_string())
            }
        };

        ApiError { status, body }
    }
}

/// Error response written by every route.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorEnvelope,
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorEnvelope::new(error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_is_bad_request_without_context() {
        let api = RelayError::Validation("Prompt is required".into()).into_api("Failed to generate video");
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.body.error, "Prompt is required");
        assert!(api.body.message.is_none());
    }

    #[test]
    fn timeout_maps_to_408() {
        let api = RelayError::PollTimeout { polls: 20 }.into_api("Failed to generate video");
        assert_eq!(api.status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(api.body.message.as_deref(), Some("Video generation timed out after 20 status checks"));
    }

    #[test]
    fn schema_mismatch_keeps_raw_payload() {
        let raw = json!({"done": true, "response": {"unexpected": 1}});
        let api = RelayError::UnexpectedSchema { detail: "missing uri".into(), raw: raw.clone() }
            .into_api("Failed to generate video");
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body.error, "Failed to generate video");
        assert_eq!(api.body.raw, Some(raw));
    }

    #[test]
    fn input_errors_become_validation() {
        let err: RelayError = InputError::NotAnImage("text/plain".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Only image files are allowed");
    }
}
