//! Clients for the external video-generation service.

mod direct;
mod operation;
mod poll;

pub use direct::DirectBackend;
pub use operation::{OperationBackend, extract_video_uri};
pub use poll::{PollPolicy, Pollable, poll_until_done};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use rf_core::GenerationMode;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::{RelayMode, UpstreamConfig};
use crate::error::RelayError;

/// Base64 image payload forwarded to the service.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InlineImage {
    pub data: String,
    pub mime_type: String,
}

/// One generation as the relay forwards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    pub prompt: String,
    pub image: Option<InlineImage>,
}

impl VideoJob {
    pub fn mode(&self) -> GenerationMode {
        GenerationMode::with_image(self.image.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVideo {
    pub video_url: String,
    pub job_id: Option<String>,
}

#[async_trait]
pub trait VideoBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Runs a generation to completion. Implementations stop early with
    /// [`RelayError::Cancelled`] once `cancel` fires.
    async fn generate(&self, job: VideoJob, cancel: CancellationToken) -> Result<GeneratedVideo, RelayError>;

    /// Raw status document for a previously returned job id.
    async fn status(&self, job_id: &str) -> Result<Value, RelayError>;
}

pub fn build_backend(conf: &UpstreamConfig) -> Result<Arc<dyn VideoBackend>, RelayError> {
    let backend: Arc<dyn VideoBackend> = match conf.mode {
        RelayMode::Direct => Arc::new(DirectBackend::new(conf)?),
        RelayMode::Operation => Arc::new(OperationBackend::new(conf)?),
    };
    Ok(backend)
}

/// Decodes a response body, turning non-2xx statuses into
/// [`RelayError::Upstream`] with the service's own message when it sent one.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<Value, RelayError> {
    let status = response.status();
    let text = response.text().await?;
    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

    if !status.is_success() {
        return Err(RelayError::Upstream {
            status: Some(status.as_u16()),
            message: upstream_message(status, &body),
            raw: Some(body),
        });
    }
    Ok(body)
}

fn upstream_message(status: StatusCode, body: &Value) -> String {
    let from_body = body
        .get("message")
        .or_else(|| body.get("error").and_then(|e| e.get("message")))
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty());

    match from_body {
        Some(msg) => msg.to_string(),
        None => format!("Video service responded with HTTP {status}"),
    }
}
