use std::time::Duration;

use reqwest::multipart::{Form, Part};
use rf_core::{GenerationRequest, GenerationResult, HealthStatus, ProceedRequest, ProceedResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid relay address {0:?}")]
    InvalidUrl(String),
    #[error("Relay request timed out")]
    Timeout,
    #[error("Could not reach the relay: {0}")]
    Transport(reqwest::Error),
    #[error("Relay answered HTTP {status} with an unreadable body: {detail}")]
    MalformedResponse { status: u16, detail: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() { Self::Timeout } else { Self::Transport(e) }
    }
}

/// HTTP client for the relay's `/api` routes.
///
/// Every response body is decoded as the route's schema whatever the status
/// code, so error envelopes come back as ordinary results with
/// `success: false`.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base: Url,
}

impl RelayClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        Self::build(base, None)
    }

    /// Same as [`RelayClient::new`] but aborts any request that runs longer
    /// than `timeout`.
    pub fn with_timeout(base: &str, timeout: Duration) -> Result<Self, ClientError> {
        Self::build(base, Some(timeout))
    }

    fn build(base: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let base = Url::parse(base).map_err(|_| ClientError::InvalidUrl(base.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base.to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, ClientError> {
        let mut form = Form::new().text("prompt", request.prompt.clone());
        if let Some(image) = &request.image {
            let part = Part::bytes(image.bytes().to_vec())
                .file_name(image.file_name().to_string())
                .mime_str(image.mime_type())?;
            form = form.part("image", part);
        }

        let url = self.endpoint(["generate-video"])?;
        debug!("POST {url}");
        let response = self.http.post(url).multipart(form).send().await?;
        decode(response).await
    }

    pub async fn proceed_to_3d(&self, request: &ProceedRequest) -> Result<ProceedResult, ClientError> {
        let url = self.endpoint(["proceed-to-3d"])?;
        debug!("POST {url}");
        let response = self.http.post(url).json(request).send().await?;
        decode(response).await
    }

    /// Raw status document for a job id returned by [`RelayClient::generate`].
    pub async fn video_status(&self, job_id: &str) -> Result<Value, ClientError> {
        let url = self.endpoint(std::iter::once("video-status").chain(job_id.split('/')))?;
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.http.get(self.endpoint(["health"])?).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status().as_u16();
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::MalformedResponse {
        status,
        detail: e.to_string(),
    })
}
