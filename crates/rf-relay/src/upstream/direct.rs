use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::RelayError;
use crate::upstream::{GeneratedVideo, InlineImage, VideoBackend, VideoJob, read_json};

const CLIP_SECONDS: u32 = 8;
const CLIP_STYLE: &str = "cinematic";

/// Single-call backend: the service answers the generate request with the
/// finished video.
pub struct DirectBackend {
    http: reqwest::Client,
    generate_url: Url,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeneratePayload<'a> {
    prompt: &'a str,
    duration: u32,
    style: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a InlineImage>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    video_url: String,
    #[serde(default)]
    job_id: Option<String>,
}

impl DirectBackend {
    pub fn new(conf: &UpstreamConfig) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder().timeout(conf.request_timeout).build()?;

        Ok(Self {
            http,
            generate_url: conf.api_url.clone(),
            api_key: conf.api_key.clone(),
        })
    }

    /// `<generate url minus /generate-preview>/status/<job id>`
    pub fn status_url(&self, job_id: &str) -> Result<Url, RelayError> {
        let mut url = self.generate_url.clone();
        let base_path = url.path().trim_end_matches('/');
        let base_path = base_path.strip_suffix("/generate-preview").unwrap_or(base_path).to_string();
        url.set_path(&base_path);
        url.set_query(None);

        url.path_segments_mut()
            .map_err(|_| RelayError::Validation(format!("Cannot build a status URL from {}", self.generate_url)))?
            .pop_if_empty()
            .push("status")
            .push(job_id);
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, job: &VideoJob) -> Result<GeneratedVideo, RelayError> {
        let payload = GeneratePayload {
            prompt: &job.prompt,
            duration: CLIP_SECONDS,
            style: CLIP_STYLE,
            image: job.image.as_ref(),
        };

        info!(
            mode = job.mode().name(),
            image_bytes = job.image.as_ref().map_or(0, |i| i.data.len()),
            "Sending generation request"
        );

        let response = self
            .authorized(self.http.post(self.generate_url.clone()))
            .json(&payload)
            .send()
            .await?;
        let body = read_json(response).await?;

        decode_generated(body)
    }
}

fn decode_generated(body: Value) -> Result<GeneratedVideo, RelayError> {
    let decoded: GenerateResponse = match serde_json::from_value(body.clone()) {
        Ok(decoded) => decoded,
        Err(e) => {
            return Err(RelayError::UnexpectedSchema {
                detail: e.to_string(),
                raw: body,
            });
        }
    };

    if decoded.video_url.trim().is_empty() {
        return Err(RelayError::UnexpectedSchema {
            detail: "video_url is empty".to_string(),
            raw: body,
        });
    }

    Ok(GeneratedVideo {
        video_url: decoded.video_url,
        job_id: decoded.job_id,
    })
}

#[async_trait]
impl VideoBackend for DirectBackend {
    fn name(&self) -> &str {
        "direct"
    }

    async fn generate(&self, job: VideoJob, cancel: CancellationToken) -> Result<GeneratedVideo, RelayError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(RelayError::Cancelled),
            result = self.send(&job) => result,
        }
    }

    async fn status(&self, job_id: &str) -> Result<Value, RelayError> {
        let url = self.status_url(job_id)?;
        let response = self.authorized(self.http.get(url)).send().await?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayMode;
    use serde_json::json;
    use std::time::Duration;

    fn backend(url: &str) -> DirectBackend {
        DirectBackend::new(&UpstreamConfig {
            mode: RelayMode::Direct,
            api_url: Url::parse(url).unwrap(),
            api_key: Some("secret".into()),
            model: "m".into(),
            request_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(10),
            max_polls: 20,
        })
        .unwrap()
    }

    #[test]
    fn status_url_strips_generate_suffix() {
        let b = backend("https://api.veo3.com/v1/generate-preview");
        assert_eq!(b.status_url("job 7").unwrap().as_str(), "https://api.veo3.com/v1/status/job%207");

        let bare = backend("http://127.0.0.1:9000");
        assert_eq!(bare.status_url("abc").unwrap().as_str(), "http://127.0.0.1:9000/status/abc");
    }

    #[test]
    fn payload_shape() {
        let image = InlineImage { data: "AAAA".into(), mime_type: "image/png".into() };
        let payload = GeneratePayload { prompt: "p", duration: CLIP_SECONDS, style: CLIP_STYLE, image: Some(&image) };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"prompt": "p", "duration": 8, "style": "cinematic", "image": {"data": "AAAA", "mime_type": "image/png"}})
        );
    }

    #[test]
    fn decode_requires_video_url() {
        let ok = decode_generated(json!({"video_url": "https://v/1.mp4", "job_id": "j1"})).unwrap();
        assert_eq!(ok.job_id.as_deref(), Some("j1"));

        let missing = decode_generated(json!({"url": "https://v/1.mp4"})).unwrap_err();
        assert!(matches!(missing, RelayError::UnexpectedSchema { .. }));

        let empty = decode_generated(json!({"video_url": " "})).unwrap_err();
        assert!(matches!(empty, RelayError::UnexpectedSchema { .. }));
    }
}
