//! Long-running operation backend.
//!
//! The service accepts a `predictLongRunning` call and hands back an operation
//! name. The operation is re-read until `done`, after which the finished
//! document must match exactly one shape:
//!
//! ```json
//! { "done": true,
//!   "response": { "generateVideoResponse": {
//!       "generatedSamples": [ { "video": { "uri": "https://..." } } ] } } }
//! ```
//!
//! Anything else is reported as [`RelayError::UnexpectedSchema`] with the raw
//! document attached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::RelayError;
use crate::upstream::poll::{PollPolicy, Pollable, poll_until_done};
use crate::upstream::{GeneratedVideo, VideoBackend, VideoJob, read_json};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct OperationBackend {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    model: String,
    policy: PollPolicy,
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    instances: [Instance<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InstanceImage<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstanceImage<'a> {
    bytes_base64_encoded: &'a str,
    mime_type: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct Operation {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    generate_video_response: GenerateVideoResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: VideoRef,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: String,
}

/// An operation document together with the JSON it was decoded from.
#[derive(Debug, Clone)]
struct OperationState {
    operation: Operation,
    raw: Value,
}

impl OperationState {
    fn decode(raw: Value) -> Result<Self, RelayError> {
        match serde_json::from_value::<Operation>(raw.clone()) {
            Ok(operation) => Ok(Self { operation, raw }),
            Err(e) => Err(RelayError::UnexpectedSchema {
                detail: format!("not an operation: {e}"),
                raw,
            }),
        }
    }
}

impl Pollable for OperationState {
    fn is_done(&self) -> bool {
        self.operation.done
    }
}

impl OperationBackend {
    pub fn new(conf: &UpstreamConfig) -> Result<Self, RelayError> {
        let api_key = conf
            .api_key
            .clone()
            .ok_or_else(|| RelayError::Validation("VIDEO_API_KEY is required for operation mode".to_string()))?;
        let http = reqwest::Client::builder().timeout(conf.request_timeout).build()?;

        Ok(Self {
            http,
            base: conf.api_url.clone(),
            api_key,
            model: conf.model.clone(),
            policy: PollPolicy {
                interval: conf.poll_interval,
                max_polls: conf.max_polls,
            },
        })
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    fn url_for<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, RelayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::Validation(format!("Cannot build a request URL from {}", self.base)))?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    async fn start(&self, job: &VideoJob) -> Result<OperationState, RelayError> {
        let action = format!("{}:predictLongRunning", self.model);
        let url = self.url_for(["models", action.as_str()])?;

        let body = StartRequest {
            instances: [Instance {
                prompt: &job.prompt,
                image: job.image.as_ref().map(|img| InstanceImage {
                    bytes_base64_encoded: &img.data,
                    mime_type: &img.mime_type,
                }),
            }],
        };

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let state = OperationState::decode(read_json(response).await?)?;

        if state.operation.name.as_deref().is_none_or(str::is_empty) {
            return Err(RelayError::UnexpectedSchema {
                detail: "operation has no name".to_string(),
                raw: state.raw,
            });
        }
        Ok(state)
    }

    async fn fetch(&self, name: &str) -> Result<Value, RelayError> {
        let url = self.url_for(name.split('/'))?;
        let response = self.http.get(url).header(API_KEY_HEADER, &self.api_key).send().await?;
        read_json(response).await
    }

    async fn fetch_state(&self, name: &str) -> Result<OperationState, RelayError> {
        OperationState::decode(self.fetch(name).await?)
    }
}

/// Pulls the video URI out of a finished operation and appends the API key
/// as a `key` query parameter so the URI can be fetched directly.
pub fn extract_video_uri(finished: &Value, api_key: &str) -> Result<String, RelayError> {
    let schema_error = |detail: String| RelayError::UnexpectedSchema {
        detail,
        raw: finished.clone(),
    };

    let response = finished
        .get("response")
        .ok_or_else(|| schema_error("operation finished without a response".to_string()))?;
    let decoded: VideoResponse =
        serde_json::from_value(response.clone()).map_err(|e| schema_error(e.to_string()))?;
    let sample = decoded
        .generate_video_response
        .generated_samples
        .into_iter()
        .next()
        .ok_or_else(|| schema_error("no generated samples".to_string()))?;

    let mut uri = Url::parse(&sample.video.uri).map_err(|e| schema_error(format!("invalid video uri: {e}")))?;
    uri.query_pairs_mut().append_pair("key", api_key);
    Ok(uri.into())
}

#[async_trait]
impl VideoBackend for OperationBackend {
    fn name(&self) -> &str {
        "operation"
    }

    async fn generate(&self, job: VideoJob, cancel: CancellationToken) -> Result<GeneratedVideo, RelayError> {
        let started = tokio::select! {
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
            state = self.start(&job) => state?,
        };
        let name = started.operation.name.clone().unwrap_or_default();
        info!(operation = %name, mode = job.mode().name(), "Started video operation");

        let finished = poll_until_done(self.policy, &cancel, started, || self.fetch_state(&name)).await?;

        if let Some(err) = &finished.operation.error {
            return Err(RelayError::Upstream {
                status: None,
                message: match err.code {
                    Some(code) => format!("Video operation failed ({code}): {}", err.message),
                    None => format!("Video operation failed: {}", err.message),
                },
                raw: Some(finished.raw),
            });
        }

        let video_url = extract_video_uri(&finished.raw, &self.api_key)?;
        info!(operation = %name, "Video operation finished");

        Ok(GeneratedVideo {
            video_url,
            job_id: Some(name),
        })
    }

    async fn status(&self, job_id: &str) -> Result<Value, RelayError> {
        self.fetch(job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_documented_shape() {
        let doc = json!({
            "name": "models/veo/operations/1",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": "https://files.example/v1/files/abc:download?alt=media"}}]}}
        });
        let uri = extract_video_uri(&doc, "k3y").unwrap();
        assert_eq!(uri, "https://files.example/v1/files/abc:download?alt=media&key=k3y");
    }

    #[test]
    fn rejects_alternative_shapes() {
        for doc in [
            json!({"done": true}),
            json!({"done": true, "response": {"videos": [{"uri": "https://x/v.mp4"}]}}),
            json!({"done": true, "response": {"generatedVideos": [{"video": {"uri": "https://x/v.mp4"}}]}}),
            json!({"done": true, "response": {"generateVideoResponse": {"generatedSamples": []}}}),
        ] {
            let err = extract_video_uri(&doc, "k").unwrap_err();
            match err {
                RelayError::UnexpectedSchema { raw, .. } => assert_eq!(raw, doc),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn start_request_shape() {
        let body = StartRequest {
            instances: [Instance {
                prompt: "waves",
                image: Some(InstanceImage { bytes_base64_encoded: "AAAA", mime_type: "image/jpeg" }),
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"instances": [{"prompt": "waves", "image": {"bytesBase64Encoded": "AAAA", "mimeType": "image/jpeg"}}]})
        );
    }

    #[test]
    fn operation_defaults_to_not_done() {
        let state = OperationState::decode(json!({"name": "operations/9"})).unwrap();
        assert!(!state.is_done());
        assert!(OperationState::decode(json!(["not", "an", "object"])).is_err());
    }
}
