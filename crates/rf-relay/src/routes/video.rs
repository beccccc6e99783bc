use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use rf_core::input::{check_prompt_length, is_image_mime};
use rf_core::{GenerationResult, InputError};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ApiError, RelayError};
use crate::state::RelayState;
use crate::uploads::{TempUpload, UploadDir};
use crate::upstream::VideoJob;

const GENERATE_FAILED: &str = "Failed to generate video";
const STATUS_FAILED: &str = "Failed to check video status";

#[derive(Debug, Default)]
struct UploadForm {
    prompt: Option<String>,
    image: Option<TempUpload>,
}

pub async fn generate_video(
    State(state): State<Arc<RelayState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerationResult>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let form = read_form(state.uploads(), multipart)
        .await
        .map_err(|e| e.into_api(GENERATE_FAILED))?;

    let Some(prompt) = form.prompt.filter(|p| !p.trim().is_empty()) else {
        return Err(ApiError::bad_request("Prompt is required"));
    };
    check_prompt_length(&prompt).map_err(|e| RelayError::from(e).into_api(GENERATE_FAILED))?;

    let image = match form.image {
        Some(upload) => Some(upload.into_inline().await.map_err(|e| e.into_api(GENERATE_FAILED))?),
        None => None,
    };

    let job = VideoJob { prompt, image };
    let mode = job.mode();
    info!(
        backend = state.backend().name(),
        mode = mode.name(),
        prompt_chars = job.prompt.chars().count(),
        "Generating video"
    );

    let cancel = state.request_token();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let generated = state
        .backend()
        .generate(job, cancel)
        .await
        .map_err(|e| e.into_api(GENERATE_FAILED))?;

    Ok(Json(GenerationResult::succeeded(
        generated.video_url,
        generated.job_id,
        mode.completion_message(),
    )))
}

pub async fn video_status(
    State(state): State<Arc<RelayState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .backend()
        .status(&job_id)
        .await
        .map(Json)
        .map_err(|e| e.into_api(STATUS_FAILED))
}

/// Collects the `prompt` text and streams the optional `image` file to disk.
/// The image MIME type is checked before anything is written.
async fn read_form(uploads: &UploadDir, mut multipart: Multipart) -> Result<UploadForm, RelayError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => form.prompt = Some(field.text().await.map_err(malformed)?),
            "image" => {
                let mime = field.content_type().unwrap_or("application/octet-stream").to_string();
                if !is_image_mime(&mime) {
                    return Err(InputError::NotAnImage(mime).into());
                }

                let file_name = field.file_name().map(str::to_string);
                let mut pending = uploads.begin(file_name, mime).await?;
                while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                    pending.write_chunk(&chunk).await?;
                }
                let upload = pending.finish().await?;

                // an empty file part means no image was picked
                form.image = (upload.size() > 0).then_some(upload);
            }
            other => debug!("Ignoring multipart field {other:?}"),
        }
    }

    Ok(form)
}

fn malformed(e: MultipartError) -> RelayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return RelayError::Validation(InputError::ImageTooLarge(0).to_string());
    }
    RelayError::Validation(format!("Malformed upload: {}", e.body_text()))
}
