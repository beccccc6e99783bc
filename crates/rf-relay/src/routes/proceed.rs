use axum::Json;
use axum::extract::rejection::JsonRejection;
use chrono::Utc;
use rf_core::schemas::rendering_id_at;
use rf_core::{ProceedRequest, ProceedResult};
use tracing::info;

use crate::error::ApiError;

/// Placeholder hand-off: no renderer sits behind this yet, so it only
/// validates the request and mints a rendering id.
pub async fn proceed_to_3d(
    body: Result<Json<ProceedRequest>, JsonRejection>,
) -> Result<Json<ProceedResult>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    if req.video_url.trim().is_empty() {
        return Err(ApiError::bad_request("Video URL is required"));
    }

    let rendering_id = rendering_id_at(Utc::now());
    info!(video_url = %req.video_url, prompt = %req.prompt, %rendering_id, "Proceeding to 3D");

    Ok(Json(ProceedResult::initiated(req.video_url, rendering_id)))
}
