use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use rf_core::{ErrorEnvelope, MAX_IMAGE_BYTES};
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use crate::routes::health::health;
use crate::routes::proceed::proceed_to_3d;
use crate::routes::video::{generate_video, video_status};
use crate::state::RelayState;

mod health;
mod proceed;
mod video;

/// Room for multipart framing and the prompt on top of the image itself.
const BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

pub fn api_routes() -> Router<Arc<RelayState>> {
    Router::new()
        .route("/api/generate-video", post(generate_video))
        .route("/api/video-status/{*job_id}", get(video_status))
        .route("/api/proceed-to-3d", post(proceed_to_3d))
        .route("/api/health", get(health))
}

pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .merge(api_routes())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    ApiError {
        status: StatusCode::NOT_FOUND,
        body: ErrorEnvelope::new("Not found"),
    }
}
