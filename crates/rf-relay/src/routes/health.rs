use axum::Json;
use chrono::Utc;
use rf_core::HealthStatus;

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::ok_at(Utc::now()))
}
