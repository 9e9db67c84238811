use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub uploads: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    // The uploads root is created lazily, so a missing directory is not an error
    let uploads_status = match tokio::fs::metadata(&state.config.uploads_dir).await {
        Ok(meta) if meta.is_dir() => "ready",
        Ok(_) => "not a directory",
        Err(_) => "pending",
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        uploads: uploads_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
