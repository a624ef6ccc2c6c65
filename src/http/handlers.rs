use super::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    #[serde(rename = "activeConnections")]
    pub active_connections: usize,
}

/// GET / and GET /health
/// Process liveness plus a timestamp; no request body.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: state.config.service.name.clone(),
            timestamp: Utc::now().to_rfc3339(),
            active_connections: state.active_connections(),
        }),
    )
}
