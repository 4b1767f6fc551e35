use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub settings: String,
    pub livekit: String,
    pub bot: String,
    pub timestamp: String,
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let settings_status = match state.settings.get().validate() {
        Ok(()) => "valid",
        Err(_) => "invalid",
    };

    let livekit_status = match state.rooms.list_rooms(&[]).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "LiveKit health check failed");
            "disconnected"
        }
    };

    let bot_status = if state.bot_user_id().is_some() {
        "ready"
    } else {
        "not_ready"
    };

    let overall_status =
        if settings_status == "valid" && livekit_status == "connected" && bot_status == "ready" {
            "healthy"
        } else {
            "unhealthy"
        };

    Json(HealthResponse {
        status: overall_status.to_string(),
        settings: settings_status.to_string(),
        livekit: livekit_status.to_string(),
        bot: bot_status.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
