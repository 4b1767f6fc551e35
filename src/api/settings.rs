use axum::{extract::State, Json};

use crate::settings::RedactedSettings;
use crate::state::AppState;

/// GET /settings - current settings with credentials redacted
pub async fn get_settings(State(state): State<AppState>) -> Json<RedactedSettings> {
    Json(state.settings.get().redacted())
}
