pub mod command;
pub mod health;
pub mod rooms;
pub mod settings;

use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::{self, Next},
    response::Response,
    routing::{any, get, post},
    Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::security;
use crate::state::AppState;

/// Header the host sets to the authenticated user's id.
pub const USER_ID_HEADER: &str = "Mattermost-User-ID";

/// Header carrying the shared secret of the proxy in front of this service.
pub const PROXY_SECRET_HEADER: &str = "X-Plugin-Proxy-Secret";

/// Authenticated caller, inserted by [`require_user`].
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

/// Envelope the webapp's `doFetch` expects.
#[derive(Debug, Serialize)]
pub struct FetchResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl FetchResponse<()> {
    pub fn ok() -> Self {
        Self {
            status: "OK",
            data: None,
        }
    }
}

impl<T: Serialize> FetchResponse<T> {
    pub fn with_data(data: T) -> Self {
        Self {
            status: "OK",
            data: Some(data),
        }
    }
}

/// Create the service router: plugin routes under the host's prefix, the
/// slash-command callback and the health check.
pub fn create_router(state: AppState) -> Router {
    let prefix = state.config.route_prefix();
    Router::new()
        .nest(&prefix, plugin_routes(state.clone()))
        .merge(command::command_routes())
        .merge(health::health_routes())
        .with_state(state)
}

/// Routes the host forwards under the plugin prefix. Every one of them,
/// including unknown paths, requires a caller identity.
pub fn plugin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/join", post(rooms::join_room))
        .route("/create", post(rooms::create_room))
        .route("/room", post(rooms::create_room))
        .route("/delete", post(rooms::delete_room))
        .route("/rooms", get(rooms::list_rooms))
        .route("/settings", get(settings::get_settings))
        .route("/webhook", any(webhook))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state, require_user))
}

async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    if let Some(expected) = &state.config.proxy_secret {
        let presented = request
            .headers()
            .get(PROXY_SECRET_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !security::ct_eq(expected, presented) {
            return Err(AppError::Unauthorized("Not authorized".to_string()));
        }
    }

    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Not authorized".to_string()))?;

    tracing::info!(
        method = %request.method(),
        path = %request.uri().path(),
        user_id = %user_id,
        "plugin request"
    );

    request.extensions_mut().insert(CallerId(user_id));
    Ok(next.run(request).await)
}

async fn webhook() -> AppError {
    AppError::Unauthorized("Not authorized".to_string())
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No handler for {}", uri.path()))
}

/// Decode a JSON request body, reporting decode errors as 400.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}
