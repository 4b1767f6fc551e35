//! The `/liveroom` slash command.

use axum::{extract::State, routing::post, Form, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::host::Command;
use crate::posts;
use crate::security;
use crate::state::AppState;

pub const TRIGGER: &str = "liveroom";

const USAGE: &str = "Usage: /liveroom \"topic\" [max participants]";

/// Slash command callback payload (form encoded).
#[derive(Debug, Deserialize)]
pub struct CommandArgs {
    #[serde(default)]
    pub token: String,
    pub channel_id: String,
    pub user_id: String,
    pub command: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub response_type: &'static str,
    pub text: String,
}

impl CommandResponse {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: "ephemeral",
            text: text.into(),
        }
    }
}

/// What a command line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    Create { topic: String, capacity: u32 },
    Help,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Usage: /liveroom \"topic\" [max participants]")]
    Usage,

    #[error("The topic must not be empty")]
    EmptyTopic,

    #[error("Invalid max participants {value:?}: {reason}")]
    Capacity { value: String, reason: String },
}

/// The command as registered with the host.
pub fn slash_command() -> Command {
    Command {
        trigger: TRIGGER.to_string(),
        auto_complete: true,
        auto_complete_desc:
            "Start a LiveKit meeting in current channel. Topic should be provided in double quotes."
                .to_string(),
        auto_complete_hint: "\"[topic]\" [max participants]".to_string(),
        display_name: "LiveKit meeting".to_string(),
        description: "Start a LiveKit audio/video meeting".to_string(),
    }
}

/// Parse a full command line such as `/liveroom "Daily standup" 5`.
pub fn parse_command(line: &str) -> std::result::Result<CommandAction, CommandError> {
    let parts: Vec<&str> = line.split('"').collect();

    let head = parts[0].trim();
    let Some(rest) = head.strip_prefix('/').and_then(|h| h.strip_prefix(TRIGGER)) else {
        return Err(CommandError::Usage);
    };
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Err(CommandError::Usage);
    }

    match parts.len() {
        1 => match rest.trim() {
            "" | "help" => Ok(CommandAction::Help),
            _ => Err(CommandError::Usage),
        },
        3 => {
            if !rest.trim().is_empty() {
                return Err(CommandError::Usage);
            }
            let topic = parts[1].trim();
            if topic.is_empty() {
                return Err(CommandError::EmptyTopic);
            }

            let raw: String = parts[2].split_whitespace().collect();
            let capacity = if raw.is_empty() {
                0
            } else {
                raw.parse::<u32>().map_err(|e| CommandError::Capacity {
                    value: raw.clone(),
                    reason: e.to_string(),
                })?
            };

            Ok(CommandAction::Create {
                topic: topic.to_string(),
                capacity,
            })
        }
        _ => Err(CommandError::Usage),
    }
}

pub fn command_routes() -> Router<AppState> {
    Router::new().route("/hooks/command", post(execute_command))
}

/// POST /hooks/command - slash command callback
async fn execute_command(
    State(state): State<AppState>,
    Form(args): Form<CommandArgs>,
) -> Result<Json<CommandResponse>> {
    if let Some(expected) = &state.config.command_token {
        if !security::ct_eq(expected, &args.token) {
            return Err(AppError::Unauthorized("Invalid command token".to_string()));
        }
    }

    let line = format!("{} {}", args.command.trim(), args.text);
    let text = match parse_command(&line) {
        Ok(CommandAction::Create { topic, capacity }) => {
            tracing::info!(topic = %topic, capacity, user_id = %args.user_id, "creating room");
            match posts::create_room_post(&state, &args.channel_id, &args.user_id, &topic, capacity)
                .await
            {
                Ok(_) => format!(
                    "Creating room with topic = {}; maxParticipants = {}",
                    topic, capacity
                ),
                Err(e) => format!("Room creation failed: {}", e.message()),
            }
        }
        Ok(CommandAction::Help) => USAGE.to_string(),
        Err(e) => e.to_string(),
    };

    Ok(Json(CommandResponse::ephemeral(text)))
}
