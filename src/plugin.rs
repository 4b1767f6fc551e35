//! Lifecycle hooks: configuration change, activation, deactivation.

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::command;
use crate::host::{Bot, HostError};
use crate::settings::{Settings, SettingsError};
use crate::state::AppState;
use crate::store::StoreError;

pub const BOT_USERNAME: &str = "livekit.bot";
const BOT_DISPLAY_NAME: &str = "Broadcasting";
const BOT_DESCRIPTION: &str = "Created by the LiveKit plugin";

/// Relative to the bundle path. The host does not accept SVG profile images.
const BOT_ICON: &str = "assets/bot-icon.png";

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("failed to load plugin configuration: {0}")]
    LoadConfiguration(HostError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to ensure bot account: {0}")]
    EnsureBot(HostError),

    #[error("couldn't read profile image {path}: {source}")]
    ReadProfileImage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't set profile image: {0}")]
    SetProfileImage(HostError),

    #[error("couldn't register slash command: {0}")]
    RegisterCommand(HostError),
}

pub struct Plugin {
    state: AppState,
}

impl Plugin {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Reload settings from the host and install them as a fresh snapshot.
    pub async fn on_configuration_change(&self) -> Result<(), PluginError> {
        let raw = self
            .state
            .host
            .load_plugin_configuration()
            .await
            .map_err(PluginError::LoadConfiguration)?;

        let settings = Settings::from_host_settings(&raw)?;
        if let Err(e) = settings.validate() {
            tracing::warn!(error = %e, "plugin settings are incomplete");
        }

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            secure = settings.secure,
            "plugin settings loaded"
        );
        self.state.settings.set(Arc::new(settings))?;
        Ok(())
    }

    pub async fn on_activate(&self) -> Result<(), PluginError> {
        tracing::info!("Activating LiveKit integration...");

        let bot_user_id = self.ensure_bot().await?;

        tracing::info!("Setting bot profile image");
        let path = self.state.config.bundle_path.join(BOT_ICON);
        let image = tokio::fs::read(&path)
            .await
            .map_err(|source| PluginError::ReadProfileImage {
                path: path.clone(),
                source,
            })?;
        self.state
            .host
            .set_profile_image(&bot_user_id, image)
            .await
            .map_err(PluginError::SetProfileImage)?;

        tracing::info!(trigger = command::TRIGGER, "Registering slash command");
        self.state
            .host
            .register_command(&command::slash_command())
            .await
            .map_err(PluginError::RegisterCommand)?;

        self.state.set_bot_user_id(Some(bot_user_id));
        tracing::info!("LiveKit integration activated");
        Ok(())
    }

    pub async fn on_deactivate(&self) -> Result<(), PluginError> {
        self.state.set_bot_user_id(None);
        tracing::info!("LiveKit integration deactivated");
        Ok(())
    }

    /// Resolve the bot that authors room posts. A bot token is used as is;
    /// otherwise the bot is looked up by username and created if missing.
    async fn ensure_bot(&self) -> Result<String, PluginError> {
        let me = self
            .state
            .host
            .get_me()
            .await
            .map_err(PluginError::EnsureBot)?;
        if me.is_bot {
            tracing::info!(user_id = %me.id, name = %me.username, "token belongs to a bot");
            return Ok(me.id);
        }
        tracing::warn!(
            name = %me.username,
            "token does not belong to a bot, room posts will be authored by its owner"
        );

        tracing::info!(name = BOT_USERNAME, "Ensuring bot");

        match self.state.host.get_user_by_username(BOT_USERNAME).await {
            Ok(user) if user.is_bot => Ok(user.id),
            Ok(user) => Err(PluginError::EnsureBot(HostError::new(
                409,
                format!("user {} exists and is not a bot", user.username),
            ))),
            Err(e) if e.status_code == 404 => {
                let bot = self
                    .state
                    .host
                    .create_bot(&Bot {
                        username: BOT_USERNAME.to_string(),
                        display_name: BOT_DISPLAY_NAME.to_string(),
                        description: BOT_DESCRIPTION.to_string(),
                        ..Bot::default()
                    })
                    .await
                    .map_err(PluginError::EnsureBot)?;
                tracing::info!(user_id = %bot.user_id, "bot account created");
                Ok(bot.user_id)
            }
            Err(e) => Err(PluginError::EnsureBot(e)),
        }
    }
}
