//! The slice of the Mattermost API this integration relies on.

pub mod models;
pub mod rest;

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub use models::{Bot, Channel, ChannelMember, Command, Post, User};
pub use rest::MattermostClient;

/// An error reported by the host, carried through unchanged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostError {
    #[serde(default = "internal_status")]
    pub status_code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub detailed_error: String,
}

fn internal_status() -> u16 {
    500
}

impl HostError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            detailed_error: String::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// The most specific text the host gave.
    pub fn detail(&self) -> &str {
        if self.detailed_error.is_empty() {
            &self.message
        } else {
            &self.detailed_error
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.detail())
    }
}

impl std::error::Error for HostError {}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Host operations used by the plugin. Implementations must not retry or
/// reinterpret errors.
#[async_trait]
pub trait HostApi: Send + Sync {
    async fn get_post(&self, post_id: &str) -> HostResult<Post>;

    async fn create_post(&self, post: &Post) -> HostResult<Post>;

    async fn update_post(&self, post: &Post) -> HostResult<Post>;

    async fn delete_post(&self, post_id: &str) -> HostResult<()>;

    async fn get_channel(&self, channel_id: &str) -> HostResult<Channel>;

    async fn get_channel_member(&self, channel_id: &str, user_id: &str)
        -> HostResult<ChannelMember>;

    async fn get_user(&self, user_id: &str) -> HostResult<User>;

    async fn get_user_by_username(&self, username: &str) -> HostResult<User>;

    /// The account this client acts as. Posts are authored by it.
    async fn get_me(&self) -> HostResult<User>;

    async fn create_bot(&self, bot: &Bot) -> HostResult<Bot>;

    async fn set_profile_image(&self, user_id: &str, image: Vec<u8>) -> HostResult<()>;

    async fn register_command(&self, command: &Command) -> HostResult<()>;

    /// The plugin's own section of the server configuration.
    async fn load_plugin_configuration(&self) -> HostResult<Value>;
}
