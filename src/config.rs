use std::env;
use std::path::PathBuf;

pub const DEFAULT_PLUGIN_ID: &str = "com.mattermost.plugin-livekit";

/// Process-level configuration. LiveKit settings come from the host instead,
/// see [`Settings`](crate::settings::Settings).
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub mattermost_url: String,
    /// Access token for the REST API. The server records the token's owner
    /// as the author of every post created with it, so this should be the
    /// `livekit.bot` account's own token. Any other token makes room posts
    /// appear under its owner.
    pub mattermost_token: String,
    pub plugin_id: String,
    pub bundle_path: PathBuf,
    /// Externally reachable base URL of this service, used for slash-command callbacks.
    pub public_url: Option<String>,
    pub team_id: Option<String>,
    pub command_token: Option<String>,
    /// Shared secret the fronting proxy sends with every plugin request.
    /// Without it the user id header is trusted from any peer.
    pub proxy_secret: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            mattermost_url: env::var("MATTERMOST_URL")
                .unwrap_or_else(|_| "http://localhost:8065".to_string()),
            mattermost_token: env::var("MATTERMOST_TOKEN")
                .map_err(|_| ConfigError::MissingToken)?,
            plugin_id: env::var("PLUGIN_ID").unwrap_or_else(|_| DEFAULT_PLUGIN_ID.to_string()),
            bundle_path: env::var("BUNDLE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            public_url: non_empty("PUBLIC_URL"),
            team_id: non_empty("TEAM_ID"),
            command_token: non_empty("COMMAND_TOKEN"),
            proxy_secret: non_empty("PLUGIN_PROXY_SECRET"),
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }

    /// True when the listener accepts connections from other hosts.
    pub fn is_exposed(&self) -> bool {
        !matches!(self.server_host.as_str(), "127.0.0.1" | "localhost" | "::1")
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Prefix the host routes plugin HTTP requests under.
    pub fn route_prefix(&self) -> String {
        format!("/plugins/{}", self.plugin_id)
    }

    /// Callback URL registered for the slash command.
    pub fn command_url(&self) -> Option<String> {
        self.public_url
            .as_ref()
            .map(|base| format!("{}/hooks/command", base.trim_end_matches('/')))
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server port")]
    InvalidPort,
    #[error("MATTERMOST_TOKEN environment variable is required")]
    MissingToken,
}
