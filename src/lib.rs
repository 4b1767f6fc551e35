pub mod api;
pub mod config;
pub mod error;
pub mod host;
pub mod livekit;
pub mod plugin;
pub mod posts;
pub mod security;
pub mod settings;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};
pub use plugin::Plugin;
pub use state::AppState;
