//! LiveKit room-service adapter and access-token issuance.

pub mod client;
pub mod models;
pub mod token;

use async_trait::async_trait;

pub use client::LiveKitClient;
pub use models::{CreateRoom, Room};
pub use token::{AccessToken, TokenError, VideoGrant, JOIN_TOKEN_TTL};

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("LiveKit unavailable: {0}")]
    Unavailable(String),

    #[error("Room not found: {0}")]
    NotFound(String),

    #[error("Room creation failed: {0}")]
    CreationFailed(String),

    #[error("LiveKit error: {0}")]
    Service(String),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// The room operations the integration needs from the media server.
#[async_trait]
pub trait RoomService: Send + Sync {
    /// List rooms, optionally restricted to the given names.
    async fn list_rooms(&self, names: &[String]) -> Result<Vec<Room>, RoomError>;

    async fn create_room(&self, request: CreateRoom) -> Result<Room, RoomError>;

    async fn delete_room(&self, name: &str) -> Result<(), RoomError>;
}
