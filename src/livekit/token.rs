use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Default lifetime of a join token handed to a chat user.
pub const JOIN_TOKEN_TTL: Duration = Duration::from_secs(12 * 60 * 60);

const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("API key and secret are required")]
    MissingCredentials,

    #[error("Identity is required to join a room")]
    MissingIdentity,

    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Permissions carried in the `video` claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_create: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_list: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_join: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_admin: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,
}

impl VideoGrant {
    /// Grant to join a single room.
    pub fn join(room: impl Into<String>) -> Self {
        Self {
            room_join: true,
            room: room.into(),
            ..Self::default()
        }
    }

    /// Grant for server-to-server room management.
    pub fn admin() -> Self {
        Self {
            room_create: true,
            room_list: true,
            room_admin: true,
            ..Self::default()
        }
    }
}

/// JWT claims understood by LiveKit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jti: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

/// Builder for a signed LiveKit access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    api_key: String,
    api_secret: String,
    grant: VideoGrant,
    identity: String,
    name: String,
    valid_for: Duration,
}

impl AccessToken {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            grant: VideoGrant::default(),
            identity: String::new(),
            name: String::new(),
            valid_for: DEFAULT_TTL,
        }
    }

    pub fn with_grant(mut self, grant: VideoGrant) -> Self {
        self.grant = grant;
        self
    }

    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identity = identity.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_valid_for(mut self, valid_for: Duration) -> Self {
        self.valid_for = valid_for;
        self
    }

    /// Sign the token with HS256. No network access.
    pub fn to_jwt(&self) -> Result<String, TokenError> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(TokenError::MissingCredentials);
        }
        if self.grant.room_join && self.identity.is_empty() {
            return Err(TokenError::MissingIdentity);
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: self.api_key.clone(),
            sub: self.identity.clone(),
            jti: self.identity.clone(),
            name: self.name.clone(),
            nbf: now,
            exp: now + self.valid_for.as_secs() as i64,
            video: self.grant.clone(),
        };

        let key = EncodingKey::from_secret(self.api_secret.as_bytes());
        Ok(encode(&Header::default(), &claims, &key)?)
    }
}
