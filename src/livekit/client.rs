use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::models::{
    CreateRoom, DeleteRoomRequest, ListRoomsRequest, ListRoomsResponse, Room, TwirpError,
};
use super::token::{AccessToken, VideoGrant};
use super::{RoomError, RoomService};
use crate::store::ConfigStore;

const SERVICE_PATH: &str = "/twirp/livekit.RoomService";
const ADMIN_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

/// Room-service client over LiveKit's Twirp JSON API.
///
/// Endpoint and credentials are read from the settings snapshot on every
/// call, so a configuration change applies to the next request.
#[derive(Clone)]
pub struct LiveKitClient {
    client: Client,
    settings: ConfigStore,
}

impl LiveKitClient {
    pub fn new(client: Client, settings: ConfigStore) -> Self {
        Self { client, settings }
    }

    async fn call<Req, Resp>(&self, method: &str, body: &Req) -> Result<Resp, RoomError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let settings = self.settings.get();
        let token = AccessToken::new(
            settings.api_key.expose_secret(),
            settings.api_secret.expose_secret(),
        )
        .with_grant(VideoGrant::admin())
        .with_valid_for(ADMIN_TOKEN_TTL)
        .to_jwt()?;

        let url = format!("{}{}/{}", settings.service_url(), SERVICE_PATH, method);
        tracing::debug!(%url, "calling LiveKit");

        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| RoomError::Unavailable(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let twirp: TwirpError = serde_json::from_str(&body).unwrap_or_default();
            let msg = if twirp.msg.is_empty() { body } else { twirp.msg };

            return Err(match (status, twirp.code.as_str()) {
                (StatusCode::NOT_FOUND, _) | (_, "not_found") => RoomError::NotFound(msg),
                (StatusCode::SERVICE_UNAVAILABLE, _) | (_, "unavailable") => {
                    RoomError::Unavailable(msg)
                }
                _ => RoomError::Service(format!("{} {}", status.as_u16(), msg)),
            });
        }

        res.json::<Resp>()
            .await
            .map_err(|e| RoomError::Service(format!("Invalid LiveKit response: {}", e)))
    }
}

#[async_trait]
impl RoomService for LiveKitClient {
    async fn list_rooms(&self, names: &[String]) -> Result<Vec<Room>, RoomError> {
        let response: ListRoomsResponse = self
            .call("ListRooms", &ListRoomsRequest { names })
            .await?;
        Ok(response.rooms)
    }

    async fn create_room(&self, request: CreateRoom) -> Result<Room, RoomError> {
        let room: Room = self
            .call("CreateRoom", &request)
            .await
            .map_err(|e| match e {
                RoomError::Unavailable(_) | RoomError::Token(_) => e,
                other => RoomError::CreationFailed(other.to_string()),
            })?;

        tracing::info!(name = %room.name, sid = %room.sid, "LiveKit room created");
        Ok(room)
    }

    async fn delete_room(&self, name: &str) -> Result<(), RoomError> {
        let _: serde_json::Value = self
            .call("DeleteRoom", &DeleteRoomRequest { room: name })
            .await?;

        tracing::info!(name = %name, "LiveKit room deleted");
        Ok(())
    }
}
