use axum::{body::Bytes, extract::State, Extension, Json};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::{parse_json, CallerId, FetchResponse};
use crate::error::{AppError, Result};
use crate::host::{HostError, Post};
use crate::livekit::{AccessToken, CreateRoom, Room, RoomError, VideoGrant, JOIN_TOKEN_TTL};
use crate::posts::{self, RoomProps};
use crate::state::AppState;

/// Seconds LiveKit keeps an empty room before closing it.
const EMPTY_TIMEOUT_SECONDS: u32 = 300;

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub channel_id: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRoomRequest {
    pub post_id: String,
    /// Also close the LiveKit room, disconnecting anyone still in it.
    #[serde(default)]
    pub delete_room: bool,
}

#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<Room>,
}

/// A missing channel membership means the caller may not use the room.
fn membership_error(err: HostError) -> AppError {
    if err.status_code == 404 {
        AppError::Forbidden(err.detail().to_string())
    } else {
        AppError::from(err)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

/// POST /join - find or create the post's room and issue a join token
pub async fn join_room(
    State(state): State<AppState>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    body: Bytes,
) -> Result<Json<FetchResponse<String>>> {
    let request: JoinRequest = parse_json(&body)?;
    require("post_id", &request.post_id)?;

    let post = state.host.get_post(&request.post_id).await?;
    state
        .host
        .get_channel_member(&post.channel_id, &user_id)
        .await
        .map_err(membership_error)?;
    let user = state.host.get_user(&user_id).await?;
    let props = posts::room_props(&post)?;

    tracing::info!(post_id = %post.id, user_id = %user_id, "room token requested");

    let room = find_or_create_room(&state, &post, &props).await?;

    let settings = state.settings.get();
    let token = AccessToken::new(
        settings.api_key.expose_secret(),
        settings.api_secret.expose_secret(),
    )
    .with_grant(VideoGrant::join(room.name.as_str()))
    .with_identity(&user_id)
    .with_name(&user.display_name())
    .with_valid_for(JOIN_TOKEN_TTL)
    .to_jwt()?;

    Ok(Json(FetchResponse::with_data(token)))
}

async fn find_or_create_room(state: &AppState, post: &Post, props: &RoomProps) -> Result<Room> {
    let name = props.room_name_for(post).to_string();

    let existing = state.rooms.list_rooms(std::slice::from_ref(&name)).await?;
    if let Some(room) = existing.into_iter().find(|room| room.name == name) {
        tracing::info!(name = %room.name, "room found");
        return Ok(room);
    }

    let room = state
        .rooms
        .create_room(CreateRoom {
            name: name.clone(),
            empty_timeout: EMPTY_TIMEOUT_SECONDS,
            max_participants: props.room_capacity,
            metadata: props.room_host.clone(),
        })
        .await?;

    let recorded = RoomProps {
        room_name: Some(room.name.clone()),
        room_sid: (!room.sid.is_empty()).then(|| room.sid.clone()),
        ..props.clone()
    };
    if &recorded != props {
        let mut updated = post.clone();
        recorded.write_to(&mut updated.props);
        state.host.update_post(&updated).await?;
    }

    Ok(room)
}

/// POST /create (also /room) - start a room in a channel the caller belongs to
pub async fn create_room(
    State(state): State<AppState>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    body: Bytes,
) -> Result<Json<FetchResponse<()>>> {
    let request: CreateRoomRequest = parse_json(&body)?;
    require("channel_id", &request.channel_id)?;

    let channel = state.host.get_channel(&request.channel_id).await?;
    let member = state
        .host
        .get_channel_member(&channel.id, &user_id)
        .await
        .map_err(membership_error)?;

    tracing::info!(
        user_id = %member.user_id,
        channel_id = %member.channel_id,
        "new live room requested"
    );

    posts::create_room_post(
        &state,
        &channel.id,
        &member.user_id,
        &request.message,
        request.capacity,
    )
    .await?;

    Ok(Json(FetchResponse::ok()))
}

/// POST /delete - remove a room post; only its host may do so
pub async fn delete_room(
    State(state): State<AppState>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    body: Bytes,
) -> Result<Json<FetchResponse<()>>> {
    let request: DeleteRoomRequest = parse_json(&body)?;
    require("post_id", &request.post_id)?;

    let post = state.host.get_post(&request.post_id).await?;
    let props = posts::room_props(&post)?;
    if props.room_host != user_id {
        return Err(AppError::Forbidden(
            "Only the room host can delete this room".to_string(),
        ));
    }

    tracing::info!(post_id = %post.id, user_id = %user_id, "room deletion requested");

    if request.delete_room {
        match state.rooms.delete_room(props.room_name_for(&post)).await {
            Ok(()) | Err(RoomError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    state.host.delete_post(&post.id).await?;

    Ok(Json(FetchResponse::ok()))
}

/// GET /rooms - list every room on the media server
pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<RoomsResponse>> {
    let rooms = state.rooms.list_rooms(&[]).await?;
    Ok(Json(RoomsResponse { rooms }))
}
