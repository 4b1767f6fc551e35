//! Room metadata stored on chat posts.
//!
//! The post is the system of record for which room belongs to which
//! conversation. This is the only place that reads or writes the untyped
//! props map.

use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::host::Post;
use crate::state::AppState;

/// Post type rendered by the webapp as a live room.
pub const ROOM_POST_TYPE: &str = "custom_livekit";

const ROOM_NAME: &str = "room_name";
const ROOM_CAPACITY: &str = "room_capacity";
const ROOM_HOST: &str = "room_host";
const ROOM_SID: &str = "room_sid";

/// Typed view of a room post's metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomProps {
    /// Remote room name; the post id is used until a room has been created.
    pub room_name: Option<String>,
    /// Maximum participants, 0 for unlimited.
    pub room_capacity: u32,
    /// User who started the room.
    pub room_host: String,
    pub room_sid: Option<String>,
}

impl RoomProps {
    pub fn new(room_host: &str, room_capacity: u32) -> Self {
        Self {
            room_host: room_host.to_string(),
            room_capacity,
            ..Self::default()
        }
    }

    /// Read room metadata from a post's props. Unknown keys are ignored and
    /// missing ones take their defaults; only `room_host` is required.
    pub fn from_props(props: &Map<String, Value>) -> Option<Self> {
        let room_host = props.get(ROOM_HOST)?.as_str()?.to_string();

        // JSON numbers may come back as floats from the host.
        let room_capacity = match props.get(ROOM_CAPACITY) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .map(|n| n.min(u32::MAX as u64) as u32)
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };

        let text = |key: &str| {
            props
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            room_name: text(ROOM_NAME),
            room_capacity,
            room_host,
            room_sid: text(ROOM_SID),
        })
    }

    /// Write room metadata into a props map, keeping unrelated keys.
    pub fn write_to(&self, props: &mut Map<String, Value>) {
        props.insert(ROOM_CAPACITY.to_string(), Value::from(self.room_capacity));
        props.insert(ROOM_HOST.to_string(), Value::from(self.room_host.clone()));
        if let Some(name) = &self.room_name {
            props.insert(ROOM_NAME.to_string(), Value::from(name.clone()));
        }
        if let Some(sid) = &self.room_sid {
            props.insert(ROOM_SID.to_string(), Value::from(sid.clone()));
        }
    }

    pub fn to_props(&self) -> Map<String, Value> {
        let mut props = Map::new();
        self.write_to(&mut props);
        props
    }

    /// Name of the remote room for the given post.
    pub fn room_name_for<'a>(&'a self, post: &'a Post) -> &'a str {
        self.room_name.as_deref().unwrap_or(&post.id)
    }
}

/// Read the room metadata of a post, failing if it is not a room post.
pub fn room_props(post: &Post) -> Result<RoomProps> {
    RoomProps::from_props(&post.props)
        .ok_or_else(|| AppError::BadRequest(format!("Post {} is not a room", post.id)))
}

/// Create the post that represents a room in a channel.
pub async fn create_room_post(
    state: &AppState,
    channel_id: &str,
    host_user_id: &str,
    topic: &str,
    capacity: u32,
) -> Result<Post> {
    let bot_user_id = state
        .bot_user_id()
        .ok_or_else(|| AppError::InternalError("Plugin is not activated".to_string()))?;

    let post = Post {
        channel_id: channel_id.to_string(),
        user_id: bot_user_id,
        message: topic.to_string(),
        post_type: ROOM_POST_TYPE.to_string(),
        props: RoomProps::new(host_user_id, capacity).to_props(),
        ..Post::default()
    };

    let created = state.host.create_post(&post).await?;
    tracing::info!(
        post_id = %created.id,
        channel_id = %channel_id,
        host = %host_user_id,
        capacity,
        "room post created"
    );

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn test_props_round_trip_keeps_other_keys() {
        let mut map = props(json!({ "attachments": [] }));
        let room = RoomProps {
            room_name: Some("post-1".to_string()),
            room_capacity: 5,
            room_host: "u1".to_string(),
            room_sid: Some("RM_1".to_string()),
        };
        room.write_to(&mut map);

        assert!(map.contains_key("attachments"));
        assert_eq!(map["room_capacity"], 5);
        assert_eq!(RoomProps::from_props(&map), Some(room));
    }

    #[test]
    fn test_capacity_from_float() {
        let room = RoomProps::from_props(&props(json!({
            "room_host": "u1",
            "room_capacity": 8.0
        })))
        .expect("room");
        assert_eq!(room.room_capacity, 8);
        assert_eq!(room.room_name, None);
    }

    #[test]
    fn test_missing_host_is_not_a_room() {
        assert_eq!(RoomProps::from_props(&props(json!({ "room_capacity": 3 }))), None);
        assert_eq!(RoomProps::from_props(&props(json!({ "room_host": 7 }))), None);
    }

    #[test]
    fn test_room_name_defaults_to_post_id() {
        let post = Post {
            id: "p1".to_string(),
            ..Post::default()
        };
        let mut room = RoomProps::new("u1", 0);
        assert_eq!(room.room_name_for(&post), "p1");

        room.room_name = Some("custom".to_string());
        assert_eq!(room.room_name_for(&post), "custom");
    }
}
