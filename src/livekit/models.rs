use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A room as reported by the LiveKit room service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Room {
    pub sid: String,
    pub name: String,
    #[serde(alias = "empty_timeout")]
    pub empty_timeout: u32,
    #[serde(alias = "max_participants")]
    pub max_participants: u32,
    #[serde(alias = "creation_time", deserialize_with = "int64")]
    pub creation_time: i64,
    pub metadata: String,
    #[serde(alias = "num_participants")]
    pub num_participants: u32,
    #[serde(alias = "active_recording")]
    pub active_recording: bool,
    #[serde(alias = "turn_password", skip_serializing)]
    pub turn_password: String,
}

/// Parameters for creating a room.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    pub name: String,
    pub empty_timeout: u32,
    pub max_participants: u32,
    pub metadata: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ListRoomsRequest<'a> {
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub names: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListRoomsResponse {
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteRoomRequest<'a> {
    pub room: &'a str,
}

/// Error body returned by Twirp endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TwirpError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub msg: String,
}

/// protojson encodes int64 as a string; accept both forms.
fn int64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom(format!("not an int64: {n}"))),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!("not an int64: {other}"))),
    }
}
