//! Control and session payload definitions

use serde::{Deserialize, Serialize};
use socket_core::{RoomId, UserId};

/// Payload of JOIN_ROOM, LEAVE_ROOM, SUBSCRIBE and UNSUBSCRIBE
///
/// The room id stays a plain string here so that a malformed id can be reported
/// with its own error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequestPayload {
    pub room_id: String,
}

impl RoomRequestPayload {
    /// Parse the requested room id
    pub fn room(&self) -> Result<RoomId, socket_core::DomainError> {
        self.room_id.parse()
    }
}

/// Payload of ERROR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Payload of CONNECTED, sent once the socket is registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub user_id: UserId,
    pub instance_id: String,
}

/// Payload of ROOM_JOINED
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedPayload {
    pub room_id: RoomId,
    /// Members of the room on the instance that handled the join
    pub member_count: usize,
}

/// Payload of ROOM_LEFT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomLeftPayload {
    pub room_id: RoomId,
}

/// Presence status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Payload of PRESENCE_UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdatePayload {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub status: PresenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
}

impl PresenceUpdatePayload {
    /// Presence of a user within a room
    #[must_use]
    pub fn in_room(
        user_id: UserId,
        username: Option<String>,
        status: PresenceStatus,
        room_id: RoomId,
    ) -> Self {
        Self {
            user_id,
            username,
            status,
            room_id: Some(room_id),
        }
    }
}
