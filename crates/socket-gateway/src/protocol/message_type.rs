//! Envelope message types
//!
//! Message types are identified by their wire name, which never changes once
//! published. Names this build does not know are preserved as `Unknown`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Type of an envelope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    // Client -> server
    /// Join a room (client only)
    JoinRoom,
    /// Leave a room (client only)
    LeaveRoom,
    /// Application-level keepalive (client only)
    Ping,
    /// Alias of `JoinRoom` (client only)
    Subscribe,
    /// Alias of `LeaveRoom` (client only)
    Unsubscribe,

    // Server -> client
    SubmissionCreated,
    SubmissionResult,
    LeaderboardUpdate,
    LeaderboardFrozen,
    LeaderboardUnfrozen,
    ContestEvent,
    ParticipantEvent,
    ProctoringViolation,
    PresenceUpdate,
    RoomJoined,
    RoomLeft,
    Pong,
    Error,
    Connected,

    /// A type name this build does not recognize
    Unknown(String),
}

impl MessageType {
    /// Every known message type
    pub const KNOWN: [Self; 19] = [
        Self::JoinRoom,
        Self::LeaveRoom,
        Self::Ping,
        Self::Subscribe,
        Self::Unsubscribe,
        Self::SubmissionCreated,
        Self::SubmissionResult,
        Self::LeaderboardUpdate,
        Self::LeaderboardFrozen,
        Self::LeaderboardUnfrozen,
        Self::ContestEvent,
        Self::ParticipantEvent,
        Self::ProctoringViolation,
        Self::PresenceUpdate,
        Self::RoomJoined,
        Self::RoomLeft,
        Self::Pong,
        Self::Error,
        Self::Connected,
    ];

    /// Resolve a wire name
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|known| known.as_str() == name)
            .cloned()
            .unwrap_or_else(|| Self::Unknown(name.to_string()))
    }

    /// Get the wire name of this type
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::JoinRoom => "JOIN_ROOM",
            Self::LeaveRoom => "LEAVE_ROOM",
            Self::Ping => "PING",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::SubmissionCreated => "SUBMISSION_CREATED",
            Self::SubmissionResult => "SUBMISSION_RESULT",
            Self::LeaderboardUpdate => "LEADERBOARD_UPDATE",
            Self::LeaderboardFrozen => "LEADERBOARD_FROZEN",
            Self::LeaderboardUnfrozen => "LEADERBOARD_UNFROZEN",
            Self::ContestEvent => "CONTEST_EVENT",
            Self::ParticipantEvent => "PARTICIPANT_EVENT",
            Self::ProctoringViolation => "PROCTORING_VIOLATION",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
            Self::RoomJoined => "ROOM_JOINED",
            Self::RoomLeft => "ROOM_LEFT",
            Self::Pong => "PONG",
            Self::Error => "ERROR",
            Self::Connected => "CONNECTED",
            Self::Unknown(name) => name,
        }
    }

    /// Check if clients may send this type
    #[must_use]
    pub const fn is_control(&self) -> bool {
        matches!(
            self,
            Self::JoinRoom | Self::LeaveRoom | Self::Ping | Self::Subscribe | Self::Unsubscribe
        )
    }

    /// Check if this type is only ever sent by the server
    #[must_use]
    pub const fn is_server_only(&self) -> bool {
        !self.is_control() && !matches!(self, Self::Unknown(_))
    }
}

impl Serialize for MessageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        if name.is_empty() {
            return Err(serde::de::Error::custom("empty message type"));
        }
        Ok(Self::from_name(&name))
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
