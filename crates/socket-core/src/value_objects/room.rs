//! Room identifiers
//!
//! A room id has the form `<roomType>:<entityId>`, e.g. `contest:42`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Separator between room type and entity id
const ROOM_SEPARATOR: char = ':';

/// Kinds of rooms a connection can join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    /// Everyone following a single contest
    Contest,
    /// Reserved for platform-wide scopes
    Global,
}

impl RoomType {
    /// Get the wire name of this room type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contest => "contest",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contest" => Ok(Self::Contest),
            "global" => Ok(Self::Global),
            other => Err(DomainError::UnknownRoomType(other.to_string())),
        }
    }
}

/// Room identifier (`<roomType>:<entityId>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId {
    room_type: RoomType,
    entity_id: String,
}

impl RoomId {
    /// Build a room id from its parts
    ///
    /// # Errors
    /// Returns an error if the entity id is empty or contains whitespace
    pub fn new(room_type: RoomType, entity_id: impl Into<String>) -> Result<Self, DomainError> {
        let entity_id = entity_id.into();
        if entity_id.is_empty() || entity_id.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidRoomId(format!(
                "{room_type}{ROOM_SEPARATOR}{entity_id}"
            )));
        }
        Ok(Self {
            room_type,
            entity_id,
        })
    }

    /// Room for a contest
    pub fn contest(contest_id: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RoomType::Contest, contest_id)
    }

    #[must_use]
    pub const fn room_type(&self) -> RoomType {
        self.room_type
    }

    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ROOM_SEPARATOR}{}", self.room_type, self.entity_id)
    }
}

impl FromStr for RoomId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, entity) = s
            .split_once(ROOM_SEPARATOR)
            .ok_or_else(|| DomainError::InvalidRoomId(s.to_string()))?;
        let room_type = kind.parse::<RoomType>()?;
        Self::new(room_type, entity)
    }
}

impl TryFrom<String> for RoomId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomId> for String {
    fn from(room: RoomId) -> Self {
        room.to_string()
    }
}
