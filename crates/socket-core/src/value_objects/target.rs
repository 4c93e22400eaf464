//! Delivery targets for published messages

use std::fmt;
use std::str::FromStr;

use super::{RoomId, UserId};
use crate::error::DomainError;

const USER_PREFIX: &str = "user:";
const ROOM_PREFIX: &str = "room:";
const ALL: &str = "all";

/// Where a published envelope should be delivered
///
/// Every instance resolves the target against its own local registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryTarget {
    /// Every connection owned by a user
    User(UserId),
    /// Every member of a room
    Room(RoomId),
    /// Every connection
    All,
}

impl DeliveryTarget {
    #[must_use]
    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self::User(user_id.into())
    }

    #[must_use]
    pub fn room(room_id: RoomId) -> Self {
        Self::Room(room_id)
    }

    /// Short label used in log fields
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Room(_) => "room",
            Self::All => "all",
        }
    }
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{USER_PREFIX}{id}"),
            Self::Room(id) => write!(f, "{ROOM_PREFIX}{id}"),
            Self::All => f.write_str(ALL),
        }
    }
}

impl FromStr for DeliveryTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            return Ok(Self::All);
        }

        if let Some(user) = s.strip_prefix(USER_PREFIX) {
            if user.is_empty() {
                return Err(DomainError::InvalidTarget(s.to_string()));
            }
            return Ok(Self::User(UserId::from(user)));
        }

        if let Some(room) = s.strip_prefix(ROOM_PREFIX) {
            return room
                .parse::<RoomId>()
                .map(Self::Room)
                .map_err(|_| DomainError::InvalidTarget(s.to_string()));
        }

        Err(DomainError::InvalidTarget(s.to_string()))
    }
}
