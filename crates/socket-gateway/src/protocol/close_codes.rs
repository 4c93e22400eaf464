//! WebSocket close codes
//!
//! Defines the close codes the gateway sends when it ends a connection.

use serde::{Deserialize, Serialize};

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure
    Normal = 1000,
    /// Unknown error occurred
    UnknownError = 4000,
    /// Outbound queue overflowed
    SlowConsumer = 4008,
    /// No inbound traffic within the heartbeat window
    HeartbeatTimeout = 4009,
    /// Server is shutting down
    ServerShutdown = 4010,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1000 => Some(Self::Normal),
            4000 => Some(Self::UnknownError),
            4008 => Some(Self::SlowConsumer),
            4009 => Some(Self::HeartbeatTimeout),
            4010 => Some(Self::ServerShutdown),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if the client should attempt to reconnect after this close code
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        !matches!(self, Self::Normal)
    }

    /// Get the description for this close code, sent as the close reason
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Normal => "normal closure",
            Self::UnknownError => "unknown error",
            Self::SlowConsumer => "slow consumer",
            Self::HeartbeatTimeout => "heartbeat timeout",
            Self::ServerShutdown => "server shutdown",
        }
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::UnknownError => "UnknownError",
            Self::SlowConsumer => "SlowConsumer",
            Self::HeartbeatTimeout => "HeartbeatTimeout",
            Self::ServerShutdown => "ServerShutdown",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
