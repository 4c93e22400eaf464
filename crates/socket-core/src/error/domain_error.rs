//! Domain errors - error types for the domain layer

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    // =========================================================================
    // Identifier Errors
    // =========================================================================
    #[error("Invalid room id: {0}")]
    InvalidRoomId(String),

    #[error("Unknown room type: {0}")]
    UnknownRoomType(String),

    #[error("Invalid connection id: {0}")]
    InvalidConnectionId(String),

    #[error("Invalid delivery target: {0}")]
    InvalidTarget(String),

    // =========================================================================
    // Event Log Errors
    // =========================================================================
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
}

impl DomainError {
    /// Get the error code for client-facing error payloads
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRoomId(_) | Self::UnknownRoomType(_) => "INVALID_ROOM_ID",
            Self::InvalidConnectionId(_) => "INVALID_CONNECTION_ID",
            Self::InvalidTarget(_) => "INVALID_TARGET",
            Self::UnknownTopic(_) => "UNKNOWN_TOPIC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DomainError::InvalidRoomId("x".into()).code(), "INVALID_ROOM_ID");
        assert_eq!(DomainError::UnknownRoomType("team".into()).code(), "INVALID_ROOM_ID");
        assert_eq!(DomainError::UnknownTopic("a.b".into()).code(), "UNKNOWN_TOPIC");
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidRoomId("contest".to_string());
        assert_eq!(err.to_string(), "Invalid room id: contest");
    }
}
