//! Envelope format
//!
//! Every WebSocket text frame, in either direction, is one JSON envelope:
//! `{"type": ..., "payload": ..., "timestamp": ..., "requestId": ...}` where
//! `payload` and `requestId` are omitted when absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};

use super::{ErrorPayload, MessageType};

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Current time in epoch milliseconds, never earlier than a previous reading
pub fn now_millis() -> i64 {
    let wall = chrono::Utc::now().timestamp_millis();
    LAST_TIMESTAMP.fetch_max(wall, Ordering::AcqRel).max(wall)
}

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed envelope: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("{0} requires a payload")]
    MissingPayload(MessageType),

    #[error("Invalid {message_type} payload: {source}")]
    InvalidPayload {
        message_type: MessageType,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for codec operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Protocol envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Message body, left undecoded until a handler asks for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Creation time (epoch milliseconds)
    #[serde(default)]
    pub timestamp: i64,

    /// Correlation id echoed back on replies
    #[serde(
        rename = "requestId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_id: Option<String>,
}

impl Envelope {
    /// Build an envelope without a payload
    #[must_use]
    pub fn empty(message_type: MessageType) -> Self {
        Self {
            message_type,
            payload: None,
            timestamp: now_millis(),
            request_id: None,
        }
    }

    /// Build an envelope carrying a serialized payload
    pub fn build<P: Serialize>(message_type: MessageType, payload: &P) -> ProtocolResult<Self> {
        let payload = serde_json::to_value(payload).map_err(ProtocolError::Encode)?;
        Ok(Self {
            payload: Some(payload),
            ..Self::empty(message_type)
        })
    }

    /// Build an envelope that answers a request
    pub fn build_with_request_id<P: Serialize>(
        message_type: MessageType,
        payload: &P,
        request_id: Option<String>,
    ) -> ProtocolResult<Self> {
        Ok(Self::build(message_type, payload)?.with_request_id(request_id))
    }

    /// Set the correlation id
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id.filter(|id| !id.is_empty());
        self
    }

    /// Build an ERROR envelope
    pub fn error(
        code: impl Into<String>,
        message: impl Into<String>,
        request_id: Option<String>,
    ) -> ProtocolResult<Self> {
        Self::build_with_request_id(
            MessageType::Error,
            &ErrorPayload::new(code, message),
            request_id,
        )
    }

    /// Build a PONG envelope
    #[must_use]
    pub fn pong(request_id: Option<String>) -> Self {
        Self::empty(MessageType::Pong).with_request_id(request_id)
    }

    /// Parse an envelope, leaving the payload undecoded
    pub fn parse(bytes: &[u8]) -> ProtocolResult<Self> {
        let mut envelope: Self = serde_json::from_slice(bytes).map_err(ProtocolError::Decode)?;
        envelope.request_id = envelope.request_id.filter(|id| !id.is_empty());
        Ok(envelope)
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    /// Serialize to JSON text for a WebSocket text frame
    pub fn to_text(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Decode the payload into a concrete type
    pub fn payload_as<T: DeserializeOwned>(&self) -> ProtocolResult<T> {
        let payload = self
            .payload
            .as_ref()
            .ok_or_else(|| ProtocolError::MissingPayload(self.message_type.clone()))?;

        T::deserialize(payload).map_err(|source| ProtocolError::InvalidPayload {
            message_type: self.message_type.clone(),
            source,
        })
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope(type={}", self.message_type)?;
        if let Some(id) = &self.request_id {
            write!(f, ", requestId={id}")?;
        }
        write!(f, ")")
    }
}
