//! Relay channel naming.
//!
//! One Redis channel per delivery target, all under a common prefix:
//! `<prefix>:user:<userId>`, `<prefix>:room:<roomId>`, `<prefix>:all`.

use socket_core::DeliveryTarget;

use crate::error::{RelayError, RelayResult};

const SEPARATOR: char = ':';

/// Maps delivery targets to channel names and back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelScheme {
    prefix: String,
}

impl ChannelScheme {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Channel name for a target
    #[must_use]
    pub fn name(&self, target: &DeliveryTarget) -> String {
        format!("{}{SEPARATOR}{target}", self.prefix)
    }

    /// Pattern matching every channel of this scheme
    #[must_use]
    pub fn pattern(&self) -> String {
        format!("{}{SEPARATOR}*", self.prefix)
    }

    /// Parse a channel name back into its target
    pub fn parse(&self, name: &str) -> RelayResult<DeliveryTarget> {
        name.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
            .ok_or_else(|| RelayError::InvalidChannel(name.to_string()))?
            .parse()
            .map_err(|_| RelayError::InvalidChannel(name.to_string()))
    }
}

impl Default for ChannelScheme {
    fn default() -> Self {
        Self::new("socket")
    }
}
