//! Fan-out hub
//!
//! Routes envelopes to local connections, and publishes through the bus so that
//! every instance delivers to the connections it holds.

mod error;
mod hub;

pub use error::{HubError, HubResult};
pub use hub::{Hub, HubStats};
