//! Event bridge
//!
//! Turns domain events from the event log into hub publications.

mod consumer;
mod error;
mod routes;

pub use consumer::{EventBridge, RecordOutcome};
pub use error::{BridgeError, BridgeResult};
pub use routes::{Delivery, HandlerRegistry, TopicHandler};
