//! Event log consumer.
//!
//! Records are delivered at least once and in order per topic. A record stays
//! pending for this consumer group until it is committed.

mod memory;
mod redis_stream;

pub use memory::MemoryEventLog;
pub use redis_stream::{RedisStreamLog, StreamLogConfig};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::RelayResult;

/// One record read from a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Topic the record was read from
    pub topic: String,
    /// Position of the record within its topic
    pub id: String,
    /// Raw record body (JSON)
    pub payload: Vec<u8>,
}

/// Source of domain event records
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Fetch the next batch of records for a topic
    ///
    /// Waits a bounded time when nothing is available and then returns an empty batch.
    async fn fetch(&self, topic: &str) -> RelayResult<Vec<EventRecord>>;

    /// Mark a record as processed so it is not delivered again
    async fn commit(&self, record: &EventRecord) -> RelayResult<()>;
}

/// Shared event log handle
pub type SharedEventLog = Arc<dyn EventLog>;
