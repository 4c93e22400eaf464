//! Redis Streams event log.
//!
//! Each topic is a stream keyed by the topic name whose entries carry the record body
//! in a `value` field. Instances read through a shared consumer group, so each record
//! is handled by one instance; the instance id serves as the consumer name.

use async_trait::async_trait;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::collections::HashSet;

use super::{EventLog, EventRecord};
use crate::error::RelayResult;
use crate::pool::RedisPool;

/// Field holding the record body
const VALUE_FIELD: &str = "value";

/// Redis Streams consumer configuration
#[derive(Debug, Clone)]
pub struct StreamLogConfig {
    /// Consumer group shared by every instance
    pub group: String,
    /// Consumer name of this instance
    pub consumer: String,
    /// Maximum records returned by one fetch
    pub batch_size: usize,
    /// Maximum time a fetch waits for new records
    pub block_ms: u64,
}

impl StreamLogConfig {
    /// Build from the application's event log settings
    #[must_use]
    pub fn from_config(config: &socket_common::EventLogConfig, instance_id: &str) -> Self {
        Self {
            group: config.consumer_group.clone(),
            consumer: instance_id.to_string(),
            batch_size: config.batch_size.max(1),
            block_ms: config.block_ms,
        }
    }
}

/// Event log backed by Redis Streams consumer groups
pub struct RedisStreamLog {
    pool: RedisPool,
    config: StreamLogConfig,
    /// Topics whose pending entries from a previous run have been re-read
    recovered: parking_lot::Mutex<HashSet<String>>,
}

impl std::fmt::Debug for RedisStreamLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamLog")
            .field("group", &self.config.group)
            .field("consumer", &self.config.consumer)
            .finish_non_exhaustive()
    }
}

impl RedisStreamLog {
    /// Verify Redis is reachable and ensure the consumer group exists on every topic
    ///
    /// # Errors
    /// Returns an error if Redis cannot be reached or a group cannot be created
    pub async fn connect(
        pool: RedisPool,
        config: StreamLogConfig,
        topics: &[String],
    ) -> RelayResult<Self> {
        pool.health_check().await?;

        let mut conn = pool.get().await?;
        for topic in topics {
            let created: redis::RedisResult<()> = conn
                .xgroup_create_mkstream(topic.as_str(), config.group.as_str(), "$")
                .await;

            match created {
                Ok(()) => {
                    tracing::info!(topic = %topic, group = %config.group, "Created consumer group");
                }
                Err(e) if e.code() == Some("BUSYGROUP") => {
                    tracing::debug!(topic = %topic, group = %config.group, "Consumer group exists");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Self {
            pool,
            config,
            recovered: parking_lot::Mutex::new(HashSet::new()),
        })
    }

    async fn read(&self, topic: &str, from: &str, block: bool) -> RelayResult<Vec<EventRecord>> {
        let mut options = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer)
            .count(self.config.batch_size);
        if block {
            options = options.block(self.config.block_ms as usize);
        }

        let mut conn = self.pool.get().await?;
        let reply: Option<StreamReadReply> =
            conn.xread_options(&[topic], &[from], &options).await?;

        let records = reply
            .into_iter()
            .flat_map(|reply| reply.keys)
            .flat_map(|key| key.ids)
            .map(|entry| EventRecord {
                topic: topic.to_string(),
                payload: entry.get::<Vec<u8>>(VALUE_FIELD).unwrap_or_default(),
                id: entry.id,
            })
            .collect();

        Ok(records)
    }
}

#[async_trait]
impl EventLog for RedisStreamLog {
    async fn fetch(&self, topic: &str) -> RelayResult<Vec<EventRecord>> {
        let recovered = self.recovered.lock().contains(topic);
        if !recovered {
            // Entries delivered to this consumer before a restart but never acknowledged.
            let pending = self.read(topic, "0", false).await?;
            if !pending.is_empty() {
                tracing::info!(topic = %topic, count = pending.len(), "Re-reading unacknowledged records");
                return Ok(pending);
            }
            self.recovered.lock().insert(topic.to_string());
        }

        self.read(topic, ">", true).await
    }

    async fn commit(&self, record: &EventRecord) -> RelayResult<()> {
        let mut conn = self.pool.get().await?;
        let _: i64 = conn
            .xack(record.topic.as_str(), self.config.group.as_str(), &[record.id.as_str()])
            .await?;
        Ok(())
    }
}
