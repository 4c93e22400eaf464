//! In-memory event log.
//!
//! Used by tests and local runs. Records are handed out once in push order and
//! remembered as committed when acknowledged.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;

use super::{EventLog, EventRecord};
use crate::error::RelayResult;

const DEFAULT_WAIT: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Inner {
    queued: HashMap<String, VecDeque<EventRecord>>,
    committed: HashMap<String, Vec<String>>,
    next_id: u64,
}

/// Event log held in process memory
#[derive(Debug)]
pub struct MemoryEventLog {
    inner: Mutex<Inner>,
    notify: Notify,
    batch_size: usize,
    wait: Duration,
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventLog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            batch_size: 64,
            wait: DEFAULT_WAIT,
        }
    }

    /// Append a record to a topic, returning its id
    pub fn push(&self, topic: &str, payload: impl Into<Vec<u8>>) -> String {
        let id = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            let id = format!("{}-0", inner.next_id);
            inner
                .queued
                .entry(topic.to_string())
                .or_default()
                .push_back(EventRecord {
                    topic: topic.to_string(),
                    id: id.clone(),
                    payload: payload.into(),
                });
            id
        };
        self.notify.notify_waiters();
        id
    }

    /// Ids committed so far on a topic, in commit order
    #[must_use]
    pub fn committed(&self, topic: &str) -> Vec<String> {
        self.inner
            .lock()
            .committed
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Records not yet fetched on a topic
    #[must_use]
    pub fn queued_len(&self, topic: &str) -> usize {
        self.inner.lock().queued.get(topic).map_or(0, VecDeque::len)
    }

    fn take_batch(&self, topic: &str) -> Vec<EventRecord> {
        let mut inner = self.inner.lock();
        let Some(queue) = inner.queued.get_mut(topic) else {
            return Vec::new();
        };
        let count = queue.len().min(self.batch_size);
        queue.drain(..count).collect()
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn fetch(&self, topic: &str) -> RelayResult<Vec<EventRecord>> {
        let notified = self.notify.notified();
        let batch = self.take_batch(topic);
        if !batch.is_empty() {
            return Ok(batch);
        }

        let _ = tokio::time::timeout(self.wait, notified).await;
        Ok(self.take_batch(topic))
    }

    async fn commit(&self, record: &EventRecord) -> RelayResult<()> {
        self.inner
            .lock()
            .committed
            .entry(record.topic.clone())
            .or_default()
            .push(record.id.clone());
        Ok(())
    }
}
