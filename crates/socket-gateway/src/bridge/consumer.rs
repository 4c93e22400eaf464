//! Event bridge
//!
//! Consumes the configured topics (one task each), routes every record through
//! its topic handler, and publishes the resulting deliveries through the hub.
//! A record is committed once it has been handled, whether handling succeeded,
//! failed, or panicked.

use parking_lot::Mutex;
use socket_core::DomainTopic;
use socket_relay::{backoff_delay, EventRecord, SharedEventLog};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{BridgeError, BridgeResult, HandlerRegistry, TopicHandler};
use crate::hub::Hub;
use crate::telemetry;

/// Base delay between fetch attempts after an event log failure
const FETCH_RETRY_BASE_MS: u64 = 200;

/// Longest delay between fetch attempts
const FETCH_RETRY_MAX_MS: u64 = 10_000;

/// What happened to one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Deliveries published
    Published(usize),
    /// Body could not be decoded
    Skipped,
    /// Handler returned an error
    Failed,
    /// Handler panicked
    Panicked,
}

impl RecordOutcome {
    /// Metric label for the outcome
    pub fn label(self) -> &'static str {
        match self {
            Self::Published(_) => "published",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Panicked => "panicked",
        }
    }
}

/// Bridge from the event log to the hub
pub struct EventBridge {
    hub: Arc<Hub>,
    log: SharedEventLog,
    routes: Vec<(DomainTopic, Arc<dyn TopicHandler>)>,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EventBridge {
    /// Create a bridge for the configured topics
    ///
    /// Fails if any topic has no handler in `handlers`.
    pub fn new(
        hub: Arc<Hub>,
        log: SharedEventLog,
        handlers: &HandlerRegistry,
        topics: &[String],
    ) -> BridgeResult<Self> {
        let routes = handlers.resolve(topics)?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            hub,
            log,
            routes,
            running: AtomicBool::new(false),
            shutdown,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Topics this bridge consumes
    pub fn topics(&self) -> Vec<DomainTopic> {
        self.routes.iter().map(|(topic, _)| *topic).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn one consumer task per topic
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Event bridge is already running");
            return;
        }

        let mut tasks = self.tasks.lock();
        for (topic, handler) in &self.routes {
            let bridge = self.clone();
            let topic = *topic;
            let handler = handler.clone();
            let shutdown = self.shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                bridge.consume(topic, handler, shutdown).await;
            }));
        }

        tracing::info!(topics = self.routes.len(), "Event bridge started");
    }

    /// Stop fetching and wait for in-flight records, up to `drain_timeout`
    ///
    /// Consumers still busy after the timeout are aborted; their uncommitted
    /// records are delivered again on the next start.
    pub async fn stop(&self, drain_timeout: Duration) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();

        match tokio::time::timeout(drain_timeout, futures::future::join_all(tasks)).await {
            Ok(_) => tracing::info!("Event bridge stopped"),
            Err(_) => {
                for abort in aborts {
                    abort.abort();
                }
                tracing::warn!(
                    timeout_ms = drain_timeout.as_millis(),
                    "Event bridge did not drain in time, consumers aborted"
                );
            }
        }
    }

    async fn consume(
        &self,
        topic: DomainTopic,
        handler: Arc<dyn TopicHandler>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::debug!(topic = %topic, "Topic consumer started");
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let fetched = tokio::select! {
                _ = shutdown.changed() => break,
                fetched = self.log.fetch(topic.as_str()) => fetched,
            };

            match fetched {
                Ok(records) => {
                    failures = 0;
                    for record in &records {
                        self.process(handler.as_ref(), record).await;
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = backoff_delay(failures, FETCH_RETRY_BASE_MS, FETCH_RETRY_MAX_MS);
                    tracing::warn!(
                        topic = %topic,
                        error = %e,
                        retry_in_ms = delay.as_millis(),
                        "Event log fetch failed"
                    );
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::debug!(topic = %topic, "Topic consumer stopped");
    }

    /// Handle one record and commit it
    pub async fn process(&self, handler: &dyn TopicHandler, record: &EventRecord) -> RecordOutcome {
        let result =
            std::panic::catch_unwind(AssertUnwindSafe(|| self.publish_record(handler, record)));

        let outcome = match result {
            Ok(Ok(published)) => {
                tracing::debug!(
                    topic = %record.topic,
                    record_id = %record.id,
                    published,
                    "Record routed"
                );
                RecordOutcome::Published(published)
            }
            Ok(Err(e)) if e.is_decode() => {
                tracing::warn!(
                    topic = %record.topic,
                    record_id = %record.id,
                    error = %e,
                    "Skipping undecodable record"
                );
                RecordOutcome::Skipped
            }
            Ok(Err(e)) => {
                tracing::error!(
                    topic = %record.topic,
                    record_id = %record.id,
                    error = %e,
                    "Record handler failed"
                );
                RecordOutcome::Failed
            }
            Err(_) => {
                tracing::error!(
                    topic = %record.topic,
                    record_id = %record.id,
                    "Record handler panicked"
                );
                RecordOutcome::Panicked
            }
        };
        metrics::counter!(
            telemetry::BRIDGE_RECORDS,
            "topic" => record.topic.clone(),
            "outcome" => outcome.label()
        )
        .increment(1);

        if let Err(e) = self.log.commit(record).await {
            tracing::warn!(
                topic = %record.topic,
                record_id = %record.id,
                error = %e,
                "Failed to commit record"
            );
        }

        outcome
    }

    fn publish_record(
        &self,
        handler: &dyn TopicHandler,
        record: &EventRecord,
    ) -> Result<usize, BridgeError> {
        let deliveries = handler.route(&record.payload)?;
        let count = deliveries.len();
        for delivery in deliveries {
            self.hub.publish(delivery.target, &delivery.envelope)?;
        }
        Ok(count)
    }
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("topics", &self.topics())
            .field("running", &self.is_running())
            .finish()
    }
}
