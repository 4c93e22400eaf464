//! Redis Pub/Sub bus.
//!
//! Publications go through a single sequential publisher task, which keeps them in
//! FIFO order per producer. A listener task holds a pattern subscription on every
//! channel of the scheme and re-broadcasts what it receives to local subscribers.
//!
//! When the subscription is lost the bus degrades to local-only delivery: the
//! publisher loops messages straight back to local subscribers while the listener
//! reconnects with exponential backoff.

use async_trait::async_trait;
use futures_util::StreamExt;
use rand::Rng;
use redis::aio::PubSub;
use redis::{AsyncCommands, Client};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::{Bus, ChannelScheme, RelayMessage};
use crate::error::{RelayError, RelayResult};
use crate::pool::RedisPool;

/// Redis bus configuration
#[derive(Debug, Clone)]
pub struct RedisBusConfig {
    /// Redis connection URL for the subscription connection
    pub redis_url: String,
    /// Prefix shared by every relay channel
    pub channel_prefix: String,
    /// First reconnect delay
    pub reconnect_base_ms: u64,
    /// Upper bound on the reconnect delay
    pub reconnect_max_ms: u64,
    /// Capacity of the outbound publish queue
    pub queue_capacity: usize,
    /// Buffer size of the local broadcast channel
    pub broadcast_buffer: usize,
}

impl Default for RedisBusConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            channel_prefix: "socket".to_string(),
            reconnect_base_ms: 500,
            reconnect_max_ms: 30_000,
            queue_capacity: 4096,
            broadcast_buffer: 4096,
        }
    }
}

impl RedisBusConfig {
    /// Build from the application's Redis and relay settings
    #[must_use]
    pub fn from_config(
        redis: &socket_common::RedisConfig,
        relay: &socket_common::RelayConfig,
    ) -> Self {
        Self {
            redis_url: redis.url.clone(),
            channel_prefix: relay.channel_prefix.clone(),
            reconnect_base_ms: relay.reconnect_base_ms,
            reconnect_max_ms: relay.reconnect_max_ms,
            ..Self::default()
        }
    }
}

/// Reconnect delay for the given attempt
///
/// Doubles from `base_ms` up to `max_ms`, then picks a random point in the upper
/// half of that window so that instances do not reconnect in lockstep.
#[must_use]
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let ceiling = base_ms
        .saturating_mul(1u64 << attempt.min(20))
        .min(max_ms)
        .max(1);
    let floor = ceiling / 2;
    Duration::from_millis(rand::thread_rng().gen_range(floor..=ceiling))
}

/// State shared between the bus handle and its tasks
struct Shared {
    scheme: ChannelScheme,
    local_tx: broadcast::Sender<RelayMessage>,
    connected: AtomicBool,
}

impl Shared {
    fn deliver_local(&self, message: RelayMessage) {
        // No subscribers is not an error
        let _ = self.local_tx.send(message);
    }

    fn deliver_remote(&self, msg: &redis::Msg) {
        let channel = msg.get_channel_name();
        let target = match self.scheme.parse(channel) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Ignoring message on unknown relay channel");
                return;
            }
        };
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Ignoring relay message with unreadable payload");
                return;
            }
        };

        tracing::trace!(channel = %channel, "Received relay message");
        self.deliver_local(RelayMessage::new(target, payload));
    }

    fn set_connected(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::AcqRel);
        if was == connected {
            return;
        }
        if connected {
            tracing::info!("Relay bus connected");
        } else {
            tracing::warn!("Relay bus disconnected, delivering locally until reconnected");
        }
    }
}

/// Bus relaying through Redis Pub/Sub
pub struct RedisBus {
    shared: Arc<Shared>,
    publish_tx: parking_lot::Mutex<Option<mpsc::Sender<RelayMessage>>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBus")
            .field("prefix", &self.shared.scheme.prefix())
            .field("connected", &self.shared.connected.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl RedisBus {
    /// Connect to Redis and start the publisher and listener tasks
    ///
    /// The pattern subscription is established before this returns, so nothing
    /// published afterwards can be missed by this instance.
    ///
    /// # Errors
    /// Returns an error if Redis cannot be reached
    pub async fn connect(pool: RedisPool, config: RedisBusConfig) -> RelayResult<Arc<Self>> {
        pool.health_check().await?;

        let scheme = ChannelScheme::new(config.channel_prefix.clone());
        let client = Client::open(config.redis_url.as_str())?;
        let pubsub = open_subscription(&client, &scheme.pattern()).await?;

        let (local_tx, _) = broadcast::channel(config.broadcast_buffer);
        let (publish_tx, publish_rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            scheme,
            local_tx,
            connected: AtomicBool::new(true),
        });

        let publisher = tokio::spawn(publish_loop(shared.clone(), pool, publish_rx));
        let listener = tokio::spawn(listen_loop(
            shared.clone(),
            client,
            pubsub,
            config,
            shutdown_rx,
        ));

        tracing::info!(pattern = %shared.scheme.pattern(), "Relay bus started");

        Ok(Arc::new(Self {
            shared,
            publish_tx: parking_lot::Mutex::new(Some(publish_tx)),
            shutdown_tx,
            tasks: parking_lot::Mutex::new(vec![publisher, listener]),
        }))
    }

    #[must_use]
    pub fn scheme(&self) -> &ChannelScheme {
        &self.shared.scheme
    }
}

#[async_trait]
impl Bus for RedisBus {
    fn publish(&self, message: RelayMessage) -> RelayResult<()> {
        let guard = self.publish_tx.lock();
        let tx = guard.as_ref().ok_or(RelayError::Closed)?;
        tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RelayError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => RelayError::Closed,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<RelayMessage> {
        self.shared.local_tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    async fn shutdown(&self) {
        // Dropping the sender lets the publisher drain its queue and exit.
        drop(self.publish_tx.lock().take());
        let _ = self.shutdown_tx.send(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Relay bus task ended abnormally");
            }
        }

        self.shared.connected.store(false, Ordering::Release);
        tracing::info!("Relay bus shut down");
    }
}

async fn open_subscription(client: &Client, pattern: &str) -> RelayResult<PubSub> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(pattern).await?;
    Ok(pubsub)
}

/// Sequentially forward queued publications to Redis
async fn publish_loop(
    shared: Arc<Shared>,
    pool: RedisPool,
    mut rx: mpsc::Receiver<RelayMessage>,
) {
    while let Some(message) = rx.recv().await {
        if shared.connected.load(Ordering::Acquire) {
            match forward(&shared, &pool, &message).await {
                Ok(()) => continue,
                Err(e) => {
                    tracing::warn!(
                        target_kind = message.target.kind(),
                        error = %e,
                        "Relay publish failed, delivering locally"
                    );
                }
            }
        }
        shared.deliver_local(message);
    }

    tracing::debug!("Relay publisher stopped");
}

async fn forward(shared: &Shared, pool: &RedisPool, message: &RelayMessage) -> RelayResult<()> {
    let channel = shared.scheme.name(&message.target);
    let mut conn = pool.get().await?;
    let receivers: i64 = conn.publish(&channel, &*message.payload).await?;

    tracing::trace!(channel = %channel, receivers, "Published relay message");
    Ok(())
}

/// Hold the pattern subscription, reconnecting with backoff until shut down
async fn listen_loop(
    shared: Arc<Shared>,
    client: Client,
    initial: PubSub,
    config: RedisBusConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let pattern = shared.scheme.pattern();
    let mut pending = Some(initial);
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let subscription = match pending.take() {
            Some(pubsub) => Ok(pubsub),
            None => open_subscription(&client, &pattern).await,
        };

        match subscription {
            Ok(pubsub) => {
                attempt = 0;
                shared.set_connected(true);

                let mut stream = Box::pin(pubsub.into_on_message());
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            tracing::debug!("Relay listener stopped");
                            return;
                        }
                        msg = stream.next() => match msg {
                            Some(msg) => shared.deliver_remote(&msg),
                            None => break,
                        }
                    }
                }

                shared.set_connected(false);
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "Relay bus reconnect failed");
            }
        }

        let delay = backoff_delay(attempt, config.reconnect_base_ms, config.reconnect_max_ms);
        attempt = attempt.saturating_add(1);

        tokio::select! {
            _ = shutdown.changed() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("Relay listener stopped");
}
