//! # socket-relay
//!
//! Infrastructure shared by every gateway instance.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Bus**: Cross-instance publish/subscribe relay of outbound envelopes, with a Redis
//!   implementation and an in-process one
//! - **Event Log**: Consumer-group reads of the domain event topics, with a Redis Streams
//!   implementation and an in-memory one
//!
//! ## Example
//!
//! ```ignore
//! use socket_relay::{Bus, RedisBus, RedisBusConfig, RedisPool, RelayMessage};
//!
//! let pool = RedisPool::from_config(&config.redis)?;
//! let bus = RedisBus::connect(pool.clone(), RedisBusConfig::from_config(&config.redis, &config.relay)).await?;
//!
//! let mut rx = bus.subscribe();
//! bus.publish(RelayMessage::new(DeliveryTarget::All, r#"{"type":"PONG"}"#))?;
//! ```

pub mod bus;
pub mod error;
pub mod event_log;
pub mod pool;

pub use bus::{
    backoff_delay, Bus, ChannelScheme, InMemoryBus, RedisBus, RedisBusConfig, RelayMessage,
    SharedBus,
};
pub use error::{RelayError, RelayResult};
pub use event_log::{
    EventLog, EventRecord, MemoryEventLog, RedisStreamLog, SharedEventLog, StreamLogConfig,
};
pub use pool::{RedisPool, RedisPoolConfig};
