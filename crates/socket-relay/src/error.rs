//! Relay error types

/// Error type for pool, bus, and event log operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Failed to get connection from pool: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid relay channel: {0}")]
    InvalidChannel(String),

    #[error("Relay publish queue is full")]
    QueueFull,

    #[error("Relay is shut down")]
    Closed,
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
