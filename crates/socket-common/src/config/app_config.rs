//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use socket_core::DomainTopic;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: GatewayConfig,
    pub redis: RedisConfig,
    pub event_log: EventLogConfig,
    pub relay: RelayConfig,
    pub jwt: JwtConfig,
    pub metrics: MetricsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// WebSocket gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Identifier of this process among the horizontally scaled instances
    pub instance_id: String,
    /// Idle interval after which the write side pings the peer
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Number of heartbeat intervals without inbound traffic before the peer is dropped
    #[serde(default = "default_heartbeat_timeout_multiplier")]
    pub heartbeat_timeout_multiplier: u32,
    /// Capacity of each connection's outbound queue
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,
    /// Upper bound on draining in-flight work during shutdown
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl GatewayConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Redis configuration (relay bus)
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Event log consumer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventLogConfig {
    pub url: String,
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    pub topics: Vec<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,
}

/// Cross-instance relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
}

/// JWT configuration (handshake verification)
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

/// Prometheus exporter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_app_name() -> String {
    "contest-socket".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    6001
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_multiplier() -> u32 {
    2
}

fn default_send_queue_capacity() -> usize {
    256
}

fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

fn default_redis_max_connections() -> u32 {
    32
}

fn default_consumer_group() -> String {
    "socket-svc-group".to_string()
}

fn default_topics() -> Vec<String> {
    DomainTopic::DEFAULT_SUBSCRIPTIONS
        .iter()
        .map(|topic| topic.as_str().to_string())
        .collect()
}

fn default_batch_size() -> usize {
    64
}

fn default_block_ms() -> u64 {
    1_000
}

fn default_channel_prefix() -> String {
    "socket".to_string()
}

fn default_reconnect_base_ms() -> u64 {
    500
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

/// Parse an optional variable, rejecting values that are present but malformed
fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        _ => Ok(None),
    }
}

/// Parse an optional on/off switch
fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(key, raw)),
        },
        _ => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    ///
    /// # Errors
    /// Returns an error if required variables are missing or malformed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let redis_url = lookup("REDIS_URL").ok_or(ConfigError::MissingVar("REDIS_URL"))?;

        let port = match parse_var(&lookup, "GATEWAY_PORT")? {
            Some(port) => port,
            None => parse_var(&lookup, "PORT")?.unwrap_or_else(default_port),
        };

        let topics = lookup("EVENT_LOG_TOPICS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|topics| !topics.is_empty())
            .unwrap_or_else(default_topics);

        let heartbeat_timeout_multiplier = parse_var(&lookup, "HEARTBEAT_TIMEOUT_MULTIPLIER")?
            .unwrap_or_else(default_heartbeat_timeout_multiplier);
        if heartbeat_timeout_multiplier == 0 {
            return Err(ConfigError::InvalidValue(
                "HEARTBEAT_TIMEOUT_MULTIPLIER",
                "0".to_string(),
            ));
        }

        let send_queue_capacity =
            parse_var(&lookup, "SEND_QUEUE_CAPACITY")?.unwrap_or_else(default_send_queue_capacity);
        if send_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("SEND_QUEUE_CAPACITY", "0".to_string()));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            gateway: GatewayConfig {
                host: lookup("GATEWAY_HOST").unwrap_or_else(default_host),
                port,
                instance_id: lookup("INSTANCE_ID")
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                heartbeat_interval_ms: parse_var(&lookup, "HEARTBEAT_INTERVAL_MS")?
                    .unwrap_or_else(default_heartbeat_interval_ms),
                heartbeat_timeout_multiplier,
                send_queue_capacity,
                shutdown_timeout_ms: parse_var(&lookup, "SHUTDOWN_TIMEOUT_MS")?
                    .unwrap_or_else(default_shutdown_timeout_ms),
            },
            redis: RedisConfig {
                url: redis_url.clone(),
                max_connections: parse_var(&lookup, "REDIS_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_redis_max_connections),
            },
            event_log: EventLogConfig {
                url: lookup("EVENT_LOG_URL").unwrap_or(redis_url),
                consumer_group: lookup("EVENT_LOG_CONSUMER_GROUP")
                    .unwrap_or_else(default_consumer_group),
                topics,
                batch_size: parse_var(&lookup, "EVENT_LOG_BATCH_SIZE")?
                    .unwrap_or_else(default_batch_size),
                block_ms: parse_var(&lookup, "EVENT_LOG_BLOCK_MS")?.unwrap_or_else(default_block_ms),
            },
            relay: RelayConfig {
                channel_prefix: lookup("RELAY_CHANNEL_PREFIX")
                    .unwrap_or_else(default_channel_prefix),
                reconnect_base_ms: parse_var(&lookup, "RELAY_RECONNECT_BASE_MS")?
                    .unwrap_or_else(default_reconnect_base_ms),
                reconnect_max_ms: parse_var(&lookup, "RELAY_RECONNECT_MAX_MS")?
                    .unwrap_or_else(default_reconnect_max_ms),
            },
            jwt: JwtConfig {
                secret: lookup("JWT_SECRET")
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
            },
            metrics: MetricsConfig {
                enabled: parse_flag(&lookup, "METRICS_ENABLED")?
                    .unwrap_or_else(default_metrics_enabled),
                port: parse_var(&lookup, "METRICS_PORT")?.unwrap_or_else(default_metrics_port),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
