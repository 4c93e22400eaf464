//! Gateway server setup
//!
//! Provides the WebSocket server routes, startup wiring, and graceful shutdown.

mod auth;
mod handler;
mod state;

pub use auth::{authenticate, extract_token, ConnectParams};
pub use handler::ws_handler;
pub use state::{GatewayState, SocketSettings};

use crate::bridge::{EventBridge, HandlerRegistry};
use crate::connection::Registry;
use crate::hub::{Hub, HubStats};
use crate::telemetry;
use axum::{extract::State, routing::get, Json, Router};
use socket_common::{AppConfig, AppError, ConfigError, JwtService};
use socket_relay::{
    RedisBus, RedisBusConfig, RedisPool, RedisPoolConfig, RedisStreamLog, SharedBus,
    SharedEventLog, StreamLogConfig,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .route("/stats", get(stats))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Local connection counts
async fn stats(State(state): State<GatewayState>) -> Json<HubStats> {
    Json(state.hub().stats())
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A fully wired gateway instance, ready to serve
pub struct Gateway {
    state: GatewayState,
    bridge: Arc<EventBridge>,
    shutdown_timeout: Duration,
}

impl Gateway {
    /// Wire a gateway from already constructed parts
    pub fn new(
        hub: Arc<Hub>,
        bridge: Arc<EventBridge>,
        jwt: JwtService,
        settings: SocketSettings,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            state: GatewayState::new(hub, jwt, settings),
            bridge,
            shutdown_timeout,
        }
    }

    /// Build a gateway over an arbitrary bus and event log
    pub fn with_parts(
        config: &AppConfig,
        bus: SharedBus,
        log: SharedEventLog,
    ) -> Result<Self, AppError> {
        let hub = Hub::new_shared(
            Registry::new_shared(),
            bus,
            config.gateway.instance_id.clone(),
        );
        let bridge = EventBridge::new(
            hub.clone(),
            log,
            &HandlerRegistry::standard(),
            &config.event_log.topics,
        )
        .map_err(|e| AppError::Config(ConfigError::InvalidValue("EVENT_LOG_TOPICS", e.to_string())))?;

        Ok(Self::new(
            hub,
            Arc::new(bridge),
            JwtService::new(&config.jwt.secret),
            SocketSettings::from(&config.gateway),
            Duration::from_millis(config.gateway.shutdown_timeout_ms),
        ))
    }

    /// Connect to Redis and build a gateway from configuration
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        // Fail on unusable topics before touching the network.
        HandlerRegistry::standard()
            .resolve(&config.event_log.topics)
            .map_err(|e| {
                AppError::Config(ConfigError::InvalidValue("EVENT_LOG_TOPICS", e.to_string()))
            })?;

        tracing::info!("Connecting to Redis...");
        let pool = RedisPool::from_config(&config.redis).map_err(AppError::cache)?;
        let bus: SharedBus = RedisBus::connect(
            pool.clone(),
            RedisBusConfig::from_config(&config.redis, &config.relay),
        )
        .await
        .map_err(AppError::cache)?;
        tracing::info!("Relay bus connected");

        let log_pool = if config.event_log.url == config.redis.url {
            pool
        } else {
            RedisPool::new(RedisPoolConfig {
                url: config.event_log.url.clone(),
                max_connections: config.redis.max_connections as usize,
            })
            .map_err(AppError::event_log)?
        };
        let log = RedisStreamLog::connect(
            log_pool,
            StreamLogConfig::from_config(&config.event_log, &config.gateway.instance_id),
            &config.event_log.topics,
        )
        .await
        .map_err(AppError::event_log)?;
        tracing::info!(topics = config.event_log.topics.len(), "Event log connected");

        Self::with_parts(config, bus, Arc::new(log))
    }

    /// Get the gateway state
    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Get the hub
    pub fn hub(&self) -> &Arc<Hub> {
        self.state.hub()
    }

    /// Serve on `listener` until `shutdown` resolves, then shut down in order
    ///
    /// Stops accepting connections, stops the bridge (waiting for in-flight
    /// records up to the shutdown timeout), closes every connection, and
    /// finally closes the bus.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let hub = self.state.hub().clone();
        hub.start();
        self.bridge.start();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Gateway listening on ws://{}/ws", addr);
        }

        let app = create_app(self.state.clone());
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        tracing::info!("Shutting down gateway...");
        self.bridge.stop(self.shutdown_timeout).await;
        hub.stop().await;

        served.map_err(AppError::internal)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("state", &self.state)
            .field("bridge", &self.bridge)
            .finish()
    }
}

/// Bind the listening socket
pub async fn bind(addr: &str) -> Result<TcpListener, AppError> {
    TcpListener::bind(addr).await.map_err(|e| AppError::Bind {
        addr: addr.to_string(),
        reason: e.to_string(),
    })
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Run the complete gateway server with configuration
///
/// The Prometheus exporter, when enabled, listens on its own port and stops
/// after the gateway has shut down.
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let exporter = if config.metrics.enabled {
        let handle = telemetry::install_recorder()?;
        let listener = bind(&format!("{}:{}", config.gateway.host, config.metrics.port)).await?;
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(telemetry::serve(listener, handle, async move {
            let _ = stopped.await;
        }));
        Some((stop, task))
    } else {
        tracing::info!("Metrics exporter disabled");
        None
    };

    let gateway = Gateway::connect(&config).await?;
    let listener = bind(&config.gateway.address()).await?;
    let served = gateway.serve(listener, shutdown_signal()).await;

    if let Some((stop, task)) = exporter {
        let _ = stop.send(());
        match task.await {
            Ok(Err(e)) => tracing::warn!(error = %e, "Metrics exporter failed"),
            Err(e) => tracing::warn!(error = %e, "Metrics exporter task failed"),
            Ok(Ok(())) => {}
        }
    }

    served
}
