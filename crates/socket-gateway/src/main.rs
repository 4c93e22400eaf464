//! Socket Gateway Server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p socket-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use socket_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration before tracing so the log format can follow APP_ENV
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    // Run the server
    if let Err(e) = run(config).await {
        error!(error = %e, code = e.error_code(), "Gateway failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), socket_common::AppError> {
    info!(
        env = ?config.app.env,
        port = config.gateway.port,
        instance_id = %config.gateway.instance_id,
        topics = config.event_log.topics.len(),
        "Starting Socket Gateway Server..."
    );

    socket_gateway::run(config).await?;

    info!("Gateway stopped");
    Ok(())
}
