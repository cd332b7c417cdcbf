//! Ingress server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p ingress-server
//! ```
//!
//! Configuration is loaded from environment variables; every recognized
//! setting must be present or startup aborts.

use ingress_common::{try_init_tracing, AppConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    // Run the server
    if let Err(e) = run().await {
        error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting ingress server...");

    // Load and validate configuration before anything opens a listener
    let config = AppConfig::load();
    config.validate().map_err(|e| {
        error!(error = %e, "Configuration validation failed");
        e
    })?;

    info!(
        env = %config.environment(),
        port = ingress_server::SERVER_PORT,
        "Configuration loaded"
    );

    // Run the gateway; domain routes are attached by the registrar
    ingress_server::run(config, ingress_server::no_routes).await?;

    Ok(())
}
