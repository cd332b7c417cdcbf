//! Server setup and initialization
//!
//! Assembles the gateway in the required order: configuration is already
//! validated by the caller, the store watchdog starts connecting, the
//! pipeline is assembled, registrar routes attach, the error boundary is
//! appended last, and the listener starts once the fan-out channel pair is
//! live.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use ingress_common::{AppConfig, GatewayError};
use ingress_fanout::{FanOutAdapter, FanOutConfig};
use ingress_store::{StoreConfig, StoreWatchdog, WatchdogConfig};
use tokio::net::TcpListener;
use tracing::info;

use crate::pipeline::apply_pipeline;
use crate::realtime::{socket_handler, ConnectionManager, RealtimeTransport};
use crate::registrar::RouteRegistrar;
use crate::response::not_found;
use crate::routes::health_routes;
use crate::state::AppState;

/// The single TCP port serving both HTTP and upgraded duplex traffic
pub const SERVER_PORT: u16 = 5000;

/// Build the complete Axum application
///
/// Registrar routes sit between the pipeline stages and the error
/// boundary; the real-time transport attaches to the same listener via
/// the `/socket` upgrade route.
pub fn create_app(state: AppState, registrar: impl RouteRegistrar) -> Router {
    let router = registrar.attach(Router::new());
    let router = router
        .merge(health_routes())
        .route("/socket", get(socket_handler))
        // Terminal stage: catch-all for unmatched routes
        .fallback(not_found);

    let router = apply_pipeline(router, state.pipeline());
    router.with_state(state)
}

/// Initialize all dependencies and create `AppState`
///
/// # Errors
/// Fails if the first store connection attempt fails or if either fan-out
/// channel role cannot be established; both are fatal at startup.
pub async fn create_app_state(config: AppConfig) -> Result<AppState, GatewayError> {
    // Store watchdog: first attempt is fatal, reconnects are not
    info!("Connecting to store...");
    let store = StoreWatchdog::connect(
        StoreConfig::for_url(&config.database.url),
        WatchdogConfig::default(),
    )
    .await?;

    // Fan-out channel pair: an awaited precondition, not a background task
    info!("Establishing fan-out channel pair...");
    let fanout = Arc::new(FanOutAdapter::connect(FanOutConfig::from(&config.broker)).await?);

    let connections = ConnectionManager::new_shared();
    let transport = Arc::new(RealtimeTransport::new(connections, fanout));
    transport.start();

    Ok(AppState::new(config, store, transport))
}

/// Run the HTTP server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), GatewayError> {
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| GatewayError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway with configuration and a route registrar
pub async fn run(config: AppConfig, registrar: impl RouteRegistrar) -> Result<(), GatewayError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], SERVER_PORT));

    // Create app state (store watchdog + fan-out channel pair)
    let state = create_app_state(config).await?;

    // Build application
    let app = create_app(state, registrar);

    // Run server
    run_server(app, addr).await
}
