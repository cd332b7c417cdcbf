//! Application state
//!
//! Holds the shared state for the Axum application: validated
//! configuration, the pipeline context, the store watchdog handle, and
//! the real-time transport.

use std::sync::Arc;

use ingress_common::{AppConfig, Environment, SessionCodec};
use ingress_store::StoreWatchdog;

use crate::pipeline::PipelineContext;
use crate::realtime::RealtimeTransport;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Validated application configuration
    config: Arc<AppConfig>,
    /// State shared by the pipeline stages
    pipeline: PipelineContext,
    /// Durable-store connectivity watchdog
    store: Arc<StoreWatchdog>,
    /// Real-time transport of this process
    transport: Arc<RealtimeTransport>,
}

impl AppState {
    /// Create a new `AppState`
    pub fn new(
        config: AppConfig,
        store: Arc<StoreWatchdog>,
        transport: Arc<RealtimeTransport>,
    ) -> Self {
        let pipeline = PipelineContext::new(&config);

        Self {
            config: Arc::new(config),
            pipeline,
            store,
            transport,
        }
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the pipeline context
    pub fn pipeline(&self) -> &PipelineContext {
        &self.pipeline
    }

    /// Get the session credential codec
    pub fn session_codec(&self) -> &SessionCodec {
        &self.pipeline.codec
    }

    /// Get the runtime environment
    pub fn environment(&self) -> Environment {
        self.pipeline.environment
    }

    /// Get the store watchdog
    pub fn store(&self) -> &StoreWatchdog {
        &self.store
    }

    /// Get the real-time transport
    pub fn transport(&self) -> &Arc<RealtimeTransport> {
        &self.transport
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
