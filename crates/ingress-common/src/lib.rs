//! # ingress-common
//!
//! Shared utilities including configuration, error handling, the session
//! credential codec, and telemetry.

pub mod config;
pub mod error;
pub mod session;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    AppConfig, AppSettings, AuthConfig, BrokerConfig, ConfigError, CorsConfig, DatabaseConfig,
    Environment, SessionKeys,
};
pub use error::{ErrorResponse, GatewayError, GatewayResult};
pub use session::{SessionClaims, SessionCodec, SESSION_COOKIE_NAME, SESSION_MAX_AGE_SECS};
pub use telemetry::{
    component_span, init_tracing, init_tracing_with_config, try_init_tracing,
    try_init_tracing_with_config, TracingConfig, TracingError,
};
