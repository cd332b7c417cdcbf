//! Tracing setup and component attribution

mod tracing_setup;

pub use tracing_setup::{
    component_span, init_tracing, init_tracing_with_config, try_init_tracing,
    try_init_tracing_with_config, TracingConfig, TracingError,
};
