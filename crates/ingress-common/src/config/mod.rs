//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, AuthConfig, BrokerConfig, ConfigError, CorsConfig, DatabaseConfig,
    Environment, SessionKeys,
};
