//! # ingress-store
//!
//! Durable-store connectivity: the PostgreSQL pool and the watchdog that
//! establishes it at startup and perpetually re-establishes it on loss.
//!
//! ## Overview
//!
//! - First connection attempt is fatal on failure (misconfiguration)
//! - Any later loss re-enters the reconnect loop, indefinitely
//! - The live handle is replaced atomically, never mutated in place
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ingress_store::{StoreConfig, StoreWatchdog, WatchdogConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store_config = StoreConfig::for_url("postgresql://localhost/chat_ingress");
//!     let watchdog = StoreWatchdog::connect(store_config, WatchdogConfig::default()).await?;
//!
//!     if let Some(pool) = watchdog.pool() {
//!         // Hand the pool to request-handling activity...
//!     }
//!     Ok(())
//! }
//! ```

pub mod pool;
pub mod watchdog;

// Re-export commonly used types
pub use pool::{create_pool, ping, PgPool, StoreConfig};
pub use watchdog::{ConnectionEvent, ConnectionStatus, StoreWatchdog, WatchdogConfig};
