//! Connectivity watchdog - state machine and monitor task

mod machine;
mod watchdog;

pub use machine::{ConnectionEvent, ConnectionStatus};
pub use watchdog::{StoreWatchdog, WatchdogConfig};
