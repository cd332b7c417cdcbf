//! # ingress-server
//!
//! The network ingress layer: HTTP + WebSocket on a single listener, the
//! ordered request pipeline, the error boundary, and the real-time
//! transport with cross-process fan-out.

pub mod handlers;
pub mod pipeline;
pub mod realtime;
pub mod registrar;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use registrar::{no_routes, RouteRegistrar};
pub use server::{create_app, create_app_state, run, run_server, SERVER_PORT};
pub use state::AppState;
