//! Real-time transport - sessions, local delivery, cross-process relay

mod connection;
mod frame;
mod handler;
mod manager;
mod transport;

pub use connection::Connection;
pub use frame::EventFrame;
pub use handler::socket_handler;
pub use manager::ConnectionManager;
pub use transport::RealtimeTransport;
