//! # ingress-fanout
//!
//! Cross-process real-time event fan-out over the shared Redis broker.
//!
//! ## Overview
//!
//! An event raised on one process must reach sessions held by every other
//! process. Each process owns a fan-out channel pair:
//!
//! - **Publish role**: pooled connection used to publish event envelopes
//! - **Subscribe role**: dedicated pub/sub connection relaying envelopes in
//!
//! Both roles are established before the real-time transport accepts any
//! traffic. Envelopes carry the publishing process's origin id so that a
//! process never re-delivers its own events.
//!
//! ## Example
//!
//! ```ignore
//! use ingress_fanout::{FanOutAdapter, FanOutConfig, Scope};
//!
//! let adapter = FanOutAdapter::connect(FanOutConfig::default()).await?;
//!
//! // Publish an event for everyone in a room
//! adapter.publish(&Scope::room("lobby"), "MESSAGE_CREATED", data).await?;
//!
//! // Relay events arriving from sibling processes
//! let mut rx = adapter.receiver();
//! while let Ok(received) = rx.recv().await {
//!     // deliver locally...
//! }
//! ```

pub mod adapter;
pub mod pool;
pub mod pubsub;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export pubsub types
pub use pubsub::{
    EventEnvelope, Publisher, ReceivedEvent, Scope, Subscriber, SubscriberConfig, SubscriberError,
    SubscriberResult, BROADCAST_CHANNEL, ROOM_CHANNEL_PREFIX, USER_CHANNEL_PREFIX,
};

// Re-export the adapter
pub use adapter::{FanOutAdapter, FanOutConfig};
