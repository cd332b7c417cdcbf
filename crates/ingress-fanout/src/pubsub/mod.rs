//! Broker publish/subscribe primitives.

mod publisher;
mod scope;
mod subscriber;

pub use publisher::{EventEnvelope, Publisher};
pub use scope::{Scope, BROADCAST_CHANNEL, ROOM_CHANNEL_PREFIX, USER_CHANNEL_PREFIX};
pub use subscriber::{
    ReceivedEvent, Subscriber, SubscriberConfig, SubscriberError, SubscriberResult,
};
