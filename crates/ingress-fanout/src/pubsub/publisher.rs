//! Broker publisher.
//!
//! Publishes event envelopes to broker channels so sibling processes can
//! relay them to their own locally-held sessions.

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::Scope;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// Envelope for events crossing process boundaries
///
/// `origin` identifies the publishing process instance so that receivers
/// can drop their own envelopes instead of delivering them twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Instance id of the publishing process
    pub origin: String,
    /// Event type name (e.g., "MESSAGE_CREATED")
    pub event: String,
    /// Event payload
    pub data: serde_json::Value,
}

impl EventEnvelope {
    /// Create a new envelope
    #[must_use]
    pub fn new(
        origin: impl Into<String>,
        event: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            origin: origin.into(),
            event: event.into(),
            data,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Broker publisher
#[derive(Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    /// Create a new publisher
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an envelope to a scope's channel
    ///
    /// Returns the number of broker-side receivers.
    pub async fn publish(&self, scope: &Scope, envelope: &EventEnvelope) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let channel_name = scope.name();
        let payload = envelope.to_json()?;

        let receivers: u32 = conn.publish(&channel_name, &payload).await?;

        tracing::debug!(
            channel = %channel_name,
            event = %envelope.event,
            receivers = receivers,
            "Published event"
        );

        Ok(receivers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_creation() {
        let data = serde_json::json!({"content": "Hello!"});
        let envelope = EventEnvelope::new("proc-1", "MESSAGE_CREATED", data.clone());

        assert_eq!(envelope.origin, "proc-1");
        assert_eq!(envelope.event, "MESSAGE_CREATED");
        assert_eq!(envelope.data, data);
    }

    #[test]
    fn test_envelope_serialization_round_trip() {
        let envelope = EventEnvelope::new(
            "proc-1",
            "TYPING_STARTED",
            serde_json::json!({"user": "42"}),
        );

        let json = envelope.to_json().unwrap();
        let parsed: EventEnvelope = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.origin, envelope.origin);
        assert_eq!(parsed.event, envelope.event);
        assert_eq!(parsed.data, envelope.data);
    }
}
