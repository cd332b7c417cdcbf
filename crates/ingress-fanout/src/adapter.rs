//! Cross-process fan-out adapter
//!
//! Bridges the real-time transports of independent processes through the
//! shared broker. Both channel roles - publish and subscribe - must be
//! established before the transport may accept any client connection.

use ingress_common::{BrokerConfig, GatewayError};
use tokio::sync::broadcast;

use crate::pool::{RedisPool, RedisPoolConfig, RedisResult};
use crate::pubsub::{
    EventEnvelope, Publisher, ReceivedEvent, Scope, Subscriber, SubscriberConfig,
};

/// Fan-out adapter configuration
#[derive(Debug, Clone)]
pub struct FanOutConfig {
    /// Broker connection URL
    pub url: String,
    /// Buffer size for the received-event channel
    pub broadcast_buffer: usize,
    /// Reconnection delay for the subscribe role, in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

impl From<&BrokerConfig> for FanOutConfig {
    fn from(config: &BrokerConfig) -> Self {
        Self {
            url: config.url.clone(),
            ..Default::default()
        }
    }
}

/// The fan-out channel pair against the shared broker
///
/// Owns both roles. The publish role rides the pooled connection; the
/// subscribe role is a dedicated pub/sub connection. Either role going
/// down after startup degrades delivery to local-only (reported, never
/// silent); failing to establish either at startup is an error the
/// transport must treat as fatal.
pub struct FanOutAdapter {
    /// Instance id stamped on every published envelope
    origin: String,
    publisher: Publisher,
    subscriber: Subscriber,
}

impl FanOutAdapter {
    /// Establish both channel roles against the broker
    ///
    /// # Errors
    /// Returns an error if either role cannot be established; transport
    /// startup must fail rather than silently continue.
    pub async fn connect(config: FanOutConfig) -> Result<Self, GatewayError> {
        // Publish role: pooled connection, verified with a ping
        let pool = RedisPool::new(RedisPoolConfig {
            url: config.url.clone(),
            ..Default::default()
        })
        .map_err(|e| GatewayError::Broker(format!("publish channel: {e}")))?;

        pool.health_check()
            .await
            .map_err(|e| GatewayError::Broker(format!("publish channel: {e}")))?;

        // Subscribe role: dedicated connection, awaited
        let subscriber = Subscriber::connect(SubscriberConfig {
            redis_url: config.url,
            broadcast_buffer: config.broadcast_buffer,
            reconnect_delay_ms: config.reconnect_delay_ms,
        })
        .await
        .map_err(|e| GatewayError::Broker(format!("subscribe channel: {e}")))?;

        let origin = uuid::Uuid::new_v4().to_string();

        tracing::info!(origin = %origin, "Fan-out channel pair established");

        Ok(Self {
            origin,
            publisher: Publisher::new(pool),
            subscriber,
        })
    }

    /// Instance id of this process
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Publish an event so sibling processes relay it to their sessions
    ///
    /// The envelope is stamped with this process's origin id; receivers
    /// drop their own envelopes, so publication never loops back into a
    /// second local delivery.
    pub async fn publish(
        &self,
        scope: &Scope,
        event: &str,
        data: serde_json::Value,
    ) -> RedisResult<u32> {
        let envelope = EventEnvelope::new(self.origin.clone(), event, data);
        self.publisher.publish(scope, &envelope).await
    }

    /// Get a receiver for events published by sibling processes
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedEvent> {
        self.subscriber.receiver()
    }

    /// Start relaying a scope's events from the broker
    pub async fn watch(&self, scope: &Scope) -> Result<(), GatewayError> {
        self.subscriber
            .subscribe(std::slice::from_ref(scope))
            .await
            .map_err(|e| GatewayError::Broker(e.to_string()))
    }

    /// Stop relaying a scope's events
    pub async fn unwatch(&self, scope: &Scope) -> Result<(), GatewayError> {
        self.subscriber
            .unsubscribe(std::slice::from_ref(scope))
            .await
            .map_err(|e| GatewayError::Broker(e.to_string()))
    }

    /// Whether delivery is currently degraded to local-only
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.subscriber.is_degraded()
    }

    /// Shut down the subscribe role
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        self.subscriber
            .shutdown()
            .await
            .map_err(|e| GatewayError::Broker(e.to_string()))
    }
}

impl std::fmt::Debug for FanOutAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutAdapter")
            .field("origin", &self.origin)
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_broker_settings() {
        let broker = BrokerConfig {
            url: "redis://broker:6379".to_string(),
        };
        let config = FanOutConfig::from(&broker);

        assert_eq!(config.url, "redis://broker:6379");
        assert_eq!(config.broadcast_buffer, 1024);
        assert_eq!(config.reconnect_delay_ms, 1000);
    }
}
