//! Broker subscriber.
//!
//! Carries the subscribe role of the fan-out channel pair. The first
//! connection is established eagerly and awaited by the caller; later
//! losses degrade delivery to local-only until the channel is back.

use crate::pubsub::{EventEnvelope, Scope, BROADCAST_CHANNEL};
use futures_util::StreamExt;
use ingress_common::component_span;
use redis::Client;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::Instrument;

/// Error type for subscriber operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to parse event: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for subscriber operations
pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// Event received from the broker
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    /// Scope the event was received on
    pub scope: Scope,
    /// Parsed envelope (if valid JSON)
    pub envelope: Option<EventEnvelope>,
    /// Raw payload
    pub payload: String,
}

impl ReceivedEvent {
    /// Create from a raw broker message
    fn from_broker(channel_name: &str, payload: String) -> Self {
        let scope = Scope::parse(channel_name);
        let envelope = serde_json::from_str(&payload).ok();

        Self {
            scope,
            envelope,
            payload,
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Broker connection URL
    pub redis_url: String,
    /// Channel buffer size for broadcast
    pub broadcast_buffer: usize,
    /// Reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

/// Commands for subscription management
#[derive(Debug)]
enum SubscriberCommand {
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
    Shutdown,
}

/// Broker subscriber with a background listener task
pub struct Subscriber {
    /// Currently subscribed channels
    subscribed: Arc<RwLock<HashSet<String>>>,
    /// Broadcast sender for received events
    broadcast_tx: broadcast::Sender<ReceivedEvent>,
    /// Control channel for subscription management
    control_tx: mpsc::Sender<SubscriberCommand>,
    /// Set while the subscribe channel is down
    degraded: Arc<AtomicBool>,
}

impl Subscriber {
    /// Establish the subscribe channel and start the background listener
    ///
    /// The connection and the broadcast-channel subscription happen before
    /// this returns: a broker that cannot be reached fails startup here
    /// instead of being retried silently.
    pub async fn connect(config: SubscriberConfig) -> SubscriberResult<Self> {
        let client = Client::open(config.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(BROADCAST_CHANNEL).await?;

        tracing::info!("Subscriber connected to broker");

        let subscribed = Arc::new(RwLock::new(HashSet::from([BROADCAST_CHANNEL.to_string()])));
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer);
        let (control_tx, control_rx) = mpsc::channel(32);
        let degraded = Arc::new(AtomicBool::new(false));

        tokio::spawn(
            Self::listener_loop(
                client,
                pubsub,
                config,
                subscribed.clone(),
                broadcast_tx.clone(),
                control_rx,
                degraded.clone(),
            )
            .instrument(component_span("fanout-subscriber")),
        );

        Ok(Self {
            subscribed,
            broadcast_tx,
            control_tx,
            degraded,
        })
    }

    /// Background listener loop
    ///
    /// Runs the established connection until it drops, then reconnects with
    /// a fixed delay, re-subscribing to everything in the subscribed set.
    async fn listener_loop(
        client: Client,
        first: redis::aio::PubSub,
        config: SubscriberConfig,
        subscribed: Arc<RwLock<HashSet<String>>>,
        broadcast_tx: broadcast::Sender<ReceivedEvent>,
        mut control_rx: mpsc::Receiver<SubscriberCommand>,
        degraded: Arc<AtomicBool>,
    ) {
        let mut pubsub = Some(first);

        loop {
            let conn = match pubsub.take() {
                Some(conn) => conn,
                None => match Self::reestablish(&client, &subscribed).await {
                    Ok(conn) => {
                        degraded.store(false, Ordering::SeqCst);
                        tracing::info!("Subscriber reconnected to broker");
                        conn
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Subscriber reconnect attempt failed");
                        tokio::time::sleep(tokio::time::Duration::from_millis(
                            config.reconnect_delay_ms,
                        ))
                        .await;
                        continue;
                    }
                },
            };

            match Self::run_listener(conn, &subscribed, &broadcast_tx, &mut control_rx).await {
                Ok(true) => {
                    tracing::info!("Subscriber shutting down");
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Subscriber error");
                }
            }

            // Either channel role being down degrades the system to
            // single-process delivery; report it once per outage.
            if !degraded.swap(true, Ordering::SeqCst) {
                tracing::warn!("Broker subscription lost, event delivery degraded to local-only");
            }

            tokio::time::sleep(tokio::time::Duration::from_millis(config.reconnect_delay_ms))
                .await;
        }
    }

    /// Open a fresh pub/sub connection subscribed to the known channels
    async fn reestablish(
        client: &Client,
        subscribed: &Arc<RwLock<HashSet<String>>>,
    ) -> SubscriberResult<redis::aio::PubSub> {
        let mut pubsub = client.get_async_pubsub().await?;

        let channels = subscribed.read().await;
        for channel in channels.iter() {
            pubsub.subscribe(channel).await?;
        }

        Ok(pubsub)
    }

    /// Run the listener until the stream ends or shutdown is requested
    ///
    /// Returns Ok(true) on shutdown, Ok(false) when the connection dropped.
    async fn run_listener(
        mut pubsub: redis::aio::PubSub,
        subscribed: &Arc<RwLock<HashSet<String>>>,
        broadcast_tx: &broadcast::Sender<ReceivedEvent>,
        control_rx: &mut mpsc::Receiver<SubscriberCommand>,
    ) -> SubscriberResult<bool> {
        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                // Handle incoming events
                msg = stream.next() => {
                    match msg {
                        Some(msg) => {
                            let channel_name = msg.get_channel_name().to_string();
                            let payload: String = msg.get_payload().unwrap_or_default();

                            let received = ReceivedEvent::from_broker(&channel_name, payload);

                            // Broadcast to all receivers (ignore send errors - no receivers)
                            let _ = broadcast_tx.send(received);

                            tracing::trace!(
                                channel = %channel_name,
                                "Received broker event"
                            );
                        }
                        None => {
                            tracing::warn!("Broker message stream ended");
                            return Ok(false);
                        }
                    }
                }

                // Handle control commands
                cmd = control_rx.recv() => {
                    match cmd {
                        Some(SubscriberCommand::Subscribe(channels)) => {
                            // Need to drop stream to access pubsub
                            drop(stream);
                            for channel in &channels {
                                if let Err(e) = pubsub.subscribe(channel).await {
                                    tracing::error!(channel = %channel, error = %e, "Failed to subscribe");
                                } else {
                                    subscribed.write().await.insert(channel.clone());
                                    tracing::debug!(channel = %channel, "Subscribed to channel");
                                }
                            }
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::Unsubscribe(channels)) => {
                            drop(stream);
                            for channel in &channels {
                                if let Err(e) = pubsub.unsubscribe(channel).await {
                                    tracing::error!(channel = %channel, error = %e, "Failed to unsubscribe");
                                } else {
                                    subscribed.write().await.remove(channel);
                                    tracing::debug!(channel = %channel, "Unsubscribed from channel");
                                }
                            }
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::Shutdown) | None => {
                            return Ok(true);
                        }
                    }
                }
            }
        }
    }

    /// Subscribe to additional scopes
    pub async fn subscribe(&self, scopes: &[Scope]) -> SubscriberResult<()> {
        let channel_names: Vec<String> = scopes.iter().map(Scope::name).collect();

        self.control_tx
            .send(SubscriberCommand::Subscribe(channel_names))
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }

    /// Unsubscribe from scopes
    pub async fn unsubscribe(&self, scopes: &[Scope]) -> SubscriberResult<()> {
        let channel_names: Vec<String> = scopes.iter().map(Scope::name).collect();

        self.control_tx
            .send(SubscriberCommand::Unsubscribe(channel_names))
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }

    /// Get a receiver for events arriving from the broker
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Whether the subscribe channel is currently down
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Get currently subscribed channels
    pub async fn subscribed_channels(&self) -> Vec<String> {
        self.subscribed.read().await.iter().cloned().collect()
    }

    /// Shutdown the subscriber
    pub async fn shutdown(&self) -> SubscriberResult<()> {
        self.control_tx
            .send(SubscriberCommand::Shutdown)
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_received_event_parsing() {
        let payload = r#"{"origin":"proc-1","event":"TEST","data":{}}"#.to_string();
        let event = ReceivedEvent::from_broker("room:lobby", payload.clone());

        assert_eq!(event.scope, Scope::Room("lobby".to_string()));
        assert!(event.envelope.is_some());
        assert_eq!(event.envelope.unwrap().origin, "proc-1");
        assert_eq!(event.payload, payload);
    }

    #[test]
    fn test_received_event_invalid_json() {
        let event = ReceivedEvent::from_broker("user:42", "invalid".to_string());

        assert_eq!(event.scope, Scope::User("42".to_string()));
        assert!(event.envelope.is_none());
        assert_eq!(event.payload, "invalid");
    }

    #[test]
    fn test_subscriber_config_default() {
        let config = SubscriberConfig::default();
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.broadcast_buffer, 1024);
        assert_eq!(config.reconnect_delay_ms, 1000);
    }
}
