//! Real-time transport
//!
//! Multiplexes events across the sessions held by this process and bridges
//! them through the fan-out adapter so sessions held by sibling processes
//! observe them too. Local delivery always happens before publication to
//! the broker; receipt from the broker triggers local delivery only and is
//! never re-published.

use super::{ConnectionManager, EventFrame};
use ingress_common::{component_span, GatewayResult};
use ingress_fanout::{FanOutAdapter, ReceivedEvent, Scope};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::Instrument;

/// Real-time transport for this process
pub struct RealtimeTransport {
    /// Sessions held by this process
    connections: Arc<ConnectionManager>,
    /// Fan-out channel pair against the shared broker
    fanout: Arc<FanOutAdapter>,
    /// Whether the relay task is running
    running: Arc<AtomicBool>,
    /// Sequence number for delivered frames
    sequence: AtomicU64,
}

impl RealtimeTransport {
    /// Create a new transport
    ///
    /// The fan-out adapter must already hold both channel roles; the
    /// transport never starts without them.
    #[must_use]
    pub fn new(connections: Arc<ConnectionManager>, fanout: Arc<FanOutAdapter>) -> Self {
        Self {
            connections,
            fanout,
            running: Arc::new(AtomicBool::new(false)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Get the connection manager
    #[must_use]
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Whether cross-process delivery is currently degraded to local-only
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.fanout.is_degraded()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start the relay task
    ///
    /// Spawns a background task that applies events arriving from sibling
    /// processes to the local delivery path.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Relay task is already running");
            return;
        }

        let transport = self.clone();
        tokio::spawn(
            async move {
                transport.relay().await;
            }
            .instrument(component_span("realtime-relay")),
        );

        tracing::info!("Real-time transport started");
    }

    /// Stop the relay task
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Real-time transport stopped");
    }

    /// Broadcast an event to a target scope, everywhere
    ///
    /// Delivers to locally-held sessions first, then publishes on the
    /// broker for sibling processes. A failed publication degrades this
    /// event to local-only delivery instead of failing the caller.
    pub async fn broadcast(&self, scope: &Scope, event: &str, data: serde_json::Value) -> usize {
        let frame = EventFrame::new(event, self.next_sequence(), data.clone());
        let delivered = self.deliver_local(scope, frame).await;

        if let Err(e) = self.fanout.publish(scope, event, data).await {
            tracing::warn!(
                error = %e,
                event = %event,
                "Broker publish failed, event delivered locally only"
            );
        }

        delivered
    }

    /// Bind a session to a user and start relaying that user's events
    pub async fn bind_user(&self, session_id: &str, user_id: &str) -> GatewayResult<bool> {
        if !self.connections.bind_user(session_id, user_id).await {
            return Ok(false);
        }

        self.fanout.watch(&Scope::user(user_id)).await?;
        Ok(true)
    }

    /// Subscribe a session to a room and start relaying that room's events
    pub async fn join_room(&self, session_id: &str, room: &str) -> GatewayResult<bool> {
        if !self.connections.join_room(session_id, room).await {
            return Ok(false);
        }

        self.fanout.watch(&Scope::room(room)).await?;
        Ok(true)
    }

    /// Unsubscribe a session from a room
    ///
    /// Stops relaying the room once no local session is left in it.
    pub async fn leave_room(&self, session_id: &str, room: &str) -> GatewayResult<bool> {
        if !self.connections.leave_room(session_id, room).await {
            return Ok(false);
        }

        if self.connections.room_session_count(room) == 0 {
            self.fanout.unwatch(&Scope::room(room)).await?;
        }
        Ok(true)
    }

    /// Tear down a disconnected session
    ///
    /// Releases the session's resources without affecting other sessions
    /// and stops relaying rooms that no longer have local members.
    pub async fn disconnect(&self, session_id: &str) -> GatewayResult<()> {
        let Some(connection) = self.connections.remove_connection(session_id).await else {
            return Ok(());
        };

        for room in connection.rooms().await {
            if self.connections.room_session_count(&room) == 0 {
                self.fanout.unwatch(&Scope::room(&room)).await?;
            }
        }

        Ok(())
    }

    /// Relay loop: apply broker receipts to the local delivery path
    async fn relay(&self) {
        let mut receiver = self.fanout.receiver();

        while self.running.load(Ordering::SeqCst) {
            match receiver.recv().await {
                Ok(received) => {
                    self.handle_received(received).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Relay lagged behind broker events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Relay channel closed");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Relay loop ended");
    }

    /// Handle one event received from the broker
    async fn handle_received(&self, received: ReceivedEvent) {
        let Some(envelope) = received.envelope else {
            tracing::debug!(scope = %received.scope, "Received non-envelope payload, ignoring");
            return;
        };

        // Our own events were already delivered locally before publication
        if envelope.origin == self.fanout.origin() {
            tracing::trace!(event = %envelope.event, "Skipping own envelope");
            return;
        }

        let frame = EventFrame::new(envelope.event, self.next_sequence(), envelope.data);
        let sent = self.deliver_local(&received.scope, frame).await;

        tracing::trace!(
            scope = %received.scope,
            origin = %envelope.origin,
            sent = sent,
            "Relayed event from sibling process"
        );
    }

    /// Deliver a frame to the local sessions matching a scope
    async fn deliver_local(&self, scope: &Scope, frame: EventFrame) -> usize {
        match scope {
            Scope::Room(room) => self.connections.send_to_room(room, frame).await,
            Scope::User(user_id) => self.connections.send_to_user(user_id, frame).await,
            Scope::Broadcast => self.connections.broadcast(frame).await,
            Scope::Custom(name) => {
                tracing::debug!(channel = %name, "Event on custom channel, ignoring");
                0
            }
        }
    }
}

impl std::fmt::Debug for RealtimeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeTransport")
            .field("connections", &self.connections.connection_count())
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
