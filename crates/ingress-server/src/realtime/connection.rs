//! A single real-time session
//!
//! One open duplex channel per connected client. The session has no
//! identity beyond the channel itself at this layer; user binding and room
//! membership are attached by collaborator logic.

use super::EventFrame;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// A connected real-time session
pub struct Connection {
    /// Session ID (UUID)
    session_id: String,
    /// Sender for outgoing frames
    sender: mpsc::Sender<EventFrame>,
    /// User bound to this session, if any
    user_id: RwLock<Option<String>>,
    /// Rooms this session is subscribed to
    rooms: RwLock<HashSet<String>>,
}

impl Connection {
    /// Create a new connection
    #[must_use]
    pub fn new(session_id: String, sender: mpsc::Sender<EventFrame>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            sender,
            user_id: RwLock::new(None),
            rooms: RwLock::new(HashSet::new()),
        })
    }

    /// Get the session ID
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Queue a frame for delivery to this session
    pub async fn send(&self, frame: EventFrame) -> Result<(), mpsc::error::SendError<EventFrame>> {
        self.sender.send(frame).await
    }

    /// Get the bound user, if any
    pub async fn user_id(&self) -> Option<String> {
        self.user_id.read().await.clone()
    }

    /// Bind a user to this session
    pub async fn set_user_id(&self, user_id: String) {
        *self.user_id.write().await = Some(user_id);
    }

    /// Get the rooms this session is subscribed to
    pub async fn rooms(&self) -> Vec<String> {
        self.rooms.read().await.iter().cloned().collect()
    }

    pub(super) async fn join_room(&self, room: String) {
        self.rooms.write().await.insert(room);
    }

    pub(super) async fn leave_room(&self, room: &str) {
        self.rooms.write().await.remove(room);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_queues_frame() {
        let (tx, mut rx) = mpsc::channel(4);
        let connection = Connection::new("s1".to_string(), tx);

        let frame = EventFrame::new("TEST", 1, serde_json::json!({}));
        connection.send(frame).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, "TEST");
        assert_eq!(received.seq, 1);
    }

    #[tokio::test]
    async fn test_user_binding() {
        let (tx, _rx) = mpsc::channel(1);
        let connection = Connection::new("s1".to_string(), tx);

        assert_eq!(connection.user_id().await, None);
        connection.set_user_id("42".to_string()).await;
        assert_eq!(connection.user_id().await, Some("42".to_string()));
    }

    #[tokio::test]
    async fn test_room_membership() {
        let (tx, _rx) = mpsc::channel(1);
        let connection = Connection::new("s1".to_string(), tx);

        connection.join_room("lobby".to_string()).await;
        assert_eq!(connection.rooms().await, vec!["lobby".to_string()]);

        connection.leave_room("lobby").await;
        assert!(connection.rooms().await.is_empty());
    }
}
