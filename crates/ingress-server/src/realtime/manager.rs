//! Connection manager
//!
//! Manages all real-time sessions held by this process using DashMap for
//! thread-safe access. Tearing one session down never touches the others.

use super::{Connection, EventFrame};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Manages all real-time sessions of this process
pub struct ConnectionManager {
    /// Active sessions by session ID
    connections: DashMap<String, Arc<Connection>>,

    /// User ID to session IDs mapping
    user_sessions: DashMap<String, HashSet<String>>,

    /// Room to session IDs mapping
    room_sessions: DashMap<String, HashSet<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_sessions: DashMap::new(),
            room_sessions: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new session
    pub fn add_connection(
        &self,
        session_id: String,
        sender: mpsc::Sender<EventFrame>,
    ) -> Arc<Connection> {
        let connection = Connection::new(session_id.clone(), sender);
        self.connections.insert(session_id.clone(), connection.clone());

        tracing::debug!(session_id = %session_id, "Session added");

        connection
    }

    /// Remove a session and release its resources
    ///
    /// Uses `alter`/`retain` for atomic modify-and-cleanup to avoid TOCTOU
    /// races with concurrent joins.
    pub async fn remove_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        let (_, connection) = self.connections.remove(session_id)?;

        if let Some(user_id) = connection.user_id().await {
            self.user_sessions.alter(&user_id, |_, mut sessions| {
                sessions.remove(session_id);
                sessions
            });
            self.user_sessions.retain(|_, sessions| !sessions.is_empty());
        }

        for room in connection.rooms().await {
            self.room_sessions.alter(&room, |_, mut sessions| {
                sessions.remove(session_id);
                sessions
            });
        }
        self.room_sessions.retain(|_, sessions| !sessions.is_empty());

        tracing::debug!(session_id = %session_id, "Session removed");

        Some(connection)
    }

    /// Get a session by ID
    pub fn get_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| r.clone())
    }

    /// Bind a session to a user
    pub async fn bind_user(&self, session_id: &str, user_id: &str) -> bool {
        if let Some(connection) = self.get_connection(session_id) {
            connection.set_user_id(user_id.to_string()).await;

            self.user_sessions
                .entry(user_id.to_string())
                .or_default()
                .insert(session_id.to_string());

            tracing::debug!(session_id = %session_id, user_id = %user_id, "Session bound to user");
            true
        } else {
            false
        }
    }

    /// Subscribe a session to a room
    pub async fn join_room(&self, session_id: &str, room: &str) -> bool {
        if let Some(connection) = self.get_connection(session_id) {
            connection.join_room(room.to_string()).await;

            self.room_sessions
                .entry(room.to_string())
                .or_default()
                .insert(session_id.to_string());

            tracing::trace!(session_id = %session_id, room = %room, "Session joined room");
            true
        } else {
            false
        }
    }

    /// Unsubscribe a session from a room
    pub async fn leave_room(&self, session_id: &str, room: &str) -> bool {
        if let Some(connection) = self.get_connection(session_id) {
            connection.leave_room(room).await;

            self.room_sessions.alter(room, |_, mut sessions| {
                sessions.remove(session_id);
                sessions
            });
            self.room_sessions.retain(|_, sessions| !sessions.is_empty());

            tracing::trace!(session_id = %session_id, room = %room, "Session left room");
            true
        } else {
            false
        }
    }

    /// Number of local sessions in a room
    #[must_use]
    pub fn room_session_count(&self, room: &str) -> usize {
        self.room_sessions.get(room).map_or(0, |s| s.len())
    }

    /// Get all sessions of a user
    pub fn user_connections(&self, user_id: &str) -> Vec<Arc<Connection>> {
        self.user_sessions
            .get(user_id)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get all sessions in a room
    pub fn room_connections(&self, room: &str) -> Vec<Arc<Connection>> {
        self.room_sessions
            .get(room)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deliver a frame to all sessions of a user
    pub async fn send_to_user(&self, user_id: &str, frame: EventFrame) -> usize {
        let connections = self.user_connections(user_id);
        let mut sent = 0;

        for conn in connections {
            if conn.send(frame.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(user_id = %user_id, sent = sent, "Frame sent to user sessions");

        sent
    }

    /// Deliver a frame to all sessions in a room
    pub async fn send_to_room(&self, room: &str, frame: EventFrame) -> usize {
        let connections = self.room_connections(room);
        let mut sent = 0;

        for conn in connections {
            if conn.send(frame.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(room = %room, sent = sent, "Frame sent to room sessions");

        sent
    }

    /// Deliver a frame to every session
    pub async fn broadcast(&self, frame: EventFrame) -> usize {
        let connections: Vec<Arc<Connection>> =
            self.connections.iter().map(|r| r.clone()).collect();
        let mut sent = 0;

        for conn in connections {
            if conn.send(frame.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(sent = sent, "Frame broadcast to all sessions");

        sent
    }

    /// Number of active sessions
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> EventFrame {
        EventFrame::new("TEST", 1, serde_json::json!({}))
    }

    fn add_session(manager: &ConnectionManager, id: &str) -> mpsc::Receiver<EventFrame> {
        let (tx, rx) = mpsc::channel(8);
        manager.add_connection(id.to_string(), tx);
        rx
    }

    #[tokio::test]
    async fn test_add_and_remove_connection() {
        let manager = ConnectionManager::new();
        let _rx = add_session(&manager, "s1");

        assert_eq!(manager.connection_count(), 1);
        assert!(manager.get_connection("s1").is_some());

        manager.remove_connection("s1").await;
        assert_eq!(manager.connection_count(), 0);
        assert!(manager.get_connection("s1").is_none());
    }

    #[tokio::test]
    async fn test_room_delivery_reaches_members_only() {
        let manager = ConnectionManager::new();
        let mut rx1 = add_session(&manager, "s1");
        let mut rx2 = add_session(&manager, "s2");

        manager.join_room("s1", "lobby").await;

        let sent = manager.send_to_room("lobby", frame()).await;
        assert_eq!(sent, 1);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_user_delivery_reaches_all_their_sessions() {
        let manager = ConnectionManager::new();
        let mut rx1 = add_session(&manager, "s1");
        let mut rx2 = add_session(&manager, "s2");

        manager.bind_user("s1", "42").await;
        manager.bind_user("s2", "42").await;

        let sent = manager.send_to_user("42", frame()).await;
        assert_eq!(sent, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let manager = ConnectionManager::new();
        let mut rx1 = add_session(&manager, "s1");
        let mut rx2 = add_session(&manager, "s2");

        let sent = manager.broadcast(frame()).await;
        assert_eq!(sent, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_removing_one_session_leaves_others_untouched() {
        let manager = ConnectionManager::new();
        let _rx1 = add_session(&manager, "s1");
        let mut rx2 = add_session(&manager, "s2");

        manager.join_room("s1", "lobby").await;
        manager.join_room("s2", "lobby").await;

        manager.remove_connection("s1").await;

        assert_eq!(manager.room_session_count("lobby"), 1);
        let sent = manager.send_to_room("lobby", frame()).await;
        assert_eq!(sent, 1);
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_empty_room_mapping_is_cleaned_up() {
        let manager = ConnectionManager::new();
        let _rx = add_session(&manager, "s1");

        manager.join_room("s1", "lobby").await;
        manager.leave_room("s1", "lobby").await;

        assert_eq!(manager.room_session_count("lobby"), 0);
    }
}
