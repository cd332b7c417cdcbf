//! Target-scope channel definitions.
//!
//! Defines the broker channel naming conventions shared by every process.

/// Channel prefix for room-scoped events
pub const ROOM_CHANNEL_PREFIX: &str = "room:";
/// Channel prefix for user-scoped events
pub const USER_CHANNEL_PREFIX: &str = "user:";
/// Channel for broadcast events (all connected clients)
pub const BROADCAST_CHANNEL: &str = "broadcast";

/// Target scope of a real-time event
///
/// Ids are opaque strings at this layer; identity semantics belong to the
/// collaborators that assign them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Events for everyone in a room
    Room(String),
    /// Events for all sessions of one user
    User(String),
    /// Broadcast to all connected clients
    Broadcast,
    /// Custom channel name
    Custom(String),
}

impl Scope {
    /// Create a room scope
    #[must_use]
    pub fn room(room_id: impl Into<String>) -> Self {
        Self::Room(room_id.into())
    }

    /// Create a user scope
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User(user_id.into())
    }

    /// Create a broadcast scope
    #[must_use]
    pub fn broadcast() -> Self {
        Self::Broadcast
    }

    /// Create a custom scope
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the broker channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Room(id) => format!("{ROOM_CHANNEL_PREFIX}{id}"),
            Self::User(id) => format!("{USER_CHANNEL_PREFIX}{id}"),
            Self::Broadcast => BROADCAST_CHANNEL.to_string(),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a channel name back to a `Scope`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name == BROADCAST_CHANNEL {
            return Self::Broadcast;
        }

        if let Some(id) = name.strip_prefix(ROOM_CHANNEL_PREFIX) {
            return Self::Room(id.to_string());
        }

        if let Some(id) = name.strip_prefix(USER_CHANNEL_PREFIX) {
            return Self::User(id.to_string());
        }

        Self::Custom(name.to_string())
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_names() {
        assert_eq!(Scope::room("lobby").name(), "room:lobby");
        assert_eq!(Scope::user("42").name(), "user:42");
        assert_eq!(Scope::broadcast().name(), "broadcast");
        assert_eq!(Scope::custom("test").name(), "test");
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(Scope::parse("room:lobby"), Scope::Room("lobby".to_string()));
        assert_eq!(Scope::parse("user:42"), Scope::User("42".to_string()));
        assert_eq!(Scope::parse("broadcast"), Scope::Broadcast);
        assert_eq!(
            Scope::parse("unknown:123"),
            Scope::Custom("unknown:123".to_string())
        );
    }

    #[test]
    fn test_name_parse_round_trip() {
        for scope in [
            Scope::room("general"),
            Scope::user("7"),
            Scope::broadcast(),
        ] {
            assert_eq!(Scope::parse(&scope.name()), scope);
        }
    }
}
