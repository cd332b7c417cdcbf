//! Connectivity state machine
//!
//! The transition table is the single source of truth for the watchdog's
//! behavior and is testable without any real network.

/// Connectivity status of the durable store handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Events observed by the watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection attempt was started
    AttemptStarted,
    /// The attempt succeeded and a live handle exists
    Established,
    /// The transport reported loss of connectivity (or the attempt failed)
    Lost,
}

impl ConnectionStatus {
    /// Apply an event and return the next status
    ///
    /// There is no terminal failure state while the process is running:
    /// every loss is followed by another attempt.
    #[must_use]
    pub fn apply(self, event: ConnectionEvent) -> Self {
        match (self, event) {
            (_, ConnectionEvent::AttemptStarted) => Self::Connecting,
            (Self::Connecting, ConnectionEvent::Established) => Self::Connected,
            (_, ConnectionEvent::Lost) => Self::Disconnected,
            // Established only means something while an attempt is in flight
            (current, ConnectionEvent::Established) => current,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
