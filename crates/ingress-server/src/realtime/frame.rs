//! Wire frame for server-to-client events

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event frame delivered to real-time sessions
///
/// Sequence numbers are per-process and exist for client-side ordering
/// diagnostics; this layer attaches no further protocol semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    /// Event type name
    pub event: String,
    /// Per-process sequence number
    pub seq: u64,
    /// Event payload
    pub data: Value,
}

impl EventFrame {
    /// Create a new frame
    #[must_use]
    pub fn new(event: impl Into<String>, seq: u64, data: Value) -> Self {
        Self {
            event: event.into(),
            seq,
            data,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_serialization() {
        let frame = EventFrame::new("MESSAGE_CREATED", 3, serde_json::json!({"id": "1"}));
        let json = frame.to_json().unwrap();

        assert!(json.contains("MESSAGE_CREATED"));
        assert!(json.contains("\"seq\":3"));
    }
}
