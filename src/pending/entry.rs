//! The tagged-union entries that make up `pending` and `initial`.

use crate::runtime::FlushMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A submitted op awaiting ack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntry {
    pub message_type: String,
    pub client_sequence_number: u64,
    pub reference_sequence_number: u64,
    pub content: Value,
    #[serde(rename = "localOpMetadata")]
    pub local_metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_metadata: Option<Value>,
}

/// An entry in the pending (or initial) queue: a submitted op, a
/// flush-mode transition, or an explicit manual-flush boundary marker.
///
/// Internally tagged on `"type"` to match the wire shape in spec §6.3
/// exactly (`"message" | "flushMode" | "flush"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PendingEntry {
    #[serde(rename = "message")]
    Message(MessageEntry),
    #[serde(rename = "flushMode")]
    FlushModeChange {
        #[serde(rename = "flushMode")]
        flush_mode: FlushMode,
    },
    #[serde(rename = "flush")]
    FlushMarker,
}

impl PendingEntry {
    pub fn as_message(&self) -> Option<&MessageEntry> {
        match self {
            PendingEntry::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Name used in diagnostics when an ack arrives but the head of
    /// `pending` isn't the Message it's expected to be.
    pub fn kind(entry: Option<&PendingEntry>) -> &'static str {
        match entry {
            None => "<empty>",
            Some(PendingEntry::Message(_)) => "message",
            Some(PendingEntry::FlushModeChange { .. }) => "flushMode",
            Some(PendingEntry::FlushMarker) => "flush",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_entry_round_trips_through_json() {
        let entry = PendingEntry::Message(MessageEntry {
            message_type: "op".into(),
            client_sequence_number: 1,
            reference_sequence_number: 0,
            content: serde_json::json!({"k": "v"}),
            local_metadata: Some(serde_json::json!({"pending": true})),
            op_metadata: None,
        });
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"message\""));
        assert!(json.contains("\"localOpMetadata\""));
        let back: PendingEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn flush_mode_change_uses_lowercase_wire_values() {
        let entry = PendingEntry::FlushModeChange {
            flush_mode: FlushMode::Manual,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"type":"flushMode","flushMode":"manual"}"#);
    }

    #[test]
    fn flush_marker_serializes_with_bare_tag() {
        let json = serde_json::to_string(&PendingEntry::FlushMarker).unwrap();
        assert_eq!(json, r#"{"type":"flush"}"#);
    }
}
