//! Versioned (de)serialization of the pending-state snapshot handed off
//! between processes.
//!
//! The wire shape is the `PendingLocalState` described in spec §6.3. The
//! compatibility contract is strict: a blob this crate produced must
//! always be accepted back, and an unrecognized entry tag is a hard
//! error rather than something silently skipped.

use crate::error::PendingOpError;
use crate::pending::entry::PendingEntry;
use serde::{Deserialize, Serialize};

const KNOWN_TAGS: &[&str] = &["message", "flushMode", "flush"];

/// The serialized form of everything still pending at the moment a host
/// process hands its session off to the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedPendingState {
    #[serde(rename = "clientId", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(rename = "pendingStates")]
    pub pending_states: Vec<PendingEntry>,
}

impl SerializedPendingState {
    /// Parse a blob, rejecting any entry whose `type` tag isn't one this
    /// version of the crate knows about *before* attempting a full
    /// typed deserialization, so the error names the offending tag
    /// rather than surfacing a generic serde message.
    pub fn from_json(bytes: &[u8]) -> Result<Self, PendingOpError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| PendingOpError::UnknownEntry { tag: format!("<invalid json: {e}>") })?;

        if let Some(entries) = value.get("pendingStates").and_then(|v| v.as_array()) {
            for entry in entries {
                let tag = entry.get("type").and_then(|t| t.as_str()).unwrap_or("<missing>");
                if !KNOWN_TAGS.contains(&tag) {
                    return Err(PendingOpError::UnknownEntry { tag: tag.to_string() });
                }
            }
        }

        serde_json::from_value(value)
            .map_err(|e| PendingOpError::UnknownEntry { tag: format!("<malformed entry: {e}>") })
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::entry::MessageEntry;
    use crate::runtime::FlushMode;

    fn sample() -> SerializedPendingState {
        SerializedPendingState {
            client_id: Some("C1".into()),
            pending_states: vec![
                PendingEntry::FlushModeChange { flush_mode: FlushMode::Manual },
                PendingEntry::Message(MessageEntry {
                    message_type: "op".into(),
                    client_sequence_number: 1,
                    reference_sequence_number: 0,
                    content: serde_json::json!("a"),
                    local_metadata: None,
                    op_metadata: None,
                }),
                PendingEntry::FlushMarker,
            ],
        }
    }

    #[test]
    fn round_trips_through_json() {
        let original = sample();
        let bytes = original.to_json().unwrap();
        let back = SerializedPendingState::from_json(&bytes).unwrap();
        assert_eq!(back.client_id, original.client_id);
        assert_eq!(back.pending_states, original.pending_states);
    }

    #[test]
    fn rejects_unknown_entry_tag() {
        let bytes = br#"{"clientId":"C1","pendingStates":[{"type":"bogus"}]}"#;
        let err = SerializedPendingState::from_json(bytes).unwrap_err();
        match err {
            PendingOpError::UnknownEntry { tag } => assert_eq!(tag, "bogus"),
            other => panic!("expected UnknownEntry, got {other:?}"),
        }
    }
}
