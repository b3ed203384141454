//! The narrow capability interface the pending-op state machine uses to
//! talk back to its host container.
//!
//! The core never owns its runtime: per the cyclic-reference design note,
//! callers pass `&mut dyn RuntimeHooks` into each method rather than the
//! state machine holding a strong reference back to whatever owns it.

use crate::error::PendingOpError;
use serde::{Deserialize, Serialize};

/// A submitted op's flush-mode framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushMode {
    #[default]
    Automatic,
    Manual,
}

/// The three-valued `metadata.batch` domain: `true`, `false`, or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub batch: Option<bool>,
}

/// Type tag the transport uses for chunked-op fragments. These are skipped
/// by `processAck` entirely: reassembly happens below this layer.
pub const CHUNKED_OP_TYPE: &str = "ChunkedOp";

/// The sequencer's echo of a submitted op, carrying the fields the core
/// inspects when matching an ack against the head of `pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub client_id: Option<String>,
    pub client_sequence_number: u64,
    pub sequence_number: u64,
    #[serde(default)]
    pub metadata: Option<BatchMetadata>,
}

/// The six hooks the core needs from its host: connection state, the
/// runtime's own flush mode, and the means to actually move bytes.
///
/// `rebase` (passed separately to the constructor, not part of this trait)
/// re-applies an op to a DDS's in-memory state without transmitting it;
/// this trait covers everything that *does* touch the wire or the host's
/// own bookkeeping.
pub trait RuntimeHooks {
    /// Whether the transport currently has a live connection.
    fn connected(&self) -> bool;

    /// The clientId assigned by the current (or most recent) connection.
    fn client_id(&self) -> Option<String>;

    /// The flush mode the runtime is currently operating under.
    fn flush_mode(&self) -> FlushMode;

    /// Switch the runtime's flush mode.
    fn set_flush_mode(&mut self, mode: FlushMode);

    /// Force a manual flush of anything batched so far.
    fn flush(&mut self);

    /// Hand an op back to the transport as if newly submitted. Per §5,
    /// this pushes into an outbound queue and returns without awaiting.
    ///
    /// Returns the clientSequenceNumber the current session assigns this
    /// resubmission. A reconnect gets a fresh session and a fresh CSN
    /// space (glossary: CSN is unique within a client session), so the
    /// stale CSN the op was originally tracked under cannot be reused —
    /// the caller re-enqueues the replayed entry under the number
    /// returned here, not the one it was submitted with originally.
    fn resubmit(
        &mut self,
        message_type: &str,
        content: serde_json::Value,
        local_metadata: Option<serde_json::Value>,
        op_metadata: Option<serde_json::Value>,
    ) -> u64;

    /// Tear the container down. After this call, no further method on the
    /// owning state machine may be invoked.
    fn close(&mut self, error: PendingOpError);
}
