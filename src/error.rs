//! Error taxonomy for the pending-op state machine.
//!
//! Every variant here indicates a divergence between what this client
//! believes it sent and what the sequencer is echoing back. There is no
//! recovery path at this layer: the policy is container close, not retry.

use thiserror::Error;

/// Errors raised by the pending-op state machine.
///
/// All variants are fatal to the enclosing session: the caller is expected
/// to invoke [`crate::runtime::RuntimeHooks::close`] and tear the container
/// down rather than attempt to continue driving this state machine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PendingOpError {
    /// An ack did not match the head of the pending queue.
    #[error(
        "data corruption: client {client_id:?} sequenceNumber={sequence_number} \
         clientSequenceNumber={client_sequence_number} expected={expected_client_sequence_number}"
    )]
    DataCorruption {
        client_id: Option<String>,
        sequence_number: u64,
        client_sequence_number: u64,
        expected_client_sequence_number: u64,
    },

    /// An ack arrived whose head of `pending` was not a Message entry.
    #[error("data corruption: expected a message at the head of pending, found {found}")]
    UnexpectedHead { found: &'static str },

    /// Batch-begin/end metadata did not match the expected shape.
    #[error("data corruption: malformed batch metadata ({reason})")]
    MalformedBatchMetadata { reason: String },

    /// `initial` contains ops whose reference sequence number is older than
    /// the ack we're trying to rebase against — the snapshot was computed
    /// against a baseline that's already been superseded.
    #[error(
        "snapshot too recent to rebase pending initial ops: ack sequenceNumber={ack_sequence_number} \
         > leading referenceSequenceNumber={reference_sequence_number}"
    )]
    RebaseTooOld {
        ack_sequence_number: u64,
        reference_sequence_number: u64,
    },

    /// `replayOnReconnect` was invoked twice for the same clientId.
    #[error("replayOnReconnect called twice for clientId {client_id:?}")]
    DoubleReplay { client_id: Option<String> },

    /// A serialized blob contained an entry tag this version doesn't know.
    #[error("unknown pending-state entry tag: {tag}")]
    UnknownEntry { tag: String },
}
