//! The Pending Op State Machine: the per-client subsystem that tracks
//! locally submitted, not-yet-acknowledged operations, preserves batch
//! framing across reconnects, validates ack ordering, and replays
//! unacked work on reconnect or after rehydrating from a snapshot.

use std::collections::VecDeque;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::PendingOpError;
use crate::pending::batch::BatchTracker;
use crate::pending::entry::{MessageEntry, PendingEntry};
use crate::pending::serialize::SerializedPendingState;
use crate::runtime::{CHUNKED_OP_TYPE, FlushMode, RuntimeHooks, SequencedMessage};

/// A closure that re-applies an op to the owning DDS's in-memory state
/// without transmitting it. Synchronous from the state machine's point
/// of view (§4.3).
pub type Rebaser = Box<dyn FnMut(&Value, &Option<Value>)>;

/// The result of processing an ack: whether it was claimed as a local
/// ack, and the `localMetadata` the DDS stashed when the op was
/// originally submitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AckOutcome {
    pub local_ack: bool,
    pub local_metadata: Option<Value>,
}

impl AckOutcome {
    fn none() -> Self {
        Self::default()
    }
}

pub struct PendingStateManager {
    runtime: Box<dyn RuntimeHooks>,
    rebase: Rebaser,

    pending: VecDeque<PendingEntry>,
    initial: VecDeque<PendingEntry>,
    initial_client_id: Option<String>,
    initial_leading_csn: Option<u64>,

    pending_message_count: usize,
    batch: BatchTracker,
    session_client_id: Option<String>,
    flush_mode: FlushMode,
}

impl PendingStateManager {
    pub fn new(
        runtime: Box<dyn RuntimeHooks>,
        rebase: Rebaser,
        initial_state: Option<SerializedPendingState>,
    ) -> Self {
        let (initial, initial_client_id, initial_leading_csn) = match initial_state {
            Some(state) => {
                let leading_csn = state
                    .pending_states
                    .iter()
                    .find_map(|e| e.as_message().map(|m| m.client_sequence_number));
                (
                    state.pending_states.into_iter().collect::<VecDeque<_>>(),
                    state.client_id,
                    leading_csn,
                )
            }
            None => (VecDeque::new(), None, None),
        };

        Self {
            runtime,
            rebase,
            pending: VecDeque::new(),
            initial,
            initial_client_id,
            initial_leading_csn,
            pending_message_count: 0,
            batch: BatchTracker::default(),
            session_client_id: None,
            flush_mode: FlushMode::Automatic,
        }
    }

    pub fn pending_message_count(&self) -> usize {
        self.pending_message_count
    }

    pub fn is_pending_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// §4.1.1
    pub fn on_submit(
        &mut self,
        message_type: impl Into<String>,
        client_sequence_number: u64,
        reference_sequence_number: u64,
        content: Value,
        local_metadata: Option<Value>,
        op_metadata: Option<Value>,
    ) {
        let message_type = message_type.into();
        debug!(
            csn = client_sequence_number,
            rsn = reference_sequence_number,
            %message_type,
            "tracking submitted op"
        );
        self.pending.push_back(PendingEntry::Message(MessageEntry {
            message_type,
            client_sequence_number,
            reference_sequence_number,
            content,
            local_metadata,
            op_metadata,
        }));
        self.pending_message_count += 1;
    }

    /// §4.1.2
    pub fn on_flush_mode_changed(&mut self, mode: FlushMode) {
        match mode {
            FlushMode::Automatic => match self.pending.back() {
                Some(PendingEntry::FlushMarker) => {
                    self.pending.pop_back();
                    self.pending
                        .push_back(PendingEntry::FlushModeChange { flush_mode: FlushMode::Automatic });
                }
                Some(PendingEntry::FlushModeChange { flush_mode: FlushMode::Manual }) => {
                    self.pending.pop_back();
                }
                _ => {
                    self.pending.push_back(PendingEntry::FlushModeChange { flush_mode: mode });
                }
            },
            FlushMode::Manual => {
                self.pending.push_back(PendingEntry::FlushModeChange { flush_mode: mode });
            }
        }
        self.flush_mode = mode;
    }

    /// §4.1.3
    pub fn on_flush(&mut self) {
        if self.flush_mode == FlushMode::Automatic {
            return;
        }
        if matches!(self.pending.back(), Some(PendingEntry::Message(_))) {
            self.pending.push_back(PendingEntry::FlushMarker);
        }
    }

    /// §4.1.4
    pub fn process_ack(
        &mut self,
        message: &SequencedMessage,
        is_local: bool,
    ) -> Result<AckOutcome, PendingOpError> {
        if message.message_type == CHUNKED_OP_TYPE {
            return Ok(AckOutcome::none());
        }
        if is_local {
            self.process_local_ack(message)
        } else {
            self.process_remote_ack(message)
        }
    }

    /// §4.1.5
    fn process_local_ack(&mut self, ack: &SequencedMessage) -> Result<AckOutcome, PendingOpError> {
        let should_enter_batch = match self.pending.front() {
            Some(PendingEntry::FlushMarker) => true,
            Some(PendingEntry::FlushModeChange { flush_mode }) => {
                debug_assert_eq!(*flush_mode, FlushMode::Manual);
                true
            }
            _ => false,
        };
        if should_enter_batch {
            self.pending.pop_front();
            self.batch.enter(ack.clone());
        }

        let popped = match self.pending.pop_front() {
            Some(PendingEntry::Message(m)) => m,
            other => {
                let found = PendingEntry::kind(other.as_ref());
                return Err(self.close(PendingOpError::UnexpectedHead { found }));
            }
        };

        if popped.client_sequence_number != ack.client_sequence_number {
            return Err(self.close(PendingOpError::DataCorruption {
                client_id: ack.client_id.clone(),
                sequence_number: ack.sequence_number,
                client_sequence_number: ack.client_sequence_number,
                expected_client_sequence_number: popped.client_sequence_number,
            }));
        }

        self.pending_message_count -= 1;

        if self.batch.in_batch() {
            let boundary = match self.pending.front() {
                Some(PendingEntry::FlushModeChange { flush_mode }) => {
                    debug_assert_eq!(*flush_mode, FlushMode::Automatic);
                    self.pending.pop_front();
                    true
                }
                Some(PendingEntry::FlushMarker) => true,
                _ => false,
            };
            if boundary {
                if let Err(reason) = self.batch.verify_close(ack) {
                    return Err(self.close(PendingOpError::MalformedBatchMetadata { reason }));
                }
                self.batch.exit();
                debug!(csn = ack.client_sequence_number, "batch closed");
            }
        }

        Ok(AckOutcome { local_ack: true, local_metadata: popped.local_metadata })
    }

    /// §4.1.6
    fn process_remote_ack(&mut self, ack: &SequencedMessage) -> Result<AckOutcome, PendingOpError> {
        loop {
            let should_drain = match self.initial.front() {
                Some(PendingEntry::Message(m)) => m.reference_sequence_number <= ack.sequence_number,
                Some(_) => true,
                None => false,
            };
            if !should_drain {
                break;
            }

            let head = self.initial.pop_front().expect("checked above");
            if let PendingEntry::Message(m) = &head {
                if Some(m.client_sequence_number) == self.initial_leading_csn
                    && ack.sequence_number > m.reference_sequence_number
                {
                    return Err(self.close(PendingOpError::RebaseTooOld {
                        ack_sequence_number: ack.sequence_number,
                        reference_sequence_number: m.reference_sequence_number,
                    }));
                }
                (self.rebase)(&m.content, &m.local_metadata);
                self.pending_message_count += 1;
            }
            self.pending.push_back(head);
        }

        let claims_prior_session = self.initial_client_id.is_some()
            && ack.client_id == self.initial_client_id
            && self
                .initial_leading_csn
                .is_some_and(|csn| ack.client_sequence_number >= csn);

        if claims_prior_session {
            while let Some(entry) = self.pending.pop_front() {
                if let PendingEntry::Message(m) = entry {
                    self.pending_message_count -= 1;
                    return Ok(AckOutcome { local_ack: true, local_metadata: m.local_metadata });
                }
                // intervening non-Message entries carried session-local
                // framing from the prior session; discard silently.
            }
        }

        Ok(AckOutcome::none())
    }

    /// §4.1.7
    pub fn replay_on_reconnect(&mut self) -> Result<(), PendingOpError> {
        assert!(
            self.runtime.connected(),
            "replayOnReconnect requires the runtime to report connected"
        );

        let new_client_id = self.runtime.client_id();
        if self.session_client_id.is_some() && self.session_client_id == new_client_id {
            warn!(?new_client_id, "refusing to double-replay for the same clientId");
            return Err(self.close(PendingOpError::DoubleReplay { client_id: new_client_id }));
        }
        self.session_client_id = new_client_id;

        while let Some(entry) = self.initial.pop_front() {
            if let PendingEntry::Message(m) = &entry {
                (self.rebase)(&m.content, &m.local_metadata);
                self.pending_message_count += 1;
            }
            self.pending.push_back(entry);
        }

        let replay_count = self.pending.len();
        self.pending_message_count = 0;
        let saved_flush_mode = self.runtime.flush_mode();

        for _ in 0..replay_count {
            match self.pending.pop_front() {
                Some(PendingEntry::Message(m)) => {
                    // `resubmit` is the runtime's re-entry point: it assigns
                    // the CSN this *new* session tracks the op under and
                    // hands it back here, so there is exactly one enqueue
                    // (via `on_submit`) per replayed op, under the CSN the
                    // new session will actually see echoed in its ack.
                    let new_csn = self.runtime.resubmit(
                        &m.message_type,
                        m.content.clone(),
                        m.local_metadata.clone(),
                        m.op_metadata.clone(),
                    );
                    self.on_submit(
                        m.message_type,
                        new_csn,
                        m.reference_sequence_number,
                        m.content,
                        m.local_metadata,
                        m.op_metadata,
                    );
                }
                Some(PendingEntry::FlushModeChange { flush_mode }) => {
                    self.runtime.set_flush_mode(flush_mode);
                }
                Some(PendingEntry::FlushMarker) => {
                    self.runtime.flush();
                }
                None => break,
            }
        }

        self.runtime.set_flush_mode(saved_flush_mode);
        info!(replayed = replay_count, "replayed pending ops on reconnect");
        Ok(())
    }

    /// §4.1.8
    pub fn serialize(&self) -> Option<SerializedPendingState> {
        if self.pending_message_count == 0 {
            return None;
        }
        Some(SerializedPendingState {
            client_id: self.session_client_id.clone(),
            pending_states: self.pending.iter().cloned().collect(),
        })
    }

    fn close(&mut self, error: PendingOpError) -> PendingOpError {
        warn!(%error, "closing container: pending-op invariant violated");
        self.runtime.close(error.clone());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::BatchMetadata;
    use crate::testing::FakeRuntime;

    fn ack(csn: u64, sn: u64, client_id: &str, batch: Option<bool>) -> SequencedMessage {
        SequencedMessage {
            message_type: "op".into(),
            client_id: Some(client_id.into()),
            client_sequence_number: csn,
            sequence_number: sn,
            metadata: batch.map(|b| BatchMetadata { batch: Some(b) }).or(Some(BatchMetadata { batch: None })),
        }
    }

    fn no_op_rebase() -> Rebaser {
        Box::new(|_, _| {})
    }

    #[test]
    fn submit_then_ack_drains_pending() {
        let fake = FakeRuntime::new(Some("C1"));
        let mut mgr = PendingStateManager::new(Box::new(fake), no_op_rebase(), None);

        mgr.on_submit("op", 1, 0, serde_json::json!("a"), None, None);
        assert_eq!(mgr.pending_message_count(), 1);

        let outcome = mgr.process_ack(&ack(1, 10, "C1", None), true).unwrap();
        assert!(outcome.local_ack);
        assert_eq!(mgr.pending_message_count(), 0);
        assert!(mgr.is_pending_empty());
        assert!(mgr.serialize().is_none());
    }

    #[test]
    fn csn_mismatch_closes_container() {
        let fake = FakeRuntime::new(Some("C1"));
        let handle = fake.handle();
        let mut mgr = PendingStateManager::new(Box::new(fake), no_op_rebase(), None);

        mgr.on_submit("op", 5, 0, serde_json::json!("a"), None, None);
        let err = mgr.process_ack(&ack(6, 10, "C1", None), true).unwrap_err();

        match err {
            PendingOpError::DataCorruption { expected_client_sequence_number, client_sequence_number, .. } => {
                assert_eq!(expected_client_sequence_number, 5);
                assert_eq!(client_sequence_number, 6);
            }
            other => panic!("expected DataCorruption, got {other:?}"),
        }
        assert_eq!(handle.close_calls(), 1);
    }

    #[test]
    fn chunked_op_is_skipped_without_touching_pending() {
        let fake = FakeRuntime::new(Some("C1"));
        let mut mgr = PendingStateManager::new(Box::new(fake), no_op_rebase(), None);
        mgr.on_submit("op", 1, 0, serde_json::json!("a"), None, None);

        let mut chunk = ack(999, 1, "C1", None);
        chunk.message_type = CHUNKED_OP_TYPE.into();
        let outcome = mgr.process_ack(&chunk, true).unwrap();
        assert!(!outcome.local_ack);
        assert_eq!(mgr.pending_message_count(), 1);
    }

    #[test]
    fn adjacent_flush_mode_transitions_collapse() {
        let fake = FakeRuntime::new(Some("C1"));
        let mut mgr = PendingStateManager::new(Box::new(fake), no_op_rebase(), None);
        mgr.on_submit("op", 1, 0, serde_json::json!("a"), None, None);

        let before = mgr.serialize().unwrap().pending_states.len();
        mgr.on_flush_mode_changed(FlushMode::Manual);
        mgr.on_flush_mode_changed(FlushMode::Automatic);
        let after = mgr.serialize().unwrap().pending_states.len();
        assert_eq!(before, after);
    }

    #[test]
    fn batch_of_three_enters_and_exits_on_boundary_acks() {
        let fake = FakeRuntime::new(Some("C1"));
        let mut mgr = PendingStateManager::new(Box::new(fake), no_op_rebase(), None);

        mgr.on_flush_mode_changed(FlushMode::Manual);
        mgr.on_submit("op", 1, 0, serde_json::json!(1), None, None);
        mgr.on_submit("op", 2, 0, serde_json::json!(2), None, None);
        mgr.on_submit("op", 3, 0, serde_json::json!(3), None, None);
        mgr.on_flush();

        mgr.process_ack(&ack(1, 10, "C1", Some(true)), true).unwrap();
        assert!(mgr.batch.in_batch());
        mgr.process_ack(&ack(2, 11, "C1", None), true).unwrap();
        assert!(mgr.batch.in_batch());
        mgr.process_ack(&ack(3, 12, "C1", Some(false)), true).unwrap();
        assert!(!mgr.batch.in_batch());
        assert_eq!(mgr.pending_message_count(), 0);
    }

    #[test]
    fn malformed_batch_metadata_is_data_corruption() {
        let fake = FakeRuntime::new(Some("C1"));
        let mut mgr = PendingStateManager::new(Box::new(fake), no_op_rebase(), None);

        mgr.on_flush_mode_changed(FlushMode::Manual);
        mgr.on_submit("op", 1, 0, serde_json::json!(1), None, None);
        mgr.on_submit("op", 2, 0, serde_json::json!(2), None, None);
        mgr.on_flush();

        mgr.process_ack(&ack(1, 10, "C1", Some(true)), true).unwrap();
        let err = mgr.process_ack(&ack(2, 11, "C1", None), true).unwrap_err();
        assert!(matches!(err, PendingOpError::MalformedBatchMetadata { .. }));
    }
}
