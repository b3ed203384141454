//! Transient state tracking whether the current run of local acks is
//! inside a batch, and the first ack of that batch for metadata
//! verification (invariant 3: `inBatch` and `batchBeginMessage` are set
//! and cleared together).

use crate::runtime::SequencedMessage;

#[derive(Debug, Default)]
pub(crate) struct BatchTracker {
    in_batch: bool,
    batch_begin_message: Option<SequencedMessage>,
}

impl BatchTracker {
    pub fn in_batch(&self) -> bool {
        self.in_batch
    }

    pub fn enter(&mut self, begin: SequencedMessage) {
        debug_assert!(
            !self.in_batch && self.batch_begin_message.is_none(),
            "entering a batch while already inside one"
        );
        self.in_batch = true;
        self.batch_begin_message = Some(begin);
    }

    pub fn exit(&mut self) {
        self.in_batch = false;
        self.batch_begin_message = None;
    }

    /// Validate the begin/end batch metadata for the ack that is closing
    /// out the current batch. Returns `Err(reason)` on a mismatch; the
    /// caller turns that into `PendingOpError::MalformedBatchMetadata`.
    pub fn verify_close(&self, ack: &SequencedMessage) -> Result<(), String> {
        let begin = self
            .batch_begin_message
            .as_ref()
            .expect("verify_close called while not in a batch");
        let begin_meta = begin.metadata.and_then(|m| m.batch);
        let end_meta = ack.metadata.and_then(|m| m.batch);
        let single_message_batch = begin.client_sequence_number == ack.client_sequence_number
            && begin.sequence_number == ack.sequence_number;

        if single_message_batch {
            if begin_meta.is_some() {
                return Err(format!(
                    "single-message batch requires absent begin metadata, got {begin_meta:?}"
                ));
            }
        } else if begin_meta != Some(true) || end_meta != Some(false) {
            return Err(format!(
                "multi-message batch requires beginMeta=true/endMeta=false, got begin={begin_meta:?} end={end_meta:?}"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::BatchMetadata;

    fn msg(csn: u64, sn: u64, batch: Option<bool>) -> SequencedMessage {
        SequencedMessage {
            message_type: "op".into(),
            client_id: Some("c1".into()),
            client_sequence_number: csn,
            sequence_number: sn,
            metadata: Some(BatchMetadata { batch }),
        }
    }

    #[test]
    fn single_message_batch_requires_absent_begin_metadata() {
        let mut tracker = BatchTracker::default();
        let begin = msg(1, 10, None);
        tracker.enter(begin.clone());
        assert!(tracker.verify_close(&begin).is_ok());
    }

    #[test]
    fn single_message_batch_rejects_present_begin_metadata() {
        let mut tracker = BatchTracker::default();
        let begin = msg(1, 10, Some(true));
        tracker.enter(begin.clone());
        assert!(tracker.verify_close(&begin).is_err());
    }

    #[test]
    fn multi_message_batch_requires_true_false_bracket() {
        let mut tracker = BatchTracker::default();
        tracker.enter(msg(1, 10, Some(true)));
        assert!(tracker.verify_close(&msg(3, 12, Some(false))).is_ok());
    }

    #[test]
    fn multi_message_batch_rejects_missing_end_metadata() {
        let mut tracker = BatchTracker::default();
        tracker.enter(msg(1, 10, Some(true)));
        assert!(tracker.verify_close(&msg(3, 12, None)).is_err());
    }
}
