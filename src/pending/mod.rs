//! The pending-op state machine: tracking, batching, ack verification,
//! serialization and replay for locally submitted ops (spec §4.1–4.3).

mod batch;
pub mod entry;
pub mod serialize;
pub mod state_machine;

pub use entry::{MessageEntry, PendingEntry};
pub use serialize::SerializedPendingState;
pub use state_machine::{AckOutcome, PendingStateManager, Rebaser};
