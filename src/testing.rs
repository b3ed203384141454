//! An in-memory [`RuntimeHooks`] double that records every call it
//! receives, in the spirit of ZeroFS's `test_helpers` module. Used by
//! the unit tests in `pending::state_machine` and by the scenario tests
//! under `tests/`.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::error::PendingOpError;
use crate::runtime::{FlushMode, RuntimeHooks};

/// One observed call to a resubmit/setFlushMode/flush/close hook, kept
/// in order so tests can assert replay preserves submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Resubmit {
        message_type: String,
        content: Value,
        local_metadata: Option<Value>,
        op_metadata: Option<Value>,
        assigned_csn: u64,
    },
    SetFlushMode(FlushMode),
    Flush,
    Close(PendingOpError),
}

#[derive(Default)]
struct Shared {
    calls: Vec<RecordedCall>,
    connected: bool,
    client_id: Option<String>,
    flush_mode: FlushMode,
    next_csn: u64,
}

/// A cloneable observer handle, retained by a test after the
/// [`FakeRuntime`] itself has been moved into a `PendingStateManager`.
#[derive(Clone)]
pub struct FakeRuntimeHandle(Rc<RefCell<Shared>>);

impl FakeRuntimeHandle {
    pub fn resubmitted_contents(&self) -> Vec<Value> {
        self.0
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Resubmit { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.0.borrow().calls.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.0
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::Close(_)))
            .count()
    }

    /// Simulate a reconnect: flip connected on, assign a new clientId, and
    /// reset the CSN space (a new session starts numbering from 1).
    pub fn connect_as(&self, client_id: impl Into<String>) {
        let mut shared = self.0.borrow_mut();
        shared.connected = true;
        shared.client_id = Some(client_id.into());
        shared.next_csn = 1;
    }
}

/// A fake host container. Construct with the clientId the *current*
/// connection should report, clone a [`FakeRuntimeHandle`] via
/// [`FakeRuntime::handle`] before moving this into a state machine, then
/// inspect the handle afterward.
pub struct FakeRuntime(Rc<RefCell<Shared>>);

impl FakeRuntime {
    pub fn new(client_id: Option<&str>) -> Self {
        let shared = Shared {
            calls: Vec::new(),
            connected: client_id.is_some(),
            client_id: client_id.map(str::to_string),
            flush_mode: FlushMode::Automatic,
            next_csn: 1,
        };
        Self(Rc::new(RefCell::new(shared)))
    }

    pub fn handle(&self) -> FakeRuntimeHandle {
        FakeRuntimeHandle(self.0.clone())
    }
}

impl RuntimeHooks for FakeRuntime {
    fn connected(&self) -> bool {
        self.0.borrow().connected
    }

    fn client_id(&self) -> Option<String> {
        self.0.borrow().client_id.clone()
    }

    fn flush_mode(&self) -> FlushMode {
        self.0.borrow().flush_mode
    }

    fn set_flush_mode(&mut self, mode: FlushMode) {
        let mut shared = self.0.borrow_mut();
        shared.flush_mode = mode;
        shared.calls.push(RecordedCall::SetFlushMode(mode));
    }

    fn flush(&mut self) {
        self.0.borrow_mut().calls.push(RecordedCall::Flush);
    }

    fn resubmit(
        &mut self,
        message_type: &str,
        content: Value,
        local_metadata: Option<Value>,
        op_metadata: Option<Value>,
    ) -> u64 {
        let mut shared = self.0.borrow_mut();
        let assigned_csn = shared.next_csn;
        shared.next_csn += 1;
        shared.calls.push(RecordedCall::Resubmit {
            message_type: message_type.to_string(),
            content,
            local_metadata,
            op_metadata,
            assigned_csn,
        });
        assigned_csn
    }

    fn close(&mut self, error: PendingOpError) {
        self.0.borrow_mut().calls.push(RecordedCall::Close(error));
    }
}
