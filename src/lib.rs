//! opsync: the per-client pending-op state machine for a
//! collaborative-document runtime that multiplexes many distributed
//! data structures over a single ordered delta stream.
//!
//! This crate covers the correctness boundary: tracking
//! submitted-but-unacked ops, preserving batch framing across
//! reconnects, verifying ack ordering against what was actually sent,
//! and replaying unacked work after a reconnect or a rehydration from a
//! serialized snapshot. The transport, container lifecycle, and the DDS
//! implementations themselves are external collaborators — this crate
//! only needs a [`runtime::RuntimeHooks`] capability and a rebase
//! closure.

pub mod config;
pub mod error;
pub mod pending;
pub mod runtime;
pub mod testing;
