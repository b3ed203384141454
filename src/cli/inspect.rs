use anyhow::{Context, Result};
use std::path::Path;

use crate::pending::entry::PendingEntry;
use crate::pending::SerializedPendingState;

pub struct Summary {
    pub client_id: Option<String>,
    pub total_entries: usize,
    pub message_count: usize,
    pub flush_mode_changes: usize,
    pub flush_markers: usize,
    pub min_csn: Option<u64>,
    pub max_csn: Option<u64>,
}

pub fn inspect(path: &Path) -> Result<Summary> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read snapshot at {}", path.display()))?;
    let state = SerializedPendingState::from_json(&bytes)
        .with_context(|| format!("snapshot at {} is not a valid pending-state blob", path.display()))?;

    let mut message_count = 0;
    let mut flush_mode_changes = 0;
    let mut flush_markers = 0;
    let mut min_csn = None;
    let mut max_csn = None;

    for entry in &state.pending_states {
        match entry {
            PendingEntry::Message(m) => {
                message_count += 1;
                min_csn = Some(min_csn.map_or(m.client_sequence_number, |v: u64| {
                    v.min(m.client_sequence_number)
                }));
                max_csn = Some(max_csn.map_or(m.client_sequence_number, |v: u64| {
                    v.max(m.client_sequence_number)
                }));
            }
            PendingEntry::FlushModeChange { .. } => flush_mode_changes += 1,
            PendingEntry::FlushMarker => flush_markers += 1,
        }
    }

    Ok(Summary {
        client_id: state.client_id,
        total_entries: state.pending_states.len(),
        message_count,
        flush_mode_changes,
        flush_markers,
        min_csn,
        max_csn,
    })
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "clientId: {}", self.client_id.as_deref().unwrap_or("<none>"))?;
        writeln!(f, "entries: {}", self.total_entries)?;
        writeln!(f, "  message: {}", self.message_count)?;
        writeln!(f, "  flushMode: {}", self.flush_mode_changes)?;
        writeln!(f, "  flush: {}", self.flush_markers)?;
        match (self.min_csn, self.max_csn) {
            (Some(min), Some(max)) => writeln!(f, "csn range: {min}..={max}")?,
            _ => writeln!(f, "csn range: <no messages>")?,
        }
        Ok(())
    }
}
