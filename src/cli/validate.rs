use anyhow::{Context, Result};
use std::path::Path;

use crate::pending::SerializedPendingState;

/// Returns `Ok(())` if the snapshot at `path` parses cleanly; the error
/// carries the same diagnostics a failed rehydration would produce.
pub fn validate(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read snapshot at {}", path.display()))?;
    SerializedPendingState::from_json(&bytes)
        .with_context(|| format!("snapshot at {} is not a valid pending-state blob", path.display()))?;
    Ok(())
}
