//! Persisted sequencing state (`SuspendedStateData`) between CLI invocations.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::state::SuspendedStateData;

/// Load saved state; a missing file means no attempt has started yet.
pub fn load_state(path: &Path) -> Result<Option<SuspendedStateData>> {
    if !path.exists() {
        debug!(path = %path.display(), "no saved sequencing state");
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read state {}", path.display()))?;
    let state: SuspendedStateData = serde_json::from_str(&contents)
        .with_context(|| format!("parse state {}", path.display()))?;
    debug!(
        current = ?state.current_activity_id,
        suspended = ?state.suspended_activity_id,
        "sequencing state loaded"
    );
    Ok(Some(state))
}

/// Atomically write state to disk (temp file + rename).
pub fn write_state(path: &Path, state: &SuspendedStateData) -> Result<()> {
    debug!(path = %path.display(), current = ?state.current_activity_id, "writing sequencing state");
    let mut buf = serde_json::to_string_pretty(state).context("serialize state")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
