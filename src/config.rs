//! Host-process settings. These parameterize how a process embedding
//! the state machine behaves; they have no bearing on the state
//! machine's own invariants.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Whether a detected invariant violation tears the process down
/// immediately or only logs — the latter is useful for a read-only
/// inspector running over an archived snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptionPolicy {
    CloseContainer,
    LogOnly,
}

impl Default for CorruptionPolicy {
    fn default() -> Self {
        CorruptionPolicy::CloseContainer
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// `tracing-subscriber` env-filter directive, e.g. `"opsync=debug"`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub corruption_policy: CorruptionPolicy,

    /// Default directory the CLI looks in for serialized snapshots when
    /// given a bare filename instead of a full path.
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "opsync=info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            corruption_policy: CorruptionPolicy::default(),
            snapshot_dir: None,
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config file at {}", path.display()))
    }

    pub fn write_default_config(path: &Path) -> Result<()> {
        let settings = Settings::default();
        let rendered =
            toml::to_string_pretty(&settings).context("failed to render default config")?;
        std::fs::write(path, rendered)
            .with_context(|| format!("failed to write config file at {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_round_trip_through_toml() {
        let settings = Settings::default();
        let rendered = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.log_filter, settings.log_filter);
        assert_eq!(parsed.corruption_policy, settings.corruption_policy);
    }
}
