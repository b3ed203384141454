use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod init;
pub mod inspect;
pub mod validate;

#[derive(Parser)]
#[command(name = "opsync")]
#[command(author, version, about = "Inspect and validate pending-op snapshots for a collaborative-document runtime", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a default configuration file
    Init {
        #[arg(default_value = "opsync.toml")]
        path: PathBuf,
    },
    /// Check that a serialized pending-state snapshot is well-formed
    ///
    /// Parses the file the same way a host process would on rehydration:
    /// unknown entry tags and malformed entries are rejected before any
    /// typed deserialization is attempted.
    Validate {
        /// Path to a `PendingLocalState` JSON blob
        path: PathBuf,
    },
    /// Print a human-readable summary of a serialized pending-state
    /// snapshot: entry counts by kind, clientId, and csn range.
    Inspect {
        /// Path to a `PendingLocalState` JSON blob
        path: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
