//! CLI error types.

use std::io;

use pulse_collect::SnapshotError;
use pulse_monitor::MonitorError;
use thiserror::Error;

/// Errors that can occur during CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// A snapshot could not be loaded.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// No snapshot files were found at the given path.
    #[error("no snapshots found in {0}")]
    NoSnapshots(String),

    /// The requested cluster is not loaded, or none was chosen.
    #[error("cluster selection: {0}")]
    Cluster(String),

    /// The monitor failed to answer.
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    /// The requested object does not exist.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Object kind.
        kind: &'static str,
        /// Object name as given.
        name: String,
    },

    /// Invalid command argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err.to_string())
    }
}
