//! # pulse-cli
//!
//! clusterpulse command-line interface.
//!
//! Provides commands for:
//! - Cluster overview (counts, resource totals, health)
//! - Node, pod and namespace reports
//! - Per-object digests
//!
//! # Architecture
//!
//! Clusters are loaded from snapshot files into a registry, and every
//! command is answered by a [`pulse_monitor::ClusterMonitor`] over it.
//!
//! ```text
//! snapshot files ──► StaticRegistry ──► ClusterMonitor ──► table / JSON
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod snapshots;

pub use cli::{Cli, Commands, DigestTarget, Format};
pub use error::CliError;
pub use output::{OutputFormat, TableDisplay};
pub use snapshots::Snapshots;
