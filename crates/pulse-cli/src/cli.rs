//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// clusterpulse - cluster resource overview and health.
#[derive(Parser, Debug, Clone)]
#[command(name = "clusterpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Snapshot file, or directory of `<cluster>.json` snapshot files.
    #[arg(short, long, env = "CLUSTERPULSE_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Monitor configuration file (TOML).
    #[arg(long, env = "CLUSTERPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cluster to query; optional when only one snapshot is loaded.
    #[arg(short, long)]
    pub cluster: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show cluster-wide counts, resource totals and health.
    Overview {
        /// Bypass the cache.
        #[arg(long)]
        refresh: bool,
    },

    /// Show every node with its allocation and health.
    Nodes {
        /// Bypass the cache.
        #[arg(long)]
        refresh: bool,
    },

    /// Show pods with their containers and health.
    Pods {
        /// Only pods in this namespace.
        #[arg(short, long)]
        namespace: Option<String>,

        /// Bypass the cache.
        #[arg(long)]
        refresh: bool,
    },

    /// Show every namespace with its object counts and health.
    Namespaces {
        /// Bypass the cache.
        #[arg(long)]
        refresh: bool,
    },

    /// Summarize one object for an agent.
    Digest {
        /// Object to summarize.
        #[command(subcommand)]
        target: DigestTarget,
    },
}

/// Objects a digest can describe.
#[derive(Subcommand, Debug, Clone)]
pub enum DigestTarget {
    /// A pod, as `<namespace>/<name>`.
    Pod {
        /// Pod reference.
        reference: String,

        /// Bypass the cache.
        #[arg(long)]
        refresh: bool,
    },

    /// A node.
    Node {
        /// Node name.
        name: String,

        /// Bypass the cache.
        #[arg(long)]
        refresh: bool,
    },

    /// A namespace.
    Namespace {
        /// Namespace name.
        name: String,

        /// Bypass the cache.
        #[arg(long)]
        refresh: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_pods_with_namespace() {
        let cli = Cli::try_parse_from([
            "clusterpulse",
            "--snapshot",
            "snap.json",
            "-f",
            "json",
            "pods",
            "--namespace",
            "shop",
            "--refresh",
        ])
        .unwrap();
        assert_eq!(cli.format, Format::Json);
        let Commands::Pods { namespace, refresh } = cli.command else {
            panic!("expected pods");
        };
        assert_eq!(namespace.as_deref(), Some("shop"));
        assert!(refresh);
    }

    #[test]
    fn parses_pod_digest() {
        let cli = Cli::try_parse_from([
            "clusterpulse",
            "--snapshot",
            "snaps",
            "--cluster",
            "prod",
            "digest",
            "pod",
            "shop/web-0",
        ])
        .unwrap();
        assert_eq!(cli.cluster.as_deref(), Some("prod"));
        assert!(matches!(
            cli.command,
            Commands::Digest {
                target: DigestTarget::Pod { ref reference, refresh: false }
            } if reference == "shop/web-0"
        ));
    }
}
