//! Error types for the pulse-monitor crate.

use pulse_collect::{ClientError, CollectorError};
use thiserror::Error;

/// Errors that fail an aggregation outright.
///
/// Cloneable so every caller sharing one cached load can receive it.
#[derive(Debug, Clone, Error)]
pub enum MonitorError {
    /// No usable client for the cluster.
    #[error("cannot connect to cluster {cluster}: {source}")]
    Connection {
        /// Cluster identifier.
        cluster: String,
        /// What the registry or client reported.
        #[source]
        source: ClientError,
    },

    /// Every collector the aggregate needs failed.
    #[error("all collectors failed for cluster {cluster}: {}", join(failures))]
    AllCollectorsFailed {
        /// Cluster identifier.
        cluster: String,
        /// One failure per collector.
        failures: Vec<CollectorError>,
    },

    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MonitorError {
    /// Returns true if the cluster itself was unreachable.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

fn join(failures: &[CollectorError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_collect::ResourceKind;

    #[test]
    fn all_failed_lists_each_kind() {
        let err = MonitorError::AllCollectorsFailed {
            cluster: "prod".to_string(),
            failures: vec![
                CollectorError::Timeout {
                    kind: ResourceKind::Node,
                    timeout_ms: 10_000,
                },
                CollectorError::Client {
                    kind: ResourceKind::Pod,
                    source: ClientError::Forbidden {
                        kind: ResourceKind::Pod,
                    },
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("all collectors failed for cluster prod: nodes: timed out"));
        assert!(msg.contains("; pods: "));
        assert!(!err.is_connection());
    }

    #[test]
    fn connection_error_display() {
        let err = MonitorError::Connection {
            cluster: "edge".to_string(),
            source: ClientError::UnknownCluster {
                cluster: "edge".to_string(),
            },
        };
        assert!(err.to_string().starts_with("cannot connect to cluster edge"));
        assert!(err.is_connection());
    }
}
