//! Error types for the pulse-collect crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::kind::ResourceKind;

/// Errors returned by a [`ResourceClient`](crate::ResourceClient) or a
/// [`ConnectionRegistry`](crate::ConnectionRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No client is registered for the cluster.
    #[error("unknown cluster: {cluster}")]
    UnknownCluster {
        /// The cluster identifier.
        cluster: String,
    },

    /// The cluster endpoint cannot be reached.
    #[error("cluster unavailable: {reason}")]
    Unavailable {
        /// What went wrong.
        reason: String,
    },

    /// The credentials may not read this kind.
    #[error("access to {kind} forbidden")]
    Forbidden {
        /// The kind that was refused.
        kind: ResourceKind,
    },

    /// The cluster does not serve this kind.
    #[error("{kind} not served by this cluster")]
    NotFound {
        /// The missing kind.
        kind: ResourceKind,
    },

    /// The request failed for another reason.
    #[error("request failed: {reason}")]
    Request {
        /// What went wrong.
        reason: String,
    },

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,
}

impl ClientError {
    /// Creates an [`ClientError::Unavailable`] error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a [`ClientError::Request`] error.
    pub fn request(reason: impl Into<String>) -> Self {
        Self::Request {
            reason: reason.into(),
        }
    }

    /// Returns true if the error means the whole cluster is unreachable
    /// rather than one query failing.
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        matches!(self, Self::UnknownCluster { .. } | Self::Unavailable { .. })
    }
}

/// A failure of one collector, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectorError {
    /// The client call failed.
    #[error("{kind}: {source}")]
    Client {
        /// The kind being collected.
        kind: ResourceKind,
        /// The client error.
        #[source]
        source: ClientError,
    },

    /// The collector exceeded its time budget.
    #[error("{kind}: timed out after {timeout_ms}ms")]
    Timeout {
        /// The kind being collected.
        kind: ResourceKind,
        /// The budget in milliseconds.
        timeout_ms: u64,
    },
}

impl CollectorError {
    /// Returns the kind whose collection failed.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Client { kind, .. } | Self::Timeout { kind, .. } => *kind,
        }
    }

    /// Returns true if the underlying cause is a connection failure.
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        match self {
            Self::Client { source, .. } => source.is_connection_failure(),
            Self::Timeout { .. } => false,
        }
    }
}

/// Errors loading a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be read.
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid JSON.
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top level is not an object of kind name to object array.
    #[error("invalid snapshot layout: {reason}")]
    Layout {
        /// What is wrong.
        reason: String,
    },
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures() {
        assert!(ClientError::unavailable("refused").is_connection_failure());
        assert!(
            ClientError::UnknownCluster {
                cluster: "x".into()
            }
            .is_connection_failure()
        );
        assert!(!ClientError::Timeout.is_connection_failure());
        assert!(
            !ClientError::Forbidden {
                kind: ResourceKind::Secret
            }
            .is_connection_failure()
        );
    }

    #[test]
    fn collector_error_display_names_kind() {
        let err = CollectorError::Client {
            kind: ResourceKind::Service,
            source: ClientError::request("bad gateway"),
        };
        assert_eq!(err.to_string(), "services: request failed: bad gateway");
        assert_eq!(err.kind(), ResourceKind::Service);

        let timeout = CollectorError::Timeout {
            kind: ResourceKind::Pod,
            timeout_ms: 10_000,
        };
        assert_eq!(timeout.to_string(), "pods: timed out after 10000ms");
        assert!(!timeout.is_connection_failure());
    }
}
