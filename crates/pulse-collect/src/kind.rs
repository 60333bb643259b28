//! Resource kinds and query scopes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A resource collection the engine reads from a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Compute nodes.
    #[serde(rename = "nodes")]
    Node,
    /// Pods.
    #[serde(rename = "pods")]
    Pod,
    /// Namespaces.
    #[serde(rename = "namespaces")]
    Namespace,
    /// Deployments.
    #[serde(rename = "deployments")]
    Deployment,
    /// Services.
    #[serde(rename = "services")]
    Service,
    /// Config maps.
    #[serde(rename = "configmaps")]
    ConfigMap,
    /// Secrets.
    #[serde(rename = "secrets")]
    Secret,
    /// Mesh ingress/egress gateways.
    #[serde(rename = "gateways")]
    Gateway,
}

impl ResourceKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 8] = [
        Self::Node,
        Self::Pod,
        Self::Namespace,
        Self::Deployment,
        Self::Service,
        Self::ConfigMap,
        Self::Secret,
        Self::Gateway,
    ];

    /// Returns the plural collection name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "nodes",
            Self::Pod => "pods",
            Self::Namespace => "namespaces",
            Self::Deployment => "deployments",
            Self::Service => "services",
            Self::ConfigMap => "configmaps",
            Self::Secret => "secrets",
            Self::Gateway => "gateways",
        }
    }

    /// Returns true if objects of this kind live inside a namespace.
    #[must_use]
    pub const fn is_namespaced(self) -> bool {
        !matches!(self, Self::Node | Self::Namespace)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower || kind.as_str().trim_end_matches('s') == lower)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Which part of a cluster a query covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Every namespace.
    #[default]
    All,
    /// A single namespace.
    Namespace(String),
}

impl Scope {
    /// Creates a single-namespace scope.
    #[must_use]
    pub fn namespace(name: impl Into<String>) -> Self {
        Self::Namespace(name.into())
    }

    /// Returns the namespace, if restricted to one.
    #[must_use]
    pub fn as_namespace(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Namespace(name) => Some(name),
        }
    }

    /// Returns true if an object in `namespace` is inside this scope.
    ///
    /// Cluster-scoped objects (no namespace) are always inside.
    #[must_use]
    pub fn contains(&self, namespace: Option<&str>) -> bool {
        match (self, namespace) {
            (Self::All, _) | (_, None) => true,
            (Self::Namespace(wanted), Some(actual)) => wanted == actual,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Namespace(name) => f.write_str(name),
        }
    }
}
