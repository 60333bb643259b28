//! Cache keys.

use std::collections::BTreeMap;
use std::fmt;

/// Identifies one cached aggregate.
///
/// Keys are compared structurally; the extra parameters are kept sorted so
/// insertion order never produces two keys for the same request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    cluster: String,
    kind: String,
    scope: Option<String>,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    /// Creates a key for a cluster-wide aggregate of the given kind.
    #[must_use]
    pub fn new(cluster: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            kind: kind.into(),
            scope: None,
            params: BTreeMap::new(),
        }
    }

    /// Narrows the key to a scope such as a namespace.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Adds an extra request parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Returns the cluster identifier.
    #[must_use]
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Returns the aggregate kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster, self.kind)?;
        if let Some(scope) = &self.scope {
            write!(f, "/{scope}")?;
        }
        let mut sep = '?';
        for (name, value) in &self.params {
            write!(f, "{sep}{name}={value}")?;
            sep = '&';
        }
        Ok(())
    }
}
