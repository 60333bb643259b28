//! Cluster client and connection registry seams.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;
use crate::kind::{ResourceKind, Scope};

/// Boxed future returned by [`ResourceClient::list`].
pub type ListFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Value>, ClientError>> + Send + 'a>>;

/// Read access to one cluster's resource collections.
///
/// Implementations issue exactly one read per call and return the raw
/// objects; decoding and normalization happen in the collectors.
pub trait ResourceClient: Send + Sync + fmt::Debug {
    /// Lists every object of `kind` within `scope`.
    fn list<'a>(&'a self, kind: ResourceKind, scope: &'a Scope) -> ListFuture<'a>;
}

/// Hands out clients by cluster identifier.
pub trait ConnectionRegistry: Send + Sync + fmt::Debug {
    /// Returns the client for a cluster.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownCluster`] when nothing is registered, or
    /// a connection error if the cluster cannot be used.
    fn client(&self, cluster: &str) -> Result<Arc<dyn ResourceClient>, ClientError>;

    /// Returns the registered cluster identifiers, sorted.
    fn clusters(&self) -> Vec<String>;
}

/// An in-memory registry filled at startup.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    clients: RwLock<HashMap<String, Arc<dyn ResourceClient>>>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the client for a cluster.
    pub fn register(&self, cluster: impl Into<String>, client: Arc<dyn ResourceClient>) {
        let cluster = cluster.into();
        debug!(cluster = %cluster, "registered cluster client");
        self.clients.write().insert(cluster, client);
    }

    /// Removes a cluster. Returns true if it was registered.
    pub fn remove(&self, cluster: &str) -> bool {
        self.clients.write().remove(cluster).is_some()
    }

    /// Returns the number of registered clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Returns true if no cluster is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

impl ConnectionRegistry for StaticRegistry {
    fn client(&self, cluster: &str) -> Result<Arc<dyn ResourceClient>, ClientError> {
        self.clients
            .read()
            .get(cluster)
            .cloned()
            .ok_or_else(|| ClientError::UnknownCluster {
                cluster: cluster.to_string(),
            })
    }

    fn clusters(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.read().keys().cloned().collect();
        names.sort();
        names
    }
}
