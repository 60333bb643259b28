//! A [`ResourceClient`] backed by captured cluster state.
//!
//! Snapshots are JSON objects mapping collection names to object arrays:
//!
//! ```json
//! { "nodes": [ { "metadata": { "name": "node-1" } } ], "pods": [] }
//! ```
//!
//! Failures and delays can be injected per kind, which makes the client
//! useful for exercising partial-failure handling.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ListFuture, ResourceClient};
use crate::error::{ClientError, SnapshotError};
use crate::kind::{ResourceKind, Scope};

/// Serves resource lists from memory.
#[derive(Debug, Default)]
pub struct SnapshotClient {
    objects: HashMap<ResourceKind, Vec<Value>>,
    failures: HashMap<ResourceKind, ClientError>,
    delays: HashMap<ResourceKind, Duration>,
    calls: AtomicUsize,
}

impl SnapshotClient {
    /// Creates a client with no objects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a client from a parsed snapshot document.
    ///
    /// Unknown collection names are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Layout`] if the document is not an object of
    /// arrays.
    pub fn from_value(document: Value) -> Result<Self, SnapshotError> {
        let Value::Object(map) = document else {
            return Err(SnapshotError::Layout {
                reason: "top level must be an object".to_string(),
            });
        };

        let mut client = Self::new();
        for (name, items) in map {
            let Ok(kind) = name.parse::<ResourceKind>() else {
                warn!(collection = %name, "ignoring unknown snapshot collection");
                continue;
            };
            let Value::Array(items) = items else {
                return Err(SnapshotError::Layout {
                    reason: format!("'{name}' must be an array"),
                });
            };
            client.objects.entry(kind).or_default().extend(items);
        }
        Ok(client)
    }

    /// Parses a snapshot from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid JSON or layout.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Loads a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let client = Self::from_json(&content)?;
        debug!(path = %path.display(), kinds = client.objects.len(), "loaded snapshot");
        Ok(client)
    }

    /// Adds objects of one kind.
    #[must_use]
    pub fn with_objects(mut self, kind: ResourceKind, objects: Vec<Value>) -> Self {
        self.objects.entry(kind).or_default().extend(objects);
        self
    }

    /// Makes every list of `kind` fail with `error`.
    #[must_use]
    pub fn with_failure(mut self, kind: ResourceKind, error: ClientError) -> Self {
        self.failures.insert(kind, error);
        self
    }

    /// Makes every list of `kind` take at least `delay`.
    #[must_use]
    pub fn with_delay(mut self, kind: ResourceKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    /// Returns the number of list calls served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn select(&self, kind: ResourceKind, scope: &Scope) -> Vec<Value> {
        let Some(objects) = self.objects.get(&kind) else {
            return Vec::new();
        };
        if !kind.is_namespaced() {
            return objects.clone();
        }
        objects
            .iter()
            .filter(|object| {
                let namespace = object
                    .pointer("/metadata/namespace")
                    .and_then(Value::as_str);
                scope.contains(namespace)
            })
            .cloned()
            .collect()
    }
}

impl ResourceClient for SnapshotClient {
    fn list<'a>(&'a self, kind: ResourceKind, scope: &'a Scope) -> ListFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(&kind) {
                tokio::time::sleep(*delay).await;
            }
            if let Some(error) = self.failures.get(&kind) {
                return Err(error.clone());
            }
            Ok(self.select(kind, scope))
        })
    }
}
