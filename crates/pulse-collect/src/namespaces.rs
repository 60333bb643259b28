//! Namespace collection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::ResourceClient;
use crate::collector::{CollectFuture, Collected, Collector, list_decoded};
use crate::kind::{ResourceKind, Scope};
use crate::model::Namespace;

/// A normalized namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceRecord {
    /// Namespace name.
    pub name: String,
    /// Phase; `Unknown` when not reported.
    pub phase: String,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl NamespaceRecord {
    /// Returns true if the namespace is being deleted.
    #[must_use]
    pub fn is_terminating(&self) -> bool {
        self.phase == "Terminating"
    }
}

impl From<Namespace> for NamespaceRecord {
    fn from(ns: Namespace) -> Self {
        Self {
            name: ns.metadata.name,
            phase: ns.status.phase.unwrap_or_else(|| "Unknown".to_string()),
            labels: ns.metadata.labels,
            created_at: ns.metadata.creation_timestamp,
        }
    }
}

/// Lists namespaces. A namespace scope narrows the result to that one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceCollector;

impl Collector for NamespaceCollector {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Namespace
    }

    fn fetch<'a>(&'a self, client: &'a dyn ResourceClient, scope: &'a Scope) -> CollectFuture<'a> {
        Box::pin(async move {
            let mut namespaces =
                list_decoded::<Namespace>(client, ResourceKind::Namespace, &Scope::All).await?;
            if let Some(wanted) = scope.as_namespace() {
                namespaces.items.retain(|ns| ns.metadata.name == wanted);
            }
            Ok(Collected::Namespaces(namespaces.map(NamespaceRecord::from)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotClient;
    use serde_json::json;

    fn client() -> SnapshotClient {
        SnapshotClient::new().with_objects(
            ResourceKind::Namespace,
            vec![
                json!({"metadata": {"name": "default"}, "status": {"phase": "Active"}}),
                json!({"metadata": {"name": "old"}, "status": {"phase": "Terminating"}}),
                json!({"metadata": {"name": "fresh"}}),
            ],
        )
    }

    #[tokio::test]
    async fn collects_all_namespaces() {
        let Collected::Namespaces(listed) =
            NamespaceCollector.fetch(&client(), &Scope::All).await.unwrap()
        else {
            panic!("expected namespaces");
        };
        assert_eq!(listed.items.len(), 3);
        assert!(listed.items[1].is_terminating());
        assert_eq!(listed.items[2].phase, "Unknown");
    }

    #[tokio::test]
    async fn scope_narrows_to_one_namespace() {
        let collected = NamespaceCollector
            .fetch(&client(), &Scope::namespace("old"))
            .await
            .unwrap();
        assert_eq!(collected.count(), 1);
    }
}
