//! The collector trait and its output.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ResourceClient;
use crate::error::{CollectorError, Result};
use crate::kind::{ResourceKind, Scope};
use crate::namespaces::NamespaceRecord;
use crate::nodes::NodeRecord;
use crate::pods::PodRecord;
use crate::workloads::{DeploymentRecord, GatewayRecord, ServiceRecord};

/// Boxed future returned by [`Collector::fetch`].
pub type CollectFuture<'a> = Pin<Box<dyn Future<Output = Result<Collected>> + Send + 'a>>;

/// Reads and normalizes one resource kind.
///
/// A collector issues a single list call per fetch. It keeps no state
/// between calls and does not retry.
pub trait Collector: Send + Sync + fmt::Debug {
    /// The kind this collector reads.
    fn kind(&self) -> ResourceKind;

    /// Lists and normalizes every object of the kind within `scope`.
    fn fetch<'a>(&'a self, client: &'a dyn ResourceClient, scope: &'a Scope) -> CollectFuture<'a>;
}

/// Decoded objects plus the number that could not be decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listed<T> {
    /// Objects that decoded.
    pub items: Vec<T>,
    /// Objects skipped as malformed.
    pub skipped: usize,
}

impl<T> Listed<T> {
    /// Converts every item, keeping the skip count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listed<U> {
        Listed {
            items: self.items.into_iter().map(f).collect(),
            skipped: self.skipped,
        }
    }
}

impl<T> Default for Listed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: 0,
        }
    }
}

/// The output of one collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Collected {
    /// Nodes.
    Nodes(Listed<NodeRecord>),
    /// Pods.
    Pods(Listed<PodRecord>),
    /// Namespaces.
    Namespaces(Listed<NamespaceRecord>),
    /// Deployments.
    Deployments(Listed<DeploymentRecord>),
    /// Services.
    Services(Listed<ServiceRecord>),
    /// Gateways.
    Gateways(Listed<GatewayRecord>),
    /// A count-only kind.
    Count {
        /// The counted kind.
        of: ResourceKind,
        /// Number of objects.
        count: usize,
    },
}

impl Collected {
    /// Returns the kind this output describes.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Nodes(_) => ResourceKind::Node,
            Self::Pods(_) => ResourceKind::Pod,
            Self::Namespaces(_) => ResourceKind::Namespace,
            Self::Deployments(_) => ResourceKind::Deployment,
            Self::Services(_) => ResourceKind::Service,
            Self::Gateways(_) => ResourceKind::Gateway,
            Self::Count { of, .. } => *of,
        }
    }

    /// Returns the number of objects collected.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Nodes(l) => l.items.len(),
            Self::Pods(l) => l.items.len(),
            Self::Namespaces(l) => l.items.len(),
            Self::Deployments(l) => l.items.len(),
            Self::Services(l) => l.items.len(),
            Self::Gateways(l) => l.items.len(),
            Self::Count { count, .. } => *count,
        }
    }

    /// Returns the number of malformed objects skipped.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        match self {
            Self::Nodes(l) => l.skipped,
            Self::Pods(l) => l.skipped,
            Self::Namespaces(l) => l.skipped,
            Self::Deployments(l) => l.skipped,
            Self::Services(l) => l.skipped,
            Self::Gateways(l) => l.skipped,
            Self::Count { .. } => 0,
        }
    }
}

/// Issues the list call for `kind`, tagging failures with the kind.
pub(crate) async fn list_raw(
    client: &dyn ResourceClient,
    kind: ResourceKind,
    scope: &Scope,
) -> Result<Vec<Value>> {
    client
        .list(kind, scope)
        .await
        .map_err(|source| CollectorError::Client { kind, source })
}

/// Lists `kind` and decodes every object, skipping the malformed ones.
pub(crate) async fn list_decoded<T: DeserializeOwned + Send>(
    client: &dyn ResourceClient,
    kind: ResourceKind,
    scope: &Scope,
) -> Result<Listed<T>> {
    let raw = list_raw(client, kind, scope).await?;
    Ok(decode_all(kind, raw))
}

pub(crate) fn decode_all<T: DeserializeOwned>(kind: ResourceKind, raw: Vec<Value>) -> Listed<T> {
    let mut listed = Listed {
        items: Vec::with_capacity(raw.len()),
        skipped: 0,
    };
    for value in raw {
        match serde_json::from_value::<T>(value) {
            Ok(item) => listed.items.push(item),
            Err(error) => {
                listed.skipped += 1;
                warn!(kind = %kind, %error, "skipping malformed object");
            }
        }
    }
    debug!(
        kind = %kind,
        count = listed.items.len(),
        skipped = listed.skipped,
        "decoded objects"
    );
    listed
}

/// Returns the collector for each kind, in [`ResourceKind::ALL`] order.
#[must_use]
pub fn default_collectors() -> Vec<Box<dyn Collector>> {
    ResourceKind::ALL.into_iter().map(collector_for).collect()
}

/// Returns the collector that reads `kind`.
#[must_use]
pub fn collector_for(kind: ResourceKind) -> Box<dyn Collector> {
    use crate::namespaces::NamespaceCollector;
    use crate::nodes::NodeCollector;
    use crate::pods::PodCollector;
    use crate::workloads::{CountCollector, GatewayCollector, ServiceCollector, WorkloadCollector};

    match kind {
        ResourceKind::Node => Box::new(NodeCollector),
        ResourceKind::Pod => Box::new(PodCollector),
        ResourceKind::Namespace => Box::new(NamespaceCollector),
        ResourceKind::Deployment => Box::new(WorkloadCollector),
        ResourceKind::Service => Box::new(ServiceCollector),
        ResourceKind::Gateway => Box::new(GatewayCollector),
        ResourceKind::ConfigMap | ResourceKind::Secret => Box::new(CountCollector::new(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    #[test]
    fn malformed_objects_are_skipped_and_counted() {
        let listed: Listed<Named> = decode_all(
            ResourceKind::Pod,
            vec![json!({"name": "a"}), json!({"nope": 1}), json!("text"), json!({"name": "b"})],
        );
        let names: Vec<_> = listed.items.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(listed.skipped, 2);
    }

    #[test]
    fn every_kind_has_a_collector() {
        let collectors = default_collectors();
        let kinds: Vec<_> = collectors.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, ResourceKind::ALL.to_vec());
    }

    #[test]
    fn count_output_reports_kind() {
        let collected = Collected::Count {
            of: ResourceKind::Secret,
            count: 4,
        };
        assert_eq!(collected.kind(), ResourceKind::Secret);
        assert_eq!(collected.count(), 4);
        assert_eq!(collected.skipped(), 0);
    }
}
