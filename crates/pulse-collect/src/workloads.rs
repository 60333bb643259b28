//! Deployments, services, gateways and count-only kinds.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::ResourceClient;
use crate::collector::{CollectFuture, Collected, Collector, Listed, list_decoded, list_raw};
use crate::error::{ClientError, CollectorError};
use crate::kind::{ResourceKind, Scope};
use crate::model::{Deployment, Gateway, Service};

/// A normalized deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRecord {
    /// Deployment name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Desired replicas.
    pub replicas: u32,
    /// Ready replicas.
    pub ready_replicas: u32,
    /// Available replicas.
    pub available_replicas: u32,
}

impl DeploymentRecord {
    /// Returns true if every desired replica is available.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available_replicas >= self.replicas
    }
}

impl From<Deployment> for DeploymentRecord {
    fn from(d: Deployment) -> Self {
        Self {
            name: d.metadata.name,
            namespace: d.metadata.namespace.unwrap_or_default(),
            replicas: d.spec.replicas.unwrap_or(1),
            ready_replicas: d.status.ready_replicas.unwrap_or(0),
            available_replicas: d.status.available_replicas.unwrap_or(0),
        }
    }
}

/// A normalized service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    /// Service name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Service type, `ClusterIP` when unset.
    pub service_type: String,
    /// Virtual IP.
    pub cluster_ip: Option<String>,
    /// Pod selector.
    pub selector: BTreeMap<String, String>,
}

impl From<Service> for ServiceRecord {
    fn from(s: Service) -> Self {
        Self {
            name: s.metadata.name,
            namespace: s.metadata.namespace.unwrap_or_default(),
            service_type: s.spec.type_.unwrap_or_else(|| "ClusterIP".to_string()),
            cluster_ip: s.spec.cluster_ip,
            selector: s.spec.selector,
        }
    }
}

/// One gateway listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listener {
    /// Port number, 0 when unset.
    pub port: u32,
    /// Protocol.
    pub protocol: String,
    /// Hosts served.
    pub hosts: Vec<String>,
}

/// A normalized mesh gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayRecord {
    /// Gateway name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Workload selector.
    pub selector: BTreeMap<String, String>,
    /// Listeners.
    pub listeners: Vec<Listener>,
}

impl GatewayRecord {
    /// Returns every host across listeners, deduplicated and sorted.
    #[must_use]
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self
            .listeners
            .iter()
            .flat_map(|l| l.hosts.iter().map(String::as_str))
            .collect();
        hosts.sort_unstable();
        hosts.dedup();
        hosts
    }
}

impl From<Gateway> for GatewayRecord {
    fn from(g: Gateway) -> Self {
        let listeners = g
            .spec
            .servers
            .into_iter()
            .map(|server| {
                let port = server.port.unwrap_or_default();
                Listener {
                    port: port.number,
                    protocol: port.protocol,
                    hosts: server.hosts,
                }
            })
            .collect();
        Self {
            name: g.metadata.name,
            namespace: g.metadata.namespace.unwrap_or_default(),
            selector: g.spec.selector,
            listeners,
        }
    }
}

/// Lists deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkloadCollector;

impl Collector for WorkloadCollector {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Deployment
    }

    fn fetch<'a>(&'a self, client: &'a dyn ResourceClient, scope: &'a Scope) -> CollectFuture<'a> {
        Box::pin(async move {
            let listed = list_decoded::<Deployment>(client, ResourceKind::Deployment, scope).await?;
            Ok(Collected::Deployments(listed.map(DeploymentRecord::from)))
        })
    }
}

/// Lists services.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceCollector;

impl Collector for ServiceCollector {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    fn fetch<'a>(&'a self, client: &'a dyn ResourceClient, scope: &'a Scope) -> CollectFuture<'a> {
        Box::pin(async move {
            let listed = list_decoded::<Service>(client, ResourceKind::Service, scope).await?;
            Ok(Collected::Services(listed.map(ServiceRecord::from)))
        })
    }
}

/// Lists mesh gateways.
///
/// Gateways come from an optional mesh extension; a cluster that does not
/// serve the kind has no gateways rather than a failed collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayCollector;

impl Collector for GatewayCollector {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Gateway
    }

    fn fetch<'a>(&'a self, client: &'a dyn ResourceClient, scope: &'a Scope) -> CollectFuture<'a> {
        Box::pin(async move {
            match list_decoded::<Gateway>(client, ResourceKind::Gateway, scope).await {
                Ok(listed) => Ok(Collected::Gateways(listed.map(GatewayRecord::from))),
                Err(CollectorError::Client {
                    source: ClientError::NotFound { .. },
                    ..
                }) => {
                    debug!("gateway kind not served, assuming none");
                    Ok(Collected::Gateways(Listed::default()))
                }
                Err(err) => Err(err),
            }
        })
    }
}

/// Counts objects of a kind without decoding them.
#[derive(Debug, Clone, Copy)]
pub struct CountCollector {
    kind: ResourceKind,
}

impl CountCollector {
    /// Creates a counter for `kind`.
    #[must_use]
    pub const fn new(kind: ResourceKind) -> Self {
        Self { kind }
    }
}

impl Collector for CountCollector {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn fetch<'a>(&'a self, client: &'a dyn ResourceClient, scope: &'a Scope) -> CollectFuture<'a> {
        Box::pin(async move {
            let raw = list_raw(client, self.kind, scope).await?;
            let count = raw.iter().filter(|v| matches!(v, Value::Object(_))).count();
            debug!(kind = %self.kind, count, "counted objects");
            Ok(Collected::Count {
                of: self.kind,
                count,
            })
        })
    }
}
