//! Aggregates returned by the monitor.
//!
//! Every count or figure whose collector failed is `None`, which serializes
//! as `null`. A zero always means "observed zero".

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use pulse_collect::{CollectorError, NodeInfo, Owner, PodPhase, ResourceKind};
use pulse_health::HealthStatus;
use serde::Serialize;

/// The aggregates the monitor produces; also the cache key kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    /// Cluster-wide counts and totals.
    Overview,
    /// Per-node details.
    Nodes,
    /// Per-pod details.
    Pods,
    /// Per-namespace details.
    Namespaces,
}

impl AggregateKind {
    /// Every aggregate kind.
    pub const ALL: [Self; 4] = [Self::Overview, Self::Nodes, Self::Pods, Self::Namespaces];

    /// Returns the name used in cache keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Nodes => "nodes",
            Self::Pods => "pods",
            Self::Namespaces => "namespaces",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A kind that could not be collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degraded {
    /// The kind.
    pub kind: ResourceKind,
    /// Why it failed.
    pub reason: String,
}

impl From<&CollectorError> for Degraded {
    fn from(error: &CollectorError) -> Self {
        let reason = match error {
            CollectorError::Client { source, .. } => source.to_string(),
            CollectorError::Timeout { timeout_ms, .. } => format!("timed out after {timeout_ms}ms"),
        };
        Self {
            kind: error.kind(),
            reason,
        }
    }
}

/// An assembled value plus how complete and how fresh it is.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregate<T> {
    /// The assembled value.
    pub data: T,
    /// At least one needed kind failed.
    pub partial: bool,
    /// The kinds that failed, with reasons.
    pub degraded: Vec<Degraded>,
    /// Malformed objects skipped while collecting.
    pub skipped: usize,
    /// When the data was collected.
    pub fetched_at: DateTime<Utc>,
    /// Served without collecting during this call.
    pub cached: bool,
    /// Older than its TTL.
    pub stale: bool,
    /// The refresh failure that caused a stale value to be served.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
}

/// Node readiness counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NodeCounts {
    /// All nodes.
    pub total: usize,
    /// `Ready` nodes.
    pub ready: usize,
    /// Nodes that are not ready.
    pub not_ready: usize,
}

/// Pod phase histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PodCounts {
    /// All pods.
    pub total: usize,
    /// Running.
    pub running: usize,
    /// Pending.
    pub pending: usize,
    /// Failed.
    pub failed: usize,
    /// Succeeded.
    pub succeeded: usize,
    /// Unknown or unrecognized phase.
    pub unknown: usize,
}

impl PodCounts {
    /// Counts one pod in `phase`.
    pub fn record(&mut self, phase: PodPhase) {
        self.total += 1;
        match phase {
            PodPhase::Running => self.running += 1,
            PodPhase::Pending => self.pending += 1,
            PodPhase::Failed => self.failed += 1,
            PodPhase::Succeeded => self.succeeded += 1,
            PodPhase::Unknown => self.unknown += 1,
        }
    }
}

/// Workload counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WorkloadCounts {
    /// Pods by phase.
    pub pods: Option<PodCounts>,
    /// Deployments.
    pub deployments: Option<usize>,
}

/// Service discovery counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiscoveryCounts {
    /// Services.
    pub services: Option<usize>,
    /// Mesh gateways.
    pub gateways: Option<usize>,
}

/// Configuration object counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfigCounts {
    /// Config maps.
    pub config_maps: Option<usize>,
    /// Secrets.
    pub secrets: Option<usize>,
    /// Namespaces.
    pub namespaces: Option<usize>,
}

/// Summed pod requests and limits.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ResourceUsage {
    /// Requested cores.
    pub cpu_requests: f64,
    /// Requested bytes.
    pub memory_requests: f64,
    /// Core limits.
    pub cpu_limits: f64,
    /// Byte limits.
    pub memory_limits: f64,
    /// Quantities that were malformed or clamped and counted as zero.
    pub anomalies: usize,
}

/// A score and its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    /// Score from 0 to 100.
    pub score: u8,
    /// Classification of the score.
    pub status: HealthStatus,
}

/// Cluster-level health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClusterHealth {
    /// Health of the node fleet.
    pub nodes: Option<HealthSummary>,
    /// Health of the pod population.
    pub pods: Option<HealthSummary>,
}

/// Cluster-wide counts, totals and health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceOverview {
    /// Node readiness.
    pub nodes: Option<NodeCounts>,
    /// Pods and deployments.
    pub workloads: WorkloadCounts,
    /// Services and gateways.
    pub discovery: DiscoveryCounts,
    /// Config maps, secrets and namespaces.
    pub configs: ConfigCounts,
    /// Requests and limits; `None` when pods could not be listed.
    pub resources: Option<ResourceUsage>,
    /// Cluster-level scores.
    pub health: ClusterHealth,
    /// When the overview was assembled.
    pub last_updated: DateTime<Utc>,
}

/// Formatted CPU, memory and pod slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceFigures {
    /// CPU, e.g. `3.50` or `250m`.
    pub cpu: String,
    /// Memory, e.g. `7.50Gi`.
    pub memory: String,
    /// Pod slots.
    pub pods: u32,
}

/// Requests of the pods bound to a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeAllocation {
    /// Requested CPU, formatted.
    pub cpu: String,
    /// Requested memory, formatted.
    pub memory: String,
    /// Requested CPU as a percentage of allocatable.
    pub cpu_percent: f64,
    /// Requested memory as a percentage of allocatable.
    pub memory_percent: f64,
    /// Non-terminated pods bound to the node.
    pub pods: usize,
}

/// One node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetail {
    /// Node name.
    pub name: String,
    /// `Ready` or `NotReady`.
    pub status: String,
    /// Roles.
    pub roles: Vec<String>,
    /// Cordoned.
    pub unschedulable: bool,
    /// Software versions.
    pub info: NodeInfo,
    /// Total resources.
    pub capacity: ResourceFigures,
    /// Resources available to pods.
    pub allocatable: ResourceFigures,
    /// Requests bound to the node; `None` when pods could not be listed.
    pub requested: Option<NodeAllocation>,
    /// Taints.
    pub taints: Vec<String>,
    /// Detected problems.
    pub error_indicators: Vec<String>,
    /// Score from 0 to 100.
    pub health_score: u8,
    /// Classification of the score.
    pub health_status: HealthStatus,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

/// Formatted container requests or limits; `None` when undeclared.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ContainerResources {
    /// CPU.
    pub cpu: Option<String>,
    /// Memory.
    pub memory: Option<String>,
}

/// One container of a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerDetail {
    /// Container name.
    pub name: String,
    /// State, e.g. `waiting (CrashLoopBackOff)`.
    pub state: String,
    /// Passing readiness checks.
    pub ready: bool,
    /// Restarts.
    pub restarts: u32,
    /// Requests.
    pub requests: ContainerResources,
    /// Limits.
    pub limits: ContainerResources,
    /// Request/limit advisories.
    pub advisories: Vec<String>,
}

/// One pod.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodDetail {
    /// Pod name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Phase.
    pub phase: PodPhase,
    /// Reason for the phase.
    pub reason: Option<String>,
    /// Node the pod is bound to.
    pub node_name: Option<String>,
    /// `Ready` condition is true.
    pub ready: bool,
    /// Controlling owner.
    pub owner: Option<Owner>,
    /// Total restarts.
    pub restarts: u32,
    /// Containers.
    pub containers: Vec<ContainerDetail>,
    /// Detected problems.
    pub error_indicators: Vec<String>,
    /// Score from 0 to 100.
    pub health_score: u8,
    /// Classification of the score.
    pub health_status: HealthStatus,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl PodDetail {
    /// Returns `namespace/name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// One namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceDetail {
    /// Namespace name.
    pub name: String,
    /// Phase, `Unknown` when namespaces could not be listed.
    pub status: String,
    /// Pods.
    pub pods: Option<usize>,
    /// Deployments.
    pub deployments: Option<usize>,
    /// Services.
    pub services: Option<usize>,
    /// Pods whose health needs attention.
    pub unhealthy_pods: Option<usize>,
    /// Detected problems.
    pub error_indicators: Vec<String>,
    /// Score from 0 to 100.
    pub health_score: u8,
    /// Classification of the score.
    pub health_status: HealthStatus,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_collect::ClientError;

    #[test]
    fn pod_counts_by_phase() {
        let mut counts = PodCounts::default();
        for phase in [
            PodPhase::Running,
            PodPhase::Running,
            PodPhase::Pending,
            PodPhase::Unknown,
        ] {
            counts.record(phase);
        }
        assert_eq!(counts.total, 4);
        assert_eq!(counts.running, 2);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.unknown, 1);
    }

    #[test]
    fn degraded_reason_omits_kind() {
        let degraded = Degraded::from(&CollectorError::Client {
            kind: ResourceKind::Secret,
            source: ClientError::Forbidden {
                kind: ResourceKind::Secret,
            },
        });
        assert_eq!(degraded.kind, ResourceKind::Secret);
        assert_eq!(degraded.reason, "access to secrets forbidden");

        let timed_out = Degraded::from(&CollectorError::Timeout {
            kind: ResourceKind::Pod,
            timeout_ms: 500,
        });
        assert_eq!(timed_out.reason, "timed out after 500ms");
    }

    #[test]
    fn failed_counts_serialize_as_null() {
        let counts = ConfigCounts {
            config_maps: Some(3),
            secrets: None,
            namespaces: Some(0),
        };
        let value = serde_json::to_value(counts).unwrap();
        assert_eq!(value["config_maps"], 3);
        assert!(value["secrets"].is_null());
        assert_eq!(value["namespaces"], 0);
    }
}
