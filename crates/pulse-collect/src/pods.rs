//! Pod collection and per-container normalization.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use pulse_quantity::{Advisory, Quantity, parse_cpu, parse_memory, validate_requirements};
use serde::Serialize;
use tracing::trace;

use crate::client::ResourceClient;
use crate::collector::{CollectFuture, Collected, Collector, list_decoded};
use crate::kind::{ResourceKind, Scope};
use crate::model::{Container, ContainerStatus, OwnerReference, Pod, condition};

/// Pod lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PodPhase {
    /// Accepted but not all containers started.
    Pending,
    /// Bound and at least one container running.
    Running,
    /// All containers exited successfully.
    Succeeded,
    /// All containers exited and at least one failed.
    Failed,
    /// State could not be obtained, or the phase is unrecognized.
    Unknown,
}

impl PodPhase {
    /// Parses a phase string, case-insensitively.
    #[must_use]
    pub fn from_phase(phase: Option<&str>) -> Self {
        match phase.map(str::to_ascii_lowercase).as_deref() {
            Some("pending") => Self::Pending,
            Some("running") => Self::Running,
            Some("succeeded") => Self::Succeeded,
            Some("failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Returns the canonical phase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContainerState {
    /// Running.
    Running,
    /// Waiting to start, e.g. `CrashLoopBackOff`.
    Waiting {
        /// Reported reason.
        reason: Option<String>,
    },
    /// Exited.
    Terminated {
        /// Reported reason.
        reason: Option<String>,
    },
    /// No status reported.
    Unknown,
}

impl ContainerState {
    /// Returns true if running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    fn from_status(status: &ContainerStatus) -> Self {
        let state = &status.state;
        if state.running.is_some() {
            Self::Running
        } else if let Some(waiting) = &state.waiting {
            Self::Waiting {
                reason: waiting.reason.clone(),
            }
        } else if let Some(terminated) = &state.terminated {
            Self::Terminated {
                reason: terminated.reason.clone(),
            }
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Waiting { reason: Some(r) } => write!(f, "waiting ({r})"),
            Self::Waiting { reason: None } => f.write_str("waiting"),
            Self::Terminated { reason: Some(r) } => write!(f, "terminated ({r})"),
            Self::Terminated { reason: None } => f.write_str("terminated"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// CPU and memory amounts; `None` when not declared.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResourcePair {
    /// CPU in cores.
    pub cpu: Option<Quantity>,
    /// Memory in bytes.
    pub memory: Option<Quantity>,
}

impl ResourcePair {
    fn parse(map: &BTreeMap<String, String>) -> Self {
        Self {
            cpu: map.get("cpu").map(|raw| parse_cpu(raw)),
            memory: map.get("memory").map(|raw| parse_memory(raw)),
        }
    }

    /// Returns the CPU value, zero when undeclared or unparseable.
    #[must_use]
    pub fn cpu_cores(&self) -> f64 {
        self.cpu.as_ref().map_or(0.0, Quantity::value)
    }

    /// Returns the memory value, zero when undeclared or unparseable.
    #[must_use]
    pub fn memory_bytes(&self) -> f64 {
        self.memory.as_ref().map_or(0.0, Quantity::value)
    }

    fn anomalous(&self) -> bool {
        self.cpu.as_ref().is_some_and(Quantity::is_anomalous)
            || self.memory.as_ref().is_some_and(Quantity::is_anomalous)
    }
}

/// Summed CPU and memory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ResourceTotals {
    /// Cores.
    pub cpu: f64,
    /// Bytes.
    pub memory: f64,
}

impl ResourceTotals {
    /// Adds another total.
    pub fn add(&mut self, other: Self) {
        self.cpu += other.cpu;
        self.memory += other.memory;
    }
}

/// A normalized container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerRecord {
    /// Container name.
    pub name: String,
    /// Requests.
    pub requests: ResourcePair,
    /// Limits.
    pub limits: ResourcePair,
    /// Request/limit advisories.
    pub advisories: Vec<Advisory>,
    /// Passing readiness checks.
    pub ready: bool,
    /// Current state.
    pub state: ContainerState,
    /// Restarts so far.
    pub restarts: u32,
}

impl ContainerRecord {
    fn build(container: &Container, status: Option<&ContainerStatus>) -> Self {
        let resources = &container.resources;
        let record = Self {
            name: container.name.clone(),
            requests: ResourcePair::parse(&resources.requests),
            limits: ResourcePair::parse(&resources.limits),
            advisories: validate_requirements(&resources.requests, &resources.limits),
            ready: status.is_some_and(|s| s.ready),
            state: status.map_or(ContainerState::Unknown, ContainerState::from_status),
            restarts: status.map_or(0, |s| s.restart_count),
        };
        if record.requests.anomalous() || record.limits.anomalous() {
            trace!(container = %record.name, "container carries anomalous quantities");
        }
        record
    }
}

/// The controlling owner of a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Owner {
    /// Owner kind.
    pub kind: String,
    /// Owner name.
    pub name: String,
}

impl Owner {
    fn select(references: &[OwnerReference]) -> Option<Self> {
        references
            .iter()
            .find(|r| r.controller == Some(true))
            .or_else(|| references.first())
            .map(|r| Self {
                kind: r.kind.clone(),
                name: r.name.clone(),
            })
    }
}

/// A normalized pod.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodRecord {
    /// Pod name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Phase.
    pub phase: PodPhase,
    /// Reason for the phase, e.g. `Evicted`.
    pub reason: Option<String>,
    /// Node the pod is bound to.
    pub node_name: Option<String>,
    /// `Ready` condition is true.
    pub ready: bool,
    /// `PodScheduled` is not false.
    pub scheduled: bool,
    /// Containers in spec order.
    pub containers: Vec<ContainerRecord>,
    /// Controlling owner.
    pub owner: Option<Owner>,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl PodRecord {
    /// Returns the summed container requests.
    #[must_use]
    pub fn requests(&self) -> ResourceTotals {
        self.sum(|c| &c.requests)
    }

    /// Returns the summed container limits.
    #[must_use]
    pub fn limits(&self) -> ResourceTotals {
        self.sum(|c| &c.limits)
    }

    /// Returns the total restarts across containers.
    #[must_use]
    pub fn restarts(&self) -> u32 {
        self.containers.iter().map(|c| c.restarts).sum()
    }

    /// Returns `namespace/name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    fn sum(&self, pick: impl Fn(&ContainerRecord) -> &ResourcePair) -> ResourceTotals {
        self.containers
            .iter()
            .map(pick)
            .fold(ResourceTotals::default(), |mut totals, pair| {
                totals.add(ResourceTotals {
                    cpu: pair.cpu_cores(),
                    memory: pair.memory_bytes(),
                });
                totals
            })
    }
}

impl From<Pod> for PodRecord {
    fn from(pod: Pod) -> Self {
        let status = &pod.status;
        let containers = pod
            .spec
            .containers
            .iter()
            .map(|container| {
                let container_status = status
                    .container_statuses
                    .iter()
                    .find(|s| s.name == container.name);
                ContainerRecord::build(container, container_status)
            })
            .collect();

        Self {
            namespace: pod.metadata.namespace.unwrap_or_else(|| "default".to_string()),
            phase: PodPhase::from_phase(status.phase.as_deref()),
            reason: status.reason.clone(),
            node_name: pod.spec.node_name.clone(),
            ready: condition(&status.conditions, "Ready").is_some_and(|c| c.is_true()),
            scheduled: condition(&status.conditions, "PodScheduled")
                .is_none_or(|c| c.status != "False"),
            containers,
            owner: Owner::select(&pod.metadata.owner_references),
            name: pod.metadata.name,
            labels: pod.metadata.labels,
            created_at: pod.metadata.creation_timestamp,
        }
    }
}

/// Lists pods within a scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct PodCollector;

impl Collector for PodCollector {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Pod
    }

    fn fetch<'a>(&'a self, client: &'a dyn ResourceClient, scope: &'a Scope) -> CollectFuture<'a> {
        Box::pin(async move {
            let pods = list_decoded::<Pod>(client, ResourceKind::Pod, scope).await?;
            Ok(Collected::Pods(pods.map(PodRecord::from)))
        })
    }
}
