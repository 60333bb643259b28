//! Wire shapes of the objects returned by the cluster API.
//!
//! Only the fields the collectors read are modelled. Everything except the
//! object name is optional so partially populated objects still decode.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Object metadata shared by every kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name.
    pub name: String,
    /// Namespace for namespaced kinds.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Creation time.
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// Controlling and owning objects.
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
}

/// A reference to an owning object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    /// Owner kind, e.g. `ReplicaSet`.
    pub kind: String,
    /// Owner name.
    pub name: String,
    /// Whether this owner is the managing controller.
    #[serde(default)]
    pub controller: Option<bool>,
}

/// A status condition.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, e.g. `Ready`.
    #[serde(rename = "type")]
    pub type_: String,
    /// `True`, `False` or `Unknown`.
    #[serde(default)]
    pub status: String,
    /// Machine-readable reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    /// Returns true if the status is `True`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

/// Finds a condition by type.
pub(crate) fn condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// A compute node.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    /// Metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: NodeSpec,
    /// Observed state.
    #[serde(default)]
    pub status: NodeStatus,
}

/// Node desired state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    /// Cordoned.
    #[serde(default)]
    pub unschedulable: bool,
    /// Taints.
    #[serde(default)]
    pub taints: Vec<Taint>,
}

/// A node taint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Taint {
    /// Taint key.
    pub key: String,
    /// Optional value.
    #[serde(default)]
    pub value: Option<String>,
    /// `NoSchedule`, `PreferNoSchedule` or `NoExecute`.
    #[serde(default)]
    pub effect: String,
}

/// Node observed state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// Conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Total resources.
    #[serde(default)]
    pub capacity: BTreeMap<String, String>,
    /// Resources available to pods.
    #[serde(default)]
    pub allocatable: BTreeMap<String, String>,
    /// Software versions.
    #[serde(default)]
    pub node_info: Option<NodeSystemInfo>,
}

/// Versions reported by the node agent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSystemInfo {
    /// Node agent version.
    #[serde(default)]
    pub kubelet_version: String,
    /// Operating system image.
    #[serde(default)]
    pub os_image: String,
    /// Kernel version.
    #[serde(default)]
    pub kernel_version: String,
    /// Container runtime and version.
    #[serde(default)]
    pub container_runtime_version: String,
}

/// A pod.
#[derive(Debug, Clone, Deserialize)]
pub struct Pod {
    /// Metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: PodSpec,
    /// Observed state.
    #[serde(default)]
    pub status: PodStatus,
}

/// Pod desired state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Node the pod is bound to.
    #[serde(default)]
    pub node_name: Option<String>,
    /// Application containers.
    #[serde(default)]
    pub containers: Vec<Container>,
}

/// A container spec.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Container {
    /// Container name.
    pub name: String,
    /// Resource requests and limits.
    #[serde(default)]
    pub resources: ResourceRequirements,
}

/// Requests and limits keyed by resource name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceRequirements {
    /// Requested amounts.
    #[serde(default)]
    pub requests: BTreeMap<String, String>,
    /// Upper bounds.
    #[serde(default)]
    pub limits: BTreeMap<String, String>,
}

/// Pod observed state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    /// Lifecycle phase.
    #[serde(default)]
    pub phase: Option<String>,
    /// Conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Per-container status.
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
    /// Reason for the current phase.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Observed state of one container.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    /// Container name.
    pub name: String,
    /// Passing readiness checks.
    #[serde(default)]
    pub ready: bool,
    /// Restarts so far.
    #[serde(default)]
    pub restart_count: u32,
    /// Current state.
    #[serde(default)]
    pub state: ContainerStateWire,
}

/// Container state; at most one field is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerStateWire {
    /// Present while running.
    #[serde(default)]
    pub running: Option<serde_json::Value>,
    /// Present while waiting.
    #[serde(default)]
    pub waiting: Option<StateReason>,
    /// Present after exit.
    #[serde(default)]
    pub terminated: Option<StateReason>,
}

/// Reason attached to a waiting or terminated state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateReason {
    /// Machine-readable reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// A namespace.
#[derive(Debug, Clone, Deserialize)]
pub struct Namespace {
    /// Metadata.
    pub metadata: ObjectMeta,
    /// Observed state.
    #[serde(default)]
    pub status: NamespaceStatus,
}

/// Namespace observed state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamespaceStatus {
    /// `Active` or `Terminating`.
    #[serde(default)]
    pub phase: Option<String>,
}

/// A deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    /// Metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: DeploymentSpec,
    /// Observed state.
    #[serde(default)]
    pub status: DeploymentStatus,
}

/// Deployment desired state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentSpec {
    /// Desired replicas; the API defaults this to 1.
    #[serde(default)]
    pub replicas: Option<u32>,
}

/// Deployment observed state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    /// Ready replicas.
    #[serde(default)]
    pub ready_replicas: Option<u32>,
    /// Available replicas.
    #[serde(default)]
    pub available_replicas: Option<u32>,
}

/// A service.
#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    /// Metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: ServiceSpec,
}

/// Service desired state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// `ClusterIP`, `NodePort`, `LoadBalancer` or `ExternalName`.
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
    /// Virtual IP.
    #[serde(default, rename = "clusterIP")]
    pub cluster_ip: Option<String>,
    /// Pod selector.
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
}

/// A mesh gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Gateway {
    /// Metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: GatewaySpec,
}

/// Gateway desired state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySpec {
    /// Labels selecting the gateway workload.
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    /// Listeners.
    #[serde(default)]
    pub servers: Vec<GatewayServer>,
}

/// One gateway listener.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayServer {
    /// Listening port.
    #[serde(default)]
    pub port: Option<GatewayPort>,
    /// Hosts served.
    #[serde(default)]
    pub hosts: Vec<String>,
}

/// Gateway listener port.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayPort {
    /// Port number.
    #[serde(default)]
    pub number: u32,
    /// Protocol, e.g. `HTTPS`.
    #[serde(default)]
    pub protocol: String,
    /// Port name.
    #[serde(default)]
    pub name: String,
}
