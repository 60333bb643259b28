//! Node collection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pulse_quantity::{Quantity, parse_cpu, parse_memory};
use serde::Serialize;

use crate::client::ResourceClient;
use crate::collector::{CollectFuture, Collected, Collector, list_decoded};
use crate::kind::{ResourceKind, Scope};
use crate::model::{Node, condition};

const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

/// Adverse node conditions reported by the node agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePressure {
    /// `MemoryPressure` is true.
    Memory,
    /// `DiskPressure` is true.
    Disk,
    /// `PIDPressure` is true.
    Pid,
    /// `NetworkUnavailable` is true.
    NetworkUnavailable,
}

impl NodePressure {
    const CONDITIONS: [(&'static str, Self); 4] = [
        ("MemoryPressure", Self::Memory),
        ("DiskPressure", Self::Disk),
        ("PIDPressure", Self::Pid),
        ("NetworkUnavailable", Self::NetworkUnavailable),
    ];

    /// Returns the condition type that reports this pressure.
    #[must_use]
    pub const fn condition_type(self) -> &'static str {
        match self {
            Self::Memory => "MemoryPressure",
            Self::Disk => "DiskPressure",
            Self::Pid => "PIDPressure",
            Self::NetworkUnavailable => "NetworkUnavailable",
        }
    }
}

/// Software versions on a node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NodeInfo {
    /// Node agent version.
    pub kubelet_version: String,
    /// Operating system image.
    pub os_image: String,
    /// Kernel version.
    pub kernel_version: String,
    /// Container runtime.
    pub container_runtime: String,
}

/// CPU, memory and pod slots of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResources {
    /// CPU in cores.
    pub cpu: Quantity,
    /// Memory in bytes.
    pub memory: Quantity,
    /// Pod slots.
    pub pods: u32,
}

impl NodeResources {
    fn parse(map: &BTreeMap<String, String>) -> Self {
        let raw = |name: &str| map.get(name).map_or("", String::as_str);
        Self {
            cpu: parse_cpu(raw("cpu")),
            memory: parse_memory(raw("memory")),
            pods: raw("pods").trim().parse().unwrap_or(0),
        }
    }
}

/// A normalized node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    /// Node name.
    pub name: String,
    /// `Ready` condition is true.
    pub ready: bool,
    /// Roles from `node-role.kubernetes.io/*` labels; `worker` when none.
    pub roles: Vec<String>,
    /// Cordoned.
    pub unschedulable: bool,
    /// Taints rendered as `key[=value]:effect`.
    pub taints: Vec<String>,
    /// Active pressure conditions.
    pub pressures: Vec<NodePressure>,
    /// Software versions.
    pub info: NodeInfo,
    /// Total resources.
    pub capacity: NodeResources,
    /// Resources available to pods.
    pub allocatable: NodeResources,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl NodeRecord {
    /// Returns `Ready` or `NotReady`.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        if self.ready { "Ready" } else { "NotReady" }
    }
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        let conditions = &node.status.conditions;
        let ready = condition(conditions, "Ready").is_some_and(|c| c.is_true());
        let pressures = NodePressure::CONDITIONS
            .into_iter()
            .filter(|(type_, _)| condition(conditions, type_).is_some_and(|c| c.is_true()))
            .map(|(_, pressure)| pressure)
            .collect();

        let mut roles: Vec<String> = node
            .metadata
            .labels
            .keys()
            .filter_map(|key| key.strip_prefix(ROLE_LABEL_PREFIX))
            .filter(|role| !role.is_empty())
            .map(str::to_string)
            .collect();
        if roles.is_empty() {
            roles.push("worker".to_string());
        }

        let taints = node
            .spec
            .taints
            .iter()
            .map(|t| match &t.value {
                Some(value) => format!("{}={}:{}", t.key, value, t.effect),
                None => format!("{}:{}", t.key, t.effect),
            })
            .collect();

        let info = node
            .status
            .node_info
            .map(|info| NodeInfo {
                kubelet_version: info.kubelet_version,
                os_image: info.os_image,
                kernel_version: info.kernel_version,
                container_runtime: info.container_runtime_version,
            })
            .unwrap_or_default();

        Self {
            name: node.metadata.name,
            ready,
            roles,
            unschedulable: node.spec.unschedulable,
            taints,
            pressures,
            info,
            capacity: NodeResources::parse(&node.status.capacity),
            allocatable: NodeResources::parse(&node.status.allocatable),
            labels: node.metadata.labels,
            created_at: node.metadata.creation_timestamp,
        }
    }
}

/// Lists nodes. Nodes are cluster-scoped, so the scope is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCollector;

impl Collector for NodeCollector {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Node
    }

    fn fetch<'a>(&'a self, client: &'a dyn ResourceClient, _scope: &'a Scope) -> CollectFuture<'a> {
        Box::pin(async move {
            let nodes = list_decoded::<Node>(client, ResourceKind::Node, &Scope::All).await?;
            Ok(Collected::Nodes(nodes.map(NodeRecord::from)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotClient;
    use serde_json::json;

    fn node_json() -> serde_json::Value {
        json!({
            "metadata": {
                "name": "node-1",
                "labels": {
                    "node-role.kubernetes.io/control-plane": "",
                    "kubernetes.io/hostname": "node-1"
                },
                "creationTimestamp": "2024-03-01T10:00:00Z"
            },
            "spec": {
                "unschedulable": true,
                "taints": [{"key": "dedicated", "value": "gpu", "effect": "NoSchedule"}]
            },
            "status": {
                "conditions": [
                    {"type": "Ready", "status": "True"},
                    {"type": "MemoryPressure", "status": "True"},
                    {"type": "DiskPressure", "status": "False"}
                ],
                "capacity": {"cpu": "4", "memory": "16Gi", "pods": "110"},
                "allocatable": {"cpu": "3800m", "memory": "15Gi", "pods": "110"},
                "nodeInfo": {
                    "kubeletVersion": "v1.29.2",
                    "osImage": "Ubuntu 22.04",
                    "kernelVersion": "6.1.0",
                    "containerRuntimeVersion": "containerd://1.7.2"
                }
            }
        })
    }

    #[test]
    fn normalizes_node() {
        let node: Node = serde_json::from_value(node_json()).unwrap();
        let record = NodeRecord::from(node);

        assert!(record.ready);
        assert_eq!(record.status(), "Ready");
        assert_eq!(record.roles, vec!["control-plane".to_string()]);
        assert!(record.unschedulable);
        assert_eq!(record.taints, vec!["dedicated=gpu:NoSchedule".to_string()]);
        assert_eq!(record.pressures, vec![NodePressure::Memory]);
        assert!((record.allocatable.cpu.value() - 3.8).abs() < 1e-9);
        assert_eq!(record.capacity.memory.value(), 16.0 * 1024.0 * 1024.0 * 1024.0);
        assert_eq!(record.capacity.pods, 110);
        assert_eq!(record.info.kubelet_version, "v1.29.2");
        assert!(record.created_at.is_some());
    }

    #[test]
    fn bare_node_is_not_ready_worker() {
        let node: Node = serde_json::from_value(json!({"metadata": {"name": "bare"}})).unwrap();
        let record = NodeRecord::from(node);
        assert!(!record.ready);
        assert_eq!(record.roles, vec!["worker".to_string()]);
        assert!(record.capacity.cpu.is_anomalous());
        assert_eq!(record.capacity.pods, 0);
    }

    #[tokio::test]
    async fn collector_skips_malformed_nodes() {
        let client = SnapshotClient::new().with_objects(
            ResourceKind::Node,
            vec![node_json(), json!({"metadata": {"labels": {}}})],
        );
        let collected = NodeCollector.fetch(&client, &Scope::All).await.unwrap();
        assert_eq!(collected.kind(), ResourceKind::Node);
        assert_eq!(collected.count(), 1);
        assert_eq!(collected.skipped(), 1);
    }
}
