//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`report`] - Overview, node, pod and namespace reports
//! - [`digest`] - One-object summaries

pub mod digest;
pub mod report;

pub use digest::DigestCommand;
pub use report::ReportCommand;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use pulse_collect::{ResourceClient, ResourceKind, SnapshotClient, StaticRegistry};
    use pulse_monitor::{ClusterMonitor, MonitorConfig};
    use serde_json::json;

    /// A one-node cluster with a healthy and a crash-looping pod.
    pub(crate) fn monitor() -> ClusterMonitor {
        let client = SnapshotClient::new()
            .with_objects(
                ResourceKind::Node,
                vec![json!({
                    "metadata": {"name": "n1"},
                    "status": {
                        "conditions": [{"type": "Ready", "status": "True"}],
                        "capacity": {"cpu": "4", "memory": "16Gi", "pods": "110"},
                        "allocatable": {"cpu": "4", "memory": "16Gi", "pods": "110"}
                    }
                })],
            )
            .with_objects(
                ResourceKind::Pod,
                vec![
                    json!({
                        "metadata": {"name": "web-0", "namespace": "shop"},
                        "spec": {"nodeName": "n1", "containers": [{"name": "app"}]},
                        "status": {
                            "phase": "Running",
                            "conditions": [{"type": "Ready", "status": "True"}],
                            "containerStatuses": [
                                {"name": "app", "ready": true, "restartCount": 0, "state": {"running": {}}}
                            ]
                        }
                    }),
                    json!({
                        "metadata": {"name": "worker-0", "namespace": "jobs"},
                        "spec": {"nodeName": "n1", "containers": [{"name": "app"}]},
                        "status": {
                            "phase": "Running",
                            "containerStatuses": [{
                                "name": "app",
                                "ready": false,
                                "restartCount": 12,
                                "state": {"waiting": {"reason": "CrashLoopBackOff"}}
                            }]
                        }
                    }),
                ],
            )
            .with_objects(
                ResourceKind::Namespace,
                vec![
                    json!({"metadata": {"name": "jobs"}, "status": {"phase": "Active"}}),
                    json!({"metadata": {"name": "shop"}, "status": {"phase": "Active"}}),
                ],
            );
        let registry = StaticRegistry::new();
        registry.register("prod", Arc::new(client) as Arc<dyn ResourceClient>);
        ClusterMonitor::new(Arc::new(registry), MonitorConfig::default()).unwrap()
    }
}
