//! Condition detection for collected records.

use pulse_collect::{
    ContainerState, NamespaceRecord, NodePressure, NodeRecord, PodPhase, PodRecord,
};

use crate::scorer::{Finding, Scorable};
use crate::weights::{ConditionKind, HealthThresholds};

const COMPLETED: &str = "Completed";

impl Scorable for NodeRecord {
    fn findings(&self, _thresholds: &HealthThresholds) -> Vec<Finding> {
        let mut findings = Vec::new();
        if !self.ready {
            findings.push(Finding::new(ConditionKind::NodeNotReady, "node is not ready"));
        }
        if self.unschedulable {
            findings.push(Finding::new(
                ConditionKind::NodeUnschedulable,
                "node is cordoned",
            ));
        }
        if !self.taints.is_empty() {
            findings.push(Finding::repeated(
                ConditionKind::NodeTainted,
                self.taints.len() as u32,
                format!("node has taints: {}", self.taints.join(", ")),
            ));
        }
        for pressure in &self.pressures {
            let (kind, detail) = match pressure {
                NodePressure::Memory => (ConditionKind::MemoryPressure, "memory pressure"),
                NodePressure::Disk => (ConditionKind::DiskPressure, "disk pressure"),
                NodePressure::Pid => (ConditionKind::PidPressure, "PID pressure"),
                NodePressure::NetworkUnavailable => {
                    (ConditionKind::NetworkUnavailable, "network unavailable")
                }
            };
            findings.push(Finding::new(kind, detail));
        }
        let quantities = [
            ("capacity cpu", &self.capacity.cpu),
            ("capacity memory", &self.capacity.memory),
            ("allocatable cpu", &self.allocatable.cpu),
            ("allocatable memory", &self.allocatable.memory),
        ];
        for (label, quantity) in quantities {
            if let Some(anomaly) = quantity.anomaly() {
                findings.push(Finding::new(
                    ConditionKind::QuantityAnomaly,
                    format!("{label}: {anomaly}"),
                ));
            }
        }
        findings
    }
}

/// A node together with the share of its allocatable resources requested by
/// the pods bound to it.
#[derive(Debug, Clone, Copy)]
pub struct NodeUsage<'a> {
    /// The node.
    pub node: &'a NodeRecord,
    /// Requested CPU as a percentage of allocatable.
    pub cpu_percent: f64,
    /// Requested memory as a percentage of allocatable.
    pub memory_percent: f64,
}

impl Scorable for NodeUsage<'_> {
    fn findings(&self, thresholds: &HealthThresholds) -> Vec<Finding> {
        let mut findings = self.node.findings(thresholds);
        if self.cpu_percent > thresholds.cpu_percent {
            findings.push(Finding::new(
                ConditionKind::HighCpuUsage,
                format!("CPU requests at {:.1}% of allocatable", self.cpu_percent),
            ));
        }
        if self.memory_percent > thresholds.memory_percent {
            findings.push(Finding::new(
                ConditionKind::HighMemoryUsage,
                format!("memory requests at {:.1}% of allocatable", self.memory_percent),
            ));
        }
        findings
    }
}

impl Scorable for PodRecord {
    fn findings(&self, thresholds: &HealthThresholds) -> Vec<Finding> {
        let mut findings = Vec::new();
        match self.phase {
            PodPhase::Pending => {
                findings.push(Finding::new(ConditionKind::PodPending, "pod is pending"));
            }
            PodPhase::Failed => {
                let detail = match &self.reason {
                    Some(reason) => format!("pod failed ({reason})"),
                    None => "pod failed".to_string(),
                };
                findings.push(Finding::new(ConditionKind::PodFailed, detail));
            }
            PodPhase::Unknown => {
                findings.push(Finding::new(ConditionKind::PodUnknown, "pod phase is unknown"));
            }
            PodPhase::Running | PodPhase::Succeeded => {}
        }

        // completed pods keep their terminated containers
        if self.phase != PodPhase::Succeeded {
            for container in &self.containers {
                if !container.ready {
                    findings.push(Finding::new(
                        ConditionKind::ContainerNotReady,
                        format!("container {} is not ready", container.name),
                    ));
                }
                if !container.state.is_running() && !is_completed(&container.state) {
                    findings.push(Finding::new(
                        ConditionKind::ContainerNotRunning,
                        format!("container {} is {}", container.name, container.state),
                    ));
                }
            }
        }

        for container in &self.containers {
            if container.restarts > thresholds.restart_count {
                findings.push(Finding::repeated(
                    ConditionKind::ContainerRestarts,
                    container.restarts,
                    format!(
                        "container {} restarted {} times",
                        container.name, container.restarts
                    ),
                ));
            }
            for advisory in &container.advisories {
                findings.push(Finding::new(
                    ConditionKind::LimitAdvisory,
                    format!("container {}: {advisory}", container.name),
                ));
            }
        }

        if self.phase == PodPhase::Running && !self.ready {
            findings.push(Finding::new(ConditionKind::PodNotReady, "pod is not ready"));
        }
        if !self.scheduled {
            findings.push(Finding::new(
                ConditionKind::PodUnscheduled,
                "pod could not be scheduled",
            ));
        }
        findings
    }
}

fn is_completed(state: &ContainerState) -> bool {
    matches!(state, ContainerState::Terminated { reason: Some(r) } if r == COMPLETED)
}

/// A namespace together with the number of its pods that are not healthy.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceLoad<'a> {
    /// The namespace.
    pub namespace: &'a NamespaceRecord,
    /// Pods in the namespace whose status needs attention.
    pub unhealthy_pods: usize,
}

impl Scorable for NamespaceLoad<'_> {
    fn findings(&self, _thresholds: &HealthThresholds) -> Vec<Finding> {
        let mut findings = Vec::new();
        if self.namespace.is_terminating() {
            findings.push(Finding::new(
                ConditionKind::NamespaceTerminating,
                "namespace is terminating",
            ));
        }
        if self.unhealthy_pods > 0 {
            findings.push(Finding::repeated(
                ConditionKind::UnhealthyPods,
                self.unhealthy_pods as u32,
                format!("{} unhealthy pods", self.unhealthy_pods),
            ));
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{HealthScorer, HealthStatus};
    use pulse_collect::model::{Namespace, Node, Pod};
    use serde_json::{Value, json};

    fn bare_node(value: Value) -> NodeRecord {
        NodeRecord::from(serde_json::from_value::<Node>(value).unwrap())
    }

    /// A node reporting well-formed capacity and allocatable figures.
    fn node(mut value: Value) -> NodeRecord {
        let figures = json!({"cpu": "4", "memory": "16Gi", "pods": "110"});
        let status = value
            .as_object_mut()
            .unwrap()
            .entry("status")
            .or_insert_with(|| json!({}))
            .as_object_mut()
            .unwrap();
        status.entry("capacity").or_insert_with(|| figures.clone());
        status.entry("allocatable").or_insert(figures);
        bare_node(value)
    }

    fn pod(value: Value) -> PodRecord {
        PodRecord::from(serde_json::from_value::<Pod>(value).unwrap())
    }

    fn kinds(findings: &[Finding]) -> Vec<ConditionKind> {
        findings.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn healthy_node_scores_full() {
        let ready = node(json!({
            "metadata": {"name": "n1"},
            "status": {"conditions": [{"type": "Ready", "status": "True"}]}
        }));
        let assessment = HealthScorer::default().assess(&ready);
        assert_eq!(assessment.score, 100);
        assert!(assessment.findings.is_empty());
    }

    #[test]
    fn node_conditions_accumulate() {
        let sick = node(json!({
            "metadata": {"name": "n2"},
            "spec": {
                "unschedulable": true,
                "taints": [
                    {"key": "a", "effect": "NoSchedule"},
                    {"key": "b", "effect": "NoSchedule"}
                ]
            },
            "status": {"conditions": [
                {"type": "Ready", "status": "True"},
                {"type": "DiskPressure", "status": "True"}
            ]}
        }));
        let findings = sick.findings(&HealthThresholds::default());
        assert_eq!(
            kinds(&findings),
            vec![
                ConditionKind::NodeUnschedulable,
                ConditionKind::NodeTainted,
                ConditionKind::DiskPressure
            ]
        );
        // 100 - 20 - 10 - 25
        assert_eq!(HealthScorer::default().score(&sick), 45);
    }

    #[test]
    fn not_ready_node_loses_the_ready_penalty() {
        let down = node(json!({"metadata": {"name": "n3"}}));
        assert_eq!(HealthScorer::default().score(&down), 50);
    }

    #[test]
    fn unusable_quantities_lower_the_score() {
        let garbled = bare_node(json!({
            "metadata": {"name": "n4"},
            "status": {
                "conditions": [{"type": "Ready", "status": "True"}],
                "capacity": {"cpu": "lots", "memory": "16Gi"},
                "allocatable": {"cpu": "lots", "memory": "garbage"}
            }
        }));
        let assessment = HealthScorer::default().assess(&garbled);
        assert_eq!(
            kinds(&assessment.findings),
            vec![ConditionKind::QuantityAnomaly; 3]
        );
        // 100 - min(3 * 10, 30)
        assert_eq!(assessment.score, 70);
        assert!(
            assessment
                .indicators()
                .iter()
                .any(|i| i.starts_with("allocatable memory: "))
        );

        let silent = bare_node(json!({
            "metadata": {"name": "n5"},
            "status": {"conditions": [{"type": "Ready", "status": "True"}]}
        }));
        assert_eq!(HealthScorer::default().score(&silent), 70);
    }

    #[test]
    fn usage_above_threshold_is_flagged() {
        let ready = node(json!({
            "metadata": {"name": "n1"},
            "status": {"conditions": [{"type": "Ready", "status": "True"}]}
        }));
        let usage = NodeUsage {
            node: &ready,
            cpu_percent: 95.0,
            memory_percent: 40.0,
        };
        let assessment = HealthScorer::default().assess(&usage);
        assert_eq!(kinds(&assessment.findings), vec![ConditionKind::HighCpuUsage]);
        assert_eq!(assessment.score, 85);
    }

    #[test]
    fn crashlooping_pod() {
        let crashing = pod(json!({
            "metadata": {"name": "web", "namespace": "shop"},
            "spec": {"containers": [{
                "name": "app",
                "resources": {"requests": {"cpu": "100m"}, "limits": {"cpu": "200m", "memory": "128Mi"}}
            }]},
            "status": {
                "phase": "Running",
                "conditions": [{"type": "Ready", "status": "False"}],
                "containerStatuses": [{
                    "name": "app",
                    "ready": false,
                    "restartCount": 3,
                    "state": {"waiting": {"reason": "CrashLoopBackOff"}}
                }]
            }
        }));
        let assessment = HealthScorer::default().assess(&crashing);
        assert_eq!(
            kinds(&assessment.findings),
            vec![
                ConditionKind::ContainerNotReady,
                ConditionKind::ContainerNotRunning,
                ConditionKind::ContainerRestarts,
                ConditionKind::PodNotReady
            ]
        );
        // 100 - 20 - 15 - 15 - 20
        assert_eq!(assessment.score, 30);
        assert_eq!(assessment.status, HealthStatus::Critical);
        assert!(
            assessment
                .indicators()
                .contains(&"container app is waiting (CrashLoopBackOff)".to_string())
        );
    }

    #[test]
    fn completed_pod_is_healthy() {
        let done = pod(json!({
            "metadata": {"name": "job-x", "namespace": "batch"},
            "spec": {"containers": [{
                "name": "run",
                "resources": {"limits": {"cpu": "1", "memory": "1Gi"}}
            }]},
            "status": {
                "phase": "Succeeded",
                "containerStatuses": [{
                    "name": "run",
                    "ready": false,
                    "state": {"terminated": {"reason": "Completed"}}
                }]
            }
        }));
        assert_eq!(HealthScorer::default().score(&done), 100);
    }

    #[test]
    fn missing_limits_are_advisories() {
        let unbounded = pod(json!({
            "metadata": {"name": "free", "namespace": "default"},
            "spec": {"containers": [{"name": "c"}]},
            "status": {
                "phase": "Running",
                "conditions": [{"type": "Ready", "status": "True"}],
                "containerStatuses": [{"name": "c", "ready": true, "state": {"running": {}}}]
            }
        }));
        let findings = unbounded.findings(&HealthThresholds::default());
        assert_eq!(
            kinds(&findings),
            vec![ConditionKind::LimitAdvisory, ConditionKind::LimitAdvisory]
        );
        assert_eq!(HealthScorer::default().score(&unbounded), 90);
    }

    #[test]
    fn pending_unscheduled_pod() {
        let stuck = pod(json!({
            "metadata": {"name": "p", "namespace": "default"},
            "status": {
                "phase": "Pending",
                "conditions": [{"type": "PodScheduled", "status": "False"}]
            }
        }));
        let findings = stuck.findings(&HealthThresholds::default());
        assert_eq!(
            kinds(&findings),
            vec![ConditionKind::PodPending, ConditionKind::PodUnscheduled]
        );
    }

    #[test]
    fn terminating_namespace_with_unhealthy_pods() {
        let ns = NamespaceRecord::from(
            serde_json::from_value::<Namespace>(json!({
                "metadata": {"name": "old"},
                "status": {"phase": "Terminating"}
            }))
            .unwrap(),
        );
        let load = NamespaceLoad {
            namespace: &ns,
            unhealthy_pods: 6,
        };
        // 100 - 30 - min(60, 40)
        assert_eq!(HealthScorer::default().score(&load), 30);
    }
}
