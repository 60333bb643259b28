//! Compact summaries of detail objects for agents.

use std::fmt;

use pulse_health::HealthStatus;
use serde::Serialize;

use crate::types::{NamespaceDetail, NodeDetail, PodDetail};

/// How a subject relates to another object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Controlled by the target.
    OwnedBy,
    /// Running on the target node.
    ScheduledOn,
    /// Contained in the target namespace.
    MemberOf,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OwnedBy => write!(f, "owned by"),
            Self::ScheduledOn => write!(f, "scheduled on"),
            Self::MemberOf => write!(f, "member of"),
        }
    }
}

/// A link from the subject to another object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    /// The relation.
    pub relation: Relation,
    /// Kind of the target, e.g. `ReplicaSet` or `Node`.
    pub target_kind: String,
    /// Name of the target.
    pub target: String,
}

impl Relationship {
    fn new(relation: Relation, target_kind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            relation,
            target_kind: target_kind.into(),
            target: target.into(),
        }
    }
}

/// A one-screen summary of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    /// `kind/name`, namespaced where applicable.
    pub subject: String,
    /// One line describing the state.
    pub summary: String,
    /// Score from 0 to 100.
    pub health_score: u8,
    /// Classification of the score.
    pub status: HealthStatus,
    /// Detected problems.
    pub error_indicators: Vec<String>,
    /// Links to related objects.
    pub relationships: Vec<Relationship>,
}

impl From<&PodDetail> for Digest {
    fn from(pod: &PodDetail) -> Self {
        let ready = pod.containers.iter().filter(|c| c.ready).count();
        let mut summary = format!(
            "{} with {}/{} containers ready, {} restarts",
            pod.phase,
            ready,
            pod.containers.len(),
            pod.restarts
        );
        if let Some(reason) = &pod.reason {
            summary.push_str(&format!(" ({reason})"));
        }

        let mut relationships = vec![Relationship::new(
            Relation::MemberOf,
            "Namespace",
            &pod.namespace,
        )];
        if let Some(owner) = &pod.owner {
            relationships.push(Relationship::new(Relation::OwnedBy, &owner.kind, &owner.name));
        }
        if let Some(node) = pod.node_name.as_deref().filter(|n| !n.is_empty()) {
            relationships.push(Relationship::new(Relation::ScheduledOn, "Node", node));
        }

        Self {
            subject: format!("pod/{}", pod.qualified_name()),
            summary,
            health_score: pod.health_score,
            status: pod.health_status,
            error_indicators: pod.error_indicators.clone(),
            relationships,
        }
    }
}

impl From<&NodeDetail> for Digest {
    fn from(node: &NodeDetail) -> Self {
        let mut summary = format!(
            "{} {}, {} CPU / {} memory allocatable",
            node.status,
            node.roles.join(","),
            node.allocatable.cpu,
            node.allocatable.memory
        );
        if let Some(requested) = &node.requested {
            summary.push_str(&format!(
                ", {} pods requesting {:.0}% CPU / {:.0}% memory",
                requested.pods, requested.cpu_percent, requested.memory_percent
            ));
        }
        if node.unschedulable {
            summary.push_str(", cordoned");
        }

        Self {
            subject: format!("node/{}", node.name),
            summary,
            health_score: node.health_score,
            status: node.health_status,
            error_indicators: node.error_indicators.clone(),
            relationships: Vec::new(),
        }
    }
}

impl From<&NamespaceDetail> for Digest {
    fn from(ns: &NamespaceDetail) -> Self {
        let count = |n: Option<usize>| n.map_or_else(|| "?".to_string(), |n| n.to_string());
        let summary = format!(
            "{} with {} pods ({} unhealthy), {} deployments, {} services",
            ns.status,
            count(ns.pods),
            count(ns.unhealthy_pods),
            count(ns.deployments),
            count(ns.services)
        );

        Self {
            subject: format!("namespace/{}", ns.name),
            summary,
            health_score: ns.health_score,
            status: ns.health_status,
            error_indicators: ns.error_indicators.clone(),
            relationships: Vec::new(),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.subject, self.summary)?;
        write!(f, "health: {} ({})", self.health_score, self.status)?;
        for indicator in &self.error_indicators {
            write!(f, "\n  ! {indicator}")?;
        }
        for rel in &self.relationships {
            write!(f, "\n  {} {}/{}", rel.relation, rel.target_kind, rel.target)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContainerDetail, ContainerResources, ResourceFigures};
    use pulse_collect::{NodeInfo, Owner, PodPhase};
    use std::collections::BTreeMap;

    fn crashing_pod() -> PodDetail {
        PodDetail {
            name: "web-7d9".to_string(),
            namespace: "shop".to_string(),
            phase: PodPhase::Running,
            reason: None,
            node_name: Some("node-2".to_string()),
            ready: false,
            owner: Some(Owner {
                kind: "ReplicaSet".to_string(),
                name: "web-7d".to_string(),
            }),
            restarts: 4,
            containers: vec![ContainerDetail {
                name: "app".to_string(),
                state: "waiting (CrashLoopBackOff)".to_string(),
                ready: false,
                restarts: 4,
                requests: ContainerResources::default(),
                limits: ContainerResources::default(),
                advisories: Vec::new(),
            }],
            error_indicators: vec!["container app is waiting (CrashLoopBackOff)".to_string()],
            health_score: 30,
            health_status: HealthStatus::Critical,
            labels: BTreeMap::new(),
            created_at: None,
        }
    }

    #[test]
    fn pod_digest_links_owner_node_and_namespace() {
        let digest = Digest::from(&crashing_pod());
        assert_eq!(digest.subject, "pod/shop/web-7d9");
        assert_eq!(digest.summary, "Running with 0/1 containers ready, 4 restarts");
        let relations: Vec<_> = digest.relationships.iter().map(|r| r.relation).collect();
        assert_eq!(
            relations,
            vec![Relation::MemberOf, Relation::OwnedBy, Relation::ScheduledOn]
        );
        assert_eq!(digest.relationships[1].target, "web-7d");
    }

    #[test]
    fn display_lists_indicators_and_links() {
        let text = Digest::from(&crashing_pod()).to_string();
        assert!(text.starts_with("pod/shop/web-7d9: Running"));
        assert!(text.contains("health: 30 (Critical)"));
        assert!(text.contains("\n  ! container app is waiting (CrashLoopBackOff)"));
        assert!(text.contains("\n  scheduled on Node/node-2"));
    }

    #[test]
    fn node_digest() {
        let node = NodeDetail {
            name: "node-1".to_string(),
            status: "Ready".to_string(),
            roles: vec!["worker".to_string()],
            unschedulable: true,
            info: NodeInfo::default(),
            capacity: ResourceFigures {
                cpu: "4.00".to_string(),
                memory: "16.00Gi".to_string(),
                pods: 110,
            },
            allocatable: ResourceFigures {
                cpu: "3.50".to_string(),
                memory: "15.00Gi".to_string(),
                pods: 110,
            },
            requested: None,
            taints: Vec::new(),
            error_indicators: vec!["node is cordoned".to_string()],
            health_score: 80,
            health_status: HealthStatus::Healthy,
            labels: BTreeMap::new(),
            created_at: None,
        };
        let digest = Digest::from(&node);
        assert_eq!(
            digest.summary,
            "Ready worker, 3.50 CPU / 15.00Gi memory allocatable, cordoned"
        );
        assert!(digest.relationships.is_empty());
    }

    #[test]
    fn namespace_digest_marks_unknown_counts() {
        let ns = NamespaceDetail {
            name: "shop".to_string(),
            status: "Active".to_string(),
            pods: Some(3),
            deployments: None,
            services: Some(1),
            unhealthy_pods: Some(1),
            error_indicators: vec!["1 unhealthy pods".to_string()],
            health_score: 90,
            health_status: HealthStatus::Healthy,
            labels: BTreeMap::new(),
            created_at: None,
        };
        assert_eq!(
            Digest::from(&ns).summary,
            "Active with 3 pods (1 unhealthy), ? deployments, 1 services"
        );
    }
}
