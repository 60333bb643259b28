//! Turning collected records into aggregates.
//!
//! Everything here is pure: the orchestrator gathers, these functions
//! count, normalize and score.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use pulse_collect::{
    Collected, ContainerRecord, DeploymentRecord, GatewayRecord, NamespaceRecord, NodeRecord,
    NodeResources, PodPhase, PodRecord, ResourceKind, ResourcePair, ResourceTotals, ServiceRecord,
};
use pulse_health::{Assessment, HealthScorer, HealthStatus, NamespaceLoad, NodeUsage, Scorable};
use pulse_quantity::{format_cpu, format_memory, usage_percent};

use crate::types::{
    ClusterHealth, ConfigCounts, ContainerDetail, ContainerResources, Degraded, DiscoveryCounts,
    HealthSummary, NamespaceDetail, NodeAllocation, NodeCounts, NodeDetail, PodCounts, PodDetail,
    ResourceFigures, ResourceOverview, ResourceUsage, WorkloadCounts,
};

/// The successful collector outputs of one aggregation.
#[derive(Debug, Default)]
pub(crate) struct Gathered {
    pub nodes: Option<Vec<NodeRecord>>,
    pub pods: Option<Vec<PodRecord>>,
    pub namespaces: Option<Vec<NamespaceRecord>>,
    pub deployments: Option<Vec<DeploymentRecord>>,
    pub services: Option<Vec<ServiceRecord>>,
    pub gateways: Option<Vec<GatewayRecord>>,
    pub counts: BTreeMap<ResourceKind, usize>,
    pub skipped: usize,
    pub succeeded: usize,
    pub degraded: Vec<Degraded>,
}

impl Gathered {
    pub fn absorb(&mut self, collected: Collected) {
        self.succeeded += 1;
        self.skipped += collected.skipped();
        match collected {
            Collected::Nodes(listed) => self.nodes = Some(listed.items),
            Collected::Pods(listed) => self.pods = Some(listed.items),
            Collected::Namespaces(listed) => self.namespaces = Some(listed.items),
            Collected::Deployments(listed) => self.deployments = Some(listed.items),
            Collected::Services(listed) => self.services = Some(listed.items),
            Collected::Gateways(listed) => self.gateways = Some(listed.items),
            Collected::Count { of, count } => {
                self.counts.insert(of, count);
            }
        }
    }

    /// Returns the object count for `kind`, `None` if it was not collected.
    pub fn count(&self, kind: ResourceKind) -> Option<usize> {
        match kind {
            ResourceKind::Node => self.nodes.as_ref().map(Vec::len),
            ResourceKind::Pod => self.pods.as_ref().map(Vec::len),
            ResourceKind::Namespace => self.namespaces.as_ref().map(Vec::len),
            ResourceKind::Deployment => self.deployments.as_ref().map(Vec::len),
            ResourceKind::Service => self.services.as_ref().map(Vec::len),
            ResourceKind::Gateway => self.gateways.as_ref().map(Vec::len),
            ResourceKind::ConfigMap | ResourceKind::Secret => self.counts.get(&kind).copied(),
        }
    }
}

const fn summary(assessment: &Assessment) -> HealthSummary {
    HealthSummary {
        score: assessment.score,
        status: assessment.status,
    }
}

pub(crate) fn overview(
    gathered: &Gathered,
    scorer: &HealthScorer,
    now: DateTime<Utc>,
) -> ResourceOverview {
    let thresholds = scorer.thresholds();

    let nodes = gathered.nodes.as_ref().map(|nodes| {
        let ready = nodes.iter().filter(|n| n.ready).count();
        NodeCounts {
            total: nodes.len(),
            ready,
            not_ready: nodes.len() - ready,
        }
    });

    let pods = gathered.pods.as_ref().map(|pods| {
        pods.iter().fold(PodCounts::default(), |mut counts, pod| {
            counts.record(pod.phase);
            counts
        })
    });

    let resources = gathered.pods.as_ref().map(|pods| resource_usage(pods));

    let health = ClusterHealth {
        nodes: gathered.nodes.as_ref().map(|nodes| {
            let findings: Vec<_> = nodes.iter().flat_map(|n| n.findings(thresholds)).collect();
            summary(&scorer.assess(&findings[..]))
        }),
        pods: gathered.pods.as_ref().map(|pods| {
            let findings: Vec<_> = pods.iter().flat_map(|p| p.findings(thresholds)).collect();
            summary(&scorer.assess(&findings[..]))
        }),
    };

    ResourceOverview {
        nodes,
        workloads: WorkloadCounts {
            pods,
            deployments: gathered.count(ResourceKind::Deployment),
        },
        discovery: DiscoveryCounts {
            services: gathered.count(ResourceKind::Service),
            gateways: gathered.count(ResourceKind::Gateway),
        },
        configs: ConfigCounts {
            config_maps: gathered.count(ResourceKind::ConfigMap),
            secrets: gathered.count(ResourceKind::Secret),
            namespaces: gathered.count(ResourceKind::Namespace),
        },
        resources,
        health,
        last_updated: now,
    }
}

fn resource_usage(pods: &[PodRecord]) -> ResourceUsage {
    let mut requests = ResourceTotals::default();
    let mut limits = ResourceTotals::default();
    let mut anomalies = 0;
    for pod in pods {
        requests.add(pod.requests());
        limits.add(pod.limits());
        anomalies += pod
            .containers
            .iter()
            .flat_map(|c| [&c.requests.cpu, &c.requests.memory, &c.limits.cpu, &c.limits.memory])
            .flatten()
            .filter(|q| q.is_anomalous())
            .count();
    }
    ResourceUsage {
        cpu_requests: requests.cpu,
        memory_requests: requests.memory,
        cpu_limits: limits.cpu,
        memory_limits: limits.memory,
        anomalies,
    }
}

fn figures(resources: &NodeResources) -> ResourceFigures {
    ResourceFigures {
        cpu: format_cpu(resources.cpu.value()),
        memory: format_memory(resources.memory.value()),
        pods: resources.pods,
    }
}

/// Sums the requests of the pods that still occupy `node`.
fn bound_requests(node: &NodeRecord, pods: &[PodRecord]) -> (ResourceTotals, usize) {
    pods.iter()
        .filter(|p| p.node_name.as_deref() == Some(node.name.as_str()))
        .filter(|p| !matches!(p.phase, PodPhase::Succeeded | PodPhase::Failed))
        .fold((ResourceTotals::default(), 0), |(mut totals, n), pod| {
            totals.add(pod.requests());
            (totals, n + 1)
        })
}

pub(crate) fn node_details(gathered: &Gathered, scorer: &HealthScorer) -> Vec<NodeDetail> {
    let Some(nodes) = &gathered.nodes else {
        return Vec::new();
    };

    let mut details: Vec<NodeDetail> = nodes
        .iter()
        .map(|node| {
            let bound = gathered.pods.as_ref().map(|pods| bound_requests(node, pods));
            let (assessment, requested) = match bound {
                Some((totals, count)) => {
                    let usage = NodeUsage {
                        node,
                        cpu_percent: usage_percent(totals.cpu, node.allocatable.cpu.value()),
                        memory_percent: usage_percent(
                            totals.memory,
                            node.allocatable.memory.value(),
                        ),
                    };
                    let requested = NodeAllocation {
                        cpu: format_cpu(totals.cpu),
                        memory: format_memory(totals.memory),
                        cpu_percent: usage.cpu_percent,
                        memory_percent: usage.memory_percent,
                        pods: count,
                    };
                    (scorer.assess(&usage), Some(requested))
                }
                None => (scorer.assess(node), None),
            };

            NodeDetail {
                name: node.name.clone(),
                status: node.status().to_string(),
                roles: node.roles.clone(),
                unschedulable: node.unschedulable,
                info: node.info.clone(),
                capacity: figures(&node.capacity),
                allocatable: figures(&node.allocatable),
                requested,
                taints: node.taints.clone(),
                error_indicators: assessment.indicators(),
                health_score: assessment.score,
                health_status: assessment.status,
                labels: node.labels.clone(),
                created_at: node.created_at,
            }
        })
        .collect();
    details.sort_by(|a, b| a.name.cmp(&b.name));
    details
}

fn container_resources(pair: &ResourcePair) -> ContainerResources {
    ContainerResources {
        cpu: pair.cpu.as_ref().map(|q| format_cpu(q.value())),
        memory: pair.memory.as_ref().map(|q| format_memory(q.value())),
    }
}

fn container_detail(container: &ContainerRecord) -> ContainerDetail {
    ContainerDetail {
        name: container.name.clone(),
        state: container.state.to_string(),
        ready: container.ready,
        restarts: container.restarts,
        requests: container_resources(&container.requests),
        limits: container_resources(&container.limits),
        advisories: container.advisories.iter().map(ToString::to_string).collect(),
    }
}

pub(crate) fn pod_details(gathered: &Gathered, scorer: &HealthScorer) -> Vec<PodDetail> {
    let Some(pods) = &gathered.pods else {
        return Vec::new();
    };

    let mut details: Vec<PodDetail> = pods
        .iter()
        .map(|pod| {
            let assessment = scorer.assess(pod);
            PodDetail {
                name: pod.name.clone(),
                namespace: pod.namespace.clone(),
                phase: pod.phase,
                reason: pod.reason.clone(),
                node_name: pod.node_name.clone(),
                ready: pod.ready,
                owner: pod.owner.clone(),
                restarts: pod.restarts(),
                containers: pod.containers.iter().map(container_detail).collect(),
                error_indicators: assessment.indicators(),
                health_score: assessment.score,
                health_status: assessment.status,
                labels: pod.labels.clone(),
                created_at: pod.created_at,
            }
        })
        .collect();
    details.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    details
}

fn per_namespace<'a, T>(
    items: Option<&'a Vec<T>>,
    namespace_of: impl Fn(&'a T) -> &'a str,
) -> Option<BTreeMap<&'a str, usize>> {
    items.map(|items| {
        items.iter().fold(BTreeMap::new(), |mut counts, item| {
            *counts.entry(namespace_of(item)).or_insert(0) += 1;
            counts
        })
    })
}

fn lookup(counts: Option<&BTreeMap<&str, usize>>, namespace: &str) -> Option<usize> {
    counts.map(|c| c.get(namespace).copied().unwrap_or(0))
}

/// Namespaces seen on other kinds, for when namespaces could not be listed.
fn inferred_namespaces(gathered: &Gathered) -> Vec<NamespaceRecord> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    names.extend(gathered.pods.iter().flatten().map(|p| p.namespace.as_str()));
    names.extend(gathered.deployments.iter().flatten().map(|d| d.namespace.as_str()));
    names.extend(gathered.services.iter().flatten().map(|s| s.namespace.as_str()));
    names
        .into_iter()
        .map(|name| NamespaceRecord {
            name: name.to_string(),
            phase: "Unknown".to_string(),
            labels: BTreeMap::new(),
            created_at: None,
        })
        .collect()
}

pub(crate) fn namespace_details(
    gathered: &Gathered,
    scorer: &HealthScorer,
) -> Vec<NamespaceDetail> {
    let records = gathered
        .namespaces
        .clone()
        .unwrap_or_else(|| inferred_namespaces(gathered));

    let pods = per_namespace(gathered.pods.as_ref(), |p| p.namespace.as_str());
    let deployments = per_namespace(gathered.deployments.as_ref(), |d| d.namespace.as_str());
    let services = per_namespace(gathered.services.as_ref(), |s| s.namespace.as_str());
    let unhealthy = gathered.pods.as_ref().map(|pods| {
        pods.iter()
            .filter(|p| HealthStatus::from_score(scorer.score(*p)).requires_attention())
            .fold(BTreeMap::new(), |mut counts, pod| {
                *counts.entry(pod.namespace.as_str()).or_insert(0) += 1;
                counts
            })
    });

    let mut details: Vec<NamespaceDetail> = records
        .iter()
        .map(|record| {
            let unhealthy_pods = lookup(unhealthy.as_ref(), &record.name);
            let assessment = scorer.assess(&NamespaceLoad {
                namespace: record,
                unhealthy_pods: unhealthy_pods.unwrap_or(0),
            });
            NamespaceDetail {
                name: record.name.clone(),
                status: record.phase.clone(),
                pods: lookup(pods.as_ref(), &record.name),
                deployments: lookup(deployments.as_ref(), &record.name),
                services: lookup(services.as_ref(), &record.name),
                unhealthy_pods,
                error_indicators: assessment.indicators(),
                health_score: assessment.score,
                health_status: assessment.status,
                labels: record.labels.clone(),
                created_at: record.created_at,
            }
        })
        .collect();
    details.sort_by(|a, b| a.name.cmp(&b.name));
    details
}
