//! The cluster monitor.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use pulse_cache::{AggregationCache, CacheKey, CacheStats, Clock, Lookup, SystemClock};
use pulse_collect::{
    Collected, Collector, CollectorError, ConnectionRegistry, ResourceClient, ResourceKind, Scope,
    default_collectors,
};
use pulse_health::HealthScorer;
use tracing::{debug, error, info, warn};

use crate::assemble::{self, Gathered};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::types::{
    Aggregate, AggregateKind, Degraded, NamespaceDetail, NodeDetail, PodDetail, ResourceOverview,
};

const OVERVIEW_KINDS: &[ResourceKind] = &ResourceKind::ALL;
const NODE_KINDS: &[ResourceKind] = &[ResourceKind::Node, ResourceKind::Pod];
const POD_KINDS: &[ResourceKind] = &[ResourceKind::Pod];
const NAMESPACE_KINDS: &[ResourceKind] = &[
    ResourceKind::Namespace,
    ResourceKind::Pod,
    ResourceKind::Deployment,
    ResourceKind::Service,
];

/// A cached aggregate with its collection metadata.
#[derive(Debug, Clone)]
struct Assembled<T> {
    data: T,
    degraded: Vec<Degraded>,
    skipped: usize,
    fetched_at: DateTime<Utc>,
}

impl<T> Assembled<T> {
    fn new(gathered: &Gathered, data: T) -> Self {
        Self {
            data,
            degraded: gathered.degraded.clone(),
            skipped: gathered.skipped,
            fetched_at: Utc::now(),
        }
    }

    fn into_aggregate(lookup: Lookup<Self, MonitorError>) -> Aggregate<T> {
        let cached = lookup.from_cache();
        let stale = lookup.is_stale();
        let refresh_error = lookup.refresh_error.map(|e| e.to_string());
        let assembled = lookup.value;
        Aggregate {
            data: assembled.data,
            partial: !assembled.degraded.is_empty(),
            degraded: assembled.degraded,
            skipped: assembled.skipped,
            fetched_at: assembled.fetched_at,
            cached,
            stale,
            refresh_error,
        }
    }
}

type Cache<T> = AggregationCache<Assembled<T>, MonitorError>;

fn new_cache<T>(config: &MonitorConfig, clock: &Arc<dyn Clock>) -> Cache<T>
where
    T: Clone + Send + Sync + 'static,
{
    AggregationCache::with_config(config.cache.clone()).with_clock(Arc::clone(clock))
}

/// Collects, scores and caches cluster aggregates.
///
/// Each aggregate kind has its own cache; entries are keyed by cluster and,
/// for pods, by namespace scope. Collectors for one aggregate run
/// concurrently, each with its own time budget, and a failing collector
/// only marks the result partial.
#[derive(Debug)]
pub struct ClusterMonitor {
    registry: Arc<dyn ConnectionRegistry>,
    config: MonitorConfig,
    scorer: HealthScorer,
    collectors: Vec<Box<dyn Collector>>,
    overview: Cache<ResourceOverview>,
    nodes: Cache<Vec<NodeDetail>>,
    pods: Cache<Vec<PodDetail>>,
    namespaces: Cache<Vec<NamespaceDetail>>,
}

impl ClusterMonitor {
    /// Creates a monitor over `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] if the configuration is invalid.
    pub fn new(registry: Arc<dyn ConnectionRegistry>, config: MonitorConfig) -> Result<Self> {
        Self::with_clock(registry, config, Arc::new(SystemClock))
    }

    /// Creates a monitor whose caches measure freshness with `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] if the configuration is invalid.
    pub fn with_clock(
        registry: Arc<dyn ConnectionRegistry>,
        config: MonitorConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            scorer: HealthScorer::new(
                config.health.weights.clone(),
                config.health.thresholds.clone(),
            ),
            collectors: default_collectors(),
            overview: new_cache(&config, &clock),
            nodes: new_cache(&config, &clock),
            pods: new_cache(&config, &clock),
            namespaces: new_cache(&config, &clock),
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Returns the health scorer.
    #[must_use]
    pub const fn scorer(&self) -> &HealthScorer {
        &self.scorer
    }

    /// Returns cluster-wide counts, resource totals and health.
    ///
    /// # Errors
    ///
    /// Fails if the cluster is unreachable or every collector failed.
    pub async fn get_overview(
        &self,
        cluster: &str,
        force_refresh: bool,
    ) -> Result<Aggregate<ResourceOverview>> {
        let key = CacheKey::new(cluster, AggregateKind::Overview.as_str());
        self.aggregate(&self.overview, AggregateKind::Overview, &key, force_refresh, || async {
            let gathered = self.gather(cluster, OVERVIEW_KINDS, &Scope::All).await?;
            let overview = assemble::overview(&gathered, &self.scorer, Utc::now());
            Ok(Assembled::new(&gathered, overview))
        })
        .await
    }

    /// Returns every node with its allocation and health.
    ///
    /// # Errors
    ///
    /// Fails if the cluster is unreachable or every collector failed.
    pub async fn get_node_details(
        &self,
        cluster: &str,
        force_refresh: bool,
    ) -> Result<Aggregate<Vec<NodeDetail>>> {
        let key = CacheKey::new(cluster, AggregateKind::Nodes.as_str());
        self.aggregate(&self.nodes, AggregateKind::Nodes, &key, force_refresh, || async {
            let gathered = self.gather(cluster, NODE_KINDS, &Scope::All).await?;
            let details = assemble::node_details(&gathered, &self.scorer);
            Ok(Assembled::new(&gathered, details))
        })
        .await
    }

    /// Returns every pod in `scope` with its containers and health.
    ///
    /// # Errors
    ///
    /// Fails if the cluster is unreachable or the pod collector failed.
    pub async fn get_pod_details(
        &self,
        cluster: &str,
        scope: &Scope,
        force_refresh: bool,
    ) -> Result<Aggregate<Vec<PodDetail>>> {
        let mut key = CacheKey::new(cluster, AggregateKind::Pods.as_str());
        if let Some(namespace) = scope.as_namespace() {
            key = key.with_scope(namespace);
        }
        self.aggregate(&self.pods, AggregateKind::Pods, &key, force_refresh, || async {
            let gathered = self.gather(cluster, POD_KINDS, scope).await?;
            let details = assemble::pod_details(&gathered, &self.scorer);
            Ok(Assembled::new(&gathered, details))
        })
        .await
    }

    /// Returns every namespace with its object counts and health.
    ///
    /// # Errors
    ///
    /// Fails if the cluster is unreachable or every collector failed.
    pub async fn get_namespace_details(
        &self,
        cluster: &str,
        force_refresh: bool,
    ) -> Result<Aggregate<Vec<NamespaceDetail>>> {
        let key = CacheKey::new(cluster, AggregateKind::Namespaces.as_str());
        self.aggregate(
            &self.namespaces,
            AggregateKind::Namespaces,
            &key,
            force_refresh,
            || async {
                let gathered = self.gather(cluster, NAMESPACE_KINDS, &Scope::All).await?;
                let details = assemble::namespace_details(&gathered, &self.scorer);
                Ok(Assembled::new(&gathered, details))
            },
        )
        .await
    }

    /// Drops every cached aggregate for `cluster`. Returns the number of
    /// slots cleared.
    pub fn invalidate(&self, cluster: &str) -> usize {
        let cleared = self.overview.invalidate_cluster(cluster)
            + self.nodes.invalidate_cluster(cluster)
            + self.pods.invalidate_cluster(cluster)
            + self.namespaces.invalidate_cluster(cluster);
        info!(cluster = %cluster, cleared, "invalidated cached aggregates");
        cleared
    }

    /// Drops one cached aggregate kind for `cluster`, in every scope.
    pub fn invalidate_kind(&self, cluster: &str, kind: AggregateKind) -> usize {
        let name = kind.as_str();
        match kind {
            AggregateKind::Overview => self.overview.invalidate_kind(cluster, name),
            AggregateKind::Nodes => self.nodes.invalidate_kind(cluster, name),
            AggregateKind::Pods => self.pods.invalidate_kind(cluster, name),
            AggregateKind::Namespaces => self.namespaces.invalidate_kind(cluster, name),
        }
    }

    /// Returns cache counters summed across aggregate kinds.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        [
            self.overview.stats(),
            self.nodes.stats(),
            self.pods.stats(),
            self.namespaces.stats(),
        ]
        .into_iter()
        .fold(CacheStats::default(), |total, s| CacheStats {
            hits: total.hits + s.hits,
            misses: total.misses + s.misses,
            coalesced: total.coalesced + s.coalesced,
            loads: total.loads + s.loads,
            load_failures: total.load_failures + s.load_failures,
            stale_served: total.stale_served + s.stale_served,
            evictions: total.evictions + s.evictions,
            entries: total.entries + s.entries,
            in_flight: total.in_flight + s.in_flight,
        })
    }

    async fn aggregate<T, F, Fut>(
        &self,
        cache: &Cache<T>,
        kind: AggregateKind,
        key: &CacheKey,
        force_refresh: bool,
        loader: F,
    ) -> Result<Aggregate<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Assembled<T>>>,
    {
        let started = Instant::now();
        let ttl = self.config.ttls.ttl_for(kind);
        match cache.get(key, ttl, force_refresh, loader).await {
            Ok(lookup) => {
                let aggregate = Assembled::into_aggregate(lookup);
                let elapsed_ms = started.elapsed().as_millis() as u64;
                if let Some(reason) = &aggregate.refresh_error {
                    warn!(
                        cluster = %key.cluster(),
                        aggregate = %kind,
                        %reason,
                        "serving stale aggregate"
                    );
                } else if aggregate.cached {
                    debug!(
                        cluster = %key.cluster(),
                        aggregate = %kind,
                        stale = aggregate.stale,
                        "served from cache"
                    );
                } else {
                    info!(
                        cluster = %key.cluster(),
                        aggregate = %kind,
                        partial = aggregate.partial,
                        skipped = aggregate.skipped,
                        elapsed_ms,
                        "aggregation complete"
                    );
                }
                Ok(aggregate)
            }
            Err(err) => {
                error!(
                    cluster = %key.cluster(),
                    aggregate = %kind,
                    error = %err,
                    "aggregation failed"
                );
                Err(err)
            }
        }
    }

    /// Runs the collectors for `kinds` concurrently and merges their results.
    async fn gather(
        &self,
        cluster: &str,
        kinds: &[ResourceKind],
        scope: &Scope,
    ) -> Result<Gathered> {
        let client = self
            .registry
            .client(cluster)
            .map_err(|source| MonitorError::Connection {
                cluster: cluster.to_string(),
                source,
            })?;
        let client: &dyn ResourceClient = client.as_ref();
        let timeout = self.config.collector_timeout();
        let timeout_ms = timeout.as_millis() as u64;

        let fetches = self
            .collectors
            .iter()
            .filter(|c| kinds.contains(&c.kind()))
            .map(|collector| async move {
                let kind = collector.kind();
                let started = Instant::now();
                let result = tokio::time::timeout(timeout, collector.fetch(client, scope))
                    .await
                    .unwrap_or_else(|_| Err(CollectorError::Timeout { kind, timeout_ms }));
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match &result {
                    Ok(collected) => debug!(
                        cluster = %cluster,
                        kind = %kind,
                        count = collected.count(),
                        elapsed_ms,
                        "collector finished"
                    ),
                    Err(err) => warn!(
                        cluster = %cluster,
                        kind = %kind,
                        error = %err,
                        elapsed_ms,
                        "collector failed"
                    ),
                }
                result
            });

        settle(cluster, join_all(fetches).await)
    }
}

/// Merges collector results, failing only if none succeeded.
fn settle(
    cluster: &str,
    results: Vec<std::result::Result<Collected, CollectorError>>,
) -> Result<Gathered> {
    let mut gathered = Gathered::default();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(collected) => gathered.absorb(collected),
            Err(err) => failures.push(err),
        }
    }

    if gathered.succeeded == 0 && !failures.is_empty() {
        if failures.iter().all(CollectorError::is_connection_failure) {
            if let Some(CollectorError::Client { source, .. }) = failures.into_iter().next() {
                return Err(MonitorError::Connection {
                    cluster: cluster.to_string(),
                    source,
                });
            }
            return Err(MonitorError::AllCollectorsFailed {
                cluster: cluster.to_string(),
                failures: Vec::new(),
            });
        }
        return Err(MonitorError::AllCollectorsFailed {
            cluster: cluster.to_string(),
            failures,
        });
    }

    gathered.degraded = failures.iter().map(Degraded::from).collect();
    Ok(gathered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_cache::ManualClock;
    use pulse_collect::{ClientError, SnapshotClient, StaticRegistry};
    use serde_json::json;
    use std::time::Duration;

    fn snapshot() -> SnapshotClient {
        SnapshotClient::new()
            .with_objects(
                ResourceKind::Node,
                vec![json!({
                    "metadata": {"name": "n1"},
                    "status": {"conditions": [{"type": "Ready", "status": "True"}]}
                })],
            )
            .with_objects(
                ResourceKind::Pod,
                vec![
                    json!({"metadata": {"name": "a", "namespace": "shop"}, "status": {"phase": "Running"}}),
                    json!({"metadata": {"name": "b", "namespace": "ops"}, "status": {"phase": "Pending"}}),
                ],
            )
    }

    fn monitor(client: SnapshotClient) -> (ClusterMonitor, Arc<SnapshotClient>, Arc<ManualClock>) {
        let client = Arc::new(client);
        let registry = StaticRegistry::new();
        registry.register("prod", Arc::clone(&client) as Arc<dyn ResourceClient>);
        let clock = Arc::new(ManualClock::new());
        let monitor = ClusterMonitor::with_clock(
            Arc::new(registry),
            MonitorConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();
        (monitor, client, clock)
    }

    #[test]
    fn rejects_invalid_config() {
        let config = MonitorConfig {
            collector_timeout_secs: 0,
            ..MonitorConfig::default()
        };
        let err = ClusterMonitor::new(Arc::new(StaticRegistry::new()), config).unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn settle_keeps_successes_and_records_failures() {
        let gathered = settle(
            "prod",
            vec![
                Ok(Collected::Count {
                    of: ResourceKind::Secret,
                    count: 2,
                }),
                Err(CollectorError::Timeout {
                    kind: ResourceKind::ConfigMap,
                    timeout_ms: 10,
                }),
            ],
        )
        .unwrap();
        assert_eq!(gathered.count(ResourceKind::Secret), Some(2));
        assert_eq!(gathered.degraded.len(), 1);
        assert_eq!(gathered.degraded[0].kind, ResourceKind::ConfigMap);
    }

    #[test]
    fn settle_all_connection_failures_is_a_connection_error() {
        let unreachable = |kind| CollectorError::Client {
            kind,
            source: ClientError::unavailable("connection refused"),
        };
        let err = settle(
            "prod",
            vec![Err(unreachable(ResourceKind::Node)), Err(unreachable(ResourceKind::Pod))],
        )
        .unwrap_err();
        assert!(err.is_connection());
    }

    #[test]
    fn settle_mixed_failures_lists_each() {
        let err = settle(
            "prod",
            vec![
                Err(CollectorError::Timeout {
                    kind: ResourceKind::Node,
                    timeout_ms: 10,
                }),
                Err(CollectorError::Client {
                    kind: ResourceKind::Pod,
                    source: ClientError::unavailable("down"),
                }),
            ],
        )
        .unwrap_err();
        let MonitorError::AllCollectorsFailed { failures, .. } = err else {
            panic!("expected AllCollectorsFailed");
        };
        assert_eq!(failures.len(), 2);
    }

    #[tokio::test]
    async fn pods_are_cached_per_scope() {
        let (monitor, client, _clock) = monitor(snapshot());

        let all = monitor.get_pod_details("prod", &Scope::All, false).await.unwrap();
        assert_eq!(all.data.len(), 2);
        assert!(!all.cached);

        let shop = Scope::namespace("shop");
        let scoped = monitor.get_pod_details("prod", &shop, false).await.unwrap();
        assert_eq!(scoped.data.len(), 1);
        assert!(!scoped.cached);

        let again = monitor.get_pod_details("prod", &shop, false).await.unwrap();
        assert!(again.cached);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn ttl_expiry_reloads() {
        let (monitor, client, clock) = monitor(snapshot());
        monitor.get_node_details("prod", false).await.unwrap();
        clock.advance(Duration::from_secs(119));
        assert!(monitor.get_node_details("prod", false).await.unwrap().cached);
        clock.advance(Duration::from_secs(2));
        assert!(!monitor.get_node_details("prod", false).await.unwrap().cached);
        // nodes and pods per load
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn invalidate_kind_leaves_others() {
        let (monitor, client, _clock) = monitor(snapshot());
        monitor.get_node_details("prod", false).await.unwrap();
        monitor.get_pod_details("prod", &Scope::All, false).await.unwrap();
        assert_eq!(monitor.invalidate_kind("prod", AggregateKind::Pods), 1);

        assert!(monitor.get_node_details("prod", false).await.unwrap().cached);
        assert!(!monitor.get_pod_details("prod", &Scope::All, false).await.unwrap().cached);
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn collector_timeout_degrades_one_kind() {
        let client = snapshot().with_delay(ResourceKind::Pod, Duration::from_secs(5));
        let client = Arc::new(client);
        let registry = StaticRegistry::new();
        registry.register("prod", Arc::clone(&client) as Arc<dyn ResourceClient>);
        let config = MonitorConfig {
            collector_timeout_secs: 1,
            ..MonitorConfig::default()
        };
        let monitor = ClusterMonitor::new(Arc::new(registry), config).unwrap();

        let nodes = monitor.get_node_details("prod", false).await.unwrap();
        assert!(nodes.partial);
        assert_eq!(nodes.degraded[0].kind, ResourceKind::Pod);
        assert_eq!(nodes.degraded[0].reason, "timed out after 1000ms");
        assert!(nodes.data[0].requested.is_none());
    }
}
