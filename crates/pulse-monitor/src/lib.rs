//! # pulse-monitor
//!
//! Cluster resource aggregation for clusterpulse.
//!
//! [`ClusterMonitor`] answers four questions about a cluster: an overview
//! of counts and resource totals, and per-node, per-pod and per-namespace
//! details. Each answer is assembled by running the needed collectors
//! concurrently against the cluster's client, scoring the results and
//! caching the assembled value per cluster.
//!
//! ## Failure model
//!
//! - A failing or slow collector marks the result partial; its counts are
//!   `None` and the kind is listed in [`Aggregate::degraded`].
//! - An unreachable cluster, or every collector failing, fails the call.
//! - A failed refresh with an earlier value cached serves that value with
//!   [`Aggregate::stale`] set.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pulse_collect::{ResourceClient, ResourceKind, SnapshotClient, StaticRegistry};
//! use pulse_monitor::{ClusterMonitor, MonitorConfig};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let client = SnapshotClient::new().with_objects(
//!     ResourceKind::Node,
//!     vec![json!({
//!         "metadata": {"name": "node-1"},
//!         "status": {"conditions": [{"type": "Ready", "status": "True"}]}
//!     })],
//! );
//! let registry = StaticRegistry::new();
//! registry.register("prod", Arc::new(client) as Arc<dyn ResourceClient>);
//!
//! let monitor = ClusterMonitor::new(Arc::new(registry), MonitorConfig::default()).unwrap();
//! let overview = monitor.get_overview("prod", false).await.unwrap();
//! assert_eq!(overview.data.nodes.unwrap().ready, 1);
//! assert!(!overview.partial);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assemble;
pub mod config;
pub mod digest;
pub mod error;
pub mod orchestrator;
pub mod types;

pub use config::{ENV_CACHE_TTL, ENV_COLLECTOR_TIMEOUT, HealthConfig, MonitorConfig, TtlConfig};
pub use digest::{Digest, Relation, Relationship};
pub use error::{MonitorError, Result};
pub use orchestrator::ClusterMonitor;
pub use types::{
    Aggregate, AggregateKind, ClusterHealth, ConfigCounts, ContainerDetail, ContainerResources,
    Degraded, DiscoveryCounts, HealthSummary, NamespaceDetail, NodeAllocation, NodeCounts,
    NodeDetail, PodCounts, PodDetail, ResourceFigures, ResourceOverview, ResourceUsage,
    WorkloadCounts,
};
