//! # pulse-collect
//!
//! Resource collectors for clusterpulse.
//!
//! A [`Collector`] reads one resource kind through a [`ResourceClient`] and
//! returns normalized records: quantities parsed into cores and bytes,
//! conditions folded into flags, owners and node bindings extracted. One
//! malformed object is skipped and counted, never fatal for its kind; a
//! failed list call is a [`CollectorError`] tagged with the kind so the
//! caller can keep going with the others.
//!
//! Clients come from a [`ConnectionRegistry`]. [`StaticRegistry`] and
//! [`SnapshotClient`] are in-memory implementations for tools and tests.
//!
//! ## Example
//!
//! ```rust
//! use pulse_collect::{Collected, Collector, NodeCollector, ResourceKind, Scope, SnapshotClient};
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
//!
//! let collected = NodeCollector.fetch(&client, &Scope::All).await.unwrap();
//! if let Collected::Nodes(nodes) = collected {
//!     assert!(nodes.items[0].ready);
//! }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod collector;
pub mod error;
pub mod kind;
pub mod model;
pub mod namespaces;
pub mod nodes;
pub mod pods;
pub mod snapshot;
pub mod workloads;

pub use client::{ConnectionRegistry, ListFuture, ResourceClient, StaticRegistry};
pub use collector::{CollectFuture, Collected, Collector, Listed, collector_for, default_collectors};
pub use error::{ClientError, CollectorError, Result, SnapshotError};
pub use kind::{ResourceKind, Scope, UnknownKind};
pub use namespaces::{NamespaceCollector, NamespaceRecord};
pub use nodes::{NodeCollector, NodeInfo, NodePressure, NodeRecord, NodeResources};
pub use pods::{
    ContainerRecord, ContainerState, Owner, PodCollector, PodPhase, PodRecord, ResourcePair,
    ResourceTotals,
};
pub use snapshot::SnapshotClient;
pub use workloads::{
    CountCollector, DeploymentRecord, GatewayCollector, GatewayRecord, Listener, ServiceCollector,
    ServiceRecord, WorkloadCollector,
};
