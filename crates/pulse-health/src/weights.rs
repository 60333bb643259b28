//! Detected conditions and their penalties.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HealthConfigError, Result};

/// A condition that lowers a health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Node `Ready` is not true.
    NodeNotReady,
    /// Node is cordoned.
    NodeUnschedulable,
    /// Node carries a taint (per taint).
    NodeTainted,
    /// Node reports memory pressure.
    MemoryPressure,
    /// Node reports disk pressure.
    DiskPressure,
    /// Node reports PID pressure.
    PidPressure,
    /// Node network is unavailable.
    NetworkUnavailable,
    /// Requested CPU exceeds the threshold share of allocatable.
    HighCpuUsage,
    /// Requested memory exceeds the threshold share of allocatable.
    HighMemoryUsage,
    /// Pod is pending.
    PodPending,
    /// Pod failed.
    PodFailed,
    /// Pod phase is unknown.
    PodUnknown,
    /// A container is not ready (per container).
    ContainerNotReady,
    /// A container is not running (per container).
    ContainerNotRunning,
    /// Container restarts (per restart).
    ContainerRestarts,
    /// Running pod is not ready.
    PodNotReady,
    /// Pod could not be scheduled.
    PodUnscheduled,
    /// Namespace is being deleted.
    NamespaceTerminating,
    /// An unhealthy pod in the namespace (per pod).
    UnhealthyPods,
    /// A request/limit advisory (per advisory).
    LimitAdvisory,
    /// A node capacity or allocatable figure could not be used (per figure).
    QuantityAnomaly,
}

impl ConditionKind {
    /// Every condition with its default penalty.
    pub const DEFAULTS: [(Self, Penalty); 21] = [
        (Self::NodeNotReady, Penalty::new(50, 50)),
        (Self::NodeUnschedulable, Penalty::new(20, 20)),
        (Self::NodeTainted, Penalty::new(5, 25)),
        (Self::MemoryPressure, Penalty::new(30, 30)),
        (Self::DiskPressure, Penalty::new(25, 25)),
        (Self::PidPressure, Penalty::new(20, 20)),
        (Self::NetworkUnavailable, Penalty::new(40, 40)),
        (Self::HighCpuUsage, Penalty::new(15, 15)),
        (Self::HighMemoryUsage, Penalty::new(15, 15)),
        (Self::PodPending, Penalty::new(30, 30)),
        (Self::PodFailed, Penalty::new(50, 50)),
        (Self::PodUnknown, Penalty::new(50, 50)),
        (Self::ContainerNotReady, Penalty::new(20, 60)),
        (Self::ContainerNotRunning, Penalty::new(15, 45)),
        (Self::ContainerRestarts, Penalty::new(5, 25)),
        (Self::PodNotReady, Penalty::new(20, 20)),
        (Self::PodUnscheduled, Penalty::new(15, 15)),
        (Self::NamespaceTerminating, Penalty::new(30, 30)),
        (Self::UnhealthyPods, Penalty::new(10, 40)),
        (Self::LimitAdvisory, Penalty::new(5, 15)),
        (Self::QuantityAnomaly, Penalty::new(10, 30)),
    ];

    /// Returns the default penalty.
    #[must_use]
    pub fn default_penalty(self) -> Penalty {
        Self::DEFAULTS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or(Penalty::ZERO, |(_, penalty)| *penalty)
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Points deducted per occurrence, capped per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    /// Deducted per occurrence.
    pub points: u32,
    /// Total cap for the kind.
    pub max: u32,
}

impl Penalty {
    /// A penalty that deducts nothing.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a penalty.
    #[must_use]
    pub const fn new(points: u32, max: u32) -> Self {
        Self { points, max }
    }

    /// Returns the deduction for `occurrences`.
    #[must_use]
    pub const fn deduction(self, occurrences: u32) -> u32 {
        let raw = self.points.saturating_mul(occurrences);
        if raw < self.max { raw } else { self.max }
    }
}

/// The weight table.
///
/// Deserializing merges the given entries over the defaults, so a config
/// file only needs to list the penalties it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ConditionKind, Penalty>",
    into = "BTreeMap<ConditionKind, Penalty>"
)]
pub struct HealthWeights {
    penalties: BTreeMap<ConditionKind, Penalty>,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            penalties: ConditionKind::DEFAULTS.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<ConditionKind, Penalty>> for HealthWeights {
    fn from(overrides: BTreeMap<ConditionKind, Penalty>) -> Self {
        let mut weights = Self::default();
        weights.penalties.extend(overrides);
        weights
    }
}

impl From<HealthWeights> for BTreeMap<ConditionKind, Penalty> {
    fn from(weights: HealthWeights) -> Self {
        weights.penalties
    }
}

impl HealthWeights {
    /// Returns the penalty for a condition.
    #[must_use]
    pub fn penalty(&self, kind: ConditionKind) -> Penalty {
        self.penalties
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_penalty())
    }

    /// Replaces the penalty for a condition.
    #[must_use]
    pub fn with_penalty(mut self, kind: ConditionKind, penalty: Penalty) -> Self {
        self.penalties.insert(kind, penalty);
        self
    }

    /// Checks that no cap is below its per-occurrence points.
    pub fn validate(&self) -> Result<()> {
        for (kind, penalty) in &self.penalties {
            if penalty.max < penalty.points {
                return Err(HealthConfigError::InvalidPenalty {
                    kind: *kind,
                    reason: format!("max {} is below points {}", penalty.max, penalty.points),
                });
            }
            if penalty.max > 100 {
                return Err(HealthConfigError::InvalidPenalty {
                    kind: *kind,
                    reason: format!("max {} exceeds 100", penalty.max),
                });
            }
        }
        Ok(())
    }
}

/// Limits that turn observations into conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Requested CPU, as a percentage of allocatable, above which a node
    /// counts as highly used.
    pub cpu_percent: f64,
    /// Requested memory, as a percentage of allocatable, above which a node
    /// counts as highly used.
    pub memory_percent: f64,
    /// Restarts above which a container is penalized.
    pub restart_count: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 90.0,
            memory_percent: 90.0,
            restart_count: 0,
        }
    }
}

impl HealthThresholds {
    /// Checks that percentages are finite and positive.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cpu_percent", self.cpu_percent),
            ("memory_percent", self.memory_percent),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(HealthConfigError::InvalidThreshold {
                    name,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}
