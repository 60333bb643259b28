//! Monitor configuration.
//!
//! Configuration for the cluster monitor, including:
//! - Per-aggregate cache TTLs
//! - Collector time budget
//! - Cache bounds and in-flight policy
//! - Health weights and thresholds

use std::path::Path;
use std::time::Duration;

use pulse_cache::CacheConfig;
use pulse_health::{HealthThresholds, HealthWeights};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::types::AggregateKind;

/// Overrides every TTL, in seconds.
pub const ENV_CACHE_TTL: &str = "CLUSTERPULSE_CACHE_TTL_SECS";

/// Overrides the collector time budget, in seconds.
pub const ENV_COLLECTOR_TIMEOUT: &str = "CLUSTERPULSE_COLLECTOR_TIMEOUT_SECS";

/// How long each aggregate stays fresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    /// Cluster overview.
    pub overview_secs: u64,
    /// Node details.
    pub nodes_secs: u64,
    /// Pod details.
    pub pods_secs: u64,
    /// Namespace details.
    pub namespaces_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            overview_secs: 30,
            nodes_secs: 120,
            pods_secs: 30,
            namespaces_secs: 60,
        }
    }
}

impl TtlConfig {
    /// Returns the TTL for an aggregate.
    #[must_use]
    pub const fn ttl_for(&self, kind: AggregateKind) -> Duration {
        let secs = match kind {
            AggregateKind::Overview => self.overview_secs,
            AggregateKind::Nodes => self.nodes_secs,
            AggregateKind::Pods => self.pods_secs,
            AggregateKind::Namespaces => self.namespaces_secs,
        };
        Duration::from_secs(secs)
    }

    /// Sets every TTL to `secs`.
    pub fn set_all(&mut self, secs: u64) {
        self.overview_secs = secs;
        self.nodes_secs = secs;
        self.pods_secs = secs;
        self.namespaces_secs = secs;
    }
}

/// Health scoring configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Penalties per condition; listed entries override the defaults.
    pub weights: HealthWeights,
    /// Usage and restart thresholds.
    pub thresholds: HealthThresholds,
}

/// Main monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Cache TTLs.
    pub ttls: TtlConfig,
    /// Time budget per collector, in seconds.
    pub collector_timeout_secs: u64,
    /// Cache tuning.
    pub cache: CacheConfig,
    /// Health scoring.
    pub health: HealthConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ttls: TtlConfig::default(),
            collector_timeout_secs: 10,
            cache: CacheConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            MonitorError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or validation fails.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| MonitorError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.collector_timeout_secs == 0 {
            return Err(MonitorError::Config(
                "collector_timeout_secs must be greater than 0".to_string(),
            ));
        }

        self.health
            .weights
            .validate()
            .map_err(|e| MonitorError::Config(e.to_string()))?;
        self.health
            .thresholds
            .validate()
            .map_err(|e| MonitorError::Config(e.to_string()))?;

        Ok(())
    }

    /// Returns the collector time budget.
    #[must_use]
    pub const fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs)
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is not a valid number or the result
    /// fails validation.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is not a valid number or the result
    /// fails validation.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(secs) = read_secs(&lookup, ENV_CACHE_TTL)? {
            debug!(secs, "cache TTL overridden from environment");
            self.ttls.set_all(secs);
        }
        if let Some(secs) = read_secs(&lookup, ENV_COLLECTOR_TIMEOUT)? {
            debug!(secs, "collector timeout overridden from environment");
            self.collector_timeout_secs = secs;
        }
        self.validate()?;
        Ok(self)
    }
}

fn read_secs(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e| {
            MonitorError::Config(format!("{name}='{raw}' is not a number of seconds: {e}"))
        })
}
