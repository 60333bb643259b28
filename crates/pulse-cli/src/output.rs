//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use pulse_monitor::{Aggregate, Digest, NamespaceDetail, NodeDetail, PodDetail, ResourceOverview};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl<T: TableDisplay> TableDisplay for Aggregate<T> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        self.data.write_table(writer)?;
        writeln!(writer)?;

        let mut origin = format!("Fetched {}", self.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
        if self.cached {
            origin.push_str(" (cached)");
        }
        if self.stale {
            origin.push_str(" (stale)");
        }
        writeln!(writer, "{origin}")?;
        if let Some(err) = &self.refresh_error {
            writeln!(writer, "Refresh failed: {err}")?;
        }
        if self.partial {
            writeln!(writer, "Partial result, unavailable:")?;
            for degraded in &self.degraded {
                writeln!(writer, "  {:<14} {}", degraded.kind, degraded.reason)?;
            }
        }
        if self.skipped > 0 {
            writeln!(writer, "Skipped {} malformed object(s)", self.skipped)?;
        }
        Ok(())
    }
}

impl TableDisplay for ResourceOverview {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Cluster Overview")?;
        writeln!(writer, "══════════════════════════════════")?;

        writeln!(writer, "Nodes")?;
        match &self.nodes {
            Some(nodes) => {
                writeln!(writer, "  Total:          {}", nodes.total)?;
                writeln!(writer, "  Ready:          {}", nodes.ready)?;
                writeln!(writer, "  Not ready:      {}", nodes.not_ready)?;
            }
            None => writeln!(writer, "  unavailable")?,
        }
        writeln!(writer)?;

        writeln!(writer, "Workloads")?;
        match &self.workloads.pods {
            Some(pods) => {
                writeln!(writer, "  Pods:           {}", pods.total)?;
                writeln!(
                    writer,
                    "    running {}, pending {}, failed {}, succeeded {}, unknown {}",
                    pods.running, pods.pending, pods.failed, pods.succeeded, pods.unknown
                )?;
            }
            None => writeln!(writer, "  Pods:           -")?,
        }
        writeln!(writer, "  Deployments:    {}", count(self.workloads.deployments))?;
        writeln!(writer)?;

        writeln!(writer, "Discovery")?;
        writeln!(writer, "  Services:       {}", count(self.discovery.services))?;
        writeln!(writer, "  Gateways:       {}", count(self.discovery.gateways))?;
        writeln!(writer)?;

        writeln!(writer, "Configuration")?;
        writeln!(writer, "  ConfigMaps:     {}", count(self.configs.config_maps))?;
        writeln!(writer, "  Secrets:        {}", count(self.configs.secrets))?;
        writeln!(writer, "  Namespaces:     {}", count(self.configs.namespaces))?;
        writeln!(writer)?;

        if let Some(resources) = &self.resources {
            writeln!(writer, "Resources")?;
            writeln!(
                writer,
                "  CPU:            {:.2} requested, {:.2} limit (cores)",
                resources.cpu_requests, resources.cpu_limits
            )?;
            writeln!(
                writer,
                "  Memory:         {:.2} requested, {:.2} limit (GiB)",
                resources.memory_requests / GIB,
                resources.memory_limits / GIB
            )?;
            if resources.anomalies > 0 {
                writeln!(writer, "  Anomalies:      {}", resources.anomalies)?;
            }
            writeln!(writer)?;
        }

        writeln!(writer, "Health")?;
        for (label, summary) in [("Nodes", &self.health.nodes), ("Pods", &self.health.pods)] {
            match summary {
                Some(s) => writeln!(writer, "  {label:<16}{} ({})", s.score, s.status)?,
                None => writeln!(writer, "  {label:<16}-")?,
            }
        }
        Ok(())
    }
}

impl TableDisplay for Vec<NodeDetail> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No nodes found.")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<28} {:<10} {:<16} {:>8} {:>8} {:>5} {:>7}  {:<10}",
            "NAME", "STATUS", "ROLES", "CPU%", "MEM%", "PODS", "HEALTH", "STATE"
        )?;
        writeln!(writer, "{}", "─".repeat(100))?;

        for node in self {
            let roles = if node.roles.is_empty() {
                "<none>".to_string()
            } else {
                node.roles.join(",")
            };
            let (cpu, memory, pods) = node.requested.as_ref().map_or_else(
                || ("-".to_string(), "-".to_string(), "-".to_string()),
                |r| {
                    (
                        format!("{:.1}", r.cpu_percent),
                        format!("{:.1}", r.memory_percent),
                        r.pods.to_string(),
                    )
                },
            );
            let status = if node.unschedulable {
                format!("{},NoSched", node.status)
            } else {
                node.status.clone()
            };
            writeln!(
                writer,
                "{:<28} {:<10} {:<16} {:>8} {:>8} {:>5} {:>7}  {:<10}",
                truncate(&node.name, 28),
                truncate(&status, 10),
                truncate(&roles, 16),
                cpu,
                memory,
                pods,
                node.health_score,
                node.health_status
            )?;
            for indicator in &node.error_indicators {
                writeln!(writer, "    ! {indicator}")?;
            }
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} node(s)", self.len())?;
        Ok(())
    }
}

impl TableDisplay for Vec<PodDetail> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No pods found.")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<16} {:<36} {:<10} {:>5} {:>8} {:<20} {:>7}",
            "NAMESPACE", "NAME", "PHASE", "READY", "RESTARTS", "NODE", "HEALTH"
        )?;
        writeln!(writer, "{}", "─".repeat(108))?;

        for pod in self {
            let ready = pod.containers.iter().filter(|c| c.ready).count();
            writeln!(
                writer,
                "{:<16} {:<36} {:<10} {:>5} {:>8} {:<20} {:>7}",
                truncate(&pod.namespace, 16),
                truncate(&pod.name, 36),
                pod.phase.to_string(),
                format!("{ready}/{}", pod.containers.len()),
                pod.restarts,
                truncate(pod.node_name.as_deref().unwrap_or("-"), 20),
                pod.health_score
            )?;
            for indicator in &pod.error_indicators {
                writeln!(writer, "    ! {indicator}")?;
            }
        }

        let attention = self
            .iter()
            .filter(|p| p.health_status.requires_attention())
            .count();
        writeln!(writer)?;
        writeln!(
            writer,
            "Total: {} pod(s), {attention} need attention",
            self.len()
        )?;
        Ok(())
    }
}

impl TableDisplay for Vec<NamespaceDetail> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No namespaces found.")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<28} {:<12} {:>6} {:>6} {:>6} {:>9} {:>7}",
            "NAME", "STATUS", "PODS", "DEPLOY", "SVC", "UNHEALTHY", "HEALTH"
        )?;
        writeln!(writer, "{}", "─".repeat(80))?;

        for ns in self {
            writeln!(
                writer,
                "{:<28} {:<12} {:>6} {:>6} {:>6} {:>9} {:>7}",
                truncate(&ns.name, 28),
                truncate(&ns.status, 12),
                count(ns.pods),
                count(ns.deployments),
                count(ns.services),
                count(ns.unhealthy_pods),
                ns.health_score
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} namespace(s)", self.len())?;
        Ok(())
    }
}

impl TableDisplay for Digest {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{self}")?;
        Ok(())
    }
}

fn count(value: Option<usize>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}
