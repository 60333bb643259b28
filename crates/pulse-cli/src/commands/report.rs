//! Cluster report commands.
//!
//! Each report is answered by the monitor's cache; `--refresh` forces a
//! fresh aggregation.

use std::io::Write;

use pulse_collect::Scope;
use pulse_monitor::ClusterMonitor;
use tracing::debug;

use crate::error::CliError;
use crate::output::OutputFormat;

/// Report command executor.
pub struct ReportCommand<'a> {
    monitor: &'a ClusterMonitor,
    cluster: String,
}

impl<'a> ReportCommand<'a> {
    /// Create a report command for one cluster.
    #[must_use]
    pub fn new(monitor: &'a ClusterMonitor, cluster: impl Into<String>) -> Self {
        Self {
            monitor,
            cluster: cluster.into(),
        }
    }

    /// Write the cluster overview.
    ///
    /// # Errors
    ///
    /// Returns an error if aggregation or output fails.
    pub async fn overview<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        refresh: bool,
    ) -> Result<(), CliError> {
        let overview = self.monitor.get_overview(&self.cluster, refresh).await?;
        format.write(writer, &overview)
    }

    /// Write the node report.
    ///
    /// # Errors
    ///
    /// Returns an error if aggregation or output fails.
    pub async fn nodes<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        refresh: bool,
    ) -> Result<(), CliError> {
        let nodes = self.monitor.get_node_details(&self.cluster, refresh).await?;
        format.write(writer, &nodes)
    }

    /// Write the pod report, optionally for one namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if aggregation or output fails.
    pub async fn pods<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        namespace: Option<&str>,
        refresh: bool,
    ) -> Result<(), CliError> {
        let scope = namespace.map_or(Scope::All, Scope::namespace);
        debug!(cluster = %self.cluster, %scope, "listing pods");
        let pods = self
            .monitor
            .get_pod_details(&self.cluster, &scope, refresh)
            .await?;
        format.write(writer, &pods)
    }

    /// Write the namespace report.
    ///
    /// # Errors
    ///
    /// Returns an error if aggregation or output fails.
    pub async fn namespaces<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        refresh: bool,
    ) -> Result<(), CliError> {
        let namespaces = self
            .monitor
            .get_namespace_details(&self.cluster, refresh)
            .await?;
        format.write(writer, &namespaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use crate::commands::fixtures;

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn overview_table() {
        let monitor = fixtures::monitor();
        let cmd = ReportCommand::new(&monitor, "prod");
        let mut buf = Vec::new();
        cmd.overview(&mut buf, &OutputFormat::default(), false)
            .await
            .unwrap();
        let out = text(buf);
        assert!(out.contains("Cluster Overview"));
        assert!(out.contains("Ready:          1"));
    }

    #[tokio::test]
    async fn pods_json_for_one_namespace() {
        let monitor = fixtures::monitor();
        let cmd = ReportCommand::new(&monitor, "prod");
        let mut buf = Vec::new();
        cmd.pods(&mut buf, &OutputFormat::new(Format::Json), Some("shop"), false)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let pods = value["data"].as_array().unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0]["name"], "web-0");
    }

    #[tokio::test]
    async fn nodes_and_namespaces_tables() {
        let monitor = fixtures::monitor();
        let cmd = ReportCommand::new(&monitor, "prod");

        let mut buf = Vec::new();
        cmd.nodes(&mut buf, &OutputFormat::default(), false)
            .await
            .unwrap();
        assert!(text(buf).contains("Total: 1 node(s)"));

        let mut buf = Vec::new();
        cmd.namespaces(&mut buf, &OutputFormat::default(), false)
            .await
            .unwrap();
        let out = text(buf);
        assert!(out.contains("jobs"));
        assert!(out.contains("Total: 2 namespace(s)"));
    }

    #[tokio::test]
    async fn unknown_cluster_fails() {
        let monitor = fixtures::monitor();
        let cmd = ReportCommand::new(&monitor, "staging");
        let mut buf = Vec::new();
        let err = cmd
            .overview(&mut buf, &OutputFormat::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Monitor(ref e) if e.is_connection()));
        assert!(buf.is_empty());
    }
}
