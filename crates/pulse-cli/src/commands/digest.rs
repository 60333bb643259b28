//! Digest command implementation.

use std::io::Write;

use pulse_collect::Scope;
use pulse_monitor::{ClusterMonitor, Digest};

use crate::cli::DigestTarget;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Digest command executor.
pub struct DigestCommand<'a> {
    monitor: &'a ClusterMonitor,
    cluster: String,
}

impl<'a> DigestCommand<'a> {
    /// Create a digest command for one cluster.
    #[must_use]
    pub fn new(monitor: &'a ClusterMonitor, cluster: impl Into<String>) -> Self {
        Self {
            monitor,
            cluster: cluster.into(),
        }
    }

    /// Execute the digest command.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist, aggregation fails or
    /// output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        target: &DigestTarget,
    ) -> Result<(), CliError> {
        let digest = self.build(target).await?;
        format.write(writer, &digest)
    }

    /// Build the digest for a target.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NotFound`] if the object does not exist.
    pub async fn build(&self, target: &DigestTarget) -> Result<Digest, CliError> {
        match target {
            DigestTarget::Pod { reference, refresh } => {
                let (namespace, name) = parse_pod_reference(reference)?;
                let pods = self
                    .monitor
                    .get_pod_details(&self.cluster, &Scope::namespace(namespace), *refresh)
                    .await?;
                pods.data
                    .iter()
                    .find(|p| p.name == name)
                    .map(Digest::from)
                    .ok_or_else(|| not_found("pod", reference))
            }
            DigestTarget::Node { name, refresh } => {
                let nodes = self
                    .monitor
                    .get_node_details(&self.cluster, *refresh)
                    .await?;
                nodes
                    .data
                    .iter()
                    .find(|n| &n.name == name)
                    .map(Digest::from)
                    .ok_or_else(|| not_found("node", name))
            }
            DigestTarget::Namespace { name, refresh } => {
                let namespaces = self
                    .monitor
                    .get_namespace_details(&self.cluster, *refresh)
                    .await?;
                namespaces
                    .data
                    .iter()
                    .find(|n| &n.name == name)
                    .map(Digest::from)
                    .ok_or_else(|| not_found("namespace", name))
            }
        }
    }
}

fn not_found(kind: &'static str, name: &str) -> CliError {
    CliError::NotFound {
        kind,
        name: name.to_string(),
    }
}

/// Split `<namespace>/<name>`.
fn parse_pod_reference(reference: &str) -> Result<(&str, &str), CliError> {
    match reference.split_once('/') {
        Some((namespace, name))
            if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((namespace, name))
        }
        _ => Err(CliError::InvalidArgument(format!(
            "pod reference '{reference}' must be <namespace>/<name>"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use pulse_health::HealthStatus;

    #[test]
    fn pod_references() {
        assert_eq!(parse_pod_reference("shop/web-0").unwrap(), ("shop", "web-0"));
        for bad in ["web-0", "/web-0", "shop/", "a/b/c"] {
            assert!(
                matches!(parse_pod_reference(bad), Err(CliError::InvalidArgument(_))),
                "{bad}"
            );
        }
    }

    #[tokio::test]
    async fn crash_looping_pod_digest() {
        let monitor = fixtures::monitor();
        let cmd = DigestCommand::new(&monitor, "prod");
        let digest = cmd
            .build(&DigestTarget::Pod {
                reference: "jobs/worker-0".into(),
                refresh: false,
            })
            .await
            .unwrap();
        assert_eq!(digest.subject, "pod/jobs/worker-0");
        assert!(digest.status.requires_attention());
        assert!(
            digest
                .error_indicators
                .iter()
                .any(|i| i.contains("CrashLoopBackOff"))
        );
    }

    #[tokio::test]
    async fn node_and_namespace_digests() {
        let monitor = fixtures::monitor();
        let cmd = DigestCommand::new(&monitor, "prod");

        let node = cmd
            .build(&DigestTarget::Node {
                name: "n1".into(),
                refresh: false,
            })
            .await
            .unwrap();
        assert_eq!(node.subject, "node/n1");
        assert_eq!(node.status, HealthStatus::Healthy);

        let ns = cmd
            .build(&DigestTarget::Namespace {
                name: "shop".into(),
                refresh: false,
            })
            .await
            .unwrap();
        assert_eq!(ns.subject, "namespace/shop");
    }

    #[tokio::test]
    async fn missing_pod_is_not_found() {
        let monitor = fixtures::monitor();
        let cmd = DigestCommand::new(&monitor, "prod");
        let mut buf = Vec::new();
        let err = cmd
            .execute(
                &mut buf,
                &OutputFormat::default(),
                &DigestTarget::Pod {
                    reference: "shop/web-9".into(),
                    refresh: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::NotFound { kind: "pod", .. }));
    }

    #[tokio::test]
    async fn digest_table_is_plain_text() {
        let monitor = fixtures::monitor();
        let cmd = DigestCommand::new(&monitor, "prod");
        let mut buf = Vec::new();
        cmd.execute(
            &mut buf,
            &OutputFormat::default(),
            &DigestTarget::Pod {
                reference: "shop/web-0".into(),
                refresh: false,
            },
        )
        .await
        .unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("pod/shop/web-0: Running"));
        assert!(out.contains("scheduled on Node/n1"));
    }
}
