//! Loads snapshot files into a connection registry.

use std::path::Path;
use std::sync::Arc;

use pulse_collect::{ResourceClient, SnapshotClient, StaticRegistry};
use tracing::{debug, info};

use crate::error::CliError;

/// Clusters loaded from snapshot files.
///
/// Each `<cluster>.json` file registers one cluster named after the file
/// stem.
#[derive(Debug)]
pub struct Snapshots {
    registry: StaticRegistry,
    clusters: Vec<String>,
}

impl Snapshots {
    /// Loads a single snapshot file, or every `.json` file in a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or parsed, or if a
    /// directory holds no snapshot files.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let files = if path.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(path)? {
                let file = entry?.path();
                if file.extension().is_some_and(|ext| ext == "json") {
                    files.push(file);
                }
            }
            files.sort();
            files
        } else {
            vec![path.to_path_buf()]
        };

        let registry = StaticRegistry::new();
        let mut clusters = Vec::with_capacity(files.len());
        for file in &files {
            let Some(cluster) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let client = SnapshotClient::from_file(file)?;
            registry.register(cluster, Arc::new(client) as Arc<dyn ResourceClient>);
            debug!(cluster, path = %file.display(), "registered snapshot");
            clusters.push(cluster.to_string());
        }

        if clusters.is_empty() {
            return Err(CliError::NoSnapshots(path.display().to_string()));
        }
        info!(count = clusters.len(), "snapshots loaded");
        Ok(Self { registry, clusters })
    }

    /// Names of the loaded clusters, sorted.
    #[must_use]
    pub fn clusters(&self) -> &[String] {
        &self.clusters
    }

    /// Picks the cluster to query.
    ///
    /// With no request, a single loaded cluster is chosen implicitly.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Cluster`] if the requested cluster is not loaded,
    /// or if none was requested and several are loaded.
    pub fn resolve(&self, requested: Option<&str>) -> Result<String, CliError> {
        match (requested, self.clusters.as_slice()) {
            (Some(name), loaded) => {
                if loaded.iter().any(|c| c == name) {
                    Ok(name.to_string())
                } else {
                    Err(CliError::Cluster(format!(
                        "'{name}' is not loaded (available: {})",
                        loaded.join(", ")
                    )))
                }
            }
            (None, [only]) => Ok(only.clone()),
            (None, loaded) => Err(CliError::Cluster(format!(
                "several clusters loaded, pass --cluster (available: {})",
                loaded.join(", ")
            ))),
        }
    }

    /// Consumes the loader, returning the registry.
    #[must_use]
    pub fn into_registry(self) -> StaticRegistry {
        self.registry
    }
}
