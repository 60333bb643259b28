//! Runs the `clusterpulse` binary against snapshot files.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const SNAPSHOT: &str = r#"{
  "nodes": [
    {
      "metadata": {"name": "n1"},
      "status": {
        "conditions": [{"type": "Ready", "status": "True"}],
        "capacity": {"cpu": "4", "memory": "16Gi", "pods": "110"},
        "allocatable": {"cpu": "4", "memory": "16Gi", "pods": "110"}
      }
    }
  ],
  "pods": [
    {
      "metadata": {"name": "web-0", "namespace": "shop"},
      "spec": {"nodeName": "n1", "containers": [{"name": "app"}]},
      "status": {
        "phase": "Running",
        "conditions": [{"type": "Ready", "status": "True"}],
        "containerStatuses": [{"name": "app", "ready": true, "restartCount": 0, "state": {"running": {}}}]
      }
    }
  ],
  "namespaces": [{"metadata": {"name": "shop"}, "status": {"phase": "Active"}}]
}"#;

fn write_snapshot(dir: &Path, cluster: &str) {
    std::fs::write(dir.join(format!("{cluster}.json")), SNAPSHOT).unwrap();
}

fn clusterpulse(snapshot: &Path) -> Command {
    let mut cmd = Command::cargo_bin("clusterpulse").unwrap();
    cmd.env_remove("CLUSTERPULSE_CONFIG")
        .env_remove("CLUSTERPULSE_CACHE_TTL_SECS")
        .env_remove("CLUSTERPULSE_COLLECTOR_TIMEOUT_SECS")
        .arg("--snapshot")
        .arg(snapshot);
    cmd
}

#[test]
fn overview_table() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), "prod");

    clusterpulse(dir.path())
        .arg("overview")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cluster Overview"))
        .stdout(predicate::str::contains("Ready:          1"));
}

#[test]
fn pods_as_json() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), "prod");

    let output = clusterpulse(dir.path())
        .args(["--format", "json", "pods", "--namespace", "shop"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["data"][0]["name"], "web-0");
    assert_eq!(value["partial"], false);
}

#[test]
fn pod_digest() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), "prod");

    clusterpulse(dir.path())
        .args(["digest", "pod", "shop/web-0"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("pod/shop/web-0"));
}

#[test]
fn several_clusters_need_a_choice() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), "prod");
    write_snapshot(dir.path(), "staging");

    clusterpulse(dir.path())
        .arg("nodes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass --cluster"));

    clusterpulse(dir.path())
        .args(["--cluster", "staging", "nodes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 node(s)"));
}

#[test]
fn missing_pod_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), "prod");

    clusterpulse(dir.path())
        .args(["digest", "pod", "shop/web-9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pod not found: shop/web-9"));
}

#[test]
fn invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), "prod");
    let config = dir.path().join("monitor.toml");
    std::fs::write(&config, "collector_timeout_secs = 0\n").unwrap();

    clusterpulse(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("overview")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}
