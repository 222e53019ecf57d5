//! Integration tests for configuration loading and top-level error output.
//!
//! All filesystem-touching tests pass `--config` or `--inventory` paths
//! under a temp dir so they never read `~/.warden/`.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn warden() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("warden"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("WARDEN_CONFIG");
    cmd.env_remove("WARDEN_YES");
    cmd
}

/// Returns a `TempDir` and the path string of a file inside it holding
/// `content`.
fn temp_file(name: &str, content: &str) -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write temp file");
    (dir, path.to_string_lossy().into_owned())
}

// --- Desired-state validation ---

#[test]
fn test_unknown_agent_variant_fails_before_observation() {
    warden()
        .args(["--config", "/nonexistent/warden-it/config.yaml"])
        .args(["status", "--agent", "v9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown agent variant 'v9'"));
}

#[test]
fn test_unknown_agent_variant_json_emits_an_error_object() {
    warden()
        .args(["--config", "/nonexistent/warden-it/config.yaml", "--json"])
        .args(["status", "--agent", "v9"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""error": true"#))
        .stdout(predicate::str::contains(r#""code": "config-invalid""#))
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_malformed_version_pin_is_rejected() {
    warden()
        .args(["--config", "/nonexistent/warden-it/config.yaml"])
        .args(["plan", "--agent-version", "seven"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("seven"));
}

// --- Config file handling ---

#[test]
fn test_malformed_config_file_is_reported() {
    let (_dir, path) = temp_file("config.yaml", "agent: [oops");
    warden()
        .args(["--config", &path, "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing config"));
}

#[test]
fn test_invalid_source_url_is_rejected_on_load() {
    let (_dir, path) = temp_file(
        "config.yaml",
        "source:\n  base_url: ftp://mirror.internal/sentinel\n",
    );
    warden()
        .args(["--config", &path, "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"))
        .stderr(predicate::str::contains("source.base_url"));
}

// --- Fleet inventory handling ---

#[test]
fn test_missing_inventory_file_is_reported() {
    warden()
        .args(["--config", "/nonexistent/warden-it/config.yaml"])
        .args(["fleet", "--inventory", "/nonexistent/warden-it/fleet.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading fleet inventory"));
}

#[test]
fn test_empty_inventory_is_rejected() {
    let (_dir, path) = temp_file("fleet.yaml", "hosts: []\n");
    warden()
        .args(["--config", "/nonexistent/warden-it/config.yaml"])
        .args(["fleet", "--inventory", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one host"));
}

#[test]
fn test_duplicate_inventory_hosts_are_rejected() {
    let inventory = "\
hosts:
  - name: edge-01
    install_root: /opt/sentinel
  - name: edge-01
    install_root: /srv/sentinel
";
    let (_dir, path) = temp_file("fleet.yaml", inventory);
    warden()
        .args(["--config", "/nonexistent/warden-it/config.yaml"])
        .args(["fleet", "--inventory", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("edge-01"));
}
