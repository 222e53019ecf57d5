//! Integration tests for the CLI surface.
//!
//! These tests verify argument parsing, help output, and the version
//! command. Anything that would touch the host's service manager or the
//! network is covered by the unit suite behind stub ports instead.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn warden() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("warden"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("WARDEN_CONFIG");
    cmd.env_remove("WARDEN_YES");
    cmd
}

// --- Help and version ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    warden().assert().code(2).stderr(predicate::str::contains(
        "Converge Sentinel monitoring agents",
    ));
}

#[test]
fn test_cli_help_lists_every_subcommand() {
    let mut assert = warden()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
    for name in ["status", "plan", "converge", "fleet", "check", "version"] {
        assert = assert.stdout(predicate::str::contains(name));
    }
}

#[test]
fn test_cli_version_flag_shows_version() {
    warden()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("warden"));
}

#[test]
fn test_version_command_prints_the_package_version() {
    warden()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "warden {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json_is_compact() {
    warden()
        .args(["version", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            r#"{{"version":"{}"}}"#,
            env!("CARGO_PKG_VERSION")
        )));
}

// --- Argument validation ---

#[test]
fn test_unknown_subcommand_is_rejected() {
    warden()
        .arg("banish")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_status_help_shows_target_flags() {
    warden()
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--agent"))
        .stdout(predicate::str::contains("--agent-version"))
        .stdout(predicate::str::contains("--install-root"))
        .stdout(predicate::str::contains("--instance"));
}

#[test]
fn test_converge_help_shows_the_check_flag() {
    warden()
        .args(["converge", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--check"))
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_fleet_help_shows_the_inventory_flag() {
    warden()
        .args(["fleet", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--inventory"));
}

#[test]
fn test_global_flags_parse_after_the_subcommand() {
    warden()
        .args(["version", "--quiet", "--no-color"])
        .assert()
        .success();
}
