//! Integration tests for the `netweave` CLI binary.
//!
//! Every test writes its property files into a temp dir and points the
//! daemon config at a path that does not exist, so defaults apply.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

fn netweave_cmd(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("netweave");
    cmd.env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env("NETWEAVE_CONFIG", dir.path().join("absent.toml"))
        .env_remove("RUST_LOG")
        .arg("--color")
        .arg("never");
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const GATEWAY: &str = r#"
"net.interfaces" = "eth0,eth1"
"net.interface.eth0.type" = "ETHERNET"
"net.interface.eth0.config.ip4.status" = "netIPv4StatusEnabledWAN"
"net.interface.eth0.config.dhcpClient4.enabled" = true
"net.interface.eth1.type" = "ETHERNET"
"net.interface.eth1.config.ip4.status" = "netIPv4StatusEnabledLAN"
"net.interface.eth1.config.dhcpClient4.enabled" = false
"net.interface.eth1.config.ip4.address" = "172.16.0.1"
"net.interface.eth1.config.ip4.prefix" = 24
"firewall.open.ports" = "22,tcp,,,,,#;80,tcp,,eth0,,,#"
"#;

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    let output = netweave_cmd(&dir).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    netweave_cmd(&dir).arg("--help").assert().success().stdout(
        predicate::str::contains("check")
            .and(predicate::str::contains("diff"))
            .and(predicate::str::contains("firewall"))
            .and(predicate::str::contains("run")),
    );
}

// ── check ───────────────────────────────────────────────────────────

#[test]
fn test_check_lists_interfaces() {
    let dir = TempDir::new().unwrap();
    let props = write(dir.path(), "network.toml", GATEWAY);
    netweave_cmd(&dir)
        .args(["check", "-o", "plain"])
        .arg(&props)
        .assert()
        .success()
        .stdout("eth0\neth1\n");
}

#[test]
fn test_check_rejects_bad_address() {
    let dir = TempDir::new().unwrap();
    let broken = GATEWAY.replace("172.16.0.1", "172.16.0.300");
    let props = write(dir.path(), "network.toml", &broken);
    netweave_cmd(&dir)
        .arg("check")
        .arg(&props)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("eth1"));
}

#[test]
fn test_check_missing_file_exits_not_found() {
    let dir = TempDir::new().unwrap();
    netweave_cmd(&dir)
        .arg("check")
        .arg(dir.path().join("nope.toml"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not found"));
}

// ── diff ────────────────────────────────────────────────────────────

#[test]
fn test_diff_reports_changed_interface() {
    let dir = TempDir::new().unwrap();
    let old = write(dir.path(), "old.toml", GATEWAY);
    let new = write(
        dir.path(),
        "new.toml",
        &GATEWAY.replace("172.16.0.1", "172.16.5.1"),
    );

    netweave_cmd(&dir)
        .args(["diff", "-o", "plain"])
        .arg(&old)
        .arg(&new)
        .assert()
        .success()
        .stdout("eth1\n");

    netweave_cmd(&dir)
        .arg("diff")
        .arg(&old)
        .arg(&old)
        .assert()
        .success()
        .stdout(predicate::str::contains("No interface needs reconfiguration"));
}

// ── firewall ────────────────────────────────────────────────────────

#[test]
fn test_firewall_decodes_open_ports() {
    let dir = TempDir::new().unwrap();
    let props = write(dir.path(), "network.toml", GATEWAY);
    let output = netweave_cmd(&dir)
        .args(["firewall", "--family", "ipv4", "-o", "json"])
        .arg(&props)
        .output()
        .unwrap();
    assert!(output.status.success());

    let rules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rules = rules.as_array().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0]["list"], "open-port");
    assert_eq!(rules[1]["interfaces"], "eth0");
}

// ── run ─────────────────────────────────────────────────────────────

#[test]
fn test_dry_run_brings_interfaces_up() {
    let dir = TempDir::new().unwrap();
    let props = write(dir.path(), "network.toml", GATEWAY);
    netweave_cmd(&dir)
        .args(["run", "--duration", "1", "-o", "plain"])
        .arg(&props)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("eth0 UpLinked").and(predicate::str::contains("eth1 UpLinked")),
        );
}
