//! CLI integration tests

use std::path::Path;
use std::process::Command;

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;

fn tape_relay_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tape-relay"))
}

/// Binary isolated from the user's config and runtime dir
fn isolated(dir: &Path) -> AssertCommand {
    let mut cmd = AssertCommand::cargo_bin("tape-relay").expect("binary built");
    cmd.env("TAPE_RELAY_CONFIG", dir.join("config.toml"))
        .env("XDG_RUNTIME_DIR", dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_output() {
    let output = tape_relay_bin()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Record live audio"));
    assert!(stdout.contains("daemon"));
    assert!(stdout.contains("record"));
    assert!(stdout.contains("clear-error"));
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("--max-duration"));
    assert!(stdout.contains("--legacy-single-message"));
}

#[test]
fn version_output() {
    let output = tape_relay_bin()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tape-relay"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn config_path_command() {
    let output = tape_relay_bin()
        .env_remove("TAPE_RELAY_CONFIG")
        .args(["config", "path"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tape-relay"));
    assert!(stdout.contains("config.toml"));
}

#[test]
fn config_path_follows_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");

    tape_relay_bin()
        .args(["--config", path.to_str().unwrap(), "config", "path"])
        .output()
        .map(|output| {
            assert!(output.status.success());
            assert_eq!(
                String::from_utf8_lossy(&output.stdout).trim(),
                path.to_string_lossy()
            );
        })
        .expect("Failed to execute command");
}

#[test]
fn config_help() {
    let output = tape_relay_bin()
        .args(["config", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("init"));
    assert!(stdout.contains("set"));
    assert!(stdout.contains("get"));
    assert!(stdout.contains("list"));
    assert!(stdout.contains("path"));
}

#[test]
fn invalid_duration_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .args(["record", "--duration", "invalid"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid duration"));
}

#[test]
fn invalid_format_rejected() {
    tape_relay_bin()
        .args(["record", "--format", "mp3"])
        .output()
        .map(|output| {
            assert!(!output.status.success());
            assert!(String::from_utf8_lossy(&output.stderr).contains("invalid value"));
        })
        .expect("Failed to execute command");
}

#[test]
fn out_of_range_sample_rate_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .args(["record", "--sample-rate", "100", "-s", "synthetic"])
        .assert()
        .code(2);
}

#[test]
fn config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();

    isolated(dir.path())
        .args(["config", "set", "max_duration", "90s"])
        .assert()
        .success();

    isolated(dir.path())
        .args(["config", "get", "max_duration"])
        .assert()
        .success()
        .stdout("1m30s\n");

    isolated(dir.path())
        .args(["config", "get", "format"])
        .assert()
        .success()
        .stdout("(not set)\n");
}

#[test]
fn config_list_shows_every_key() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("chunk_cap")
                .and(predicate::str::contains("stale_buffer_timeout"))
                .and(predicate::str::contains("legacy_single_message")),
        );
}

#[test]
fn config_rejects_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .args(["config", "get", "api_key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown key"));
}

#[test]
fn control_without_daemon_fails() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .arg("stop")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No daemon running"));
}

#[test]
fn record_synthetic_source_saves_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("recordings");

    let assert = isolated(dir.path())
        .args(["record", "-s", "synthetic", "-d", "1s", "-o"])
        .arg(&out)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let saved = Path::new(stdout.trim());
    assert!(saved.starts_with(&out));
    assert_eq!(saved.extension().and_then(|e| e.to_str()), Some("wav"));

    let bytes = std::fs::read(saved).unwrap();
    assert_eq!(&bytes[..4], b"RIFF");
}

#[test]
fn record_unknown_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .args(["record", "-s", "synthetic:abc", "-d", "1s", "-o"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}
