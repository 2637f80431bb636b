//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against an isolated data
//! directory and verify exit codes and outputs.

use std::process::Command;

/// Run a CLI command against a scratch home directory.
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let home = std::env::temp_dir().join("vigil-cli-tests");
    std::fs::create_dir_all(&home).expect("create scratch home");

    let output = Command::new("cargo")
        .args(["run", "-p", "vigil-cli", "--quiet", "--"])
        .args(args)
        .env("HOME", &home)
        .env("USERPROFILE", &home)
        .env("VIGIL_ENV", "dev")
        .output()
        .expect("failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn day_status_reports_a_fresh_day() {
    let (stdout, stderr, code) = run_cli(&["day", "status"]);
    assert_eq!(code, 0, "day status failed: {stderr}");
    assert!(stdout.contains("\"submitted\": false"));
    assert!(stdout.contains("\"multiplier\""));
}

#[test]
fn config_list_prints_defaults() {
    let (stdout, stderr, code) = run_cli(&["config", "list"]);
    assert_eq!(code, 0, "config list failed: {stderr}");
    assert!(stdout.contains("[loyalty]"));
    assert!(stdout.contains("deadline_minutes = 7"));
}

#[test]
fn config_get_known_key() {
    let (stdout, stderr, code) = run_cli(&["config", "get", "enforcement.warning_delay_secs"]);
    assert_eq!(code, 0, "config get failed: {stderr}");
    assert_eq!(stdout.trim(), "15");
}

#[test]
fn config_get_unknown_key_fails() {
    let (_, _, code) = run_cli(&["config", "get", "no.such.key"]);
    assert_ne!(code, 0);
}

#[test]
fn history_list_handles_empty_history() {
    let (stdout, stderr, code) = run_cli(&["history", "list"]);
    assert_eq!(code, 0, "history list failed: {stderr}");
    assert!(stdout.contains("no submitted days") || !stdout.is_empty());
}
