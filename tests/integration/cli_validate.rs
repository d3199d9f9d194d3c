//! Integration tests for the command-line binary
//!
//! None of these reach the network: validation is offline and harvest runs
//! fail on configuration before the first request.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn harvester() -> Command {
    let mut cmd = Command::cargo_bin("channel-stats-harvester").unwrap();
    cmd.env_remove("HARVEST_API_KEYS");
    cmd
}

#[test]
fn test_validate_json_output() {
    let output = harvester()
        .args([
            "validate",
            "--output-format",
            "json",
            "https://www.youtube.com/@SomeCreator",
            "UCMPyGnBgm6l0KiLoxPI8x3A",
            "Some Creator",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let entries: Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0]["strategy"], "handle");
    assert_eq!(entries[0]["value"], "@SomeCreator");
    assert_eq!(entries[1]["strategy"], "canonical-id");
    assert_eq!(entries[2]["strategy"], "search");
    assert_eq!(entries[2]["reference"], "Some Creator");
}

#[test]
fn test_validate_reads_channel_list() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("channels.csv");
    fs::write(
        &input,
        "\u{feff}name,channel_url\nA,https://www.youtube.com/user/LegacyName\nB,\nC,https://www.youtube.com/c/CustomName\n",
    )
    .unwrap();

    let output = harvester()
        .args(["validate", "--input", input.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Strategy: username"));
    assert!(stdout.contains("Lookup value: LegacyName"));
    assert!(stdout.contains("Strategy: vanity"));
    assert!(stdout.contains("2 reference(s) classified"));
}

#[test]
fn test_validate_without_references_fails() {
    harvester().arg("validate").assert().failure();
}

#[test]
fn test_harvest_without_credentials_fails_before_network() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("channels.csv");
    fs::write(&input, "channel_url\n@SomeCreator\n").unwrap();
    let output = temp_dir.path().join("stats.csv");

    harvester()
        .current_dir(temp_dir.path())
        .args([
            "harvest",
            "--input",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--from",
            "2025-09-30",
            "--to",
            "2025-10-06",
        ])
        .assert()
        .failure();

    assert!(!output.exists(), "no output before credentials are loaded");
}

#[test]
fn test_harvest_rejects_inverted_period() {
    harvester()
        .args([
            "harvest",
            "--input",
            "channels.csv",
            "--from",
            "2025-10-06",
            "--to",
            "2025-09-30",
            "--api-keys",
            "k1",
        ])
        .assert()
        .failure();
}

#[test]
fn test_harvest_rejects_oversized_batch() {
    harvester()
        .args([
            "harvest",
            "--input",
            "channels.csv",
            "--from",
            "2025-09-30",
            "--to",
            "2025-10-06",
            "--batch-size",
            "80",
        ])
        .assert()
        .failure()
        .code(2);
}
