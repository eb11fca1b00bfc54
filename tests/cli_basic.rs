//! Integration tests for basic CLI behavior.
//!
//! Only paths that fail or finish before any network request are covered
//! here; resolver behavior is tested against mock servers in `resolvers.rs`.

#![allow(deprecated)] // cargo_bin deprecation, replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `livefetch` binary.
fn livefetch() -> Command {
    let mut cmd = Command::cargo_bin("livefetch").expect("binary 'livefetch' should be built");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Empty settings file, so tests never read the user's own settings.
fn empty_config(tag: &str) -> String {
    let path = std::env::temp_dir().join(format!(
        "livefetch-cli-{tag}-{}.toml",
        std::process::id()
    ));
    std::fs::write(&path, "").unwrap();
    path.display().to_string()
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    livefetch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: livefetch"))
        .stdout(predicate::str::contains("--platform"))
        .stdout(predicate::str::contains("--id"))
        .stdout(predicate::str::contains("--quality"))
        .stdout(predicate::str::contains("--proxy"))
        .stdout(predicate::str::contains("--list"));
}

#[test]
fn version_flag_shows_semver() {
    livefetch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^livefetch \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn list_prints_every_platform() {
    livefetch()
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("douyin"))
        .stdout(predicate::str::contains("huya"))
        .stdout(predicate::str::contains("douyu"))
        .stdout(predicate::str::contains("piaopiao"))
        .stdout(predicate::str::contains("huamao"))
        .stdout(predicate::str::contains("https://www.huya.com/{room_id}"));
}

// ─── Argument errors ─────────────────────────────────────────────────────────

#[test]
fn platform_and_id_are_required() {
    livefetch()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--platform"));

    livefetch()
        .args(["-l", "huya"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--id"));
}

#[test]
fn unknown_platform_lists_supported_ones() {
    livefetch()
        .args(["-l", "bilibili", "-i", "1", "--config", &empty_config("bilibili")])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unsupported platform: bilibili"))
        .stderr(predicate::str::contains(
            "Supported platforms: douyin, huya, douyu, piaopiao, huamao",
        ));
}

#[test]
fn broken_settings_file_is_reported() {
    let path = std::env::temp_dir().join(format!("livefetch-cli-bad-{}.toml", std::process::id()));
    std::fs::write(&path, "timeout_secs = \"never\"").unwrap();

    livefetch()
        .args(["-l", "huya", "-i", "1", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load settings"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_settings_file_is_reported() {
    let path = std::env::temp_dir().join("livefetch-cli-no-such-dir/config.toml");

    livefetch()
        .args(["-l", "huya", "-i", "1", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load settings"))
        .stderr(predicate::str::contains("livefetch-cli-no-such-dir"));
}

#[test]
fn empty_room_id_is_rejected_without_network() {
    livefetch()
        .args(["-l", "douyu", "-i", "  ", "--config", &empty_config("empty-id")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty room id"));
}
