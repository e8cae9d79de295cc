#![warn(clippy::pedantic)]

//! Integration tests for the pvm CLI.
//!
//! These tests spawn the compiled binary with an isolated `PVM_HOME` and an
//! unreachable `PVM_DIST_SERVER`, then check stdout, stderr and exit codes.
//! Tests that need a catalog seed `cache/catalog.json` with a fresh
//! timestamp so no network access is attempted.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pvm
//! ```

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const UNREACHABLE_SERVER: &str = "http://127.0.0.1:1";

/// Creates a command with an isolated home directory.
fn pvm(home: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pvm"));
    cmd.env("PVM_HOME", home.path())
        .env("PVM_DIST_SERVER", UNREACHABLE_SERVER)
        .env_remove("PVM_LOG");
    cmd
}

/// Writes a catalog cache that is considered fresh for the unreachable server.
fn seed_catalog(home: &assert_fs::TempDir) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Clock should be after epoch")
        .as_secs();
    let cache = serde_json::json!({
        "fetched_at": now,
        "dist_server": UNREACHABLE_SERVER,
        "catalog": [
            { "major": 8, "minor": 1, "patch": 27, "thread_safe": true,
              "download_url": "/downloads/releases/archives/php-8.1.27-Win32-vs16-x64.zip" },
            { "major": 8, "minor": 2, "patch": 9, "thread_safe": true,
              "download_url": "/downloads/releases/php-8.2.9-Win32-vs16-x64.zip" },
            { "major": 8, "minor": 2, "patch": 9, "thread_safe": false,
              "download_url": "/downloads/releases/php-8.2.9-nts-Win32-vs16-x64.zip" }
        ]
    });
    home.child("cache/catalog.json")
        .write_str(&cache.to_string())
        .expect("Should write cache");
}

#[test]
fn help_lists_subcommands() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    pvm(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("versions"))
        .stdout(predicate::str::contains("PVM_HOME"));
}

#[test]
fn list_with_nothing_installed() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    pvm(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No PHP versions installed."));
}

#[test]
fn list_shows_installed_directories_only() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    home.child("versions/php-8.2.9-Win32-vs16-x64")
        .create_dir_all()
        .expect("Should create dir");
    home.child("versions/php-8.3.0-Win32-vs16-x64.zip")
        .write_binary(b"partial")
        .expect("Should write");

    pvm(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("php-8.2.9-Win32-vs16-x64"))
        .stdout(predicate::str::contains(".zip").not());
}

#[test]
fn install_rejects_malformed_version() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    pvm(&home)
        .args(["install", "eight"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid version specified: eight"));
}

#[test]
fn install_rejects_unknown_variant() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    pvm(&home)
        .args(["install", "8.2", "debug"])
        .assert()
        .failure();
}

#[test]
fn install_reports_unreachable_server() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    pvm(&home)
        .args(["install", "8.2", "nts"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains(
            "Non-thread safe version will be installed",
        ))
        .stderr(predicate::str::contains("catalog error"));
}

#[test]
fn install_reports_missing_version() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    seed_catalog(&home);

    pvm(&home)
        .args(["install", "8.1", "nts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "could not find the desired version: 8.1 non-thread safe",
        ));
}

#[test]
fn install_refuses_existing_version_without_downloading() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    seed_catalog(&home);
    home.child("versions/php-8.2.9-Win32-vs16-x64")
        .create_dir_all()
        .expect("Should create dir");

    pvm(&home)
        .args(["install", "8"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Installing PHP 8.2.9 thread safe"))
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn versions_lists_newest_first_and_marks_installed() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    seed_catalog(&home);
    home.child("versions/php-8.1.27-Win32-vs16-x64")
        .create_dir_all()
        .expect("Should create dir");

    pvm(&home)
        .arg("versions")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?s)8\.2\.9\n.*8\.1\.27 \*").expect("Valid regex"));
}

#[test]
fn versions_json_filters_variant() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    seed_catalog(&home);

    let output = pvm(&home)
        .args(["versions", "--nts", "--json"])
        .output()
        .expect("Should run");
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Should be JSON");
    let list = parsed.as_array().expect("Should be an array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["version"], "8.2.9");
    assert_eq!(list[0]["thread_safe"], false);
}

#[test]
fn versions_reports_unreachable_server() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    pvm(&home)
        .arg("versions")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"));
}

#[test]
fn malformed_config_is_reported() {
    let home = assert_fs::TempDir::new().expect("Should create temp dir");
    home.child("config.toml")
        .write_str("catalog_ttl_secs = \"never\"\n")
        .expect("Should write");

    pvm(&home)
        .arg("versions")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}
