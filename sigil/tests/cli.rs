//! Integration tests for the sigil CLI

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn sigil(base_dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("sigil");
    cmd.env_remove("SIGIL_ASSET_DIR")
        .env_remove("RUST_LOG")
        .arg("--base-dir")
        .arg(base_dir);
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.arg("--json").assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn help_displays() {
    cargo_bin_cmd!("sigil")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fingerprint static assets"));
}

#[test]
fn init_creates_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("assets");

    sigil(&base)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains(".manifest-"));

    assert!(base.is_dir());
}

#[test]
fn digest_then_asset() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    fs::write(base.join("app.js"), b"X").unwrap();

    let digest = json_stdout(sigil(base).arg("digest"));
    assert_eq!(digest["files_digested"], 1);
    assert!(digest.get("clean").is_none());

    let asset = json_stdout(sigil(base).args(["asset", "app.js"]));
    let fingerprinted = asset["fingerprinted"].as_str().unwrap();
    assert!(fingerprinted.starts_with("app-"));
    assert!(fingerprinted.ends_with(".js"));
    assert!(base.join(fingerprinted).exists());
}

#[test]
fn asset_missing_fails_without_fallback() {
    let temp_dir = TempDir::new().unwrap();

    sigil(temp_dir.path())
        .args(["asset", "missing.js"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No manifest entry for missing.js"));

    sigil(temp_dir.path())
        .args(["asset", "missing.js", "--fallback"])
        .assert()
        .success()
        .stdout("missing.js\n");
}

#[test]
fn clean_dry_run_then_clean() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    let orphan = "old-523a40ea7f96cd5740980e61d62dbc77.js";
    fs::write(base.join(orphan), b"o").unwrap();
    fs::write(base.join("app.js"), b"X").unwrap();
    sigil(base).arg("digest").assert().success();

    let dry = json_stdout(sigil(base).args(["clean", "--dry-run"]));
    assert_eq!(dry["dry_run"], true);
    assert_eq!(dry["files_deleted"], 1);
    assert!(base.join(orphan).exists());

    sigil(base)
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 files"));
    assert!(!base.join(orphan).exists());
    assert!(base.join("app.js").exists());
}

#[test]
fn digest_with_clean_removes_previous_generation() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    fs::write(base.join("app.js"), b"X").unwrap();
    sigil(base).arg("digest").assert().success();

    fs::write(base.join("app.js"), b"Z").unwrap();
    let out = json_stdout(sigil(base).args(["digest", "--clean"]));
    assert_eq!(out["clean"]["files_deleted"], 1);
}

#[test]
fn nuke_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    fs::write(base.join("app.js"), b"X").unwrap();
    sigil(base).arg("digest").assert().success();

    let first = json_stdout(sigil(base).arg("nuke"));
    assert_eq!(first["files_deleted"], 1);
    assert_eq!(first["manifest_removed"], true);

    // Opening recreates an empty manifest, which nuke then removes again
    let second = json_stdout(sigil(base).arg("nuke"));
    assert_eq!(second["files_deleted"], 0);

    let remaining: Vec<_> = fs::read_dir(base).unwrap().collect();
    assert_eq!(remaining.len(), 1);
    assert!(base.join("app.js").exists());
}

#[test]
fn ls_lists_entries() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();

    sigil(base)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("No entries"));

    fs::write(base.join("app.js"), b"X").unwrap();
    sigil(base).arg("digest").assert().success();

    sigil(base)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("app.js -> app-"));
}

#[test]
fn strict_rejects_multiple_manifests() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    for token in ["0".repeat(32), "1".repeat(32)] {
        fs::write(base.join(format!(".manifest-{}.json", token)), "{}").unwrap();
    }

    sigil(base).arg("ls").assert().success();
    sigil(base)
        .args(["--strict", "ls"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("manifest files"));
}

#[test]
fn env_var_sets_base_dir() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("from-env");

    cargo_bin_cmd!("sigil")
        .env("SIGIL_ASSET_DIR", &base)
        .arg("init")
        .assert()
        .success();

    assert!(base.is_dir());
}
