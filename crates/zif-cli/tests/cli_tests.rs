//! CLI integration tests for zif.

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn zif() -> Command {
    Command::new(cargo_bin!("zif"))
}

#[test]
fn test_help_output() {
    zif()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("system-upgrade"));
}

#[test]
fn test_version_output() {
    zif().arg("--version").assert().success().stdout(predicate::str::contains("zif"));
}

#[test]
fn test_install_requires_world_file() {
    zif().args(["install", "hal"]).assert().failure().stderr(predicate::str::contains("--world"));
}

#[test]
fn test_install_and_remove_roundtrip() {
    let mut world = NamedTempFile::new().unwrap();
    writeln!(world, "repo updates").unwrap();
    writeln!(world, "package updates hal 0 0.0.2 1 x86_64").unwrap();
    world.flush().unwrap();

    let root = tempfile::tempdir().unwrap();

    zif()
        .args(["--world", world.path().to_str().unwrap(), "--root", root.path().to_str().unwrap(), "-y", "install", "hal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 installed"));
}

#[test]
fn test_run_manifest_reports_summary() {
    let mut manifest = NamedTempFile::new().unwrap();
    writeln!(manifest, "repo updates").unwrap();
    writeln!(manifest, "package updates hal 0 0.0.2 1 x86_64").unwrap();
    writeln!(manifest, "install hal").unwrap();
    writeln!(manifest, "run").unwrap();
    writeln!(manifest, "expect-state hal 0.0.2 1 x86_64").unwrap();
    manifest.flush().unwrap();

    zif().args(["run-manifest", manifest.path().to_str().unwrap()]).assert().success();
}
