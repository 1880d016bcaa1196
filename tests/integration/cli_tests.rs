//! CLI integration tests
//!
//! These tests run the jarmap binary against generated jars and mapping
//! files.

mod common;

use assert_cmd::Command;
use common::{sample_classes, write_jar};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// The jarmap binary, run from `dir` so no stray config file is picked up
fn jarmap(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("jarmap").unwrap();
    cmd.current_dir(dir).env("NO_COLOR", "1");
    cmd
}

fn sample_jar(dir: &Path) -> String {
    write_jar(dir, "sample.jar", &sample_classes(), &[])
        .to_string_lossy()
        .into_owned()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    jarmap(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("jarmap"))
        .stdout(predicate::str::contains("inheritance"))
        .stdout(predicate::str::contains("convert"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    jarmap(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jarmap"));
}

#[test]
fn test_cli_missing_jar() {
    let dir = TempDir::new().unwrap();
    jarmap(dir.path())
        .args(["index", "missing.jar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.jar"));
}

// ============================================================================
// Index and query commands
// ============================================================================

#[test]
fn test_cli_index_stats() {
    let dir = TempDir::new().unwrap();
    let jar = sample_jar(dir.path());

    jarmap(dir.path())
        .args(["index", &jar])
        .assert()
        .success()
        .stdout(predicate::str::contains("classes"))
        .stdout(predicate::str::contains("bridge methods"));
}

#[test]
fn test_cli_index_json() {
    let dir = TempDir::new().unwrap();
    let jar = sample_jar(dir.path());

    let output = jarmap(dir.path())
        .args(["--quiet", "--json", "index", &jar])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["classes"], 5);
    assert_eq!(stats["bridge_methods"], 1);
}

#[test]
fn test_cli_inheritance() {
    let dir = TempDir::new().unwrap();
    let jar = sample_jar(dir.path());

    jarmap(dir.path())
        .args(["-q", "inheritance", &jar, "c"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("b\n"))
        .stdout(predicate::str::contains("  c\n"));
}

#[test]
fn test_cli_implementations() {
    let dir = TempDir::new().unwrap();
    let jar = sample_jar(dir.path());

    let output = jarmap(dir.path())
        .args(["-q", "--json", "implementations", &jar, "a"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let tree: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tree["class"], "a");
    assert_eq!(tree["children"].as_array().unwrap().len(), 2);

    jarmap(dir.path())
        .args(["-q", "implementations", &jar, "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an interface"));
}

#[test]
fn test_cli_callers_recursive() {
    let dir = TempDir::new().unwrap();
    let jar = sample_jar(dir.path());

    jarmap(dir.path())
        .args(["-q", "callers", &jar, "c", "a", "()Ljava/lang/String;"])
        .assert()
        .success()
        .stdout(predicate::str::contains("d.b(Lc;)V"))
        .stdout(predicate::str::contains("d.a(Lb;)V").not());

    jarmap(dir.path())
        .args(["-q", "callers", &jar, "c", "a", "()Ljava/lang/String;", "--recursive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("d.a(Lb;)V"))
        .stdout(predicate::str::contains("b.a()Ljava/lang/Object;"));
}

#[test]
fn test_cli_recursive_callers_of_unknown_method() {
    let dir = TempDir::new().unwrap();
    let jar = sample_jar(dir.path());

    jarmap(dir.path())
        .args(["-q", "callers", &jar, "zz", "a", "()V", "--recursive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not part of the index"));
}

// ============================================================================
// Mapping commands
// ============================================================================

#[test]
fn test_cli_convert_enigma_to_tiny() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("in.mapping"),
        "CLASS a pkg/Api\n\tMETHOD a get ()Ljava/lang/Object;\nCLASS b pkg/Impl\n",
    )
    .unwrap();

    jarmap(dir.path())
        .args(["convert", "in.mapping", "out.tiny", "--to", "tiny"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted 3 mappings"));

    let tiny = fs::read_to_string(dir.path().join("out.tiny")).unwrap();
    assert_eq!(
        tiny,
        "v1\tofficial\tnamed\n\
         CLASS\ta\tpkg/Api\n\
         CLASS\tb\tpkg/Impl\n\
         METHOD\ta\t()Ljava/lang/Object;\ta\tget\n"
    );
}

#[test]
fn test_cli_convert_from_srg_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("in.srg"), "CL: a b\n").unwrap();

    jarmap(dir.path())
        .args(["convert", "in.srg", "out.mapping"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("can only be written"));
}

#[test]
fn test_cli_convert_reports_bad_line() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("in.mapping"), "CLASS a A\n\tMETHOD b\n").unwrap();

    jarmap(dir.path())
        .args(["convert", "in.mapping", "out.tiny", "--to", "tiny"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Line 2"));
    assert!(!dir.path().join("out.tiny").exists());
}

#[test]
fn test_cli_deobfuscate_names() {
    let dir = TempDir::new().unwrap();
    let jar = sample_jar(dir.path());
    fs::write(
        dir.path().join("names.mapping"),
        "CLASS d pkg/Main\n\tCLASS e Helper\nCLASS zz pkg/Missing\n",
    )
    .unwrap();

    jarmap(dir.path())
        .args(["-q", "deobfuscate-names", &jar, "names.mapping"])
        .assert()
        .success()
        .stdout(predicate::str::contains("d -> pkg/Main"))
        .stdout(predicate::str::contains("d$e -> pkg/Main$Helper"))
        .stdout(predicate::str::contains("pkg/Missing").not());
}

#[test]
fn test_cli_config_default_format() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("jarmap.yml"), "mappings:\n  format: srg\n").unwrap();
    fs::write(dir.path().join("in.mapping"), "CLASS a pkg/Api\n").unwrap();

    jarmap(dir.path())
        .args(["-q", "convert", "in.mapping", "out.srg"])
        .assert()
        .success();

    let srg = fs::read_to_string(dir.path().join("out.srg")).unwrap();
    assert_eq!(srg, "CL: a pkg/Api\n");
}
