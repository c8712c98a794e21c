//! CLI binary tests.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn issuelens() -> Command {
    Command::cargo_bin("issuelens").expect("binary built")
}

#[test]
fn test_help_lists_commands() {
    issuelens()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build-index"))
        .stdout(predicate::str::contains("evaluate"));
}

#[test]
fn test_missing_dataset_fails_with_hint() {
    let temp = TempDir::new().expect("temp dir");
    issuelens()
        .args(["--root", &temp.path().display().to_string(), "keywords"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("input not found"))
        .stderr(predicate::str::contains("ingestion"));
}

#[test]
fn test_json_error_envelope_on_stdout() {
    let temp = TempDir::new().expect("temp dir");
    let output = issuelens()
        .args([
            "--root",
            &temp.path().display().to_string(),
            "--format",
            "json",
            "keywords",
        ])
        .assert()
        .failure()
        .get_output()
        .clone();

    let body: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().expect("message").contains("not found"));
}

#[test]
fn test_keywords_over_dataset() {
    let temp = TempDir::new().expect("temp dir");
    std::fs::create_dir_all(temp.path().join("local_data")).expect("mkdir");
    std::fs::write(
        temp.path().join("local_data/issues.json"),
        r#"{"stories":[{"id":"1","name":"订单列表分页"},{"id":"2","name":"订单导出"}],"bugs":[]}"#,
    )
    .expect("write dataset");

    issuelens()
        .args([
            "--root",
            &temp.path().display().to_string(),
            "--format",
            "json",
            "keywords",
            "--min-frequency",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("订单"))
        .stdout(predicate::str::contains("\"status\": \"success\""));
}

#[test]
fn test_search_requires_index() {
    let temp = TempDir::new().expect("temp dir");
    issuelens()
        .args(["--root", &temp.path().display().to_string(), "search", "订单"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not built"))
        .stderr(predicate::str::contains("build-index"));
}
