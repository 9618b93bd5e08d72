//! Workspace-level integration tests driving the built binaries end to end.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use assert_cmd::Command;
use std::fs;
use tempfile::tempdir;

#[test]
fn scand_dry_run_reports_pending_folders_as_json() {
    let root = tempdir().unwrap();
    let folder = root.path().join("mission-a").join("folder-a");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("scan.las"), b"las bytes").unwrap();

    let db_path = root.path().join("state").join("catalog.sqlite3");

    let assert = Command::cargo_bin("lidar-scand")
        .unwrap()
        .arg("--original-root")
        .arg(root.path().join("mission-a").parent().unwrap())
        .arg("--zip-root")
        .arg(root.path().join("zip"))
        .arg("--db-path")
        .arg(&db_path)
        .arg("--dry-run")
        .assert()
        .success();

    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["folders"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["folders"][0], "mission-a/folder-a");
}

#[test]
fn scand_is_a_no_op_on_an_empty_original_root() {
    let root = tempdir().unwrap();
    let db_path = root.path().join("state").join("catalog.sqlite3");

    Command::cargo_bin("lidar-scand")
        .unwrap()
        .arg("--original-root")
        .arg(root.path().join("original"))
        .arg("--zip-root")
        .arg(root.path().join("zip"))
        .arg("--db-path")
        .arg(&db_path)
        .assert()
        .success();
}

#[test]
fn orchestratord_reports_its_own_usage() {
    Command::cargo_bin("lidar-orchestratord").unwrap().arg("--help").assert().success();
}

#[test]
fn scand_reports_its_own_usage() {
    Command::cargo_bin("lidar-scand").unwrap().arg("--help").assert().success();
}
