//! Integration tests for the strata CLI.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn strata_bin() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../../target/debug/strata");
    path
}

fn test_data_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path
}

fn setup() {
    let status = Command::new("cargo")
        .args(["build", "-p", "strata-cli"])
        .status()
        .expect("Failed to build CLI");
    assert!(status.success());

    let data_dir = test_data_dir();
    fs::create_dir_all(&data_dir).ok();
}

const MOVE_PIPELINE: &str = r#"{
  "pipeline": {
    "name": "restructure",
    "nodes": [
      { "filter": { "class": "CreateGroup", "uuid": "8a261d04-6b22-42c5-a37a-4ea7e48b1a01",
                    "args": { "path": "Group1" } } },
      { "filter": { "class": "CreateGroup", "uuid": "8a261d04-6b22-42c5-a37a-4ea7e48b1a01",
                    "args": { "path": "Group2/Group3" } } },
      { "filter": { "class": "MoveObject", "uuid": "8a261d04-6b22-42c5-a37a-4ea7e48b1a03",
                    "args": { "object_type": 0, "group": "Group2/Group3", "dest": "Group1" } } }
    ]
  }
}"#;

const CYCLE_PIPELINE: &str = r#"{
  "pipeline": {
    "name": "cyclic",
    "nodes": [
      { "filter": { "class": "CreateGroup", "uuid": "8a261d04-6b22-42c5-a37a-4ea7e48b1a01",
                    "args": { "path": "Group2/Group3" } } },
      { "filter": { "class": "MoveObject", "uuid": "8a261d04-6b22-42c5-a37a-4ea7e48b1a03",
                    "args": { "object_type": 0, "group": "Group2", "dest": "Group2/Group3" } } },
      { "filter": { "class": "CreateGroup", "uuid": "8a261d04-6b22-42c5-a37a-4ea7e48b1a01",
                    "args": { "path": "NeverCreated" } } }
    ]
  }
}"#;

#[test]
fn test_help() {
    setup();
    let output = Command::new(strata_bin())
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pipeline engine"));
}

#[test]
fn test_list() {
    setup();
    let output = Command::new(strata_bin())
        .arg("list")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Available filters"));
    assert!(stdout.contains("MoveObject"));
    assert!(stdout.contains("GenerateColorTable"));
}

#[test]
fn test_run_pipeline() {
    setup();
    let file = test_data_dir().join("restructure.json");
    fs::write(&file, MOVE_PIPELINE).expect("Failed to write pipeline");

    let output = Command::new(strata_bin())
        .args(["run", file.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("MoveObject"));
    assert!(stdout.contains("3 of 3 filters ran"));
}

#[test]
fn test_preflight_only() {
    setup();
    let file = test_data_dir().join("restructure_preflight.json");
    fs::write(&file, MOVE_PIPELINE).expect("Failed to write pipeline");

    let output = Command::new(strata_bin())
        .args(["run", "--preflight", file.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    // Nothing committed in preflight-only mode
    assert!(stdout.contains("store holds 0 objects"));
}

#[test]
fn test_cycle_fails_and_stops() {
    setup();
    let file = test_data_dir().join("cyclic.json");
    fs::write(&file, CYCLE_PIPELINE).expect("Failed to write pipeline");

    let output = Command::new(strata_bin())
        .args(["run", file.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cycle"));
    // Fail-fast: the third node never ran
    assert!(stdout.contains("2 of 3 filters ran"));
    assert!(!stdout.contains("NeverCreated"));
}

#[test]
fn test_show() {
    setup();
    let file = test_data_dir().join("show.json");
    fs::write(&file, MOVE_PIPELINE).expect("Failed to write pipeline");

    let output = Command::new(strata_bin())
        .args(["show", file.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Pipeline: restructure"));
    assert!(stdout.contains("CreateGroup"));
    assert!(stdout.contains("3 filters"));
}
