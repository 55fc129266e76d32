//! Binary-level tests for the offline-sync CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn offline_sync() -> Command {
    Command::cargo_bin("offline-sync").unwrap()
}

#[test]
fn diff_prints_patches() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.json");
    let new = dir.path().join("new.json");
    fs::write(&old, r#"{"a": 1, "b": 2}"#).unwrap();
    fs::write(&new, r#"{"a": 1}"#).unwrap();

    offline_sync()
        .arg("diff")
        .arg(&old)
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type": "delete""#))
        .stdout(predicate::str::contains(r#""oldValue": 2"#));
}

#[test]
fn patch_prints_patched_snapshot() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data.json");
    let patches = dir.path().join("patches.json");
    fs::write(&data, r#"{"a": 1}"#).unwrap();
    fs::write(&patches, r#"[{"type": "add", "path": "b", "value": 2}]"#).unwrap();

    offline_sync()
        .arg("patch")
        .arg(&data)
        .arg(&patches)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""b": 2"#));
}

#[test]
fn plan_prints_result_and_statuses() {
    let dir = tempdir().unwrap();
    let queue = dir.path().join("queue.json");
    fs::write(
        &queue,
        r#"[{
            "localId": "a",
            "userPubkey": "user123",
            "actionType": "create_post",
            "actionData": {"content": "hi", "topicId": "t1"},
            "createdAt": "2024-01-01T00:00:00Z"
        }]"#,
    )
    .unwrap();

    offline_sync()
        .args(["-v", "plan"])
        .arg(&queue)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""totalProcessed": 1"#))
        .stdout(predicate::str::contains(r#""status": "fully_synced""#));
}

#[test]
fn missing_input_file_fails() {
    offline_sync()
        .args(["diff", "/nonexistent/old.json", "/nonexistent/new.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}
