//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs. Each test run
//! points HOME at a scratch directory so it never touches real user data.

use std::path::PathBuf;
use std::process::Command;

fn scratch_home(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("studytrack-cli-test-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create scratch home");
    dir
}

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &PathBuf, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "studytrack-cli", "--"])
        .args(args)
        .env("HOME", home)
        .env("STUDYTRACK_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_session_lifecycle() {
    let home = scratch_home("lifecycle");

    let (stdout, _, code) = run_cli(&home, &["session", "create", "topic-1", "--minutes", "30"]);
    assert_eq!(code, 0, "session create failed");
    let session: serde_json::Value = serde_json::from_str(&stdout).expect("session JSON");
    assert_eq!(session["status"], "planned");
    let id = session["id"].as_str().expect("session id").to_string();

    let (stdout, _, code) = run_cli(&home, &["session", "start", &id]);
    assert_eq!(code, 0, "session start failed");
    let event: serde_json::Value = serde_json::from_str(&stdout).expect("event JSON");
    assert_eq!(event["type"], "SessionStarted");

    let (stdout, _, code) = run_cli(&home, &["session", "complete"]);
    assert_eq!(code, 0, "session complete failed");
    let event: serde_json::Value = serde_json::from_str(&stdout).expect("event JSON");
    assert_eq!(event["type"], "SessionCompleted");

    let _ = std::fs::remove_dir_all(home);
}

#[test]
fn test_second_open_session_rejected() {
    let home = scratch_home("conflict");

    let (_, _, code) = run_cli(&home, &["session", "create", "topic-1"]);
    assert_eq!(code, 0);

    let (_, stderr, code) = run_cli(&home, &["session", "create", "topic-2"]);
    assert_ne!(code, 0, "second open session should be rejected");
    assert!(stderr.contains("already has an open session"), "{stderr}");

    let _ = std::fs::remove_dir_all(home);
}

#[test]
fn test_goal_progress_and_sweep() {
    let home = scratch_home("goal");

    let (stdout, _, code) = run_cli(
        &home,
        &[
            "goal", "create", "Reading", "--target", "50", "--recur", "weekly", "--days", "7",
        ],
    );
    assert_eq!(code, 0, "goal create failed");
    let goal: serde_json::Value = serde_json::from_str(&stdout).expect("goal JSON");
    let id = goal["id"].as_str().expect("goal id").to_string();

    let (stdout, _, code) = run_cli(&home, &["goal", "progress", &id, "50"]);
    assert_eq!(code, 0, "goal progress failed");
    let events: serde_json::Value = serde_json::from_str(&stdout).expect("events JSON");
    assert!(events
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["type"] == "GoalCompleted"));

    let (stdout, _, code) = run_cli(&home, &["sweep", "run"]);
    assert_eq!(code, 0, "sweep failed");
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("report JSON");
    assert_eq!(report["regenerated"], 1);

    let _ = std::fs::remove_dir_all(home);
}

#[test]
fn test_stats_streak_empty() {
    let home = scratch_home("streak");

    let (stdout, _, code) = run_cli(&home, &["stats", "streak"]);
    assert_eq!(code, 0, "stats streak failed");
    let summary: serde_json::Value = serde_json::from_str(&stdout).expect("summary JSON");
    assert_eq!(summary["current"], 0);
    assert_eq!(summary["longest"], 0);

    let _ = std::fs::remove_dir_all(home);
}
