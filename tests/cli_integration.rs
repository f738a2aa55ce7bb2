//! CLI integration tests for shift-board
//!
//! These tests verify the complete workflow from initialization through
//! approval, change requests and the timeline, ensuring commands work
//! together correctly.

use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Get a command instance for the shifts binary, isolated from the user's
/// global config and environment
fn shifts_cmd(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("shifts"));
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join(".config"))
        .env_remove("SHIFTS_ACTOR")
        .env_remove("SHIFTS_ROLE")
        .env_remove("RUST_LOG");
    cmd
}

/// Create a temporary directory and initialize a project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    shifts_cmd(&dir).arg("init").arg(dir.path()).assert().success();
    dir
}

/// Runs a command as `actor` with JSON output and parses stdout
fn json_as(dir: &TempDir, actor: &str, role: &str, args: &[&str]) -> Value {
    let output = shifts_cmd(dir)
        .args(["--format", "json", "--actor", actor, "--role", role])
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).unwrap()
}

/// Adds a shift as staff member `actor` and returns its ID
fn add_shift(dir: &TempDir, actor: &str, date: &str, start: &str, end: &str, submit: bool) -> String {
    let mut args = vec!["shift", "add", "--date", date, "--start", start, "--end", end];
    if submit {
        args.push("--submit");
    }
    let record = json_as(dir, actor, "staff", &args);
    record["id"].as_str().unwrap().to_string()
}

fn approve(dir: &TempDir, id: &str) {
    json_as(dir, "admin", "privileged", &["shift", "approve", id]);
}

fn show(dir: &TempDir, id: &str) -> Value {
    json_as(dir, "admin", "privileged", &["shift", "show", id])
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    shifts_cmd(&dir)
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized shift-board project"));

    assert!(dir.path().join(".shifts").is_dir());
    assert!(dir.path().join(".shifts/shifts.jsonl").is_file());
    assert!(dir.path().join(".shifts/config.toml").is_file());
    assert!(dir.path().join(".shifts/.gitignore").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    shifts_cmd(&dir).arg("init").arg(dir.path()).assert().success();
    shifts_cmd(&dir).arg("init").arg(dir.path()).assert().success();
}

#[test]
fn test_commands_outside_project_fail() {
    let dir = TempDir::new().unwrap();

    shifts_cmd(&dir)
        .args(["--actor", "alice", "pending"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("shifts init"));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_add_creates_draft() {
    let dir = setup_project();

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "add", "--date", "2026-10-20"])
        .args(["--start", "09:00", "--end", "12:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created shift: s-"))
        .stdout(predicate::str::contains("draft"));

    let list = json_as(&dir, "alice", "staff", &["shift", "list"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["resourceId"], "alice");
    assert_eq!(list[0]["startTime"], "09:00");
}

#[test]
fn test_inverted_interval_is_rejected() {
    let dir = setup_project();

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "add", "--date", "2026-10-20"])
        .args(["--start", "12:00", "--end", "09:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid_interval"));
}

#[test]
fn test_slot_outside_shift_is_rejected() {
    let dir = setup_project();

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "add", "--date", "2026-10-20"])
        .args(["--start", "09:00", "--end", "12:00", "--kind", "class-session"])
        .args(["--subject", "Math", "--slot", "11:30-12:30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid_interval"));
}

#[test]
fn test_staff_cannot_approve() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "approve", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission_denied"));

    assert_eq!(show(&dir, &id)["status"], "pending");
}

#[test]
fn test_staff_cannot_complete_or_purge() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);
    approve(&dir, &id);

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "complete", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission_denied"));
    assert_eq!(show(&dir, &id)["status"], "approved");

    json_as(&dir, "alice", "staff", &["shift", "request-deletion", &id]);
    approve(&dir, &id);

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "purge", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission_denied"));
    assert_eq!(show(&dir, &id)["status"], "deleted");
}

#[test]
fn test_times_with_seconds_are_rejected() {
    let dir = setup_project();

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "add", "--date", "2026-10-20"])
        .args(["--start", "09:00:10", "--end", "09:00:50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected HH:MM"));

    let store = fs::read_to_string(dir.path().join(".shifts/shifts.jsonl")).unwrap();
    assert!(store.trim().is_empty());
}

#[test]
fn test_submit_and_approve() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", false);

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "submit", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("submit -> pending"));

    let pending = json_as(&dir, "admin", "privileged", &["pending"]);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    approve(&dir, &id);
    assert_eq!(show(&dir, &id)["status"], "approved");

    let pending = json_as(&dir, "admin", "privileged", &["pending"]);
    assert!(pending.as_array().unwrap().is_empty());
}

#[test]
fn test_role_from_environment() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);

    shifts_cmd(&dir)
        .env("SHIFTS_ACTOR", "admin")
        .env("SHIFTS_ROLE", "privileged")
        .args(["shift", "approve", &id])
        .assert()
        .success();

    assert_eq!(show(&dir, &id)["status"], "approved");
}

#[test]
fn test_invalid_transition_is_reported() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", false);

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "request-deletion", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid_transition"));
}

#[test]
fn test_unknown_shift_is_not_found() {
    let dir = setup_project();

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "submit", "s-0000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_found"));
}

#[test]
fn test_hidden_shift_is_not_found() {
    let dir = setup_project();
    let id = add_shift(&dir, "bob", "2026-10-20", "09:00", "12:00", false);

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "show", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_found"));

    assert_eq!(show(&dir, &id)["resourceId"], "bob");
}

// =============================================================================
// Change Request Tests
// =============================================================================

#[test]
fn test_rejected_change_keeps_approved_values() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);
    approve(&dir, &id);

    let draft = json_as(
        &dir,
        "alice",
        "staff",
        &["shift", "propose", &id, "--end", "13:00"],
    );
    assert_eq!(draft["status"], "draft");
    assert_eq!(draft["endTime"], "12:00");
    assert_eq!(draft["requestedChange"]["endTime"], "13:00");

    json_as(&dir, "alice", "staff", &["shift", "submit", &id]);
    json_as(&dir, "admin", "privileged", &["shift", "reject", &id]);

    let record = show(&dir, &id);
    assert_eq!(record["status"], "approved");
    assert_eq!(record["startTime"], "09:00");
    assert_eq!(record["endTime"], "12:00");
    assert!(record["requestedChange"].is_null());
}

#[test]
fn test_approved_change_is_merged() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);
    approve(&dir, &id);

    json_as(&dir, "alice", "staff", &["shift", "propose", &id, "--end", "13:00"]);
    json_as(&dir, "alice", "staff", &["shift", "submit", &id]);
    approve(&dir, &id);

    let record = show(&dir, &id);
    assert_eq!(record["status"], "approved");
    assert_eq!(record["endTime"], "13:00");
    assert!(record["requestedChange"].is_null());
}

#[test]
fn test_empty_proposal_is_rejected() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);
    approve(&dir, &id);

    shifts_cmd(&dir)
        .args(["--actor", "alice", "shift", "propose", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid_delta"));
}

// =============================================================================
// Deletion Tests
// =============================================================================

#[test]
fn test_deletion_and_purge() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);
    approve(&dir, &id);

    json_as(&dir, "alice", "staff", &["shift", "request-deletion", &id]);
    approve(&dir, &id);
    assert_eq!(show(&dir, &id)["status"], "deleted");

    let list = json_as(&dir, "admin", "privileged", &["shift", "list"]);
    assert!(list.as_array().unwrap().is_empty());
    let audit = json_as(
        &dir,
        "admin",
        "privileged",
        &["shift", "list", "--include-deleted"],
    );
    assert_eq!(audit.as_array().unwrap().len(), 1);

    let purged = json_as(&dir, "admin", "privileged", &["shift", "purge", &id]);
    assert_eq!(purged["status"], "purged");

    let store = fs::read_to_string(dir.path().join(".shifts/shifts.jsonl")).unwrap();
    assert!(!store.contains(&id));
}

#[test]
fn test_cancel_deletion() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);
    approve(&dir, &id);

    json_as(&dir, "alice", "staff", &["shift", "request-deletion", &id]);
    json_as(&dir, "alice", "staff", &["shift", "cancel-deletion", &id]);
    assert_eq!(show(&dir, &id)["status"], "approved");
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_staff_only_see_their_own_shifts() {
    let dir = setup_project();
    add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", false);
    add_shift(&dir, "bob", "2026-10-20", "09:00", "12:00", false);

    let alice = json_as(&dir, "alice", "staff", &["shift", "list"]);
    assert_eq!(alice.as_array().unwrap().len(), 1);
    assert_eq!(alice[0]["resourceId"], "alice");

    let admin = json_as(&dir, "admin", "privileged", &["shift", "list"]);
    assert_eq!(admin.as_array().unwrap().len(), 2);
}

#[test]
fn test_list_by_month() {
    let dir = setup_project();
    add_shift(&dir, "alice", "2026-10-31", "09:00", "12:00", false);
    add_shift(&dir, "alice", "2026-11-01", "09:00", "12:00", false);

    let october = json_as(
        &dir,
        "alice",
        "staff",
        &["shift", "list", "--month", "2026-10"],
    );
    assert_eq!(october.as_array().unwrap().len(), 1);
    assert_eq!(october[0]["date"], "2026-10-31");
}

#[test]
fn test_status_counts() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);
    add_shift(&dir, "alice", "2026-10-21", "09:00", "12:00", true);
    add_shift(&dir, "alice", "2026-10-22", "09:00", "12:00", false);
    approve(&dir, &id);

    let status = json_as(
        &dir,
        "admin",
        "privileged",
        &["status", "--month", "2026-10"],
    );
    assert_eq!(status["total"], 3);
    assert_eq!(status["by_status"]["approved"], 1);
    assert_eq!(status["by_status"]["pending"], 1);
    assert_eq!(status["by_status"]["draft"], 1);
    assert_eq!(status["awaiting_approval"], 1);
}

#[test]
fn test_complete_elapsed() {
    let dir = setup_project();
    let id = add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", true);
    approve(&dir, &id);

    let none = json_as(
        &dir,
        "admin",
        "privileged",
        &["complete-elapsed", "--at", "2026-10-20T11:59"],
    );
    assert!(none.as_array().unwrap().is_empty());

    let done = json_as(
        &dir,
        "admin",
        "privileged",
        &["complete-elapsed", "--at", "2026-10-20T12:00"],
    );
    assert_eq!(done.as_array().unwrap().len(), 1);
    assert_eq!(show(&dir, &id)["status"], "completed");
}

// =============================================================================
// Timeline Tests
// =============================================================================

#[test]
fn test_staff_cannot_sweep() {
    let dir = setup_project();
    let id = add_shift(&dir, "bob", "2026-10-20", "09:00", "12:00", true);
    approve(&dir, &id);

    shifts_cmd(&dir)
        .args(["--actor", "alice", "--role", "staff"])
        .args(["complete-elapsed", "--at", "2099-01-01T00:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission_denied"));

    assert_eq!(show(&dir, &id)["status"], "approved");
}

#[test]
fn test_status_lists_month_holidays() {
    let dir = setup_project();
    let config_path = dir.path().join(".shifts/config.toml");
    let mut config = fs::read_to_string(&config_path).unwrap();
    config.push_str("\"2026-10-20\" = \"Founders Day\"\n\"2026-11-03\" = \"Culture Day\"\n");
    fs::write(&config_path, config).unwrap();

    let status = json_as(&dir, "admin", "privileged", &["status", "--month", "2026-10"]);
    let holidays = status["holidays"].as_array().unwrap();
    assert_eq!(holidays.len(), 1);
    assert_eq!(holidays[0]["date"], "2026-10-20");
    assert_eq!(holidays[0]["label"], "Founders Day");
}

#[test]
fn test_timeline_lanes() {
    let dir = setup_project();
    add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", false);
    add_shift(&dir, "alice", "2026-10-20", "11:00", "13:00", false);
    add_shift(&dir, "alice", "2026-10-20", "13:00", "14:00", false);

    let timeline = json_as(
        &dir,
        "alice",
        "staff",
        &["timeline", "--date", "2026-10-20"],
    );
    let resources = timeline["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["laneCount"], 2);

    let lanes: Vec<u64> = resources[0]["placements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["lane"].as_u64().unwrap())
        .collect();
    assert_eq!(lanes, vec![0, 1, 0]);
}

#[test]
fn test_timeline_text_marks_holiday() {
    let dir = setup_project();
    fs::write(
        dir.path().join(".shifts/config.toml"),
        "[holidays]\n\"2026-10-20\" = \"Founders Day\"\n",
    )
    .unwrap();
    add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", false);

    shifts_cmd(&dir)
        .args(["--actor", "alice", "timeline", "--date", "2026-10-20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("holiday: Founders Day"))
        .stdout(predicate::str::contains("alice"));
}

#[test]
fn test_timeline_for_empty_resource() {
    let dir = setup_project();

    let timeline = json_as(
        &dir,
        "admin",
        "privileged",
        &["timeline", "--date", "2026-10-20", "--resource", "carol"],
    );
    assert_eq!(timeline["resources"][0]["laneCount"], 0);
}

// =============================================================================
// Store Robustness Tests
// =============================================================================

#[test]
fn test_invalid_lines_are_quarantined() {
    let dir = setup_project();
    add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", false);

    let store_path = dir.path().join(".shifts/shifts.jsonl");
    let mut content = fs::read_to_string(&store_path).unwrap();
    content.push_str("{\"id\": \"s-bad\"}\n");
    fs::write(&store_path, content).unwrap();

    shifts_cmd(&dir)
        .args(["--actor", "admin", "--role", "privileged", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 invalid line(s)"))
        .stderr(predicate::str::contains("skipping invalid shift record"))
        .stderr(predicate::str::contains("\u{1b}[").not());

    // The next write moves the bad line aside
    add_shift(&dir, "alice", "2026-10-21", "09:00", "12:00", false);
    let quarantine = fs::read_to_string(dir.path().join(".shifts/quarantine.jsonl")).unwrap();
    assert!(quarantine.contains("s-bad"));

    let list = json_as(&dir, "alice", "staff", &["shift", "list"]);
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[test]
fn test_compact_keeps_valid_records() {
    let dir = setup_project();
    add_shift(&dir, "alice", "2026-10-20", "09:00", "12:00", false);

    let store_path = dir.path().join(".shifts/shifts.jsonl");
    let mut content = fs::read_to_string(&store_path).unwrap();
    content.push_str("not json\n");
    fs::write(&store_path, content).unwrap();

    let result = json_as(&dir, "admin", "privileged", &["compact"]);
    assert_eq!(result["kept"], 1);

    let content = fs::read_to_string(&store_path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(dir.path().join(".shifts/quarantine.jsonl").is_file());
}
