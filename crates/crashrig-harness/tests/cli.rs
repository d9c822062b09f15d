//! CLI surface: catalog listing, selection channels, the once-per-run
//! guard.

use std::collections::HashSet;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn crashrig(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crashrig"));
    cmd.args(args)
        .env_remove("CRASHRIG_FAULT_KIND")
        .env_remove("CRASHRIG_RUN_ID")
        .stderr(Stdio::null());
    cmd
}

fn run(args: &[&str]) -> Output {
    crashrig(args).output().expect("spawn crashrig")
}

#[test]
fn list_prints_the_whole_catalog() {
    let out = run(&["list"]);
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 30, "one line per fault kind");
    assert!(stdout.contains("sigabrt"));
    assert!(stdout.contains("out-of-memory"));
    assert!(stdout.contains("main-thread-hang"));
}

#[test]
fn list_json_is_machine_readable() {
    let out = run(&["list", "--json"]);
    assert!(out.status.success());

    let catalog: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let entries = catalog.as_array().expect("top-level array");
    assert_eq!(entries.len(), 30);

    let mut ids = HashSet::new();
    for entry in entries {
        let id = entry["id"].as_str().expect("id is a string");
        assert!(ids.insert(id.to_string()), "duplicate id {id}");
        assert!(entry["label"].as_str().is_some_and(|l| !l.is_empty()));
        assert!(entry["category"].as_str().is_some_and(|c| !c.is_empty()));
    }
    assert!(ids.contains("use-after-free"));
}

#[test]
fn env_var_selects_the_fault() {
    let status = crashrig(&["trigger"])
        .env("CRASHRIG_FAULT_KIND", "sigtrap")
        .stdout(Stdio::null())
        .status()
        .expect("spawn crashrig");
    assert_eq!(status.signal(), Some(libc::SIGTRAP));
}

#[test]
fn kind_flag_overrides_env_var() {
    let status = crashrig(&["trigger", "--kind", "sigabrt"])
        .env("CRASHRIG_FAULT_KIND", "sigtrap")
        .stdout(Stdio::null())
        .status()
        .expect("spawn crashrig");
    assert_eq!(status.signal(), Some(libc::SIGABRT));
}

#[test]
fn once_guard_crashes_first_then_exits_cleanly() {
    let state = TempDir::new().unwrap();
    let dir = state.path().to_str().unwrap();
    let args = [
        "trigger",
        "--kind",
        "sigabrt",
        "--once",
        "--run-id",
        "ci-run-7",
        "--state-dir",
        dir,
    ];

    let first = crashrig(&args).stdout(Stdio::null()).status().unwrap();
    assert_eq!(first.signal(), Some(libc::SIGABRT), "first launch crashes");

    let second = crashrig(&args).stdout(Stdio::null()).status().unwrap();
    assert!(second.success(), "second launch exits cleanly: {second:?}");
    assert_eq!(second.signal(), None);
}

#[test]
fn once_guard_is_scoped_to_the_run_id() {
    let state = TempDir::new().unwrap();
    let dir = state.path().to_str().unwrap();

    let mut args = vec![
        "trigger", "--kind", "sigabrt", "--once", "--run-id", "run-a", "--state-dir", dir,
    ];
    let first = crashrig(&args).stdout(Stdio::null()).status().unwrap();
    assert_eq!(first.signal(), Some(libc::SIGABRT));

    // A fresh run id crashes again even with the old marker present.
    args[5] = "run-b";
    let other = crashrig(&args).stdout(Stdio::null()).status().unwrap();
    assert_eq!(other.signal(), Some(libc::SIGABRT));
}

#[test]
fn unwritable_state_dir_is_a_usage_error() {
    let state = TempDir::new().unwrap();
    let missing = state.path().join("does-not-exist");
    let status = crashrig(&[
        "trigger",
        "--kind",
        "sigabrt",
        "--once",
        "--run-id",
        "r",
        "--state-dir",
        missing.to_str().unwrap(),
    ])
    .stdout(Stdio::null())
    .status()
    .unwrap();
    assert_eq!(status.code(), Some(1), "refused without crashing");
}

#[test]
fn delay_holds_off_the_crash() {
    use std::time::Instant;

    let start = Instant::now();
    let status = crashrig(&["trigger", "--kind", "sigabrt", "--delay-ms", "300"])
        .stdout(Stdio::null())
        .status()
        .unwrap();
    assert_eq!(status.signal(), Some(libc::SIGABRT));
    assert!(start.elapsed().as_millis() >= 300, "dispatch was deferred");
}
