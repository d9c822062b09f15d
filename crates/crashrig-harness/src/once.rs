//! Crash-on-launch once-per-run-id guard.
//!
//! A CI driver that crashes the rig on launch needs the *second* launch
//! of the same run to come up cleanly, so the crash reporter can collect
//! and upload the report from the first one.  The guard is a marker file
//! keyed by run id: created before the crash, checked on every launch.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable naming the current CI run.
pub const RUN_ID_ENV: &str = "CRASHRIG_RUN_ID";

/// Marker path for `run_id` under `state_dir`.
///
/// Run ids come from the CI driver and may contain path separators;
/// anything outside `[A-Za-z0-9._-]` is flattened to `-`.
pub fn marker_path(state_dir: &Path, run_id: &str) -> PathBuf {
    let sanitized: String = run_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    state_dir.join(format!("crashrig-did-crash-{sanitized}"))
}

/// Record that `run_id` is about to crash; `Ok(true)` on the first call
/// for a given id, `Ok(false)` on every later one.
///
/// The marker is written *before* the crash, mirroring its check-in on
/// the relaunch path.  Creation is atomic (`create_new`), so two racing
/// launches cannot both see the first-run answer.
pub fn first_run(state_dir: &Path, run_id: &str) -> io::Result<bool> {
    let path = marker_path(state_dir, run_id);
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => {
            log::debug!("created crash marker {}", path.display());
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_call_wins_later_calls_lose() {
        let dir = TempDir::new().unwrap();
        assert!(first_run(dir.path(), "run-1").unwrap());
        assert!(!first_run(dir.path(), "run-1").unwrap());
        assert!(!first_run(dir.path(), "run-1").unwrap());
    }

    #[test]
    fn run_ids_are_independent() {
        let dir = TempDir::new().unwrap();
        assert!(first_run(dir.path(), "run-1").unwrap());
        assert!(first_run(dir.path(), "run-2").unwrap());
        assert!(!first_run(dir.path(), "run-1").unwrap());
    }

    #[test]
    fn hostile_run_id_stays_inside_state_dir() {
        let dir = TempDir::new().unwrap();
        let path = marker_path(dir.path(), "../../etc/passwd");
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(first_run(dir.path(), "../../etc/passwd").unwrap());
    }

    #[test]
    fn missing_state_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");
        assert!(first_run(&gone, "run-1").is_err());
    }
}
