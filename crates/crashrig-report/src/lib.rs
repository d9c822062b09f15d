//! Crash-reporter collaborator boundary.
//!
//! CrashRig never records, persists, or uploads crash reports itself —
//! that is the external reporting library's job.  This crate defines the
//! narrow surface the rig relies on:
//!
//! 1. **[`CrashReporter`]** — install with a configuration, a
//!    process-wide annotation map, and enumeration/sending of pending
//!    reports by id.
//! 2. **[`MemoryReporter`]** — an in-process stand-in used by the harness
//!    binary and by tests.
//! 3. **[`TagGuard`]** — scoped diagnostic tagging around a fault
//!    dispatch: set on construction, cleared on drop.  The crashing path
//!    never reaches the drop, which is the point — the tag survives into
//!    the crash report.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use thiserror::Error;

/// Annotation key the dispatch chain writes before a fault runs.
pub const CALL_CHAIN_KEY: &str = "call_chain";

/// Opaque identifier of a stored crash report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportId(pub i64);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration handed to [`CrashReporter::install`].
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Maximum number of reports kept before the oldest is dropped.
    pub max_report_count: u32,
    /// Record out-of-memory terminations detected on the next launch.
    pub monitor_memory_termination: bool,
    /// Record watchdog (unresponsiveness) terminations.
    pub monitor_watchdog: bool,
    /// Record SIGTERM.  Off by default: the CI driver terminates the rig
    /// with SIGTERM between iterations, which must not count as a crash.
    pub monitor_sigterm: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            max_report_count: 50,
            monitor_memory_termination: true,
            monitor_watchdog: true,
            monitor_sigterm: false,
        }
    }
}

/// Errors from [`CrashReporter::install`].
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("reporter already installed")]
    AlreadyInstalled,

    #[error("reporter backend failed: {0}")]
    Backend(String),
}

/// Errors from [`CrashReporter::send_report`].
#[derive(Error, Debug)]
pub enum SendError {
    #[error("no pending report with id {0}")]
    UnknownReport(ReportId),

    #[error("upload rejected: {0}")]
    Rejected(String),
}

/// The surface of the external crash-reporting library.
///
/// The rig calls `install` once at startup, writes annotations around
/// fault dispatch, and leaves `pending_report_ids`/`send_report` to the
/// upload glue driven by CI.
pub trait CrashReporter {
    /// Install the reporter's crash monitors.
    fn install(&self, config: &ReporterConfig) -> Result<(), InstallError>;

    /// Set a process-wide annotation attached to any future crash report.
    fn set_annotation(&self, key: &str, value: &str);

    /// Remove a process-wide annotation.
    fn remove_annotation(&self, key: &str);

    /// Current value of an annotation, if set.
    fn annotation(&self, key: &str) -> Option<String>;

    /// IDs of reports recorded by previous runs and not yet uploaded.
    fn pending_report_ids(&self) -> Vec<ReportId>;

    /// Upload one report.  Success allows the backend to delete it.
    fn send_report(&self, id: ReportId) -> Result<(), SendError>;
}

/// In-process reporter used by the harness binary and by tests.
///
/// Keeps annotations and a pending-report list in memory.  Stands in for
/// the real recording library, which lives outside this repository; the
/// annotation semantics (last write wins, removal is idempotent) match
/// what the rig expects from the real one.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    installed: bool,
    annotations: BTreeMap<String, String>,
    pending: Vec<ReportId>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `install` has completed.
    pub fn is_installed(&self) -> bool {
        self.inner.lock().map(|st| st.installed).unwrap_or(false)
    }

    /// Queue a fake pending report (test setup).
    pub fn push_pending(&self, id: ReportId) {
        if let Ok(mut st) = self.inner.lock() {
            st.pending.push(id);
        }
    }
}

impl CrashReporter for MemoryReporter {
    fn install(&self, config: &ReporterConfig) -> Result<(), InstallError> {
        let mut st = self
            .inner
            .lock()
            .map_err(|_| InstallError::Backend("reporter state poisoned".into()))?;
        if st.installed {
            return Err(InstallError::AlreadyInstalled);
        }
        st.installed = true;
        log::debug!(
            "reporter installed: max_reports={} memory_termination={} watchdog={} sigterm={}",
            config.max_report_count,
            config.monitor_memory_termination,
            config.monitor_watchdog,
            config.monitor_sigterm,
        );
        Ok(())
    }

    fn set_annotation(&self, key: &str, value: &str) {
        if let Ok(mut st) = self.inner.lock() {
            st.annotations.insert(key.to_string(), value.to_string());
        }
    }

    fn remove_annotation(&self, key: &str) {
        if let Ok(mut st) = self.inner.lock() {
            st.annotations.remove(key);
        }
    }

    fn annotation(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .ok()
            .and_then(|st| st.annotations.get(key).cloned())
    }

    fn pending_report_ids(&self) -> Vec<ReportId> {
        self.inner
            .lock()
            .map(|st| st.pending.clone())
            .unwrap_or_default()
    }

    fn send_report(&self, id: ReportId) -> Result<(), SendError> {
        let mut st = self
            .inner
            .lock()
            .map_err(|_| SendError::Rejected("reporter state poisoned".into()))?;
        let Some(pos) = st.pending.iter().position(|p| *p == id) else {
            return Err(SendError::UnknownReport(id));
        };
        st.pending.remove(pos);
        Ok(())
    }
}

/// Scoped diagnostic tag: set on construction, cleared on drop.
///
/// Only a non-crashing action unwinds the scope; a fault that terminates
/// the process leaves the tag in place for the crash report to pick up.
pub struct TagGuard<'a> {
    reporter: &'a dyn CrashReporter,
    key: &'a str,
}

impl<'a> TagGuard<'a> {
    /// Set `key = value` on the reporter and return the clearing guard.
    pub fn set(reporter: &'a dyn CrashReporter, key: &'a str, value: &str) -> Self {
        reporter.set_annotation(key, value);
        Self { reporter, key }
    }
}

impl Drop for TagGuard<'_> {
    fn drop(&mut self) {
        self.reporter.remove_annotation(self.key);
    }
}
