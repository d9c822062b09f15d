//! Harness support for the `crashrig` binary.
//!
//! The binary itself is thin: resolve which fault to run, install the
//! reporter, arm the fallback guard, dispatch through the call chain.
//! The pieces with actual decisions live here so they can be unit
//! tested without crashing the test runner:
//!
//! - **[`select`]** — fault-kind resolution from flag/environment with
//!   random fallback
//! - **[`once`]** — the crash-on-launch once-per-run-id marker
//! - **[`hooks`]** — the abort-on-panic hook that turns language traps
//!   into SIGABRT

pub mod hooks;
pub mod once;
pub mod select;
