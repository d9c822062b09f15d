//! The CrashRig fault catalog.
//!
//! Every fault kind here, when triggered, is expected to end the process:
//! by hardware fault, by signal, by runtime abort, by the OS low-memory
//! killer, or by the fallback guard.  Nothing is recoverable by design —
//! a kind that fails to crash is a rig defect observed by the CI driver,
//! never an error this crate handles.
//!
//! # Layout
//!
//! - **[`kinds`]** — the [`FaultKind`] enum: stable ids, labels,
//!   categories, and the trigger dispatch
//! - **[`generators`]** — the native fault primitives (signals, invalid
//!   memory access, heap/stack corruption through libc, allocation loop)
//! - **[`workload`]** — synthetic CPU-bound work for the hang fault
//! - **[`guard`]** — the fallback termination guard (deferred SIGKILL)

pub mod generators;
pub mod guard;
pub mod kinds;
pub mod workload;

pub use kinds::{FaultCategory, FaultKind, ParseFaultKindError};
