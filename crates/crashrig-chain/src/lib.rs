//! Call-chain obfuscator.
//!
//! Routes a terminal action through a randomized sequence of indirect
//! calls so that the stack trace captured by an external crash reporter
//! varies run to run: the "culprit" frame above the fault differs on
//! every invocation instead of always blaming one fixed entry point.
//!
//! ```text
//! run(action)
//!   └─ dispatch ─→ stage ─→ dispatch ─→ stage ─→ ... ─→ action
//!                 (random)             (random)
//! ```
//!
//! Stages come from a fixed pool of 20 named functions ([`STAGE_COUNT`]),
//! sampled uniformly with replacement; the hop count is uniform in
//! [`MIN_HOPS`]`..=`[`MAX_HOPS`].  The chain is pure control-flow
//! indirection: if the action returns (it usually does not, because the
//! action crashes the process), `run` returns normally.

mod stages;

use crashrig_report::{CrashReporter, TagGuard, CALL_CHAIN_KEY};
use rand::Rng;

pub use stages::STAGE_COUNT;

/// Smallest number of indirection frames [`run`] inserts.
pub const MIN_HOPS: u32 = 3;

/// Largest number of indirection frames [`run`] inserts.
pub const MAX_HOPS: u32 = 8;

/// Hop counters for one dispatch chain.
///
/// Owned by exactly one invocation; never shared across concurrent
/// chains.  `traversed` counts stage frames actually entered, which lets
/// an instrumented caller verify the indirection depth after a
/// non-crashing action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchState {
    /// Stage frames still to traverse before the action runs.
    pub remaining: u32,
    /// Stage frames entered so far.
    pub traversed: u32,
}

impl DispatchState {
    pub fn new(hops: u32) -> Self {
        Self {
            remaining: hops,
            traversed: 0,
        }
    }
}

/// Invoke `action` behind a randomized chain of [`MIN_HOPS`] to
/// [`MAX_HOPS`] stage frames.
///
/// Each call samples a fresh hop count and a fresh stage sequence; there
/// is no seed management.
pub fn run(action: impl FnOnce()) {
    let hops = rand::thread_rng().gen_range(MIN_HOPS..=MAX_HOPS);
    run_with_hops(hops, action);
}

/// Invoke `action` behind exactly `hops` stage frames.
///
/// `hops == 0` calls the action directly with no indirection.
pub fn run_with_hops(hops: u32, action: impl FnOnce()) {
    let mut state = DispatchState::new(hops);
    run_state(&mut state, action);
}

/// Like [`run_with_hops`], but with caller-owned counters so tests can
/// observe the exact traversal depth after the action returns.
pub fn run_state(state: &mut DispatchState, action: impl FnOnce()) {
    let mut slot = Some(action);
    let mut invoke = move || {
        if let Some(action) = slot.take() {
            action();
        }
    };
    if state.remaining == 0 {
        invoke();
        return;
    }
    log::trace!("dispatching through {} stage frames", state.remaining);
    stages::dispatch(state, &mut invoke);
}

/// Tag the reporter with the about-to-run fault, then dispatch.
///
/// The `call_chain` annotation is set before the chain starts and cleared
/// only if the action returns; a crash skips the clear, so the report
/// carries the tag of the fault that caused it.
pub fn run_tagged(reporter: &dyn CrashReporter, value: &str, action: impl FnOnce()) {
    let guard = TagGuard::set(reporter, CALL_CHAIN_KEY, value);
    run(action);
    drop(guard);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashrig_report::MemoryReporter;
    use std::cell::Cell;

    #[test]
    fn exact_depth_for_every_hop_count() {
        for hops in MIN_HOPS..=MAX_HOPS {
            let calls = Cell::new(0u32);
            let mut state = DispatchState::new(hops);
            run_state(&mut state, || calls.set(calls.get() + 1));

            assert_eq!(calls.get(), 1, "action runs exactly once for {hops} hops");
            assert_eq!(state.traversed, hops, "one stage frame per hop");
            assert_eq!(state.remaining, 0);
        }
    }

    #[test]
    fn zero_hops_is_direct_invocation() {
        // Repeat: hop-count zero must behave identically every time.
        for _ in 0..16 {
            let calls = Cell::new(0u32);
            let mut state = DispatchState::new(0);
            run_state(&mut state, || calls.set(calls.get() + 1));

            assert_eq!(calls.get(), 1);
            assert_eq!(state.traversed, 0, "no indirection frames");
        }
    }

    #[test]
    fn run_returns_when_action_returns() {
        // A non-crashing action must come back out of the chain; sample
        // many randomized chains to cover the hop range and stage pool.
        let calls = Cell::new(0u32);
        for _ in 0..64 {
            run(|| calls.set(calls.get() + 1));
        }
        assert_eq!(calls.get(), 64);
    }

    #[test]
    fn stage_pool_has_twenty_entries() {
        assert_eq!(STAGE_COUNT, 20);
    }

    #[test]
    fn tag_is_visible_during_dispatch() {
        let reporter = MemoryReporter::new();
        let seen = Cell::new(false);
        run_tagged(&reporter, "sigsegv", || {
            seen.set(reporter.annotation(CALL_CHAIN_KEY).as_deref() == Some("sigsegv"));
        });
        assert!(seen.get(), "annotation set before the action runs");
    }

    #[test]
    fn tag_cleared_after_non_crashing_action() {
        let reporter = MemoryReporter::new();
        run_tagged(&reporter, "sigabrt", || {});
        assert_eq!(reporter.annotation(CALL_CHAIN_KEY), None);
    }
}
