//! Fallback termination guard.
//!
//! Guarantees process death within a bounded window even when the chosen
//! fault does not crash on its own.  The kill is SIGKILL — immediate and
//! non-catchable — so an external harness watching process liveness
//! never sees a graceful shutdown path.

use std::thread;
use std::time::Duration;

/// Schedule an unconditional SIGKILL after `timeout`.
///
/// Runs on a detached background thread that shares nothing with the
/// caller.  There is no cancellation: on the expected path the process
/// is dead long before the timer fires, and the thread dies with it.
pub fn arm(timeout: Duration) {
    log::debug!("fallback guard armed: SIGKILL in {timeout:?}");
    thread::spawn(move || {
        thread::sleep(timeout);
        log::warn!("fault did not terminate the process; delivering SIGKILL");
        kill_now();
    });
}

/// Deliver SIGKILL to the current process immediately.
pub fn kill_now() {
    unsafe {
        libc::kill(libc::getpid(), libc::SIGKILL);
    }
}
