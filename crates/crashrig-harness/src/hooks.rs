//! Process-wide hooks installed at harness startup.

use std::panic;
use std::process;

/// Turn every panic into SIGABRT.
///
/// Language-trap faults (`panic!`, failed asserts, out-of-bounds
/// indexing) otherwise unwind to a normal nonzero exit, which a crash
/// reporter watching for signals would miss.  The default hook still
/// runs first so the panic message and backtrace reach stderr.
///
/// Installed once per process, before any fault dispatch.
pub fn install_abort_on_panic() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        default_hook(info);
        process::abort();
    }));
}
