//! Fault kind definitions and the trigger dispatch.
//!
//! Each variant names one mechanism that destabilizes or terminates the
//! process.  Kinds carry a stable kebab-case id (the configuration and
//! selection channel) and a human-readable label for catalog listings.
//! The set is closed and defined at build time.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::generators;
use crate::guard;
use crate::workload;

/// How long the hang fault's own kill timer waits.  An external watchdog
/// is expected to fire first (~10 s of unresponsiveness); the timer makes
/// the outcome independent of the watchdog actually existing.
const HANG_KILL_AFTER: Duration = Duration::from_secs(10);

/// How long the hang fault busies the calling thread if nothing kills it.
const HANG_WORK_FOR: Duration = Duration::from_secs(60);

/// A mechanism that intentionally destabilizes or terminates the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    // ── Language-level traps ────────────────────────────────────
    /// Explicit `panic!`.
    Panic,
    /// `assert!` on a condition derived from runtime-only data.
    AssertFailure,
    /// Unwrap of an `Option` that is `None` at runtime.
    UnwrapNone,
    /// Indexed access with a runtime-derived out-of-range index.
    IndexOutOfBounds,
    /// Integer division by a runtime-zero denominator.
    DivideByZero,
    /// `Vec::with_capacity` beyond the addressable limit.
    CapacityOverflow,
    /// Forced unreachable-code termination.
    Unreachable,

    // ── Raw signal delivery ─────────────────────────────────────
    /// `std::process::abort`.
    Abort,
    /// `abort(3)` through the C runtime.
    Sigabrt,
    /// Raise SIGBUS directly.
    Sigbus,
    /// Raise SIGFPE directly.
    Sigfpe,
    /// Raise SIGTRAP directly.
    Sigtrap,

    // ── Memory access ───────────────────────────────────────────
    /// Write through an invalid address in the never-mapped first page.
    Sigsegv,
    /// Volatile read through a garbage address.
    GarbagePointerDeref,
    /// Volatile store into the read-only data segment.
    WriteToReadOnlyPage,
    /// Call through a function pointer aimed at non-executable data.
    JumpToNonExecutable,

    // ── Bad instruction ─────────────────────────────────────────
    /// Execute an architecturally undefined instruction.
    Sigill,
    /// Execute a ring-0-only instruction in user mode.
    PrivilegedInstruction,

    // ── Stack corruption ────────────────────────────────────────
    /// Unbounded recursion into the guard page.
    StackOverflow,
    /// Write far past a stack array through a raw pointer.
    SmashStackBuffer,

    // ── Heap corruption (libc boundary) ─────────────────────────
    /// memset far past a small `malloc` allocation.
    HeapBufferOverflow,
    /// Write and read through a freed pointer.
    UseAfterFree,
    /// Free the same allocation twice.
    DoubleFree,
    /// Free a pointer into the middle of an allocation.
    InvalidFree,
    /// Scribble over allocator chunk metadata, then churn the heap.
    CorruptHeapMetadata,

    // ── Unwind boundary ─────────────────────────────────────────
    /// Panic inside an `extern "C"` frame.
    PanicAcrossFfi,
    /// Panic on a spawned thread.
    PanicInThread,
    /// Raise SIGABRT while a mutex is held.
    AbortWithLockHeld,

    // ── Resource exhaustion ─────────────────────────────────────
    /// Allocate and dirty memory until the low-memory killer fires.
    OutOfMemory,

    // ── Unresponsiveness ────────────────────────────────────────
    /// Occupy the calling thread with CPU-bound work until killed.
    MainThreadHang,
}

/// Broad category for a fault kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCategory {
    LanguageTrap,
    Signal,
    MemoryAccess,
    BadInstruction,
    StackCorruption,
    HeapCorruption,
    Unwind,
    Resource,
    Hang,
}

impl fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCategory::LanguageTrap => write!(f, "language-trap"),
            FaultCategory::Signal => write!(f, "signal"),
            FaultCategory::MemoryAccess => write!(f, "memory-access"),
            FaultCategory::BadInstruction => write!(f, "bad-instruction"),
            FaultCategory::StackCorruption => write!(f, "stack-corruption"),
            FaultCategory::HeapCorruption => write!(f, "heap-corruption"),
            FaultCategory::Unwind => write!(f, "unwind"),
            FaultCategory::Resource => write!(f, "resource"),
            FaultCategory::Hang => write!(f, "hang"),
        }
    }
}

/// Error from parsing an unknown fault id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown fault kind: {0:?}")]
pub struct ParseFaultKindError(pub String);

impl FaultKind {
    /// Every fault kind, in catalog order.
    pub const ALL: [FaultKind; 30] = [
        FaultKind::Panic,
        FaultKind::AssertFailure,
        FaultKind::UnwrapNone,
        FaultKind::IndexOutOfBounds,
        FaultKind::DivideByZero,
        FaultKind::CapacityOverflow,
        FaultKind::Unreachable,
        FaultKind::Abort,
        FaultKind::Sigabrt,
        FaultKind::Sigbus,
        FaultKind::Sigfpe,
        FaultKind::Sigtrap,
        FaultKind::Sigsegv,
        FaultKind::GarbagePointerDeref,
        FaultKind::WriteToReadOnlyPage,
        FaultKind::JumpToNonExecutable,
        FaultKind::Sigill,
        FaultKind::PrivilegedInstruction,
        FaultKind::StackOverflow,
        FaultKind::SmashStackBuffer,
        FaultKind::HeapBufferOverflow,
        FaultKind::UseAfterFree,
        FaultKind::DoubleFree,
        FaultKind::InvalidFree,
        FaultKind::CorruptHeapMetadata,
        FaultKind::PanicAcrossFfi,
        FaultKind::PanicInThread,
        FaultKind::AbortWithLockHeld,
        FaultKind::OutOfMemory,
        FaultKind::MainThreadHang,
    ];

    /// Pick a kind uniformly at random.
    pub fn random() -> FaultKind {
        let idx = rand::thread_rng().gen_range(0..Self::ALL.len());
        Self::ALL[idx]
    }

    /// Stable identifier used for selection and configuration.
    pub fn id(&self) -> &'static str {
        match self {
            FaultKind::Panic => "panic",
            FaultKind::AssertFailure => "assert-failure",
            FaultKind::UnwrapNone => "unwrap-none",
            FaultKind::IndexOutOfBounds => "index-out-of-bounds",
            FaultKind::DivideByZero => "divide-by-zero",
            FaultKind::CapacityOverflow => "capacity-overflow",
            FaultKind::Unreachable => "unreachable",
            FaultKind::Abort => "abort",
            FaultKind::Sigabrt => "sigabrt",
            FaultKind::Sigbus => "sigbus",
            FaultKind::Sigfpe => "sigfpe",
            FaultKind::Sigtrap => "sigtrap",
            FaultKind::Sigsegv => "sigsegv",
            FaultKind::GarbagePointerDeref => "garbage-pointer-deref",
            FaultKind::WriteToReadOnlyPage => "write-to-read-only-page",
            FaultKind::JumpToNonExecutable => "jump-to-non-executable",
            FaultKind::Sigill => "sigill",
            FaultKind::PrivilegedInstruction => "privileged-instruction",
            FaultKind::StackOverflow => "stack-overflow",
            FaultKind::SmashStackBuffer => "smash-stack-buffer",
            FaultKind::HeapBufferOverflow => "heap-buffer-overflow",
            FaultKind::UseAfterFree => "use-after-free",
            FaultKind::DoubleFree => "double-free",
            FaultKind::InvalidFree => "invalid-free",
            FaultKind::CorruptHeapMetadata => "corrupt-heap-metadata",
            FaultKind::PanicAcrossFfi => "panic-across-ffi",
            FaultKind::PanicInThread => "panic-in-thread",
            FaultKind::AbortWithLockHeld => "abort-with-lock-held",
            FaultKind::OutOfMemory => "out-of-memory",
            FaultKind::MainThreadHang => "main-thread-hang",
        }
    }

    /// Human-readable label for catalog listings.
    pub fn label(&self) -> &'static str {
        match self {
            FaultKind::Panic => "Explicit panic!()",
            FaultKind::AssertFailure => "Failed assert!()",
            FaultKind::UnwrapNone => "Unwrap of None",
            FaultKind::IndexOutOfBounds => "Slice index out of bounds",
            FaultKind::DivideByZero => "Integer division by zero",
            FaultKind::CapacityOverflow => "Vec capacity overflow",
            FaultKind::Unreachable => "Unreachable code entered",
            FaultKind::Abort => "std::process::abort",
            FaultKind::Sigabrt => "abort(3) via C runtime",
            FaultKind::Sigbus => "Raised SIGBUS",
            FaultKind::Sigfpe => "Raised SIGFPE",
            FaultKind::Sigtrap => "Raised SIGTRAP",
            FaultKind::Sigsegv => "Write through invalid pointer",
            FaultKind::GarbagePointerDeref => "Garbage pointer deref",
            FaultKind::WriteToReadOnlyPage => "Write to read-only page",
            FaultKind::JumpToNonExecutable => "Jump to non-executable page",
            FaultKind::Sigill => "Undefined instruction",
            FaultKind::PrivilegedInstruction => "Privileged instruction",
            FaultKind::StackOverflow => "Stack overflow",
            FaultKind::SmashStackBuffer => "Smash stack buffer",
            FaultKind::HeapBufferOverflow => "Heap buffer overflow",
            FaultKind::UseAfterFree => "Use after free",
            FaultKind::DoubleFree => "Double free",
            FaultKind::InvalidFree => "Invalid free",
            FaultKind::CorruptHeapMetadata => "Corrupt heap metadata",
            FaultKind::PanicAcrossFfi => "Panic across extern \"C\"",
            FaultKind::PanicInThread => "Panic on background thread",
            FaultKind::AbortWithLockHeld => "Abort with mutex held",
            FaultKind::OutOfMemory => "Out of memory",
            FaultKind::MainThreadHang => "Main thread hang",
        }
    }

    /// Classify this kind by mechanism.
    pub fn category(&self) -> FaultCategory {
        match self {
            FaultKind::Panic
            | FaultKind::AssertFailure
            | FaultKind::UnwrapNone
            | FaultKind::IndexOutOfBounds
            | FaultKind::DivideByZero
            | FaultKind::CapacityOverflow
            | FaultKind::Unreachable => FaultCategory::LanguageTrap,

            FaultKind::Abort
            | FaultKind::Sigabrt
            | FaultKind::Sigbus
            | FaultKind::Sigfpe
            | FaultKind::Sigtrap => FaultCategory::Signal,

            FaultKind::Sigsegv
            | FaultKind::GarbagePointerDeref
            | FaultKind::WriteToReadOnlyPage
            | FaultKind::JumpToNonExecutable => FaultCategory::MemoryAccess,

            FaultKind::Sigill | FaultKind::PrivilegedInstruction => {
                FaultCategory::BadInstruction
            }

            FaultKind::StackOverflow | FaultKind::SmashStackBuffer => {
                FaultCategory::StackCorruption
            }

            FaultKind::HeapBufferOverflow
            | FaultKind::UseAfterFree
            | FaultKind::DoubleFree
            | FaultKind::InvalidFree
            | FaultKind::CorruptHeapMetadata => FaultCategory::HeapCorruption,

            FaultKind::PanicAcrossFfi
            | FaultKind::PanicInThread
            | FaultKind::AbortWithLockHeld => FaultCategory::Unwind,

            FaultKind::OutOfMemory => FaultCategory::Resource,

            FaultKind::MainThreadHang => FaultCategory::Hang,
        }
    }

    /// Execute this fault.
    ///
    /// Does not come back for any kind in practice: the process dies by
    /// signal, runtime abort, the OS low-memory killer, or the explicit
    /// fallback kill that follows the undefined-behavior kinds.  The
    /// signature still returns `()` so a kind that unexpectedly fails to
    /// crash surfaces as the caller's fallback guard firing rather than
    /// being masked here.
    #[inline(never)]
    pub fn trigger(self) {
        log::info!("triggering fault: {} ({})", self, self.label());
        match self {
            FaultKind::Panic => panic!("intentional crash: explicit panic"),

            FaultKind::AssertFailure => {
                // Condition derived from runtime-only data; nothing sets
                // this variable, so the assert fails at runtime.
                assert!(
                    std::env::var_os("CRASHRIG_ASSERT_HOLDS").is_some(),
                    "intentional crash: assertion failed"
                );
            }

            FaultKind::UnwrapNone => {
                let value = std::env::var("CRASHRIG_NIL").ok();
                println!("{}", value.unwrap());
            }

            FaultKind::IndexOutOfBounds => {
                let table = [1u32, 2, 3];
                // Index mixed from the pid so the bounds check survives
                // optimization; always >= 0x100.
                let idx = std::process::id() as usize | 0x100;
                println!("{}", table[idx]);
            }

            FaultKind::DivideByZero => {
                let zero = std::env::var("CRASHRIG_DENOMINATOR")
                    .map(|v| v.len() as u32)
                    .unwrap_or(0);
                println!("{}", u32::MAX / zero);
            }

            FaultKind::CapacityOverflow => {
                let cap = usize::MAX - std::process::id() as usize;
                let buf: Vec<u64> = Vec::with_capacity(cap);
                println!("{}", buf.capacity());
            }

            FaultKind::Unreachable => {
                unreachable!("intentional crash: unreachable code entered")
            }

            FaultKind::Abort => std::process::abort(),
            FaultKind::Sigabrt => generators::c_abort(),
            FaultKind::Sigbus => generators::raise_signal(libc::SIGBUS),
            FaultKind::Sigfpe => generators::raise_signal(libc::SIGFPE),
            FaultKind::Sigtrap => generators::raise_signal(libc::SIGTRAP),

            FaultKind::Sigsegv => generators::write_through_invalid_pointer(),
            FaultKind::GarbagePointerDeref => generators::garbage_pointer_deref(),
            FaultKind::WriteToReadOnlyPage => generators::write_to_read_only_page(),
            FaultKind::JumpToNonExecutable => generators::jump_to_non_executable(),
            FaultKind::Sigill => generators::undefined_instruction(),
            FaultKind::PrivilegedInstruction => generators::privileged_instruction(),

            FaultKind::StackOverflow => {
                std::hint::black_box(generators::overflow_stack(0));
            }

            FaultKind::SmashStackBuffer => {
                generators::smash_stack_buffer();
                guard::kill_now(); // UB may not fault
            }

            FaultKind::HeapBufferOverflow => {
                generators::heap_buffer_overflow();
                guard::kill_now(); // UB may not fault
            }

            FaultKind::UseAfterFree => {
                generators::use_after_free();
                guard::kill_now(); // UB may not fault
            }

            FaultKind::DoubleFree => {
                generators::double_free();
                guard::kill_now(); // UB may not fault
            }

            FaultKind::InvalidFree => {
                generators::invalid_free();
                guard::kill_now(); // UB may not fault
            }

            FaultKind::CorruptHeapMetadata => {
                generators::corrupt_heap_metadata();
                guard::kill_now(); // UB may not fault
            }

            FaultKind::PanicAcrossFfi => generators::panic_across_ffi(),

            FaultKind::PanicInThread => {
                let handle = std::thread::spawn(|| {
                    panic!("intentional crash: panic on background thread");
                });
                let _ = handle.join();
                // An abort-on-panic hook normally fires inside the
                // thread; if the panic unwound quietly, abort here.
                std::process::abort();
            }

            FaultKind::AbortWithLockHeld => {
                let lock = std::sync::Mutex::new(0u32);
                let _held = lock.lock();
                generators::c_abort();
            }

            FaultKind::OutOfMemory => generators::exhaust_memory(),

            FaultKind::MainThreadHang => {
                guard::arm(HANG_KILL_AFTER);
                workload::run_for(HANG_WORK_FOR);
            }
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for FaultKind {
    type Err = ParseFaultKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| ParseFaultKindError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_thirty_kinds() {
        assert_eq!(FaultKind::ALL.len(), 30);
    }

    #[test]
    fn ids_are_unique_kebab_case() {
        let mut seen = HashSet::new();
        for kind in FaultKind::ALL {
            let id = kind.id();
            assert!(seen.insert(id), "duplicate id {id}");
            assert!(
                id.chars().all(|c| c.is_ascii_lowercase()
                    || c.is_ascii_digit()
                    || c == '-'),
                "id {id} is not kebab-case"
            );
        }
    }

    #[test]
    fn every_id_round_trips() {
        for kind in FaultKind::ALL {
            let parsed: FaultKind = kind.id().parse().expect("id parses back");
            assert_eq!(parsed, kind);
            assert_eq!(kind.to_string(), kind.id());
        }
    }

    #[test]
    fn unknown_id_is_an_error() {
        let err = "not-a-fault".parse::<FaultKind>().unwrap_err();
        assert_eq!(err, ParseFaultKindError("not-a-fault".to_string()));
    }

    #[test]
    fn category_classification() {
        assert_eq!(FaultKind::Panic.category(), FaultCategory::LanguageTrap);
        assert_eq!(FaultKind::Sigabrt.category(), FaultCategory::Signal);
        assert_eq!(FaultKind::Sigsegv.category(), FaultCategory::MemoryAccess);
        assert_eq!(
            FaultKind::Sigill.category(),
            FaultCategory::BadInstruction
        );
        assert_eq!(
            FaultKind::DoubleFree.category(),
            FaultCategory::HeapCorruption
        );
        assert_eq!(
            FaultKind::StackOverflow.category(),
            FaultCategory::StackCorruption
        );
        assert_eq!(FaultKind::PanicAcrossFfi.category(), FaultCategory::Unwind);
        assert_eq!(FaultKind::OutOfMemory.category(), FaultCategory::Resource);
        assert_eq!(FaultKind::MainThreadHang.category(), FaultCategory::Hang);
    }

    #[test]
    fn labels_are_nonempty() {
        for kind in FaultKind::ALL {
            assert!(!kind.label().is_empty(), "{kind} has no label");
        }
    }

    #[test]
    fn random_yields_catalog_members() {
        for _ in 0..128 {
            let kind = FaultKind::random();
            assert!(FaultKind::ALL.contains(&kind));
        }
    }

    #[test]
    fn category_display_is_kebab_case() {
        assert_eq!(FaultCategory::LanguageTrap.to_string(), "language-trap");
        assert_eq!(FaultCategory::HeapCorruption.to_string(), "heap-corruption");
        assert_eq!(FaultCategory::Hang.to_string(), "hang");
    }
}
