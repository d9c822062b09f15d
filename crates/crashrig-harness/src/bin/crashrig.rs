//! CLI binary for the CrashRig self-destruction harness.
//!
//! Selects one fault from the catalog, installs the crash reporter,
//! arms the fallback termination guard, and dispatches the fault
//! through the randomized call chain.  The process is expected to die;
//! a normal exit from `trigger` means the chosen fault failed and the
//! guard will deliver SIGKILL.
//!
//! # Usage
//!
//! ```bash
//! # Enumerate the fault catalog
//! crashrig list
//! crashrig list --json
//!
//! # Crash with a specific fault
//! crashrig trigger --kind sigsegv
//!
//! # Crash with a random fault after a 2-second delay
//! crashrig trigger --delay-ms 2000
//!
//! # Select via the environment instead of a flag
//! CRASHRIG_FAULT_KIND=double-free crashrig trigger
//!
//! # Crash-on-launch mode: the first invocation for a run id crashes,
//! # the second exits cleanly so the reporter can upload
//! crashrig trigger --once --run-id ci-4711 --state-dir /tmp/crashrig
//! ```

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crashrig_fault::FaultKind;
use crashrig_harness::{hooks, once, select};
use crashrig_report::{CrashReporter, MemoryReporter, ReporterConfig, TagGuard, CALL_CHAIN_KEY};

#[derive(Parser)]
#[command(name = "crashrig")]
#[command(about = "Deliberately crash this process to exercise a crash reporter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every fault kind in the catalog.
    List {
        /// Emit the catalog as JSON for the CI driver.
        #[arg(long)]
        json: bool,
    },

    /// Trigger a fault and terminate the process.
    Trigger {
        /// Fault kind id (see `list`); unrecognized ids fall back to
        /// random.  Defaults to $CRASHRIG_FAULT_KIND, then random.
        #[arg(short, long)]
        kind: Option<String>,

        /// Delay before dispatch, so a test driver's launch call can
        /// return before the process dies.
        #[arg(long, default_value = "0")]
        delay_ms: u64,

        /// Seconds until the fallback guard SIGKILLs a process the
        /// fault failed to crash.
        #[arg(long, default_value = "15")]
        fallback_secs: u64,

        /// Fixed indirection depth instead of a random one in [3, 8].
        #[arg(long)]
        hops: Option<u32>,

        /// Crash at most once per run id; later invocations for the
        /// same id exit cleanly.
        #[arg(long)]
        once: bool,

        /// Run id for --once.  Defaults to $CRASHRIG_RUN_ID, then
        /// "default".
        #[arg(long)]
        run_id: Option<String>,

        /// Directory holding --once marker files.  Defaults to the
        /// system temp directory.
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { json } => cmd_list(json),
        Commands::Trigger {
            kind,
            delay_ms,
            fallback_secs,
            hops,
            once,
            run_id,
            state_dir,
        } => cmd_trigger(kind, delay_ms, fallback_secs, hops, once, run_id, state_dir),
    }
}

fn cmd_list(json: bool) {
    if json {
        let catalog: Vec<serde_json::Value> = FaultKind::ALL
            .iter()
            .map(|kind| {
                serde_json::json!({
                    "id": kind.id(),
                    "label": kind.label(),
                    "category": kind.category().to_string(),
                })
            })
            .collect();
        match serde_json::to_string_pretty(&catalog) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Error: failed to serialize catalog: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        for kind in FaultKind::ALL {
            println!(
                "{:<24} {:<17} {}",
                kind.id(),
                kind.category().to_string(),
                kind.label()
            );
        }
    }
}

fn cmd_trigger(
    kind: Option<String>,
    delay_ms: u64,
    fallback_secs: u64,
    hops: Option<u32>,
    once: bool,
    run_id: Option<String>,
    state_dir: Option<PathBuf>,
) {
    hooks::install_abort_on_panic();

    let env_kind = std::env::var(select::FAULT_KIND_ENV).ok();
    let kind = select::resolve(kind.as_deref(), env_kind.as_deref());

    let reporter = MemoryReporter::new();
    if let Err(e) = reporter.install(&ReporterConfig::default()) {
        eprintln!("Error: failed to install crash reporter: {}", e);
        std::process::exit(1);
    }

    if once {
        let run_id = run_id
            .or_else(|| std::env::var(once::RUN_ID_ENV).ok())
            .unwrap_or_else(|| "default".to_string());
        let state_dir = state_dir.unwrap_or_else(std::env::temp_dir);
        match once::first_run(&state_dir, &run_id) {
            Ok(true) => log::info!("run {run_id}: first launch, crashing"),
            Ok(false) => {
                log::info!("run {run_id}: already crashed, exiting cleanly");
                return;
            }
            Err(e) => {
                eprintln!(
                    "Error: cannot write crash marker in {}: {}",
                    state_dir.display(),
                    e
                );
                std::process::exit(1);
            }
        }
    }

    if delay_ms > 0 {
        thread::sleep(Duration::from_millis(delay_ms));
    }

    crashrig_fault::guard::arm(Duration::from_secs(fallback_secs));

    log::info!("dispatching {} ({})", kind, kind.label());
    match hops {
        Some(hops) => {
            let _tag = TagGuard::set(&reporter, CALL_CHAIN_KEY, kind.id());
            crashrig_chain::run_with_hops(hops, || kind.trigger());
        }
        None => crashrig_chain::run_tagged(&reporter, kind.id(), || kind.trigger()),
    }

    // Only reachable when the fault failed to kill the process.  Stay
    // alive so the guard's SIGKILL, not a clean exit, ends the run.
    log::error!("{kind} did not terminate the process; waiting for the fallback guard");
    loop {
        thread::park();
    }
}
