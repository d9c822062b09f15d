//! Fault-kind resolution.
//!
//! Selection precedence: explicit `--kind` flag, then the
//! [`FAULT_KIND_ENV`] environment variable, then a uniformly random
//! pick from the catalog.  An unrecognized id is never an error — it
//! logs a warning and falls through to random, so a stale CI
//! configuration still crashes *something*.

use crashrig_fault::FaultKind;

/// Environment variable naming the fault kind to trigger.
pub const FAULT_KIND_ENV: &str = "CRASHRIG_FAULT_KIND";

/// Resolve the fault kind from an optional flag and an optional
/// environment value.
pub fn resolve(flag: Option<&str>, env: Option<&str>) -> FaultKind {
    for (source, value) in [("--kind", flag), (FAULT_KIND_ENV, env)] {
        let Some(value) = value else { continue };
        match value.parse::<FaultKind>() {
            Ok(kind) => return kind,
            Err(err) => {
                log::warn!("{source}: {err}; falling back to a random kind");
            }
        }
    }
    let kind = FaultKind::random();
    log::info!("no fault kind selected; picked {kind} at random");
    kind
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_env() {
        let kind = resolve(Some("sigabrt"), Some("sigtrap"));
        assert_eq!(kind, FaultKind::Sigabrt);
    }

    #[test]
    fn env_used_when_no_flag() {
        let kind = resolve(None, Some("double-free"));
        assert_eq!(kind, FaultKind::DoubleFree);
    }

    #[test]
    fn unrecognized_flag_falls_back_to_random() {
        for _ in 0..32 {
            let kind = resolve(Some("not-a-fault"), None);
            assert!(FaultKind::ALL.contains(&kind));
        }
    }

    #[test]
    fn unrecognized_flag_does_not_shadow_env() {
        // A bad flag falls through to a valid env value.
        let kind = resolve(Some("not-a-fault"), Some("panic"));
        assert_eq!(kind, FaultKind::Panic);
    }

    #[test]
    fn nothing_selected_is_random() {
        for _ in 0..32 {
            let kind = resolve(None, None);
            assert!(FaultKind::ALL.contains(&kind));
        }
    }
}
