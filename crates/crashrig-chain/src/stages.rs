//! The fixed stage-function pool.
//!
//! Twenty `#[inline(never)]` indirection points with names drawn from
//! five everyday subsystems (UI flow, networking, business logic,
//! storage, auth/session).  They are semantically interchangeable: each
//! either invokes the action (no hops left) or delegates back to the
//! dispatcher with one hop fewer.  The names exist purely so captured
//! stack traces read like ordinary application frames.

use rand::Rng;

use crate::DispatchState;

type Stage = fn(&mut DispatchState, &mut dyn FnMut());

/// Number of stage functions in the pool.
pub const STAGE_COUNT: usize = ALL_STAGES.len();

/// Generates one stage function.
///
/// Each body black-boxes a distinct discriminant so the optimizer cannot
/// merge the otherwise-identical functions into one symbol, and the
/// trailing counter read keeps the recursive call out of tail position.
macro_rules! stage {
    ($name:ident, $discriminant:expr) => {
        #[inline(never)]
        fn $name(state: &mut DispatchState, action: &mut dyn FnMut()) {
            std::hint::black_box($discriminant as u32);
            state.traversed += 1;
            state.remaining -= 1;
            if state.remaining == 0 {
                action();
            } else {
                dispatch(state, action);
            }
            std::hint::black_box(state.traversed);
        }
    };
}

// ── UI flow ─────────────────────────────────────────────────────────
stage!(handle_user_interaction, 0);
stage!(process_view_update, 1);
stage!(layout_widget_hierarchy, 2);
stage!(render_visible_content, 3);

// ── Network ─────────────────────────────────────────────────────────
stage!(fetch_remote_resource, 4);
stage!(process_network_response, 5);
stage!(deserialize_payload, 6);
stage!(validate_response_integrity, 7);

// ── Business logic ──────────────────────────────────────────────────
stage!(apply_business_rules, 8);
stage!(compute_derived_state, 9);
stage!(resolve_conflicts, 10);
stage!(transform_data_model, 11);

// ── Storage ─────────────────────────────────────────────────────────
stage!(persist_to_local_store, 12);
stage!(synchronize_with_backend, 13);
stage!(migrate_schema_version, 14);
stage!(index_searchable_content, 15);

// ── Auth/session ────────────────────────────────────────────────────
stage!(refresh_session_token, 16);
stage!(validate_user_permissions, 17);
stage!(decrypt_secure_payload, 18);
stage!(audit_access_log, 19);

const ALL_STAGES: [Stage; 20] = [
    handle_user_interaction,
    process_view_update,
    layout_widget_hierarchy,
    render_visible_content,
    fetch_remote_resource,
    process_network_response,
    deserialize_payload,
    validate_response_integrity,
    apply_business_rules,
    compute_derived_state,
    resolve_conflicts,
    transform_data_model,
    persist_to_local_store,
    synchronize_with_backend,
    migrate_schema_version,
    index_searchable_content,
    refresh_session_token,
    validate_user_permissions,
    decrypt_secure_payload,
    audit_access_log,
];

/// Pick the next stage uniformly at random (with replacement) and enter
/// it.
#[inline(never)]
pub(crate) fn dispatch(state: &mut DispatchState, action: &mut dyn FnMut()) {
    let idx = rand::thread_rng().gen_range(0..ALL_STAGES.len());
    ALL_STAGES[idx](state, action);
    std::hint::black_box(state.traversed);
}
