//! Delivery Request Process and content delivery environment.

use tracing::info;

use crate::core::exceptions::SequencingException;
use crate::core::rules::is_disabled;
use crate::core::state::GlobalStateInfo;
use crate::core::termination::end_attempt;
use crate::core::tree::ActivityIdx;

/// Validate `target` and make it the current, active activity.
///
/// Activities on the path from the root that are not already active begin a
/// new attempt, except suspended ones, which resume their existing attempt.
pub fn delivery_request_process(
    state: &mut GlobalStateInfo,
    target: ActivityIdx,
    check_availability: bool,
) -> Result<(), SequencingException> {
    let tree = state.tree();
    if !tree.node(target).is_launchable() {
        return Err(SequencingException::DeliveryNotLeaf);
    }
    let path = tree.path_from_root(target);
    if check_availability
        && path
            .iter()
            .any(|idx| !tree.node(*idx).tracking.activity_is_active && is_disabled(state, *idx))
    {
        return Err(SequencingException::DeliveryDisabled);
    }

    end_stale_attempts(state, &path);

    for idx in &path {
        let node = state.tree_mut().node_mut(*idx);
        let objective_ids = node.sequencing.objective_ids();
        let tracking = &mut node.tracking;
        if tracking.activity_is_active {
            continue;
        }
        if tracking.activity_is_suspended {
            tracking.activity_is_suspended = false;
        } else {
            tracking.begin_attempt();
        }
        tracking.initialize_objectives(&objective_ids);
        tracking.activity_is_active = true;
    }

    if let Some(anchor) = state.suspended_activity.take() {
        for idx in state.tree().ancestors(anchor) {
            state.tree_mut().node_mut(idx).tracking.activity_is_suspended = false;
        }
    }
    state.current_activity = Some(target);

    let node = state.tree().node(target);
    info!(
        activity_id = %node.id,
        attempt = node.tracking.attempt_count,
        "delivering activity"
    );
    Ok(())
}

/// End attempts still active from the previous current activity that lie off
/// the new delivery path.
fn end_stale_attempts(state: &mut GlobalStateInfo, path: &[ActivityIdx]) {
    let Some(previous) = state.current_activity else {
        return;
    };
    for idx in state.tree().ancestors(previous) {
        if path.contains(&idx) {
            break;
        }
        if state.tree().node(idx).tracking.activity_is_active {
            end_attempt(state, idx);
        }
    }
}
