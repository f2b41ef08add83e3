//! Termination Request Process: end, suspend, or abandon attempts before
//! sequencing picks the next activity.

use tracing::debug;

use crate::core::definition::RuleAction;
use crate::core::exceptions::SequencingException;
use crate::core::rollup::overall_rollup;
use crate::core::rules::{exit_condition_matches, post_condition_action};
use crate::core::state::GlobalStateInfo;
use crate::core::tree::ActivityIdx;
use crate::core::types::{SequencingRequest, TerminationRequest};

/// Run `request` against the current activity.
///
/// Returns a sequencing request that replaces the one produced by navigation
/// when a post-condition rule (or an exit all) calls for one.
pub fn termination_request_process(
    state: &mut GlobalStateInfo,
    request: TerminationRequest,
) -> Result<Option<SequencingRequest>, SequencingException> {
    let current = state
        .current_activity
        .ok_or(SequencingException::TerminationWithoutCurrent)?;
    let active = state.tree().node(current).tracking.activity_is_active;
    debug!(activity_id = %state.tree().id(current), ?request, "terminating");

    match request {
        TerminationRequest::Exit => {
            if !active {
                return Err(SequencingException::TerminationOfInactive);
            }
            end_attempt(state, current);
            if let Some(target) = exit_action_target(state, current) {
                debug!(activity_id = %state.tree().id(target), "exit condition rule fired");
                end_descendent_attempts(state, target, current);
                end_attempt(state, target);
                state.current_activity = Some(target);
            }
            post_condition_loop(state)
        }
        TerminationRequest::ExitParent => {
            let parent = state
                .tree()
                .parent(current)
                .ok_or(SequencingException::RootHasNoParent)?;
            if active {
                end_attempt(state, current);
            }
            end_attempt(state, parent);
            state.current_activity = Some(parent);
            post_condition_loop(state)
        }
        TerminationRequest::ExitAll => {
            exit_all(state, current);
            Ok(None)
        }
        TerminationRequest::SuspendAll => {
            suspend_all(state, current)?;
            Ok(None)
        }
        TerminationRequest::Abandon => {
            if !active {
                return Err(SequencingException::TerminationOfInactive);
            }
            state.tree_mut().node_mut(current).tracking.activity_is_active = false;
            Ok(None)
        }
        TerminationRequest::AbandonAll => {
            for ancestor in state.tree().ancestors(current) {
                state.tree_mut().node_mut(ancestor).tracking.activity_is_active = false;
            }
            state.current_activity = Some(state.tree().root());
            Ok(None)
        }
    }
}

/// End the attempt on `idx` and roll its status up to the root.
///
/// A tracked leaf whose content never reported completion (or success) is
/// completed (or satisfied) automatically, unless the content owns that
/// status.
pub fn end_attempt(state: &mut GlobalStateInfo, idx: ActivityIdx) {
    let node = state.tree_mut().node_mut(idx);
    let delivery = node.sequencing.delivery.clone();
    if node.is_leaf() && delivery.tracked && !node.tracking.activity_is_suspended {
        if !delivery.completion_set_by_content && !node.tracking.attempt_progress_status {
            node.tracking.set_completed(true);
        }
        if !delivery.objective_set_by_content {
            let primary = node.sequencing.primary_objective_id().to_string();
            let objective = node.tracking.objective_mut(&primary);
            if !objective.progress_status {
                objective.set_satisfied(true);
            }
        }
    }
    node.tracking.activity_is_active = false;
    overall_rollup(state, idx);
}

/// End every active attempt from `current` up to the root; the root becomes
/// current.
pub fn exit_all(state: &mut GlobalStateInfo, current: ActivityIdx) {
    for ancestor in state.tree().ancestors(current) {
        if state.tree().node(ancestor).tracking.activity_is_active {
            end_attempt(state, ancestor);
        }
    }
    state.current_activity = Some(state.tree().root());
}

fn suspend_all(state: &mut GlobalStateInfo, current: ActivityIdx) -> Result<(), SequencingException> {
    let tracking = &state.tree().node(current).tracking;
    if !tracking.activity_is_active && !tracking.activity_is_suspended && current == state.tree().root() {
        return Err(SequencingException::NothingToSuspend);
    }
    overall_rollup(state, current);

    // A later suspension replaces any earlier anchor.
    if let Some(previous) = state.suspended_activity {
        for ancestor in state.tree().ancestors(previous) {
            state.tree_mut().node_mut(ancestor).tracking.activity_is_suspended = false;
        }
    }
    for ancestor in state.tree().ancestors(current) {
        let tracking = &mut state.tree_mut().node_mut(ancestor).tracking;
        tracking.activity_is_active = false;
        tracking.activity_is_suspended = true;
    }
    state.suspended_activity = Some(current);
    state.current_activity = Some(state.tree().root());
    Ok(())
}

/// Outermost ancestor of `current` (root first, excluding `current`) whose
/// exit-condition rules fire.
fn exit_action_target(state: &GlobalStateInfo, current: ActivityIdx) -> Option<ActivityIdx> {
    let mut path = state.tree().path_from_root(current);
    path.pop();
    path.into_iter().find(|ancestor| exit_condition_matches(state, *ancestor))
}

/// End active attempts strictly below `ancestor` on the path to `current`.
fn end_descendent_attempts(state: &mut GlobalStateInfo, ancestor: ActivityIdx, current: ActivityIdx) {
    for idx in state.tree().ancestors(current) {
        if idx == ancestor {
            break;
        }
        if state.tree().node(idx).tracking.activity_is_active {
            end_attempt(state, idx);
        }
    }
}

/// Apply post-condition rules on the current activity until one yields a
/// sequencing request or none fires.
fn post_condition_loop(state: &mut GlobalStateInfo) -> Result<Option<SequencingRequest>, SequencingException> {
    loop {
        let current = state
            .current_activity
            .ok_or(SequencingException::TerminationWithoutCurrent)?;
        let action = post_condition_action(state, current);
        if let Some(action) = action {
            debug!(activity_id = %state.tree().id(current), ?action, "post condition rule fired");
        }
        match action {
            Some(RuleAction::ExitParent) => {
                let Some(parent) = state.tree().parent(current) else {
                    return Ok(None);
                };
                end_attempt(state, parent);
                state.current_activity = Some(parent);
            }
            Some(RuleAction::ExitAll) => {
                exit_all(state, current);
                return Ok(Some(SequencingRequest::Exit));
            }
            Some(RuleAction::Retry) => return Ok(Some(SequencingRequest::Retry)),
            Some(RuleAction::RetryAll) => {
                exit_all(state, current);
                return Ok(Some(SequencingRequest::Retry));
            }
            Some(RuleAction::Continue) => return Ok(Some(SequencingRequest::Continue)),
            Some(RuleAction::Previous) => return Ok(Some(SequencingRequest::Previous)),
            _ => return Ok(None),
        }
    }
}
