//! Sequencing Request Process: resolve a sequencing request to the activity
//! that should be delivered next.

use rand::rngs::StdRng;
use tracing::debug;

use crate::core::definition::RuleAction;
use crate::core::exceptions::SequencingException;
use crate::core::flow::{descend, flow};
use crate::core::rules::{is_disabled, is_hidden_from_choice, post_condition_action, pre_condition_check};
use crate::core::state::GlobalStateInfo;
use crate::core::termination::end_attempt;
use crate::core::tree::ActivityIdx;
use crate::core::types::{Direction, SequencingRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencingOutcome {
    /// Deliver the leaf; `check_availability` is false for jumps.
    Deliver {
        target: ActivityIdx,
        check_availability: bool,
    },
    EndSession,
    /// Nothing to deliver and nothing wrong: wait for the next request.
    Idle,
}

impl SequencingOutcome {
    fn deliver(target: ActivityIdx) -> Self {
        Self::Deliver {
            target,
            check_availability: true,
        }
    }
}

pub fn sequencing_request_process(
    state: &mut GlobalStateInfo,
    rng: &mut StdRng,
    request: &SequencingRequest,
) -> Result<SequencingOutcome, SequencingException> {
    debug!(?request, "sequencing request");
    match request {
        SequencingRequest::Start => start(state, rng),
        SequencingRequest::ResumeAll => {
            if state.current_activity.is_some() {
                return Err(SequencingException::ResumeSessionInProgress);
            }
            let suspended = state
                .suspended_activity
                .ok_or(SequencingException::ResumeWithoutSuspended)?;
            Ok(SequencingOutcome::deliver(suspended))
        }
        SequencingRequest::Continue => {
            let current = state
                .current_activity
                .ok_or(SequencingException::ContinueWithoutCurrent)?;
            if let Some(parent) = state.tree().parent(current)
                && !state.tree().node(parent).sequencing.control_mode.flow
            {
                return Err(SequencingException::ContinueFlowDisabled);
            }
            match flow(state, rng, current, Direction::Forward, false) {
                Ok(next) => Ok(SequencingOutcome::deliver(next)),
                Err(SequencingException::EndOfTree) => Ok(SequencingOutcome::EndSession),
                Err(exc) => Err(exc),
            }
        }
        SequencingRequest::Previous => {
            let current = state
                .current_activity
                .ok_or(SequencingException::PreviousWithoutCurrent)?;
            if let Some(parent) = state.tree().parent(current) {
                let control = &state.tree().node(parent).sequencing.control_mode;
                if !control.flow {
                    return Err(SequencingException::PreviousFlowDisabled);
                }
                if control.forward_only {
                    return Err(SequencingException::FlowForwardOnly);
                }
            }
            let previous = flow(state, rng, current, Direction::Backward, false)?;
            Ok(SequencingOutcome::deliver(previous))
        }
        SequencingRequest::Choice(target_id) => choice(state, rng, target_id),
        SequencingRequest::Jump(target_id) => {
            let target = state
                .tree()
                .find(target_id)
                .ok_or(SequencingException::JumpTargetNotFound)?;
            Ok(SequencingOutcome::Deliver {
                target,
                check_availability: false,
            })
        }
        SequencingRequest::Retry => retry(state, rng),
        SequencingRequest::Exit => exit(state, rng),
    }
}

fn start(state: &mut GlobalStateInfo, rng: &mut StdRng) -> Result<SequencingOutcome, SequencingException> {
    if state.current_activity.is_some() {
        return Err(SequencingException::StartSessionInProgress);
    }
    let root = state.tree().root();
    if state.tree().is_leaf(root) {
        return Ok(SequencingOutcome::deliver(root));
    }
    match flow(state, rng, root, Direction::Forward, true) {
        Ok(first) => Ok(SequencingOutcome::deliver(first)),
        Err(SequencingException::EndOfTree) => Err(SequencingException::NothingDeliverable),
        Err(exc) => Err(exc),
    }
}

fn choice(
    state: &mut GlobalStateInfo,
    rng: &mut StdRng,
    target_id: &str,
) -> Result<SequencingOutcome, SequencingException> {
    let tree = state.tree();
    let target = tree
        .find(target_id)
        .ok_or(SequencingException::ChoiceTargetNotFound)?;
    let path = tree.path_from_root(target);

    if path.iter().any(|idx| is_hidden_from_choice(state, *idx)) {
        return Err(SequencingException::ChoiceTargetHidden);
    }
    if path
        .iter()
        .filter_map(|idx| tree.parent(*idx))
        .any(|parent| !tree.node(parent).sequencing.control_mode.choice)
    {
        return Err(SequencingException::ChoiceControlViolation);
    }
    if path.iter().any(|idx| is_disabled(state, *idx)) {
        return Err(SequencingException::ChoiceTargetDisabled);
    }
    if let Some(current) = state.current_activity {
        check_choice_from_current(state, current, target)?;
    }

    if tree.is_leaf(target) {
        return Ok(SequencingOutcome::deliver(target));
    }
    match descend(state, rng, target, Direction::Forward)? {
        Some(leaf) => Ok(SequencingOutcome::deliver(leaf)),
        None => Err(SequencingException::ChoiceNothingDeliverable),
    }
}

/// Checks that depend on where the learner is now.
fn check_choice_from_current(
    state: &GlobalStateInfo,
    current: ActivityIdx,
    target: ActivityIdx,
) -> Result<(), SequencingException> {
    let tree = state.tree();
    let common = tree.common_ancestor(current, target);
    let strictly_below_common = |start: ActivityIdx| -> Vec<ActivityIdx> {
        tree.ancestors(start)
            .into_iter()
            .take_while(|idx| *idx != common)
            .collect()
    };
    let leaving = strictly_below_common(current);
    let entering = strictly_below_common(target);

    // A cluster that forbids choice exit can be neither left nor entered by
    // choice; moves within it are unaffected.
    if leaving
        .iter()
        .skip(1)
        .chain(entering.iter())
        .any(|idx| !tree.is_leaf(*idx) && !tree.node(*idx).sequencing.control_mode.choice_exit)
    {
        return Err(SequencingException::ChoiceExitBlocked);
    }

    // Nearest active ancestor that constrains choice limits targets to its subtree.
    if let Some(scope) = tree.ancestors(current).into_iter().skip(1).find(|idx| {
        let node = tree.node(*idx);
        node.sequencing.constrain_choice && node.tracking.activity_is_active
    }) && !tree.is_ancestor_of(scope, target)
    {
        return Err(SequencingException::ChoiceConstrained);
    }

    // Branch positions under the common ancestor decide traversal direction.
    if let (Some(from), Some(to)) = (leaving.last().copied(), entering.last().copied()) {
        let siblings = tree.available_children(common);
        let position = |idx| siblings.iter().position(|sibling| *sibling == idx);
        if let (Some(from_pos), Some(to_pos)) = (position(from), position(to)) {
            if to_pos < from_pos && tree.node(common).sequencing.control_mode.forward_only {
                return Err(SequencingException::ChoiceForwardOnly);
            }
            if to_pos > from_pos
                && siblings[from_pos..to_pos]
                    .iter()
                    .any(|idx| pre_condition_check(state, *idx, &[RuleAction::StopForwardTraversal]).is_some())
            {
                return Err(SequencingException::ChoiceStopForward);
            }
        }
    }

    if entering
        .iter()
        .skip(1)
        .any(|idx| {
            let node = tree.node(*idx);
            node.sequencing.prevent_activation && !node.tracking.activity_is_active
        })
    {
        return Err(SequencingException::ChoicePreventActivation);
    }
    Ok(())
}

fn retry(state: &mut GlobalStateInfo, rng: &mut StdRng) -> Result<SequencingOutcome, SequencingException> {
    let current = state
        .current_activity
        .ok_or(SequencingException::RetryWithoutCurrent)?;
    let tracking = &state.tree().node(current).tracking;
    if tracking.activity_is_active || tracking.activity_is_suspended {
        return Err(SequencingException::RetryActiveActivity);
    }
    for idx in state.tree().subtree(current) {
        state.tree_mut().node_mut(idx).tracking.reset_attempt();
    }
    debug!(activity_id = %state.tree().id(current), "retrying activity");

    if state.tree().is_leaf(current) {
        return Ok(SequencingOutcome::deliver(current));
    }
    match descend(state, rng, current, Direction::Forward)? {
        Some(leaf) => Ok(SequencingOutcome::deliver(leaf)),
        None => Err(SequencingException::NothingDeliverable),
    }
}

fn exit(state: &mut GlobalStateInfo, rng: &mut StdRng) -> Result<SequencingOutcome, SequencingException> {
    let current = state
        .current_activity
        .ok_or(SequencingException::ExitWithoutCurrent)?;
    if state.tree().node(current).tracking.activity_is_active {
        return Err(SequencingException::ExitActiveActivity);
    }
    let Some(parent) = state.tree().parent(current) else {
        return Ok(SequencingOutcome::EndSession);
    };
    if post_condition_action(state, parent) == Some(RuleAction::Continue) {
        // Flow resumes after the parent, not after the exited child.
        if state.tree().node(parent).tracking.activity_is_active {
            end_attempt(state, parent);
        }
        state.current_activity = Some(parent);
        debug!(activity_id = %state.tree().id(parent), "exit continues from parent");
        return sequencing_request_process(state, rng, &SequencingRequest::Continue);
    }
    Ok(SequencingOutcome::Idle)
}
