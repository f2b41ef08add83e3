//! Navigation Request Process: validate a learner request against the
//! current state and translate it into termination and sequencing requests.

use crate::core::exceptions::SequencingException;
use crate::core::state::GlobalStateInfo;
use crate::core::types::{NavigationRequest, NavigationVerb, SequencingRequest, TerminationRequest};

/// Requests the rest of the pipeline must run for one navigation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationOutcome {
    pub termination: Option<TerminationRequest>,
    pub sequencing: SequencingRequest,
}

impl NavigationOutcome {
    fn sequencing(sequencing: SequencingRequest) -> Self {
        Self {
            termination: None,
            sequencing,
        }
    }

    fn terminate(termination: TerminationRequest, sequencing: SequencingRequest) -> Self {
        Self {
            termination: Some(termination),
            sequencing,
        }
    }
}

pub fn navigation_request_process(
    state: &GlobalStateInfo,
    request: &NavigationRequest,
) -> Result<NavigationOutcome, SequencingException> {
    let tree = state.tree();
    let current = state.current_activity;
    let current_active = current.is_some_and(|idx| tree.node(idx).tracking.activity_is_active);
    // Leaving an active activity ends its attempt before sequencing moves on.
    let exit_current = |sequencing: SequencingRequest| {
        if current_active {
            NavigationOutcome::terminate(TerminationRequest::Exit, sequencing)
        } else {
            NavigationOutcome::sequencing(sequencing)
        }
    };

    match request.request {
        NavigationVerb::Start => match current {
            Some(_) => Err(SequencingException::SessionAlreadyBegun),
            None => Ok(NavigationOutcome::sequencing(SequencingRequest::Start)),
        },
        NavigationVerb::ResumeAll => {
            if current.is_some() {
                return Err(SequencingException::SessionAlreadyBegun);
            }
            if state.suspended_activity.is_none() {
                return Err(SequencingException::NoSuspendedActivity);
            }
            Ok(NavigationOutcome::sequencing(SequencingRequest::ResumeAll))
        }
        NavigationVerb::Continue => {
            let current = current.ok_or(SequencingException::CurrentActivityUndefined)?;
            if let Some(parent) = tree.parent(current)
                && !tree.node(parent).sequencing.control_mode.flow
            {
                return Err(SequencingException::FlowNotEnabled);
            }
            Ok(exit_current(SequencingRequest::Continue))
        }
        NavigationVerb::Previous => {
            let current = current.ok_or(SequencingException::CurrentActivityUndefined)?;
            let parent = tree
                .parent(current)
                .ok_or(SequencingException::NoPreviousToRoot)?;
            let control = &tree.node(parent).sequencing.control_mode;
            if !control.flow || control.forward_only {
                return Err(SequencingException::ForwardOnlyViolation);
            }
            Ok(exit_current(SequencingRequest::Previous))
        }
        NavigationVerb::Choice => {
            let target_id = request
                .target_activity_id
                .as_deref()
                .ok_or(SequencingException::TargetNotFound)?;
            let target = tree
                .find(target_id)
                .ok_or(SequencingException::TargetNotFound)?;
            if let Some(parent) = tree.parent(target)
                && !tree.node(parent).sequencing.control_mode.choice
            {
                return Err(SequencingException::ChoiceNotEnabled);
            }
            Ok(exit_current(SequencingRequest::Choice(target_id.to_string())))
        }
        NavigationVerb::Jump => {
            let target_id = request
                .target_activity_id
                .as_deref()
                .ok_or(SequencingException::TargetNotFound)?;
            if tree.find(target_id).is_none() {
                return Err(SequencingException::TargetNotFound);
            }
            Ok(exit_current(SequencingRequest::Jump(target_id.to_string())))
        }
        NavigationVerb::Exit | NavigationVerb::Abandon => {
            current.ok_or(SequencingException::CurrentActivityUndefined)?;
            if !current_active {
                return Err(SequencingException::CurrentActivityTerminated);
            }
            let termination = if request.request == NavigationVerb::Exit {
                TerminationRequest::Exit
            } else {
                TerminationRequest::Abandon
            };
            Ok(NavigationOutcome::terminate(termination, SequencingRequest::Exit))
        }
        NavigationVerb::ExitAll | NavigationVerb::SuspendAll | NavigationVerb::AbandonAll => {
            current.ok_or(SequencingException::CurrentActivityUndefined)?;
            let termination = match request.request {
                NavigationVerb::ExitAll => TerminationRequest::ExitAll,
                NavigationVerb::SuspendAll => TerminationRequest::SuspendAll,
                _ => TerminationRequest::AbandonAll,
            };
            Ok(NavigationOutcome::terminate(termination, SequencingRequest::Exit))
        }
    }
}
