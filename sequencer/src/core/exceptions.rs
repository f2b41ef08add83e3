//! Numbered sequencing exceptions.
//!
//! Codes follow the standard's own numbering (`NB` navigation, `TB`
//! termination, `SB` sequencing, `DB` delivery). They are part of the wire
//! contract with calling UIs and must not be renumbered or merged.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequencingException {
    // Navigation request process.
    #[error("current activity is already defined; sequencing session has already begun")]
    SessionAlreadyBegun,
    #[error("current activity is not defined; sequencing session has not begun")]
    CurrentActivityUndefined,
    #[error("suspended activity is not defined")]
    NoSuspendedActivity,
    #[error("flow sequencing control mode violation")]
    FlowNotEnabled,
    #[error("flow or forward only sequencing control mode violation")]
    ForwardOnlyViolation,
    #[error("no activity is previous to the root")]
    NoPreviousToRoot,
    #[error("choice sequencing control mode violation")]
    ChoiceNotEnabled,
    #[error("target activity does not exist")]
    TargetNotFound,
    #[error("current activity has already been terminated")]
    CurrentActivityTerminated,

    // Termination request process.
    #[error("termination requested with no current activity")]
    TerminationWithoutCurrent,
    #[error("termination requested on an activity that is no longer active")]
    TerminationOfInactive,
    #[error("activity tree root has no parent")]
    RootHasNoParent,
    #[error("nothing to suspend")]
    NothingToSuspend,

    // Flow subprocess.
    #[error("flow reached the end of the activity tree")]
    EndOfTree,
    #[error("flow reached the beginning of the activity tree")]
    BeginningOfTree,
    #[error("backward flow is blocked by a forward only control mode")]
    FlowForwardOnly,
    #[error("flow is not enabled on the cluster being entered")]
    ClusterFlowNotEnabled,
    #[error("no deliverable activity found by flow")]
    NothingDeliverable,
    #[error("choice target lies beyond an activity that stops forward traversal")]
    ChoiceStopForward,
    #[error("choice target lies backward under a forward only cluster")]
    ChoiceForwardOnly,

    // Sequencing request process.
    #[error("start requested while a sequencing session is in progress")]
    StartSessionInProgress,
    #[error("resume all requested while a sequencing session is in progress")]
    ResumeSessionInProgress,
    #[error("resume all requested with no suspended activity")]
    ResumeWithoutSuspended,
    #[error("continue requested with no current activity")]
    ContinueWithoutCurrent,
    #[error("continue is not permitted by the parent's flow control mode")]
    ContinueFlowDisabled,
    #[error("previous requested with no current activity")]
    PreviousWithoutCurrent,
    #[error("previous is not permitted by the parent's flow control mode")]
    PreviousFlowDisabled,
    #[error("choice target does not exist")]
    ChoiceTargetNotFound,
    #[error("choice target or one of its ancestors is hidden from choice")]
    ChoiceTargetHidden,
    #[error("choice is not enabled on the target's parent")]
    ChoiceControlViolation,
    #[error("choice target cluster contains nothing deliverable")]
    ChoiceNothingDeliverable,
    #[error("choice target or one of its ancestors is disabled")]
    ChoiceTargetDisabled,
    #[error("choice path crosses a cluster that does not permit choice exit")]
    ChoiceExitBlocked,
    #[error("choice target is outside the constrained choice scope")]
    ChoiceConstrained,
    #[error("choice cannot activate a cluster that prevents activation")]
    ChoicePreventActivation,
    #[error("retry requested with no current activity")]
    RetryWithoutCurrent,
    #[error("retry requested on an activity that is still active or suspended")]
    RetryActiveActivity,
    #[error("exit requested with no current activity")]
    ExitWithoutCurrent,
    #[error("exit requested on an activity that is still active")]
    ExitActiveActivity,
    #[error("jump target does not exist")]
    JumpTargetNotFound,

    // Delivery request process.
    #[error("cannot deliver an activity that is not a launchable leaf")]
    DeliveryNotLeaf,
    #[error("nothing to deliver")]
    DeliveryNothing,
    #[error("an activity on the delivery path is disabled or over its attempt limit")]
    DeliveryDisabled,
}

impl SequencingException {
    /// The standard's alphanumeric exception code.
    pub fn code(self) -> &'static str {
        match self {
            Self::SessionAlreadyBegun => "NB.2.1-1",
            Self::CurrentActivityUndefined => "NB.2.1-2",
            Self::NoSuspendedActivity => "NB.2.1-3",
            Self::FlowNotEnabled => "NB.2.1-4",
            Self::ForwardOnlyViolation => "NB.2.1-5",
            Self::NoPreviousToRoot => "NB.2.1-6",
            Self::ChoiceNotEnabled => "NB.2.1-10",
            Self::TargetNotFound => "NB.2.1-11",
            Self::CurrentActivityTerminated => "NB.2.1-12",

            Self::TerminationWithoutCurrent => "TB.2.3-1",
            Self::TerminationOfInactive => "TB.2.3-2",
            Self::RootHasNoParent => "TB.2.3-4",
            Self::NothingToSuspend => "TB.2.3-5",

            Self::EndOfTree => "SB.2.1-1",
            Self::BeginningOfTree => "SB.2.1-2",
            Self::FlowForwardOnly => "SB.2.1-3",
            Self::ClusterFlowNotEnabled => "SB.2.2-1",
            Self::NothingDeliverable => "SB.2.2-2",
            Self::ChoiceStopForward => "SB.2.4-1",
            Self::ChoiceForwardOnly => "SB.2.4-2",

            Self::StartSessionInProgress => "SB.2.5-1",
            Self::ResumeSessionInProgress => "SB.2.6-1",
            Self::ResumeWithoutSuspended => "SB.2.6-2",
            Self::ContinueWithoutCurrent => "SB.2.7-1",
            Self::ContinueFlowDisabled => "SB.2.7-2",
            Self::PreviousWithoutCurrent => "SB.2.8-1",
            Self::PreviousFlowDisabled => "SB.2.8-2",
            Self::ChoiceTargetNotFound => "SB.2.9-1",
            Self::ChoiceTargetHidden => "SB.2.9-3",
            Self::ChoiceControlViolation => "SB.2.9-4",
            Self::ChoiceNothingDeliverable => "SB.2.9-5",
            Self::ChoiceTargetDisabled => "SB.2.9-6",
            Self::ChoiceExitBlocked => "SB.2.9-7",
            Self::ChoiceConstrained => "SB.2.9-8",
            Self::ChoicePreventActivation => "SB.2.9-9",
            Self::RetryWithoutCurrent => "SB.2.10-1",
            Self::RetryActiveActivity => "SB.2.10-2",
            Self::ExitWithoutCurrent => "SB.2.11-1",
            Self::ExitActiveActivity => "SB.2.11-2",
            Self::JumpTargetNotFound => "SB.2.13-1",

            Self::DeliveryNotLeaf => "DB.1.1-1",
            Self::DeliveryNothing => "DB.1.1-2",
            Self::DeliveryDisabled => "DB.1.1-3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: &[SequencingException] = &[
        SequencingException::SessionAlreadyBegun,
        SequencingException::CurrentActivityUndefined,
        SequencingException::NoSuspendedActivity,
        SequencingException::FlowNotEnabled,
        SequencingException::ForwardOnlyViolation,
        SequencingException::NoPreviousToRoot,
        SequencingException::ChoiceNotEnabled,
        SequencingException::TargetNotFound,
        SequencingException::CurrentActivityTerminated,
        SequencingException::TerminationWithoutCurrent,
        SequencingException::TerminationOfInactive,
        SequencingException::RootHasNoParent,
        SequencingException::NothingToSuspend,
        SequencingException::EndOfTree,
        SequencingException::BeginningOfTree,
        SequencingException::FlowForwardOnly,
        SequencingException::ClusterFlowNotEnabled,
        SequencingException::NothingDeliverable,
        SequencingException::ChoiceStopForward,
        SequencingException::ChoiceForwardOnly,
        SequencingException::StartSessionInProgress,
        SequencingException::ResumeSessionInProgress,
        SequencingException::ResumeWithoutSuspended,
        SequencingException::ContinueWithoutCurrent,
        SequencingException::ContinueFlowDisabled,
        SequencingException::PreviousWithoutCurrent,
        SequencingException::PreviousFlowDisabled,
        SequencingException::ChoiceTargetNotFound,
        SequencingException::ChoiceTargetHidden,
        SequencingException::ChoiceControlViolation,
        SequencingException::ChoiceNothingDeliverable,
        SequencingException::ChoiceTargetDisabled,
        SequencingException::ChoiceExitBlocked,
        SequencingException::ChoiceConstrained,
        SequencingException::ChoicePreventActivation,
        SequencingException::RetryWithoutCurrent,
        SequencingException::RetryActiveActivity,
        SequencingException::ExitWithoutCurrent,
        SequencingException::ExitActiveActivity,
        SequencingException::JumpTargetNotFound,
        SequencingException::DeliveryNotLeaf,
        SequencingException::DeliveryNothing,
        SequencingException::DeliveryDisabled,
    ];

    /// Every exception maps to its own code.
    #[test]
    fn codes_are_unique() {
        let codes: HashSet<&str> = ALL.iter().map(|exc| exc.code()).collect();
        assert_eq!(codes.len(), ALL.len());
    }

    #[test]
    fn codes_use_process_prefixes() {
        assert!(
            ALL.iter()
                .all(|exc| ["NB.", "TB.", "SB.", "DB."].iter().any(|p| exc.code().starts_with(p)))
        );
        assert_eq!(SequencingException::CurrentActivityUndefined.code(), "NB.2.1-2");
        assert_eq!(SequencingException::DeliveryDisabled.code(), "DB.1.1-3");
    }
}
