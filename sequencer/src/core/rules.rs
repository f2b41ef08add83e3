//! Rule condition evaluation shared by pre-, post-, exit- and rollup rules.
//!
//! Rules are ordered lists of condition sets with a plain action enum; the
//! first rule whose conditions hold wins and later rules are not evaluated.

use crate::core::definition::{
    ConditionCombination, ConditionKind, ConditionOperator, RuleAction, RuleCondition,
    SequencingRule,
};
use crate::core::state::GlobalStateInfo;
use crate::core::tree::{ActivityIdx, ActivityNode};

/// Pre-condition actions consulted while flowing through the tree.
pub const FLOW_SKIP_ACTIONS: &[RuleAction] = &[RuleAction::Skip, RuleAction::Disabled];

const POST_ACTIONS: &[RuleAction] = &[
    RuleAction::ExitParent,
    RuleAction::ExitAll,
    RuleAction::Retry,
    RuleAction::RetryAll,
    RuleAction::Continue,
    RuleAction::Previous,
];

/// Evaluate one condition, including its `not` operator.
pub fn evaluate_condition(state: &GlobalStateInfo, idx: ActivityIdx, condition: &RuleCondition) -> bool {
    let node = state.tree().node(idx);
    let tracking = &node.tracking;
    let objective = || state.objective_status(idx, condition.referenced_objective.as_deref());
    let result = match condition.condition {
        ConditionKind::Satisfied => objective().satisfied(),
        ConditionKind::ObjectiveStatusKnown => objective().progress_status,
        ConditionKind::ObjectiveMeasureKnown => objective().measure_status,
        ConditionKind::ObjectiveMeasureGreaterThan => {
            let progress = objective();
            progress.measure_status && progress.normalized_measure > condition.measure_threshold
        }
        ConditionKind::ObjectiveMeasureLessThan => {
            let progress = objective();
            progress.measure_status && progress.normalized_measure < condition.measure_threshold
        }
        ConditionKind::Completed => tracking.completed(),
        ConditionKind::ActivityProgressKnown => tracking.attempt_progress_status,
        ConditionKind::Attempted => tracking.attempt_count > 0,
        ConditionKind::AttemptLimitExceeded => attempt_limit_exceeded(node),
        ConditionKind::Always => true,
    };
    match condition.operator {
        ConditionOperator::NoOp => result,
        ConditionOperator::Not => !result,
    }
}

/// Combine a rule's conditions. A rule without conditions never matches.
pub fn conditions_match(
    state: &GlobalStateInfo,
    idx: ActivityIdx,
    combination: ConditionCombination,
    conditions: &[RuleCondition],
) -> bool {
    if conditions.is_empty() {
        return false;
    }
    match combination {
        ConditionCombination::All => conditions
            .iter()
            .all(|condition| evaluate_condition(state, idx, condition)),
        ConditionCombination::Any => conditions
            .iter()
            .any(|condition| evaluate_condition(state, idx, condition)),
    }
}

/// Action of the first rule in `rules` whose action is in `actions` and whose
/// conditions hold.
pub fn rule_check(
    state: &GlobalStateInfo,
    idx: ActivityIdx,
    rules: &[SequencingRule],
    actions: &[RuleAction],
) -> Option<RuleAction> {
    rules
        .iter()
        .filter(|rule| actions.contains(&rule.action))
        .find(|rule| conditions_match(state, idx, rule.condition_combination, &rule.conditions))
        .map(|rule| rule.action)
}

pub fn pre_condition_check(
    state: &GlobalStateInfo,
    idx: ActivityIdx,
    actions: &[RuleAction],
) -> Option<RuleAction> {
    let rules = &state.tree().node(idx).sequencing.rules.pre_condition;
    rule_check(state, idx, rules, actions)
}

pub fn post_condition_action(state: &GlobalStateInfo, idx: ActivityIdx) -> Option<RuleAction> {
    let rules = &state.tree().node(idx).sequencing.rules.post_condition;
    rule_check(state, idx, rules, POST_ACTIONS)
}

pub fn exit_condition_matches(state: &GlobalStateInfo, idx: ActivityIdx) -> bool {
    let rules = &state.tree().node(idx).sequencing.rules.exit_condition;
    rule_check(state, idx, rules, &[RuleAction::Exit]).is_some()
}

pub fn attempt_limit_exceeded(node: &ActivityNode) -> bool {
    match node.sequencing.limit_conditions.attempt_limit {
        Some(limit) if limit > 0 => node.tracking.attempt_count >= limit,
        _ => false,
    }
}

/// Disabled by a pre-condition rule, or unable to start another attempt.
///
/// Active and suspended activities continue their open attempt, so the
/// attempt limit does not apply to them.
pub fn is_disabled(state: &GlobalStateInfo, idx: ActivityIdx) -> bool {
    if pre_condition_check(state, idx, &[RuleAction::Disabled]).is_some() {
        return true;
    }
    let node = state.tree().node(idx);
    !node.tracking.activity_is_active && !node.tracking.activity_is_suspended && attempt_limit_exceeded(node)
}

pub fn is_hidden_from_choice(state: &GlobalStateInfo, idx: ActivityIdx) -> bool {
    !state.tree().node(idx).is_visible
        || pre_condition_check(state, idx, &[RuleAction::HiddenFromChoice]).is_some()
}
