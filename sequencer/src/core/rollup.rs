//! Overall Rollup: propagate child status up to the root.
//!
//! Each cluster on the way up runs, in order: measure rollup, objective
//! rollup, activity progress rollup, then explicit rollup rules. A matching
//! rollup rule overrides whatever the default steps derived.

use tracing::debug;

use crate::core::definition::{ChildActivitySet, RollupAction, RollupRule};
use crate::core::rules::conditions_match;
use crate::core::state::GlobalStateInfo;
use crate::core::tree::ActivityIdx;

/// Roll status up from `idx` through every ancestor to the root.
pub fn overall_rollup(state: &mut GlobalStateInfo, idx: ActivityIdx) {
    for ancestor in state.tree().ancestors(idx) {
        if !state.tree().is_leaf(ancestor) {
            rollup_activity(state, ancestor);
        }
        state.write_global_objectives(ancestor);
    }
}

fn rollup_activity(state: &mut GlobalStateInfo, idx: ActivityIdx) {
    let children: Vec<ActivityIdx> = state
        .tree()
        .available_children(idx)
        .into_iter()
        .filter(|child| state.tree().node(*child).sequencing.delivery.tracked)
        .collect();
    if children.is_empty() {
        return;
    }
    let controls = state.tree().node(idx).sequencing.rollup.clone();

    measure_rollup(state, idx, &children);
    if controls.rollup_objective_satisfied {
        objective_rollup(state, idx, &children);
    }
    if controls.rollup_progress_completion {
        progress_rollup(state, idx, &children);
    }
    apply_rollup_rules(
        state,
        idx,
        &children,
        controls.rollup_objective_satisfied,
        controls.rollup_progress_completion,
    );

    let tracking = &state.tree().node(idx).tracking;
    debug!(
        activity_id = %state.tree().id(idx),
        completed = tracking.completed(),
        satisfied = state.primary_objective(idx).satisfied(),
        "rolled up activity"
    );
}

/// Weighted average of children's primary measures, over children with a
/// known measure.
fn measure_rollup(state: &mut GlobalStateInfo, idx: ActivityIdx, children: &[ActivityIdx]) {
    let mut weighted_total = 0.0;
    let mut weight_sum = 0.0;
    for child in children {
        let weight = state
            .tree()
            .node(*child)
            .sequencing
            .rollup
            .objective_measure_weight;
        if weight <= 0.0 {
            continue;
        }
        let progress = state.primary_objective(*child);
        if progress.measure_status {
            weighted_total += progress.normalized_measure * weight;
            weight_sum += weight;
        }
    }

    let node = state.tree_mut().node_mut(idx);
    let primary = node.sequencing.primary_objective_id().to_string();
    let progress = node.tracking.objective_mut(&primary);
    if weight_sum > 0.0 {
        progress.set_measure(weighted_total / weight_sum);
    } else {
        progress.measure_status = false;
    }
}

fn objective_rollup(state: &mut GlobalStateInfo, idx: ActivityIdx, children: &[ActivityIdx]) {
    let node = state.tree().node(idx);
    let primary = node.sequencing.primary_objective_id().to_string();
    let by_measure = node
        .sequencing
        .primary_objective()
        .filter(|objective| objective.satisfied_by_measure)
        .map(|objective| objective.min_normalized_measure);

    if let Some(threshold) = by_measure {
        let progress = state.tree_mut().node_mut(idx).tracking.objective_mut(&primary);
        if progress.measure_status {
            let satisfied = progress.normalized_measure >= threshold;
            progress.set_satisfied(satisfied);
        } else {
            progress.progress_status = false;
        }
        return;
    }

    let statuses: Vec<_> = children
        .iter()
        .map(|child| state.primary_objective(*child))
        .collect();
    let progress = state.tree_mut().node_mut(idx).tracking.objective_mut(&primary);
    if statuses.iter().all(|status| status.satisfied()) {
        progress.set_satisfied(true);
    } else if statuses.iter().all(|status| status.progress_status) {
        progress.set_satisfied(false);
    } else {
        progress.progress_status = false;
    }
}

/// Completion is known only once every child's completion is known.
fn progress_rollup(state: &mut GlobalStateInfo, idx: ActivityIdx, children: &[ActivityIdx]) {
    let all_known = children
        .iter()
        .all(|child| state.tree().node(*child).tracking.attempt_progress_status);
    let all_completed = children
        .iter()
        .all(|child| state.tree().node(*child).tracking.completed());
    let tracking = &mut state.tree_mut().node_mut(idx).tracking;
    if all_known {
        tracking.set_completed(all_completed);
    } else {
        tracking.attempt_progress_status = false;
        tracking.attempt_completion_status = false;
    }
}

fn apply_rollup_rules(
    state: &mut GlobalStateInfo,
    idx: ActivityIdx,
    children: &[ActivityIdx],
    satisfaction_enabled: bool,
    completion_enabled: bool,
) {
    let rules = state.tree().node(idx).sequencing.rollup_rules.clone();
    let first_match = |satisfaction: bool| {
        rules
            .iter()
            .filter(|rule| rule.action.is_satisfaction() == satisfaction)
            .find(|rule| rollup_rule_matches(state, rule, children))
            .map(|rule| rule.action)
    };
    let satisfaction = if satisfaction_enabled {
        first_match(true)
    } else {
        None
    };
    let completion = if completion_enabled {
        first_match(false)
    } else {
        None
    };

    let node = state.tree_mut().node_mut(idx);
    let primary = node.sequencing.primary_objective_id().to_string();
    for action in [satisfaction, completion].into_iter().flatten() {
        match action {
            RollupAction::Satisfied => node.tracking.objective_mut(&primary).set_satisfied(true),
            RollupAction::NotSatisfied => {
                node.tracking.objective_mut(&primary).set_satisfied(false);
            }
            RollupAction::Completed => node.tracking.set_completed(true),
            RollupAction::Incomplete => node.tracking.set_completed(false),
        }
    }
}

fn rollup_rule_matches(state: &GlobalStateInfo, rule: &RollupRule, children: &[ActivityIdx]) -> bool {
    let total = children.len();
    if total == 0 {
        return false;
    }
    let hits = children
        .iter()
        .filter(|child| conditions_match(state, **child, rule.condition_combination, &rule.conditions))
        .count();
    match rule.child_activity_set {
        ChildActivitySet::All => hits == total,
        ChildActivitySet::Any => hits > 0,
        ChildActivitySet::None => hits == 0,
        ChildActivitySet::AtLeastCount => hits >= rule.minimum_count as usize,
        ChildActivitySet::AtLeastPercent => hits as f64 / total as f64 >= rule.minimum_percent,
    }
}
