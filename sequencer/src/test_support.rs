//! Test-only helpers for constructing activity trees and engines.

use crate::core::activity::Activity;
use crate::core::definition::{
    ChildActivitySet, ConditionCombination, RollupAction, RollupRule, RuleAction, RuleCondition,
    SequencingDefinition, SequencingRule,
};
use crate::core::engine::SequencingEngine;
use crate::core::tree::ActivityTree;
use crate::runtime::service::RuntimeSessionService;
use crate::runtime::session::{CreateSessionParams, Revision};

/// Create a launchable leaf with deterministic resource fields.
pub fn leaf(id: &str) -> Activity {
    Activity {
        id: id.to_string(),
        title: format!("{} title", id),
        resource_id: Some(format!("res-{}", id)),
        launch_url: Some(format!("{}.html", id)),
        is_visible: true,
        sequencing: SequencingDefinition::default(),
        children: Vec::new(),
    }
}

/// Create a cluster with default control modes (choice on, flow off).
pub fn cluster(id: &str, children: Vec<Activity>) -> Activity {
    Activity {
        id: id.to_string(),
        title: format!("{} title", id),
        resource_id: None,
        launch_url: None,
        is_visible: true,
        sequencing: SequencingDefinition::default(),
        children,
    }
}

/// Create a cluster whose children may be traversed with continue/previous.
pub fn flow_cluster(id: &str, children: Vec<Activity>) -> Activity {
    let mut activity = cluster(id, children);
    activity.sequencing.control_mode.flow = true;
    activity
}

/// Sequencing rule whose conditions must all hold.
pub fn rule(conditions: Vec<RuleCondition>, action: RuleAction) -> SequencingRule {
    SequencingRule {
        condition_combination: ConditionCombination::All,
        conditions,
        action,
    }
}

pub fn rollup_rule(
    child_activity_set: ChildActivitySet,
    conditions: Vec<RuleCondition>,
    action: RollupAction,
) -> RollupRule {
    RollupRule {
        child_activity_set,
        minimum_count: 0,
        minimum_percent: 0.0,
        condition_combination: ConditionCombination::Any,
        conditions,
        action,
    }
}

/// Build an engine with a fixed randomization seed.
pub fn engine_for(root: Activity) -> SequencingEngine {
    let tree = ActivityTree::build(root).expect("valid test tree");
    SequencingEngine::with_seed(tree, 7)
}

pub fn session_params(revision: Revision) -> CreateSessionParams {
    CreateSessionParams {
        package_id: "pkg-1".to_string(),
        learner_id: "learner-1".to_string(),
        learner_name: "Doe, Jane".to_string(),
        attempt_id: "attempt-1".to_string(),
        sco_id: "sco-1".to_string(),
        revision,
        ..CreateSessionParams::default()
    }
}

/// Create and initialize a session, returning its id.
pub fn initialized_session(service: &mut RuntimeSessionService, params: CreateSessionParams) -> String {
    let session_id = service.create_session(params).id.clone();
    let result = service.initialize(&session_id);
    assert!(result.success, "initialize failed: {:?}", result);
    session_id
}
