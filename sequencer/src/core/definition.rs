//! Static sequencing definition attached to every activity.
//!
//! These types are immutable for the lifetime of an activity tree build. They
//! serialize with camelCase field names so trees produced by a manifest builder
//! can be consumed without translation.

use serde::{Deserialize, Serialize};

/// Objective id used when an activity declares no objectives at all.
pub const IMPLICIT_PRIMARY_OBJECTIVE: &str = "_primary";

/// Control modes governing how an activity's children may be navigated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlMode {
    pub choice: bool,
    pub choice_exit: bool,
    pub flow: bool,
    pub forward_only: bool,
    pub use_current_attempt_objective_info: bool,
    pub use_current_attempt_progress_info: bool,
}

impl Default for ControlMode {
    fn default() -> Self {
        Self {
            choice: true,
            choice_exit: true,
            flow: false,
            forward_only: false,
            use_current_attempt_objective_info: true,
            use_current_attempt_progress_info: true,
        }
    }
}

/// Predicate tested by a single rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionKind {
    Satisfied,
    ObjectiveStatusKnown,
    ObjectiveMeasureKnown,
    ObjectiveMeasureGreaterThan,
    ObjectiveMeasureLessThan,
    Completed,
    ActivityProgressKnown,
    Attempted,
    AttemptLimitExceeded,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    #[default]
    NoOp,
    Not,
}

/// How the conditions of one rule combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionCombination {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub condition: ConditionKind,
    /// Objective tested by the predicate; `None` means the primary objective.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_objective: Option<String>,
    #[serde(default)]
    pub measure_threshold: f64,
    #[serde(default)]
    pub operator: ConditionOperator,
}

impl RuleCondition {
    pub fn new(condition: ConditionKind) -> Self {
        Self {
            condition,
            referenced_objective: None,
            measure_threshold: 0.0,
            operator: ConditionOperator::NoOp,
        }
    }

    pub fn negated(mut self) -> Self {
        self.operator = ConditionOperator::Not;
        self
    }
}

/// Action of a pre-, post- or exit-condition sequencing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleAction {
    // pre-condition
    Skip,
    Disabled,
    HiddenFromChoice,
    StopForwardTraversal,
    // post-condition
    ExitParent,
    ExitAll,
    Retry,
    RetryAll,
    Continue,
    Previous,
    // exit
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencingRule {
    #[serde(default)]
    pub condition_combination: ConditionCombination,
    pub conditions: Vec<RuleCondition>,
    pub action: RuleAction,
}

/// Ordered rule lists; within a list the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SequencingRules {
    pub pre_condition: Vec<SequencingRule>,
    pub post_condition: Vec<SequencingRule>,
    pub exit_condition: Vec<SequencingRule>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChildActivitySet {
    All,
    Any,
    None,
    AtLeastCount,
    AtLeastPercent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RollupAction {
    Satisfied,
    NotSatisfied,
    Completed,
    Incomplete,
}

impl RollupAction {
    /// True for actions that change objective satisfaction rather than completion.
    pub fn is_satisfaction(self) -> bool {
        matches!(self, Self::Satisfied | Self::NotSatisfied)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupRule {
    pub child_activity_set: ChildActivitySet,
    #[serde(default)]
    pub minimum_count: u32,
    /// Fraction in `[0, 1]` used by `atLeastPercent`.
    #[serde(default)]
    pub minimum_percent: f64,
    #[serde(default = "default_rollup_combination")]
    pub condition_combination: ConditionCombination,
    pub conditions: Vec<RuleCondition>,
    pub action: RollupAction,
}

fn default_rollup_combination() -> ConditionCombination {
    ConditionCombination::Any
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RollupControls {
    pub rollup_objective_satisfied: bool,
    pub rollup_progress_completion: bool,
    pub objective_measure_weight: f64,
}

impl Default for RollupControls {
    fn default() -> Self {
        Self {
            rollup_objective_satisfied: true,
            rollup_progress_completion: true,
            objective_measure_weight: 1.0,
        }
    }
}

/// Link between a local objective and a global (shared) objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveMap {
    pub target_objective_id: String,
    #[serde(default = "default_true")]
    pub read_satisfied_status: bool,
    #[serde(default = "default_true")]
    pub read_normalized_measure: bool,
    #[serde(default)]
    pub write_satisfied_status: bool,
    #[serde(default)]
    pub write_normalized_measure: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveDescription {
    pub id: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub satisfied_by_measure: bool,
    #[serde(default = "default_min_measure")]
    pub min_normalized_measure: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map_info: Vec<ObjectiveMap>,
}

fn default_min_measure() -> f64 {
    1.0
}

impl ObjectiveDescription {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primary: false,
            satisfied_by_measure: false,
            min_normalized_measure: default_min_measure(),
            map_info: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RandomizationTiming {
    #[default]
    Never,
    Once,
    OnEachNewAttempt,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RandomizationControls {
    pub randomization_timing: RandomizationTiming,
    pub reorder_children: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeliveryControls {
    pub tracked: bool,
    pub completion_set_by_content: bool,
    pub objective_set_by_content: bool,
}

impl Default for DeliveryControls {
    fn default() -> Self {
        Self {
            tracked: true,
            completion_set_by_content: false,
            objective_set_by_content: false,
        }
    }
}

/// Full sequencing configuration of one activity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SequencingDefinition {
    pub control_mode: ControlMode,
    pub rules: SequencingRules,
    pub limit_conditions: LimitConditions,
    pub rollup_rules: Vec<RollupRule>,
    pub rollup: RollupControls,
    pub objectives: Vec<ObjectiveDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_objective_id: Option<String>,
    pub randomization: RandomizationControls,
    pub delivery: DeliveryControls,
    pub constrain_choice: bool,
    pub prevent_activation: bool,
}

impl SequencingDefinition {
    /// Id of the objective that rollup and unreferenced rule conditions use.
    ///
    /// Resolution order: explicit `primaryObjectiveId`, the objective flagged
    /// `primary`, the first declared objective, then an implicit objective.
    pub fn primary_objective_id(&self) -> &str {
        if let Some(id) = &self.primary_objective_id {
            return id;
        }
        self.objectives
            .iter()
            .find(|objective| objective.primary)
            .or_else(|| self.objectives.first())
            .map(|objective| objective.id.as_str())
            .unwrap_or(IMPLICIT_PRIMARY_OBJECTIVE)
    }

    pub fn primary_objective(&self) -> Option<&ObjectiveDescription> {
        let id = self.primary_objective_id();
        self.objectives.iter().find(|objective| objective.id == id)
    }

    /// Every objective id that needs a progress entry once an attempt begins.
    pub fn objective_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.objectives.iter().map(|o| o.id.clone()).collect();
        let primary = self.primary_objective_id();
        if !ids.iter().any(|id| id == primary) {
            ids.insert(0, primary.to_string());
        }
        ids
    }

    pub fn objective(&self, id: &str) -> Option<&ObjectiveDescription> {
        self.objectives.iter().find(|objective| objective.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_objective_prefers_explicit_id() {
        let def = SequencingDefinition {
            objectives: vec![ObjectiveDescription::new("a"), ObjectiveDescription::new("b")],
            primary_objective_id: Some("b".to_string()),
            ..SequencingDefinition::default()
        };
        assert_eq!(def.primary_objective_id(), "b");
    }

    #[test]
    fn primary_objective_falls_back_to_implicit() {
        let def = SequencingDefinition::default();
        assert_eq!(def.primary_objective_id(), IMPLICIT_PRIMARY_OBJECTIVE);
        assert_eq!(def.objective_ids(), vec![IMPLICIT_PRIMARY_OBJECTIVE.to_string()]);
    }

    /// Missing fields in JSON fall back to the standard defaults.
    #[test]
    fn deserializes_with_defaults() {
        let def: SequencingDefinition =
            serde_json::from_str(r#"{"controlMode":{"flow":true}}"#).expect("parse");
        assert!(def.control_mode.flow);
        assert!(def.control_mode.choice);
        assert!(def.control_mode.choice_exit);
        assert!(def.delivery.tracked);
        assert_eq!(def.rollup.objective_measure_weight, 1.0);
    }

    #[test]
    fn rollup_rule_condition_combination_defaults_to_any() {
        let rule: RollupRule = serde_json::from_str(
            r#"{"childActivitySet":"all","conditions":[{"condition":"satisfied"}],"action":"satisfied"}"#,
        )
        .expect("parse");
        assert_eq!(rule.condition_combination, ConditionCombination::Any);
        assert!(rule.action.is_satisfaction());
    }
}
