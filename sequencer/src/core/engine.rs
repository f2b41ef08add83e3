//! The sequencing engine: owns the activity tree and global state and runs
//! navigation requests through the full pipeline.
//!
//! Navigation → Termination → Sequencing → Delivery. Each request runs
//! against a scratch copy of the state that replaces the live state only when
//! the request succeeds, so a request that raises an exception leaves
//! tracking untouched.

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::delivery::delivery_request_process;
use crate::core::exceptions::SequencingException;
use crate::core::navigation::navigation_request_process;
use crate::core::rollup::overall_rollup;
use crate::core::sequencing::{SequencingOutcome, sequencing_request_process};
use crate::core::state::{GlobalStateInfo, LearnerPreferences, RestoreError, SuspendedStateData};
use crate::core::termination::{end_attempt, termination_request_process};
use crate::core::tree::ActivityTree;
use crate::core::types::{AttemptReport, DeliveryRequest, NavigationRequest, NavigationVerb};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("unknown activity '{0}'")]
    UnknownActivity(String),
}

#[derive(Debug, Clone)]
pub struct SequencingEngine {
    state: GlobalStateInfo,
    rng: StdRng,
}

impl SequencingEngine {
    /// Engine whose randomization is seeded from the operating system.
    pub fn new(tree: ActivityTree) -> Self {
        Self {
            state: GlobalStateInfo::new(tree),
            rng: StdRng::from_entropy(),
        }
    }

    /// Engine with reproducible selection and randomization.
    pub fn with_seed(tree: ActivityTree, seed: u64) -> Self {
        Self {
            state: GlobalStateInfo::new(tree),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &GlobalStateInfo {
        &self.state
    }

    pub fn tree(&self) -> &ActivityTree {
        self.state.tree()
    }

    pub fn current_activity(&self) -> Option<&str> {
        self.state.current_id()
    }

    pub fn suspended_activity(&self) -> Option<&str> {
        self.state.suspended_id()
    }

    pub fn learner_preferences(&self) -> &LearnerPreferences {
        &self.state.learner_preferences
    }

    pub fn learner_preferences_mut(&mut self) -> &mut LearnerPreferences {
        &mut self.state.learner_preferences
    }

    /// Run one navigation request and report what, if anything, to launch.
    ///
    /// Never fails: sequencing exceptions are carried in the returned
    /// [`DeliveryRequest`].
    #[instrument(skip_all, fields(request = %request.request, target = ?request.target_activity_id))]
    pub fn process_navigation_request(&mut self, request: &NavigationRequest) -> DeliveryRequest {
        let mut scratch = self.clone();
        match scratch.run_pipeline(request) {
            Ok(delivery) => {
                *self = scratch;
                delivery
            }
            Err(exc) => {
                warn!(code = exc.code(), error = %exc, "navigation request rejected");
                DeliveryRequest::exception(exc)
            }
        }
    }

    /// True when `request` would run without raising a sequencing exception.
    ///
    /// Evaluated on a copy; the engine's own state is never touched.
    pub fn is_navigation_request_valid(&self, request: &NavigationRequest) -> bool {
        let mut scratch = self.clone();
        scratch.run_pipeline(request).is_ok()
    }

    /// Ids of activities a learner could pick by choice right now, in tree order.
    pub fn available_choices(&self) -> Vec<String> {
        let tree = self.state.tree();
        tree.preorder()
            .map(|idx| tree.id(idx))
            .filter(|id| self.is_navigation_request_valid(&NavigationRequest::choice(*id)))
            .map(str::to_string)
            .collect()
    }

    fn run_pipeline(&mut self, request: &NavigationRequest) -> Result<DeliveryRequest, SequencingException> {
        let navigation = navigation_request_process(&self.state, request)?;
        let mut sequencing = navigation.sequencing;
        if let Some(termination) = navigation.termination
            && let Some(replacement) = termination_request_process(&mut self.state, termination)?
        {
            debug!(?replacement, "termination replaced sequencing request");
            sequencing = replacement;
        }

        match sequencing_request_process(&mut self.state, &mut self.rng, &sequencing)? {
            SequencingOutcome::Deliver {
                target,
                check_availability,
            } => {
                delivery_request_process(&mut self.state, target, check_availability)?;
                let node = self.state.tree().node(target);
                Ok(DeliveryRequest::deliver(node.id.clone(), node.launch_url.clone()))
            }
            SequencingOutcome::EndSession => {
                self.end_sequencing_session();
                Ok(DeliveryRequest::session_ended())
            }
            SequencingOutcome::Idle => Ok(DeliveryRequest::idle()),
        }
    }

    /// End whatever attempts are still open and clear the current activity.
    /// A suspension anchor survives so the session can later be resumed.
    fn end_sequencing_session(&mut self) {
        if let Some(current) = self.state.current_activity.take() {
            for idx in self.state.tree().ancestors(current) {
                if self.state.tree().node(idx).tracking.activity_is_active {
                    end_attempt(&mut self.state, idx);
                }
            }
        }
        info!(
            suspended = ?self.state.suspended_id(),
            "sequencing session ended"
        );
    }

    /// Snapshot of all attempt-scoped state for persistence.
    pub fn save_state(&self) -> SuspendedStateData {
        self.state.snapshot()
    }

    /// Replace all attempt-scoped state with a snapshot taken by
    /// [`save_state`](Self::save_state), possibly in another process.
    pub fn restore_state(&mut self, data: SuspendedStateData) -> Result<(), RestoreError> {
        self.state.restore(data)?;
        debug!(
            current = ?self.state.current_id(),
            suspended = ?self.state.suspended_id(),
            "restored sequencing state"
        );
        Ok(())
    }

    /// Apply results reported by a delivered activity's runtime session, then
    /// roll them up.
    pub fn record_attempt_report(&mut self, activity_id: &str, report: &AttemptReport) -> Result<(), EngineError> {
        let idx = self
            .state
            .tree()
            .find(activity_id)
            .ok_or_else(|| EngineError::UnknownActivity(activity_id.to_string()))?;
        let node = self.state.tree_mut().node_mut(idx);
        let primary = node.sequencing.primary_objective_id().to_string();
        if let Some(completed) = report.completed {
            node.tracking.set_completed(completed);
        }
        if let Some(satisfied) = report.satisfied {
            node.tracking.objective_mut(&primary).set_satisfied(satisfied);
        }
        if let Some(score) = report.scaled_score {
            node.tracking.objective_mut(&primary).set_measure(score);
        }
        if let Some(seconds) = report.session_seconds {
            node.tracking.add_duration(seconds);
        }
        debug!(activity_id, ?report, "recorded attempt report");
        overall_rollup(&mut self.state, idx);
        Ok(())
    }

    /// Convenience for the common `start` request.
    pub fn start(&mut self) -> DeliveryRequest {
        self.process_navigation_request(&NavigationRequest::new(NavigationVerb::Start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::activity::Activity;
    use crate::core::definition::{ConditionKind, ObjectiveDescription, ObjectiveMap, RuleAction, RuleCondition};
    use crate::test_support::{engine_for, flow_cluster, leaf, rule};

    fn course() -> Activity {
        flow_cluster("root", vec![leaf("a"), leaf("b")])
    }

    #[test]
    fn start_delivers_first_leaf() {
        let mut engine = engine_for(course());
        let delivery = engine.start();
        assert!(delivery.valid);
        assert_eq!(delivery.activity_id.as_deref(), Some("a"));
        assert_eq!(delivery.launch_url.as_deref(), Some("a.html"));
        assert_eq!(engine.current_activity(), Some("a"));
    }

    /// A rejected request reports its code and leaves state unchanged.
    #[test]
    fn rejected_request_leaves_state_untouched() {
        let mut engine = engine_for(course());
        engine.start();
        let before = engine.save_state();

        let delivery = engine.process_navigation_request(&NavigationRequest::new(NavigationVerb::Previous));

        assert!(!delivery.valid);
        assert_eq!(delivery.exception.as_deref(), Some("SB.2.1-2"));
        assert_eq!(engine.save_state(), before);
    }

    #[test]
    fn validity_check_does_not_mutate() {
        let mut engine = engine_for(course());
        engine.start();
        let before = engine.save_state();
        assert!(engine.is_navigation_request_valid(&NavigationRequest::new(NavigationVerb::Continue)));
        assert!(!engine.is_navigation_request_valid(&NavigationRequest::new(NavigationVerb::Start)));
        assert_eq!(engine.save_state(), before);
    }

    #[test]
    fn attempt_report_rolls_up() {
        let mut engine = engine_for(flow_cluster("root", vec![leaf("a")]));
        engine.start();
        let report = AttemptReport {
            completed: Some(true),
            satisfied: Some(false),
            scaled_score: Some(0.4),
            session_seconds: Some(90.0),
        };
        engine.record_attempt_report("a", &report).expect("record");

        let tree = engine.tree();
        let root = tree.node(tree.root());
        assert!(root.tracking.completed());
        let status = engine.state().primary_objective(tree.root());
        assert!(status.progress_status);
        assert!(!status.satisfied_status);
        assert_eq!(
            engine.record_attempt_report("missing", &report),
            Err(EngineError::UnknownActivity("missing".to_string()))
        );
    }

    #[test]
    fn available_choices_skip_hidden_activities() {
        let mut hidden = leaf("b");
        hidden.is_visible = false;
        let engine = engine_for(flow_cluster("root", vec![leaf("a"), hidden]));
        assert_eq!(engine.available_choices(), vec!["root".to_string(), "a".to_string()]);
    }

    fn always(action: RuleAction) -> crate::core::definition::SequencingRule {
        rule(vec![RuleCondition::new(ConditionKind::Always)], action)
    }

    #[test]
    fn retry_post_condition_redelivers_with_new_attempt() {
        let mut a = leaf("a");
        a.sequencing.rules.post_condition.push(always(RuleAction::Retry));
        let mut engine = engine_for(flow_cluster("root", vec![a, leaf("b")]));
        engine.start();

        let delivery = engine.process_navigation_request(&NavigationRequest::new(NavigationVerb::Continue));

        assert!(delivery.valid);
        assert_eq!(delivery.activity_id.as_deref(), Some("a"));
        let tree = engine.tree();
        let a = tree.find("a").expect("a");
        assert_eq!(tree.node(a).tracking.attempt_count, 2);
        assert_eq!(tree.node(tree.root()).tracking.attempt_count, 1);
    }

    /// RetryAll ends every open attempt and starts the course over.
    #[test]
    fn retry_all_post_condition_restarts_from_root() {
        let mut b = leaf("b");
        b.sequencing.rules.post_condition.push(always(RuleAction::RetryAll));
        let mut engine = engine_for(flow_cluster("root", vec![leaf("a"), b]));
        engine.start();
        engine.process_navigation_request(&NavigationRequest::new(NavigationVerb::Continue));

        let delivery = engine.process_navigation_request(&NavigationRequest::new(NavigationVerb::Continue));

        assert_eq!(delivery.activity_id.as_deref(), Some("a"));
        let tree = engine.tree();
        assert_eq!(tree.node(tree.root()).tracking.attempt_count, 2);
        let a = tree.find("a").expect("a");
        assert_eq!(tree.node(a).tracking.attempt_count, 2);
        assert!(!tree.node(a).tracking.attempt_progress_status);
    }

    #[test]
    fn attempt_report_writes_shared_objective_for_readers() {
        let mapped = |id: &str, read: bool, write: bool| {
            let mut activity = leaf(id);
            let mut objective = ObjectiveDescription::new(format!("{id}-obj"));
            objective.map_info.push(ObjectiveMap {
                target_objective_id: "shared".to_string(),
                read_satisfied_status: read,
                read_normalized_measure: read,
                write_satisfied_status: write,
                write_normalized_measure: write,
            });
            activity.sequencing.objectives.push(objective);
            activity
        };
        let mut engine = engine_for(flow_cluster(
            "root",
            vec![mapped("writer", false, true), mapped("reader", true, false)],
        ));
        engine.start();
        let reader = engine.tree().find("reader").expect("reader");
        assert!(!engine.state().primary_objective(reader).progress_status);

        let report = AttemptReport {
            satisfied: Some(true),
            scaled_score: Some(0.9),
            ..AttemptReport::default()
        };
        engine.record_attempt_report("writer", &report).expect("record");

        let shared = engine.save_state().global_objectives["shared"];
        assert!(shared.progress_status && shared.satisfied_status);
        let status = engine.state().primary_objective(reader);
        assert!(status.progress_status);
        assert!(status.satisfied_status);
        assert_eq!(status.normalized_measure, 0.9);
        assert!(
            !engine
                .tree()
                .node(reader)
                .tracking
                .objective("reader-obj")
                .progress_status
        );
    }
}
