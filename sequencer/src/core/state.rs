//! Attempt-wide sequencing state and its persisted snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::activity::{ObjectiveProgress, TrackingInfo};
use crate::core::tree::{ActivityIdx, ActivityTree};

/// Learner preference settings shared by every activity of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LearnerPreferences {
    pub audio_level: f64,
    pub language: String,
    pub delivery_speed: f64,
    pub audio_captioning: i8,
}

impl Default for LearnerPreferences {
    fn default() -> Self {
        Self {
            audio_level: 1.0,
            language: String::new(),
            delivery_speed: 1.0,
            audio_captioning: 0,
        }
    }
}

/// Serializable snapshot of everything attempt-scoped, for cross-session resume.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuspendedStateData {
    pub current_activity_id: Option<String>,
    pub suspended_activity_id: Option<String>,
    /// Tracking record per activity id.
    pub tracking: BTreeMap<String, TrackingInfo>,
    pub global_objectives: BTreeMap<String, ObjectiveProgress>,
    pub learner_preferences: LearnerPreferences,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RestoreError {
    #[error("saved state references unknown activity '{0}'")]
    UnknownActivity(String),
}

/// Mutable state of one attempt: the owned tree plus current/suspended pointers.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalStateInfo {
    pub activity_tree: ActivityTree,
    pub current_activity: Option<ActivityIdx>,
    pub suspended_activity: Option<ActivityIdx>,
    pub learner_preferences: LearnerPreferences,
    pub global_objectives: BTreeMap<String, ObjectiveProgress>,
}

impl GlobalStateInfo {
    pub fn new(activity_tree: ActivityTree) -> Self {
        Self {
            activity_tree,
            current_activity: None,
            suspended_activity: None,
            learner_preferences: LearnerPreferences::default(),
            global_objectives: BTreeMap::new(),
        }
    }

    pub fn tree(&self) -> &ActivityTree {
        &self.activity_tree
    }

    pub fn tree_mut(&mut self) -> &mut ActivityTree {
        &mut self.activity_tree
    }

    /// Objective progress as seen by rules and rollup.
    ///
    /// `objective_id = None` selects the primary objective. Local values are
    /// overlaid by any global objective the local objective reads from, once
    /// that global objective's status (or measure) is known.
    pub fn objective_status(&self, idx: ActivityIdx, objective_id: Option<&str>) -> ObjectiveProgress {
        let node = self.activity_tree.node(idx);
        let id = objective_id.unwrap_or_else(|| node.sequencing.primary_objective_id());
        let mut progress = node.tracking.objective(id);
        let Some(description) = node.sequencing.objective(id) else {
            return progress;
        };
        for map in &description.map_info {
            let Some(global) = self.global_objectives.get(&map.target_objective_id) else {
                continue;
            };
            if map.read_satisfied_status && global.progress_status {
                progress.progress_status = true;
                progress.satisfied_status = global.satisfied_status;
            }
            if map.read_normalized_measure && global.measure_status {
                progress.measure_status = true;
                progress.normalized_measure = global.normalized_measure;
            }
        }
        progress
    }

    pub fn primary_objective(&self, idx: ActivityIdx) -> ObjectiveProgress {
        self.objective_status(idx, None)
    }

    /// Push local objective values out through `write*` objective maps.
    pub fn write_global_objectives(&mut self, idx: ActivityIdx) {
        let node = self.activity_tree.node(idx);
        let mut writes = Vec::new();
        for description in &node.sequencing.objectives {
            let local = node.tracking.objective(&description.id);
            for map in &description.map_info {
                writes.push((map.clone(), local));
            }
        }
        for (map, local) in writes {
            let global = self
                .global_objectives
                .entry(map.target_objective_id.clone())
                .or_default();
            if map.write_satisfied_status && local.progress_status {
                global.set_satisfied(local.satisfied_status);
            }
            if map.write_normalized_measure && local.measure_status {
                global.set_measure(local.normalized_measure);
            }
        }
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_activity.map(|idx| self.activity_tree.id(idx))
    }

    pub fn suspended_id(&self) -> Option<&str> {
        self.suspended_activity.map(|idx| self.activity_tree.id(idx))
    }

    pub fn snapshot(&self) -> SuspendedStateData {
        let tree = &self.activity_tree;
        SuspendedStateData {
            current_activity_id: self.current_id().map(str::to_string),
            suspended_activity_id: self.suspended_id().map(str::to_string),
            tracking: tree
                .preorder()
                .map(|idx| (tree.id(idx).to_string(), tree.node(idx).tracking.clone()))
                .collect(),
            global_objectives: self.global_objectives.clone(),
            learner_preferences: self.learner_preferences.clone(),
        }
    }

    /// Replace all attempt-scoped state with `data`.
    ///
    /// Activities absent from `data.tracking` start from a blank record.
    pub fn restore(&mut self, data: SuspendedStateData) -> Result<(), RestoreError> {
        let lookup = |tree: &ActivityTree, id: &str| {
            tree.find(id)
                .ok_or_else(|| RestoreError::UnknownActivity(id.to_string()))
        };
        let current = data
            .current_activity_id
            .as_deref()
            .map(|id| lookup(&self.activity_tree, id))
            .transpose()?;
        let suspended = data
            .suspended_activity_id
            .as_deref()
            .map(|id| lookup(&self.activity_tree, id))
            .transpose()?;
        let mut assignments = Vec::with_capacity(data.tracking.len());
        for (id, tracking) in data.tracking {
            assignments.push((lookup(&self.activity_tree, &id)?, tracking));
        }

        self.activity_tree.clear_tracking();
        for (idx, tracking) in assignments {
            self.activity_tree.node_mut(idx).tracking = tracking;
        }
        self.current_activity = current;
        self.suspended_activity = suspended;
        self.global_objectives = data.global_objectives;
        self.learner_preferences = data.learner_preferences;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::definition::{ObjectiveDescription, ObjectiveMap};
    use crate::test_support::{cluster, leaf};

    fn mapped_leaf(id: &str, read: bool, write: bool) -> crate::core::activity::Activity {
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
    }

    #[test]
    fn global_objectives_flow_from_writer_to_reader() {
        let tree = ActivityTree::build(cluster(
            "root",
            vec![mapped_leaf("w", false, true), mapped_leaf("r", true, false)],
        ))
        .expect("build");
        let mut state = GlobalStateInfo::new(tree);
        let w = state.tree().find("w").expect("w");
        let r = state.tree().find("r").expect("r");

        state
            .tree_mut()
            .node_mut(w)
            .tracking
            .objective_mut("w-obj")
            .set_satisfied(true);
        state.write_global_objectives(w);

        assert!(state.primary_objective(r).satisfied());
        assert!(!state.tree().node(r).tracking.objective("r-obj").progress_status);
    }

    #[test]
    fn restore_rejects_unknown_ids() {
        let tree = ActivityTree::build(cluster("root", vec![leaf("a")])).expect("build");
        let mut state = GlobalStateInfo::new(tree);
        let data = SuspendedStateData {
            current_activity_id: Some("ghost".to_string()),
            ..SuspendedStateData::default()
        };
        assert_eq!(
            state.restore(data),
            Err(RestoreError::UnknownActivity("ghost".to_string()))
        );
    }

    #[test]
    fn snapshot_then_restore_reproduces_state() {
        let tree = ActivityTree::build(cluster("root", vec![leaf("a"), leaf("b")])).expect("build");
        let mut state = GlobalStateInfo::new(tree.clone());
        let a = state.tree().find("a").expect("a");
        state.current_activity = Some(a);
        state.tree_mut().node_mut(a).tracking.attempt_count = 3;
        state.learner_preferences.language = "fr".to_string();

        let snapshot = state.snapshot();
        let mut fresh = GlobalStateInfo::new(tree);
        fresh.restore(snapshot.clone()).expect("restore");

        assert_eq!(fresh.snapshot(), snapshot);
        assert_eq!(fresh.current_id(), Some("a"));
    }
}
