//! Static activity definitions and per-attempt tracking records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::definition::SequencingDefinition;

/// One node of a course's activity hierarchy, as produced by a manifest builder.
///
/// This is the serialized shape of the tree. Tracking state is attempt scoped
/// and never part of it; see [`crate::core::tree::ActivityTree`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_url: Option<String>,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default)]
    pub sequencing: SequencingDefinition,
    #[serde(default)]
    pub children: Vec<Activity>,
}

fn default_visible() -> bool {
    true
}

impl Activity {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first lookup by id.
    pub fn find(&self, id: &str) -> Option<&Activity> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Single-lesson flow course used when bootstrapping an empty tree file.
pub fn default_activity() -> Activity {
    let mut sequencing = SequencingDefinition::default();
    sequencing.control_mode.flow = true;
    Activity {
        id: "course".to_string(),
        title: "Course".to_string(),
        resource_id: None,
        launch_url: None,
        is_visible: true,
        sequencing,
        children: vec![Activity {
            id: "sco-1".to_string(),
            title: "Lesson 1".to_string(),
            resource_id: Some("res-1".to_string()),
            launch_url: Some("index.html".to_string()),
            is_visible: true,
            sequencing: SequencingDefinition::default(),
            children: Vec::new(),
        }],
    }
}

/// Progress of a single objective within the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveProgress {
    pub progress_status: bool,
    pub satisfied_status: bool,
    pub measure_status: bool,
    /// Normalized measure in `[-1, 1]`; meaningful only when `measure_status`.
    pub normalized_measure: f64,
}

impl ObjectiveProgress {
    pub fn satisfied(&self) -> bool {
        self.progress_status && self.satisfied_status
    }

    pub fn set_satisfied(&mut self, satisfied: bool) {
        self.progress_status = true;
        self.satisfied_status = satisfied;
    }

    pub fn set_measure(&mut self, measure: f64) {
        self.measure_status = true;
        self.normalized_measure = measure.clamp(-1.0, 1.0);
    }
}

/// Mutable per-attempt state embedded in every activity of a live tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackingInfo {
    pub activity_is_active: bool,
    pub activity_is_suspended: bool,
    pub attempt_count: u32,
    pub attempt_progress_status: bool,
    pub attempt_completion_status: bool,
    pub objectives: BTreeMap<String, ObjectiveProgress>,
    /// Seconds; reset at each new attempt.
    pub attempt_absolute_duration: f64,
    pub attempt_experienced_duration: f64,
    /// Seconds; accumulated over every attempt.
    pub activity_absolute_duration: f64,
    pub activity_experienced_duration: f64,
    /// Child ids in delivery order after selection/randomization, once applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_children: Option<Vec<String>>,
}

impl TrackingInfo {
    pub fn completed(&self) -> bool {
        self.attempt_progress_status && self.attempt_completion_status
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.attempt_progress_status = true;
        self.attempt_completion_status = completed;
    }

    pub fn objective(&self, id: &str) -> ObjectiveProgress {
        self.objectives.get(id).copied().unwrap_or_default()
    }

    pub fn objective_mut(&mut self, id: &str) -> &mut ObjectiveProgress {
        self.objectives.entry(id.to_string()).or_default()
    }

    /// Ensure a progress entry exists for every objective in `ids`.
    pub fn initialize_objectives(&mut self, ids: &[String]) {
        for id in ids {
            self.objectives.entry(id.clone()).or_default();
        }
    }

    /// Start a new attempt: bump the counter and clear attempt-scoped progress.
    ///
    /// Objective progress carries over from earlier attempts.
    pub fn begin_attempt(&mut self) {
        self.attempt_count += 1;
        self.attempt_progress_status = false;
        self.attempt_completion_status = false;
        self.attempt_absolute_duration = 0.0;
        self.attempt_experienced_duration = 0.0;
    }

    /// Clear progress and objective status ahead of a retry.
    ///
    /// Attempt count and activity-wide duration totals survive.
    pub fn reset_attempt(&mut self) {
        self.attempt_progress_status = false;
        self.attempt_completion_status = false;
        self.attempt_absolute_duration = 0.0;
        self.attempt_experienced_duration = 0.0;
        for progress in self.objectives.values_mut() {
            *progress = ObjectiveProgress::default();
        }
    }

    /// Accumulate a delivered session's duration into attempt and activity totals.
    pub fn add_duration(&mut self, seconds: f64) {
        self.attempt_absolute_duration += seconds;
        self.attempt_experienced_duration += seconds;
        self.activity_absolute_duration += seconds;
        self.activity_experienced_duration += seconds;
    }
}
