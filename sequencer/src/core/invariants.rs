//! Semantic invariants not expressible via JSON Schema.

use std::collections::HashSet;

use crate::core::activity::Activity;

/// Check semantic invariants of a static activity tree:
/// - No empty or duplicate activity ids
/// - A node is never both a cluster and a launchable leaf
/// - Objective ids are unique per activity
/// - Weights, thresholds and percentages are in range
pub fn validate_invariants(root: &Activity) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    validate_activity(root, &mut seen, &mut errors, root.id.as_str());
    errors
}

fn validate_activity(
    activity: &Activity,
    seen: &mut HashSet<String>,
    errors: &mut Vec<String>,
    path: &str,
) {
    if activity.id.trim().is_empty() {
        errors.push(format!("{}: activity id must not be empty", path));
    } else if !seen.insert(activity.id.clone()) {
        errors.push(format!("duplicate id '{}' at {}", activity.id, path));
    }

    if !activity.children.is_empty() && activity.resource_id.is_some() {
        errors.push(format!(
            "{}: activity with children must not reference a resource",
            path
        ));
    }

    let sequencing = &activity.sequencing;
    let mut objective_ids = HashSet::new();
    for objective in &sequencing.objectives {
        if !objective_ids.insert(objective.id.as_str()) {
            errors.push(format!("{}: duplicate objective id '{}'", path, objective.id));
        }
        if !(-1.0..=1.0).contains(&objective.min_normalized_measure) {
            errors.push(format!(
                "{}: objective '{}' minNormalizedMeasure {} outside [-1,1]",
                path, objective.id, objective.min_normalized_measure
            ));
        }
    }

    let weight = sequencing.rollup.objective_measure_weight;
    if !(0.0..=1.0).contains(&weight) {
        errors.push(format!(
            "{}: objectiveMeasureWeight {} outside [0,1]",
            path, weight
        ));
    }

    for rule in &sequencing.rollup_rules {
        if !(0.0..=1.0).contains(&rule.minimum_percent) {
            errors.push(format!(
                "{}: rollup rule minimumPercent {} outside [0,1]",
                path, rule.minimum_percent
            ));
        }
    }

    if sequencing.randomization.select_count == Some(0) {
        errors.push(format!("{}: selectCount must be > 0", path));
    }

    for child in &activity.children {
        let child_path = format!("{}/{}", path, child.id);
        validate_activity(child, seen, errors, &child_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::definition::ObjectiveDescription;
    use crate::test_support::{cluster, leaf};

    #[test]
    fn valid_tree_has_no_errors() {
        let root = cluster("root", vec![leaf("a"), cluster("m", vec![leaf("b")])]);
        assert!(validate_invariants(&root).is_empty());
    }

    #[test]
    fn reports_duplicate_ids() {
        let root = cluster("root", vec![leaf("a"), leaf("a")]);
        let errors = validate_invariants(&root);
        assert_eq!(errors, vec!["duplicate id 'a' at root/a".to_string()]);
    }

    /// A cluster carrying a resource would be both launchable and a container.
    #[test]
    fn reports_cluster_with_resource() {
        let mut root = cluster("root", vec![leaf("a")]);
        root.resource_id = Some("res".to_string());
        let errors = validate_invariants(&root);
        assert!(errors.iter().any(|err| err.contains("must not reference a resource")));
    }

    #[test]
    fn reports_out_of_range_values() {
        let mut a = leaf("a");
        a.sequencing.rollup.objective_measure_weight = 2.0;
        let mut objective = ObjectiveDescription::new("o");
        objective.min_normalized_measure = -3.0;
        a.sequencing.objectives = vec![objective.clone(), objective];
        let errors = validate_invariants(&cluster("root", vec![a]));
        assert!(errors.iter().any(|err| err.contains("objectiveMeasureWeight")));
        assert!(errors.iter().any(|err| err.contains("minNormalizedMeasure")));
        assert!(errors.iter().any(|err| err.contains("duplicate objective id 'o'")));
    }
}
