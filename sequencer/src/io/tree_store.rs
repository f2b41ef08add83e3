//! Activity tree load/save helpers with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::activity::Activity;
use crate::core::invariants::validate_invariants;
use crate::core::tree::ActivityTree;

/// JSON Schema every serialized activity tree must satisfy.
pub const TREE_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/activity_tree/v1.schema.json"
));

/// Load and validate a static tree from disk (schema + invariants).
pub fn load_tree(tree_path: &Path) -> Result<Activity> {
    let tree_contents = fs::read_to_string(tree_path)
        .with_context(|| format!("read tree {}", tree_path.display()))?;
    parse_tree(&tree_contents).with_context(|| format!("load tree {}", tree_path.display()))
}

/// Load a tree and build its arena, ready for an engine.
pub fn load_activity_tree(tree_path: &Path) -> Result<ActivityTree> {
    let root = load_tree(tree_path)?;
    let tree = ActivityTree::build(root)?;
    debug!(path = %tree_path.display(), activities = tree.len(), "loaded activity tree");
    Ok(tree)
}

/// Parse and validate tree JSON: schema conformance + semantic invariants.
pub fn parse_tree(raw: &str) -> Result<Activity> {
    let tree_value: Value = serde_json::from_str(raw).context("parse tree json")?;
    validate_schema(&tree_value)?;
    let tree: Activity = serde_json::from_value(tree_value).context("deserialize tree")?;
    validate_tree_invariants(&tree)?;
    Ok(tree)
}

/// Write a static tree as pretty JSON with a trailing newline.
pub fn write_tree(tree_path: &Path, tree: &Activity) -> Result<()> {
    validate_tree_invariants(tree)?;
    let mut buf = serde_json::to_string_pretty(tree).context("serialize tree")?;
    buf.push('\n');
    super::write_atomic(tree_path, &buf)
}

fn validate_schema(tree: &Value) -> Result<()> {
    let schema_value: Value = serde_json::from_str(TREE_SCHEMA).context("parse tree schema")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(tree) {
        let messages = compiled
            .iter_errors(tree)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "tree schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn validate_tree_invariants(tree: &Activity) -> Result<()> {
    let errors = validate_invariants(tree);
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow!("tree invariants failed: {}", errors.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::activity::default_activity;
    use crate::core::definition::{ConditionKind, RuleAction, RuleCondition};
    use crate::test_support::{flow_cluster, leaf, rule};

    /// Sequencing definitions survive a write → load round trip unchanged.
    #[test]
    fn load_and_write_tree_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree_path = temp.path().join("tree.json");

        let mut quiz = leaf("quiz");
        quiz.sequencing.rules.pre_condition.push(rule(
            vec![RuleCondition::new(ConditionKind::Satisfied)],
            RuleAction::Skip,
        ));
        quiz.sequencing.limit_conditions.attempt_limit = Some(2);
        let root = flow_cluster("course", vec![leaf("intro"), quiz]);

        write_tree(&tree_path, &root).expect("write tree");
        let loaded = load_tree(&tree_path).expect("load tree");
        assert_eq!(loaded, root);
    }

    #[test]
    fn default_activity_passes_schema() {
        let raw = serde_json::to_string(&default_activity()).expect("serialize");
        let tree = parse_tree(&raw).expect("parse");
        assert_eq!(tree.id, "course");
    }

    #[test]
    fn schema_rejects_unknown_fields() {
        let raw = r#"{"id":"root","title":"Root","passes":true}"#;
        let err = parse_tree(raw).expect_err("unknown field");
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn invariants_reject_duplicate_ids() {
        let raw = r#"{"id":"root","title":"Root","children":[
            {"id":"a","title":"A","resourceId":"r1"},
            {"id":"a","title":"A again","resourceId":"r2"}
        ]}"#;
        let err = parse_tree(raw).expect_err("duplicate ids");
        assert!(format!("{err:#}").contains("duplicate id 'a'"));
    }
}
