//! Live activity tree: an arena of activities with an id index.
//!
//! The tree exclusively owns every activity. Parent links, the current
//! activity and the suspended activity are all expressed as [`ActivityIdx`]
//! handles (or string ids at the API boundary), never as owning pointers.
//! Arena order is depth-first pre-order because nodes are inserted parent
//! first.

use std::collections::HashMap;

use thiserror::Error;

use crate::core::activity::{Activity, TrackingInfo};
use crate::core::definition::SequencingDefinition;
use crate::core::invariants::validate_invariants;

/// Handle to an activity inside one [`ActivityTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivityIdx(usize);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("activity tree invariants failed: {}", .0.join("; "))]
    Invariants(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityNode {
    pub id: String,
    pub title: String,
    pub resource_id: Option<String>,
    pub launch_url: Option<String>,
    pub is_visible: bool,
    pub sequencing: SequencingDefinition,
    pub tracking: TrackingInfo,
    parent: Option<ActivityIdx>,
    children: Vec<ActivityIdx>,
}

impl ActivityNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// A leaf bound to a content resource.
    pub fn is_launchable(&self) -> bool {
        self.is_leaf() && self.resource_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityTree {
    nodes: Vec<ActivityNode>,
    index: HashMap<String, ActivityIdx>,
}

impl ActivityTree {
    /// Validate invariants and build the arena from a static tree.
    pub fn build(root: Activity) -> Result<Self, TreeError> {
        let errors = validate_invariants(&root);
        if !errors.is_empty() {
            return Err(TreeError::Invariants(errors));
        }
        let mut tree = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        };
        tree.insert(root, None);
        Ok(tree)
    }

    fn insert(&mut self, activity: Activity, parent: Option<ActivityIdx>) -> ActivityIdx {
        let idx = ActivityIdx(self.nodes.len());
        self.index.insert(activity.id.clone(), idx);
        self.nodes.push(ActivityNode {
            id: activity.id,
            title: activity.title,
            resource_id: activity.resource_id,
            launch_url: activity.launch_url,
            is_visible: activity.is_visible,
            sequencing: activity.sequencing,
            tracking: TrackingInfo::default(),
            parent,
            children: Vec::new(),
        });
        for child in activity.children {
            let child_idx = self.insert(child, Some(idx));
            self.nodes[idx.0].children.push(child_idx);
        }
        idx
    }

    /// Rebuild the static shape (definitions only, no tracking).
    pub fn to_activity(&self) -> Activity {
        self.to_activity_from(self.root())
    }

    fn to_activity_from(&self, idx: ActivityIdx) -> Activity {
        let node = self.node(idx);
        Activity {
            id: node.id.clone(),
            title: node.title.clone(),
            resource_id: node.resource_id.clone(),
            launch_url: node.launch_url.clone(),
            is_visible: node.is_visible,
            sequencing: node.sequencing.clone(),
            children: node
                .children
                .iter()
                .map(|child| self.to_activity_from(*child))
                .collect(),
        }
    }

    pub fn root(&self) -> ActivityIdx {
        ActivityIdx(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: ActivityIdx) -> &ActivityNode {
        &self.nodes[idx.0]
    }

    pub fn node_mut(&mut self, idx: ActivityIdx) -> &mut ActivityNode {
        &mut self.nodes[idx.0]
    }

    pub fn id(&self, idx: ActivityIdx) -> &str {
        &self.nodes[idx.0].id
    }

    pub fn find(&self, id: &str) -> Option<ActivityIdx> {
        self.index.get(id).copied()
    }

    pub fn parent(&self, idx: ActivityIdx) -> Option<ActivityIdx> {
        self.nodes[idx.0].parent
    }

    pub fn children(&self, idx: ActivityIdx) -> &[ActivityIdx] {
        &self.nodes[idx.0].children
    }

    pub fn is_leaf(&self, idx: ActivityIdx) -> bool {
        self.nodes[idx.0].is_leaf()
    }

    /// Children in delivery order: the randomized selection if one was
    /// applied for the current attempt, otherwise declaration order.
    pub fn available_children(&self, idx: ActivityIdx) -> Vec<ActivityIdx> {
        let node = &self.nodes[idx.0];
        match &node.tracking.available_children {
            Some(ids) => ids.iter().filter_map(|id| self.find(id)).collect(),
            None => node.children.clone(),
        }
    }

    /// All activities in depth-first pre-order.
    pub fn preorder(&self) -> impl Iterator<Item = ActivityIdx> + '_ {
        (0..self.nodes.len()).map(ActivityIdx)
    }

    /// Launchable leaves in depth-first order.
    pub fn leaves(&self) -> Vec<ActivityIdx> {
        self.preorder()
            .filter(|idx| self.node(*idx).is_launchable())
            .collect()
    }

    /// Activities from the root down to `idx`, inclusive.
    pub fn path_from_root(&self, idx: ActivityIdx) -> Vec<ActivityIdx> {
        let mut path = self.ancestors(idx);
        path.reverse();
        path
    }

    /// `idx` followed by each ancestor up to the root.
    pub fn ancestors(&self, idx: ActivityIdx) -> Vec<ActivityIdx> {
        let mut chain = vec![idx];
        let mut cursor = idx;
        while let Some(parent) = self.parent(cursor) {
            chain.push(parent);
            cursor = parent;
        }
        chain
    }

    /// True when `ancestor` is `idx` or lies on its path to the root.
    pub fn is_ancestor_of(&self, ancestor: ActivityIdx, idx: ActivityIdx) -> bool {
        self.ancestors(idx).contains(&ancestor)
    }

    /// Deepest activity that is an ancestor of (or equal to) both inputs.
    pub fn common_ancestor(&self, a: ActivityIdx, b: ActivityIdx) -> ActivityIdx {
        let chain_b = self.ancestors(b);
        self.ancestors(a)
            .into_iter()
            .find(|candidate| chain_b.contains(candidate))
            .unwrap_or_else(|| self.root())
    }

    /// `idx` and all of its descendants in pre-order.
    pub fn subtree(&self, idx: ActivityIdx) -> Vec<ActivityIdx> {
        let mut out = vec![idx];
        for child in self.children(idx) {
            out.extend(self.subtree(*child));
        }
        out
    }

    /// `/`-separated id path from the root to `idx`.
    pub fn path_string(&self, idx: ActivityIdx) -> String {
        self.path_from_root(idx)
            .iter()
            .map(|step| self.id(*step))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Reset every activity's tracking record.
    pub fn clear_tracking(&mut self) {
        for node in &mut self.nodes {
            node.tracking = TrackingInfo::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cluster, leaf};

    fn sample() -> ActivityTree {
        ActivityTree::build(cluster(
            "root",
            vec![
                cluster("m1", vec![leaf("a"), leaf("b")]),
                cluster("m2", vec![leaf("c")]),
            ],
        ))
        .expect("build")
    }

    #[test]
    fn arena_is_preorder() {
        let tree = sample();
        let ids: Vec<&str> = tree.preorder().map(|idx| tree.id(idx)).collect();
        assert_eq!(ids, vec!["root", "m1", "a", "b", "m2", "c"]);
    }

    #[test]
    fn leaves_and_paths() {
        let tree = sample();
        let leaves: Vec<&str> = tree.leaves().into_iter().map(|idx| tree.id(idx)).collect();
        assert_eq!(leaves, vec!["a", "b", "c"]);

        let b = tree.find("b").expect("b");
        assert_eq!(tree.path_string(b), "root/m1/b");
        assert_eq!(tree.parent(b), tree.find("m1"));
    }

    #[test]
    fn common_ancestor_of_cousins_is_root() {
        let tree = sample();
        let a = tree.find("a").expect("a");
        let b = tree.find("b").expect("b");
        let c = tree.find("c").expect("c");
        assert_eq!(tree.common_ancestor(a, b), tree.find("m1").expect("m1"));
        assert_eq!(tree.common_ancestor(a, c), tree.root());
        assert!(tree.is_ancestor_of(tree.root(), c));
        assert!(!tree.is_ancestor_of(a, c));
    }

    /// Building then flattening reproduces the static definition exactly.
    #[test]
    fn to_activity_round_trips() {
        let source = cluster("root", vec![cluster("m1", vec![leaf("a")]), leaf("b")]);
        let tree = ActivityTree::build(source.clone()).expect("build");
        assert_eq!(tree.to_activity(), source);
    }

    #[test]
    fn build_rejects_duplicate_ids() {
        let err = ActivityTree::build(cluster("root", vec![leaf("x"), leaf("x")]))
            .expect_err("duplicate ids");
        assert!(err.to_string().contains("duplicate id 'x'"));
    }

    #[test]
    fn available_children_follow_tracking_order() {
        let mut tree = sample();
        let root = tree.root();
        tree.node_mut(root).tracking.available_children =
            Some(vec!["m2".to_string(), "m1".to_string()]);
        let ids: Vec<&str> = tree
            .available_children(root)
            .into_iter()
            .map(|idx| tree.id(idx))
            .collect();
        assert_eq!(ids, vec!["m2", "m1"]);
    }
}
