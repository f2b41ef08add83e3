//! Flow subprocess: walk the tree in declaration order to find a deliverable leaf.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::core::definition::RandomizationTiming;
use crate::core::exceptions::SequencingException;
use crate::core::rules::{FLOW_SKIP_ACTIONS, is_disabled, pre_condition_check};
use crate::core::state::GlobalStateInfo;
use crate::core::tree::ActivityIdx;
use crate::core::types::Direction;

/// Flow from `start` in `direction` until a deliverable leaf is found.
///
/// With `enter_start` the search first descends into `start` itself;
/// otherwise it begins at the next sibling in `direction`.
pub fn flow(
    state: &mut GlobalStateInfo,
    rng: &mut StdRng,
    start: ActivityIdx,
    direction: Direction,
    enter_start: bool,
) -> Result<ActivityIdx, SequencingException> {
    let mut cursor = start;
    let mut enter = enter_start;
    loop {
        if enter && let Some(found) = descend(state, rng, cursor, direction)? {
            return Ok(found);
        }
        cursor = next_sibling(state, cursor, direction)?;
        enter = true;
    }
}

/// First deliverable leaf inside `idx` in `direction`, if any.
///
/// Invisible activities and activities skipped or disabled by pre-condition
/// rules are passed over. A cluster that does not permit flow cannot be
/// entered and fails the whole traversal.
pub fn descend(
    state: &mut GlobalStateInfo,
    rng: &mut StdRng,
    idx: ActivityIdx,
    direction: Direction,
) -> Result<Option<ActivityIdx>, SequencingException> {
    let node = state.tree().node(idx);
    if !node.is_visible {
        return Ok(None);
    }
    if let Some(action) = pre_condition_check(state, idx, FLOW_SKIP_ACTIONS) {
        debug!(activity_id = %node.id, ?action, "flow passes over activity");
        return Ok(None);
    }
    if is_disabled(state, idx) {
        debug!(activity_id = %node.id, "flow passes over disabled activity");
        return Ok(None);
    }
    if node.is_leaf() {
        return Ok(node.is_launchable().then_some(idx));
    }
    let control = node.sequencing.control_mode.clone();
    if !control.flow {
        return Err(SequencingException::ClusterFlowNotEnabled);
    }

    prepare_children(state, rng, idx);
    let mut children = state.tree().available_children(idx);
    let child_direction = if control.forward_only {
        Direction::Forward
    } else {
        direction
    };
    if child_direction == Direction::Backward {
        children.reverse();
    }
    for child in children {
        if let Some(found) = descend(state, rng, child, child_direction)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// The sibling after (or before) `idx`, ascending through parents whose
/// children are exhausted.
fn next_sibling(
    state: &GlobalStateInfo,
    idx: ActivityIdx,
    direction: Direction,
) -> Result<ActivityIdx, SequencingException> {
    let tree = state.tree();
    let mut node = idx;
    loop {
        let Some(parent) = tree.parent(node) else {
            return Err(match direction {
                Direction::Forward => SequencingException::EndOfTree,
                Direction::Backward => SequencingException::BeginningOfTree,
            });
        };
        let control = &tree.node(parent).sequencing.control_mode;
        if !control.flow {
            return Err(SequencingException::ClusterFlowNotEnabled);
        }
        if direction == Direction::Backward && control.forward_only {
            return Err(SequencingException::FlowForwardOnly);
        }

        let siblings = tree.available_children(parent);
        let next = siblings
            .iter()
            .position(|sibling| *sibling == node)
            .and_then(|pos| match direction {
                Direction::Forward => siblings.get(pos + 1).copied(),
                Direction::Backward => pos.checked_sub(1).and_then(|prev| siblings.get(prev).copied()),
            });
        if let Some(next) = next {
            return Ok(next);
        }
        node = parent;
    }
}

/// Apply selection and randomization to the children of `idx` when its
/// randomization timing calls for it.
///
/// The resulting order is stored on the activity's tracking record so that it
/// survives suspend/resume.
pub fn prepare_children(state: &mut GlobalStateInfo, rng: &mut StdRng, idx: ActivityIdx) {
    let tree = state.tree();
    let node = tree.node(idx);
    if node.is_leaf() {
        return;
    }
    let controls = &node.sequencing.randomization;
    let due = match controls.randomization_timing {
        RandomizationTiming::Never => false,
        RandomizationTiming::Once => node.tracking.available_children.is_none(),
        RandomizationTiming::OnEachNewAttempt => !node.tracking.activity_is_active,
    };
    if !due || (!controls.reorder_children && controls.select_count.is_none()) {
        return;
    }

    let mut ids: Vec<String> = tree
        .children(idx)
        .iter()
        .map(|child| tree.id(*child).to_string())
        .collect();
    if controls.reorder_children {
        ids.shuffle(rng);
    }
    if let Some(count) = controls.select_count {
        ids.truncate(count);
    }
    debug!(activity_id = %node.id, children = ?ids, "randomized children");
    state.tree_mut().node_mut(idx).tracking.available_children = Some(ids);
}
