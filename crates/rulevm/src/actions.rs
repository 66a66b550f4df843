//! Action compiler
//!
//! The action side of a rule graph is a singly-linked execution chain
//! hanging off the pass node. Compilation converts each action node into an
//! immutable [`ActionInfo`] value so the compiled output is fully decoupled
//! from the live graph.

use crate::graph::{NodeKind, RuleGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A compiled, immutable action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionInfo {
    /// Insert a marker at the rule's cell
    AddMarker {
        /// Marker tag to insert
        marker_name: String,
        /// Copy rotation from the first existing marker matching these tags
        copy_rotation_from: Vec<String>,
        /// Copy height from the first existing marker matching these tags
        copy_height_from: Vec<String>,
    },

    /// Remove the first marker with this tag from the rule's cell
    RemoveMarker {
        /// Marker tag to remove
        marker_name: String,
    },
}

/// Ordered list of compiled actions for one rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionList {
    /// Actions in execution-chain order
    pub actions: Vec<ActionInfo>,

    /// Hint: true when any action inserts a marker. Downstream uses this to
    /// infer "an asset will be placed here" when the author did not set the
    /// flag explicitly.
    pub emits_marker: bool,
}

impl ActionList {
    /// Create an empty action list
    pub fn new() -> Self {
        ActionList::default()
    }

    /// Check if the list has no actions
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Compile the action chain of `graph` into an [`ActionList`].
///
/// Follows output-to-input links from the pass node, stopping at a dead end
/// or at an already-visited node (the cycle guard for malformed graphs).
/// A graph without a pass node compiles to an empty list.
pub fn compile_actions(graph: &RuleGraph) -> ActionList {
    let mut list = ActionList::new();

    let Some(pass_node) = graph.pass_node else {
        return list;
    };

    let outgoing = graph.outgoing_map();
    let mut visited: HashSet<usize> = HashSet::new();
    let mut current = outgoing.get(&pass_node).copied();

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        match graph.node(id).map(|n| &n.kind) {
            Some(NodeKind::AddMarker {
                marker_name,
                copy_rotation_from,
                copy_height_from,
            }) => {
                list.actions.push(ActionInfo::AddMarker {
                    marker_name: marker_name.clone(),
                    copy_rotation_from: copy_rotation_from.clone(),
                    copy_height_from: copy_height_from.clone(),
                });
            }
            Some(NodeKind::RemoveMarker { marker_name }) => {
                list.actions.push(ActionInfo::RemoveMarker {
                    marker_name: marker_name.clone(),
                });
            }
            // Non-action nodes linked into the chain contribute nothing
            _ => {}
        }
        current = outgoing.get(&id).copied();
    }

    list.emits_marker = list
        .actions
        .iter()
        .any(|a| matches!(a, ActionInfo::AddMarker { .. }));
    list
}
