//! Rule graph arena
//!
//! A rule graph is authored as a visual node graph. Here it is represented
//! as an arena of nodes plus a pin-to-pin link table, so traversal visited
//! sets and serialization stay trivial and cycle-safe even when authoring
//! tools produce malformed (cyclic) graphs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle of a node within a [`RuleGraph`]
pub type NodeId = usize;

/// The closed set of node kinds a rule graph can contain.
///
/// Condition kinds feed the condition compiler; action kinds form the
/// execution chain walked by the action compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Logical AND of two boolean inputs
    And,

    /// Logical OR of two boolean inputs
    Or,

    /// Logical NOT of one boolean input
    Not,

    /// True if a marker with this name exists at the evaluated cell
    MarkerExists {
        /// Marker tag to look up
        marker_name: String,
    },

    /// Defer to a user-registered scripted condition
    ConditionScript {
        /// Registered script class name
        script_class: String,
    },

    /// The designated condition output ("should select?")
    Result,

    /// Head of the action execution chain, runs when the condition passes
    OnPass,

    /// Insert a marker at the evaluated cell
    AddMarker {
        /// Marker tag to insert
        marker_name: String,
        /// Copy rotation from the first existing marker matching these tags
        copy_rotation_from: Vec<String>,
        /// Copy height from the first existing marker matching these tags
        copy_height_from: Vec<String>,
    },

    /// Remove the first marker with this tag from the evaluated cell
    RemoveMarker {
        /// Marker tag to remove
        marker_name: String,
    },
}

impl NodeKind {
    /// Number of boolean input pins this node exposes
    pub fn input_count(&self) -> usize {
        match self {
            NodeKind::And | NodeKind::Or => 2,
            NodeKind::Not | NodeKind::Result => 1,
            _ => 0,
        }
    }

    /// Whether this kind participates in the action execution chain
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            NodeKind::OnPass | NodeKind::AddMarker { .. } | NodeKind::RemoveMarker { .. }
        )
    }
}

/// A node in the arena: its kind plus per-input-pin boolean defaults.
///
/// Defaults correspond to the checkbox shown on an unconnected pin in the
/// graph editor; the compiler pushes them as literals when no link feeds
/// the pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// What this node is
    pub kind: NodeKind,

    /// Default literal per input pin, used when the pin is unconnected
    pub input_defaults: Vec<bool>,
}

/// A directed link from a node's output to another node's input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    /// Source node (its single output pin)
    pub from: NodeId,

    /// Destination node
    pub to: NodeId,

    /// Input pin index on the destination node
    pub to_pin: usize,
}

/// An authored rule graph: one condition DAG rooted at `result_node` and
/// one action chain headed by `pass_node`, sharing the same arena.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleGraph {
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,

    /// The designated condition result node, if the graph has one
    pub result_node: Option<NodeId>,

    /// The designated action chain head, if the graph has one
    pub pass_node: Option<NodeId>,
}

impl RuleGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        RuleGraph::default()
    }

    /// Add a node to the arena and return its handle.
    ///
    /// The first `Result` node becomes the graph's result node and the
    /// first `OnPass` node becomes the action chain head. Pin defaults
    /// start as `true`, matching the editor's unconnected-pin default.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        let input_defaults = vec![true; kind.input_count()];
        if matches!(kind, NodeKind::Result) && self.result_node.is_none() {
            self.result_node = Some(id);
        }
        if matches!(kind, NodeKind::OnPass) && self.pass_node.is_none() {
            self.pass_node = Some(id);
        }
        self.nodes.push(GraphNode {
            kind,
            input_defaults,
        });
        id
    }

    /// Link `from`'s output to input pin `to_pin` of `to`.
    pub fn connect(&mut self, from: NodeId, to: NodeId, to_pin: usize) {
        self.links.push(GraphLink { from, to, to_pin });
    }

    /// Override the default literal of an unconnected input pin.
    pub fn set_input_default(&mut self, node: NodeId, pin: usize, value: bool) {
        if let Some(node) = self.nodes.get_mut(node) {
            if let Some(default) = node.input_defaults.get_mut(pin) {
                *default = value;
            }
        }
    }

    /// Look up a node by handle
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Number of nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All links, in insertion order
    pub fn links(&self) -> &[GraphLink] {
        &self.links
    }

    /// Build the incoming-link lookup used by the condition compiler:
    /// `(node, input pin) -> source node`. Later links to the same pin win,
    /// matching the original's last-write dictionary semantics.
    pub fn incoming_map(&self) -> HashMap<(NodeId, usize), NodeId> {
        let mut map = HashMap::new();
        for link in &self.links {
            map.insert((link.to, link.to_pin), link.from);
        }
        map
    }

    /// Build the outgoing-chain lookup used by the action compiler:
    /// `source node -> next node`.
    pub fn outgoing_map(&self) -> HashMap<NodeId, NodeId> {
        let mut map = HashMap::new();
        for link in &self.links {
            map.insert(link.from, link.to);
        }
        map
    }
}
