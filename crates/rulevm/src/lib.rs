//! Rulevm crate - condition compiler and stack VM for marker generation
//!
//! Rule conditions are authored as visual boolean graphs. This crate
//! compiles such a graph to linear postfix bytecode once at authoring time,
//! and executes the bytecode in a tiny stack machine at generation time,
//! calling out to a pluggable [`VmApi`] for the two spatial queries
//! (marker-exists, scripted condition).
//!
//! # Example
//!
//! ```rust
//! use rulevm::{compile_condition, run, NodeKind, RuleGraph, RuleProgram, VmApi};
//!
//! struct Api;
//!
//! impl VmApi for Api {
//!     fn marker_exists(&mut self, marker_name: &str) -> bool {
//!         marker_name == "Wall"
//!     }
//!
//!     fn condition_script(&mut self, _script_class: &str) -> bool {
//!         false
//!     }
//! }
//!
//! let mut graph = RuleGraph::new();
//! let result = graph.add_node(NodeKind::Result);
//! let wall = graph.add_node(NodeKind::MarkerExists {
//!     marker_name: "Wall".to_string(),
//! });
//! graph.connect(wall, result, 0);
//!
//! let mut program = RuleProgram::default();
//! compile_condition(&graph, &mut program);
//! assert!(program.compiled);
//! assert_eq!(run(&program, &mut Api), Ok(true));
//! ```

mod actions;
mod compiler;
mod error;
mod graph;
mod opcode;
mod program;
mod vm;

pub use actions::{compile_actions, ActionInfo, ActionList};
pub use compiler::compile_condition;
pub use error::{Error, Result};
pub use graph::{GraphLink, GraphNode, NodeId, NodeKind, RuleGraph};
pub use opcode::{bool_to_int, int_to_bool, Instruction, OpCode};
pub use program::RuleProgram;
pub use vm::{run, VmApi};
