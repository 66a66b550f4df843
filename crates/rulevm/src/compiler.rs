//! Condition graph compiler
//!
//! Walks the boolean condition graph backwards from the result node and
//! emits postfix bytecode: operands are generated before the operator that
//! consumes them, so the VM only ever needs a value stack.

use crate::graph::{NodeId, NodeKind, RuleGraph};
use crate::opcode::{bool_to_int, Instruction, OpCode};
use crate::program::RuleProgram;
use std::collections::{HashMap, HashSet};

/// Compile a rule graph's condition DAG into `program`.
///
/// On success `program.compiled` is true. A missing result node or a cyclic
/// graph degrades to the fallback "always false" program with
/// `program.compiled = false`; compilation failures never propagate as
/// errors because authoring tools surface the flag instead.
pub fn compile_condition(graph: &RuleGraph, program: &mut RuleProgram) {
    let mut compiler = ConditionCompiler {
        graph,
        incoming: graph.incoming_map(),
        instructions: Vec::new(),
        string_table: Vec::new(),
        visited: HashSet::new(),
    };

    let Some(result_node) = graph.result_node else {
        *program = RuleProgram::fallback_false();
        return;
    };

    if compiler.emit_node(result_node) {
        program.instructions = compiler.instructions;
        program.string_table = compiler.string_table;
        program.compiled = true;
    } else {
        *program = RuleProgram::fallback_false();
    }
}

struct ConditionCompiler<'a> {
    graph: &'a RuleGraph,
    incoming: HashMap<(NodeId, usize), NodeId>,
    instructions: Vec<Instruction>,
    string_table: Vec<String>,
    visited: HashSet<NodeId>,
}

impl ConditionCompiler<'_> {
    /// Emit instructions for `id` and, post-order, everything feeding it.
    /// Returns false when a cycle is detected.
    fn emit_node(&mut self, id: NodeId) -> bool {
        if !self.visited.insert(id) {
            // Already on the current traversal path: true cycle
            return false;
        }

        let Some(node) = self.graph.node(id) else {
            self.visited.remove(&id);
            return false;
        };

        // Operands first: either the linked source subtree or the pin's
        // default literal when the pin is unconnected
        for pin in 0..node.kind.input_count() {
            if let Some(&source) = self.incoming.get(&(id, pin)) {
                if !self.emit_node(source) {
                    return false;
                }
            } else {
                let default = node.input_defaults.get(pin).copied().unwrap_or(false);
                self.push(Instruction::new(OpCode::Push, bool_to_int(default)));
            }
        }

        match &node.kind {
            NodeKind::MarkerExists { marker_name } => {
                let index = self.intern(marker_name);
                self.push(Instruction::new(OpCode::Push, index));
                self.push(Instruction::op(OpCode::MarkerExists));
            }
            NodeKind::ConditionScript { script_class } => {
                let index = self.intern(script_class);
                self.push(Instruction::new(OpCode::Push, index));
                self.push(Instruction::op(OpCode::ConditionScript));
            }
            NodeKind::And => self.push(Instruction::op(OpCode::And)),
            NodeKind::Or => self.push(Instruction::op(OpCode::Or)),
            NodeKind::Not => self.push(Instruction::op(OpCode::Not)),
            NodeKind::Result => self.push(Instruction::HALT),
            other => {
                tracing::warn!(?other, "unsupported node kind in condition graph");
                self.push(Instruction::NOOP);
            }
        }

        // Pop from the path set so independent branches may revisit shared
        // subtrees (a diamond is legal, a cycle is not)
        self.visited.remove(&id);
        true
    }

    fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Append `value` to the string table. Duplicates are allowed; the
    /// table is tiny and dedup would change persisted indices.
    fn intern(&mut self, value: &str) -> i32 {
        self.string_table.push(value.to_string());
        (self.string_table.len() - 1) as i32
    }
}
