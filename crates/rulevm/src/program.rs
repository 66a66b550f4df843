//! Compiled condition programs

use crate::opcode::{bool_to_int, Instruction, OpCode};
use serde::{Deserialize, Serialize};

/// A condition graph compiled down to bytecode, ready to run in the VM.
///
/// Programs are immutable once compiled. `compiled == false` marks the
/// fallback "always false" program emitted when compilation fails (cyclic
/// graph, missing result node); the fallback still runs successfully in the
/// VM and evaluates to false, so a broken rule degrades to "never matches"
/// instead of aborting a generation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleProgram {
    /// Linear instruction stream; the final instruction is always `Halt`
    pub instructions: Vec<Instruction>,

    /// String constants referenced by `Push`ed indices
    pub string_table: Vec<String>,

    /// Whether compilation succeeded
    pub compiled: bool,
}

impl RuleProgram {
    /// The fallback program: pushes `false` and halts, `compiled = false`.
    pub fn fallback_false() -> Self {
        RuleProgram {
            instructions: vec![
                Instruction::new(OpCode::Push, bool_to_int(false)),
                Instruction::HALT,
            ],
            string_table: Vec::new(),
            compiled: false,
        }
    }

    /// Check if the program has any instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
