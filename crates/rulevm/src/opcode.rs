//! Bytecode instruction set for compiled condition programs

use serde::{Deserialize, Serialize};

/// Opcodes understood by the rule virtual machine.
///
/// The numeric values are part of the persisted program format and must
/// never change: programs are compiled once at authoring time and executed
/// repeatedly at generation time, potentially across process boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpCode {
    /// Does nothing
    NoOp,

    /// Push `arg0` onto the stack
    Push,

    /// Pop two values, push their logical AND
    And,

    /// Pop two values, push their logical OR
    Or,

    /// Pop one value, push its logical NOT
    Not,

    /// Pop a string-table index, query the API for a marker with that name
    MarkerExists,

    /// Pop a string-table index, invoke the named scripted condition
    ConditionScript,

    /// Terminate execution; mandatory final instruction of every program
    Halt,
}

impl OpCode {
    /// Wire value of this opcode in the persisted instruction stream.
    pub fn as_i32(self) -> i32 {
        match self {
            OpCode::NoOp => 0,
            OpCode::Push => 10,
            OpCode::And => 100,
            OpCode::Or => 101,
            OpCode::Not => 102,
            OpCode::MarkerExists => 200,
            OpCode::ConditionScript => 201,
            OpCode::Halt => 1000,
        }
    }

    /// Decode a wire value. Returns `None` for unknown opcodes; the VM
    /// treats those as `NoOp` rather than aborting.
    pub fn from_i32(value: i32) -> Option<OpCode> {
        match value {
            0 => Some(OpCode::NoOp),
            10 => Some(OpCode::Push),
            100 => Some(OpCode::And),
            101 => Some(OpCode::Or),
            102 => Some(OpCode::Not),
            200 => Some(OpCode::MarkerExists),
            201 => Some(OpCode::ConditionScript),
            1000 => Some(OpCode::Halt),
            _ => None,
        }
    }
}

/// A single bytecode instruction.
///
/// The opcode is stored as its raw wire value so serialized programs
/// round-trip bit-exact even if they contain opcodes this build does not
/// know about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Wire value of the opcode (see [`OpCode::as_i32`])
    pub opcode: i32,

    /// First operand; a boolean literal or string-table index for `Push`
    pub arg0: i32,

    /// Second operand; reserved, always 0 in programs compiled today
    pub arg1: i32,
}

impl Instruction {
    /// An instruction that does nothing
    pub const NOOP: Instruction = Instruction {
        opcode: 0,
        arg0: 0,
        arg1: 0,
    };

    /// An instruction that halts the program
    pub const HALT: Instruction = Instruction {
        opcode: 1000,
        arg0: 0,
        arg1: 0,
    };

    /// Create an instruction with a single operand
    pub fn new(opcode: OpCode, arg0: i32) -> Self {
        Instruction {
            opcode: opcode.as_i32(),
            arg0,
            arg1: 0,
        }
    }

    /// Create an instruction with no operands
    pub fn op(opcode: OpCode) -> Self {
        Instruction::new(opcode, 0)
    }

    /// Decode the opcode, if it is one this build understands
    pub fn decode(&self) -> Option<OpCode> {
        OpCode::from_i32(self.opcode)
    }
}

/// Convert a boolean to its stack representation.
pub fn bool_to_int(value: bool) -> i32 {
    if value {
        1
    } else {
        0
    }
}

/// Interpret a stack value as a boolean (nonzero = true).
pub fn int_to_bool(value: i32) -> bool {
    value != 0
}
