//! Error types for the rulevm crate

use thiserror::Error;

/// Result type alias for VM execution
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while executing a compiled program.
///
/// These are all non-fatal at the system level: the processor maps any
/// execution error to "this rule evaluated to false" and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The program has no instructions
    #[error("Program is empty")]
    EmptyProgram,

    /// An operation popped from an empty stack
    #[error("Invalid stack state: pop from empty stack")]
    StackUnderflow,

    /// A string operation referenced an index outside the string table
    #[error("Invalid string table index: {0}")]
    StringIndex(i32),

    /// The program halted with no result on the stack
    #[error("Program halted with an empty stack")]
    NoResult,

    /// The program halted with leftover values on the stack
    #[error("Program halted with {0} values on the stack, expected 1")]
    Unbalanced(usize),
}
