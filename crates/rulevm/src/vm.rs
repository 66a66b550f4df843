//! Stack virtual machine for compiled condition programs

use crate::error::{Error, Result};
use crate::opcode::{bool_to_int, int_to_bool, OpCode};
use crate::program::RuleProgram;

/// The capability surface a program can call out to.
///
/// An implementation is supplied per [`run`] invocation and never owned by
/// the VM; every run is independent and stateless across calls. Methods
/// take `&mut self` so implementations may maintain caches (e.g. the
/// per-batch script instance cache).
pub trait VmApi {
    /// True if a marker with this tag exists at the evaluated cell
    fn marker_exists(&mut self, marker_name: &str) -> bool;

    /// Evaluate the named scripted condition at the evaluated cell
    fn condition_script(&mut self, script_class: &str) -> bool;
}

/// Execute `program` against `api` and return its boolean result.
///
/// Instructions run sequentially from index 0 until `Halt` (or the end of
/// the stream). Binary operators pop the right-hand operand first:
/// `rhs = pop(); lhs = pop(); push(lhs OP rhs)` — unobservable for the
/// commutative AND/OR the compiler emits today. Unknown opcodes are skipped
/// like `NoOp` so newer programs degrade instead of aborting.
///
/// Any failure (empty program, stack underflow, bad string index, a final
/// stack that does not hold exactly one value) returns an error; callers
/// treat errors as "the condition did not pass".
pub fn run(program: &RuleProgram, api: &mut dyn VmApi) -> Result<bool> {
    if program.is_empty() {
        return Err(Error::EmptyProgram);
    }

    let mut stack: Vec<i32> = Vec::new();
    let mut index = 0usize;

    while index < program.instructions.len() {
        let instruction = program.instructions[index];
        match instruction.decode() {
            Some(OpCode::Halt) => break,
            Some(OpCode::Push) => stack.push(instruction.arg0),
            Some(OpCode::And) => {
                let rhs = pop(&mut stack)?;
                let lhs = pop(&mut stack)?;
                stack.push(bool_to_int(int_to_bool(lhs) && int_to_bool(rhs)));
            }
            Some(OpCode::Or) => {
                let rhs = pop(&mut stack)?;
                let lhs = pop(&mut stack)?;
                stack.push(bool_to_int(int_to_bool(lhs) || int_to_bool(rhs)));
            }
            Some(OpCode::Not) => {
                let value = pop(&mut stack)?;
                stack.push(bool_to_int(!int_to_bool(value)));
            }
            Some(OpCode::MarkerExists) => {
                let name = pop_string(program, &mut stack)?;
                stack.push(bool_to_int(api.marker_exists(name)));
            }
            Some(OpCode::ConditionScript) => {
                let class = pop_string(program, &mut stack)?;
                stack.push(bool_to_int(api.condition_script(class)));
            }
            Some(OpCode::NoOp) | None => {}
        }
        index += 1;
    }

    match stack.len() {
        1 => Ok(int_to_bool(stack[0])),
        0 => Err(Error::NoResult),
        n => Err(Error::Unbalanced(n)),
    }
}

fn pop(stack: &mut Vec<i32>) -> Result<i32> {
    stack.pop().ok_or(Error::StackUnderflow)
}

fn pop_string<'a>(program: &'a RuleProgram, stack: &mut Vec<i32>) -> Result<&'a str> {
    let index = pop(stack)?;
    usize::try_from(index)
        .ok()
        .and_then(|i| program.string_table.get(i))
        .map(String::as_str)
        .ok_or(Error::StringIndex(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Instruction;

    struct NullApi;

    impl VmApi for NullApi {
        fn marker_exists(&mut self, _marker_name: &str) -> bool {
            false
        }

        fn condition_script(&mut self, _script_class: &str) -> bool {
            false
        }
    }

    struct RecordingApi {
        marker_queries: Vec<String>,
        answer: bool,
    }

    impl VmApi for RecordingApi {
        fn marker_exists(&mut self, marker_name: &str) -> bool {
            self.marker_queries.push(marker_name.to_string());
            self.answer
        }

        fn condition_script(&mut self, _script_class: &str) -> bool {
            false
        }
    }

    fn program(instructions: Vec<Instruction>, strings: Vec<&str>) -> RuleProgram {
        RuleProgram {
            instructions,
            string_table: strings.into_iter().map(String::from).collect(),
            compiled: true,
        }
    }

    #[test]
    fn test_empty_program_fails() {
        let empty = RuleProgram::default();
        assert_eq!(run(&empty, &mut NullApi), Err(Error::EmptyProgram));
    }

    #[test]
    fn test_fallback_program_runs_false() {
        let fallback = RuleProgram::fallback_false();
        assert_eq!(run(&fallback, &mut NullApi), Ok(false));
    }

    #[test]
    fn test_push_halt() {
        let p = program(
            vec![Instruction::new(OpCode::Push, 1), Instruction::HALT],
            vec![],
        );
        assert_eq!(run(&p, &mut NullApi), Ok(true));
    }

    #[test]
    fn test_not_operator() {
        let p = program(
            vec![
                Instruction::new(OpCode::Push, 0),
                Instruction::op(OpCode::Not),
                Instruction::HALT,
            ],
            vec![],
        );
        assert_eq!(run(&p, &mut NullApi), Ok(true));
    }

    #[test]
    fn test_and_or_truth() {
        for (a, b, and, or) in [(0, 0, false, false), (1, 0, false, true), (1, 1, true, true)] {
            let p = program(
                vec![
                    Instruction::new(OpCode::Push, a),
                    Instruction::new(OpCode::Push, b),
                    Instruction::op(OpCode::And),
                    Instruction::HALT,
                ],
                vec![],
            );
            assert_eq!(run(&p, &mut NullApi), Ok(and));

            let p = program(
                vec![
                    Instruction::new(OpCode::Push, a),
                    Instruction::new(OpCode::Push, b),
                    Instruction::op(OpCode::Or),
                    Instruction::HALT,
                ],
                vec![],
            );
            assert_eq!(run(&p, &mut NullApi), Ok(or));
        }
    }

    #[test]
    fn test_marker_exists_resolves_string() {
        let p = program(
            vec![
                Instruction::new(OpCode::Push, 0),
                Instruction::op(OpCode::MarkerExists),
                Instruction::HALT,
            ],
            vec!["Wall"],
        );
        let mut api = RecordingApi {
            marker_queries: Vec::new(),
            answer: true,
        };
        assert_eq!(run(&p, &mut api), Ok(true));
        assert_eq!(api.marker_queries, vec!["Wall".to_string()]);
    }

    #[test]
    fn test_bad_string_index_fails() {
        let p = program(
            vec![
                Instruction::new(OpCode::Push, 5),
                Instruction::op(OpCode::MarkerExists),
                Instruction::HALT,
            ],
            vec!["Wall"],
        );
        assert_eq!(run(&p, &mut NullApi), Err(Error::StringIndex(5)));

        let p = program(
            vec![
                Instruction::new(OpCode::Push, -1),
                Instruction::op(OpCode::MarkerExists),
                Instruction::HALT,
            ],
            vec!["Wall"],
        );
        assert_eq!(run(&p, &mut NullApi), Err(Error::StringIndex(-1)));
    }

    #[test]
    fn test_stack_underflow_fails() {
        let p = program(
            vec![Instruction::op(OpCode::And), Instruction::HALT],
            vec![],
        );
        assert_eq!(run(&p, &mut NullApi), Err(Error::StackUnderflow));
    }

    #[test]
    fn test_halt_with_empty_stack_fails() {
        let p = program(vec![Instruction::HALT], vec![]);
        assert_eq!(run(&p, &mut NullApi), Err(Error::NoResult));
    }

    #[test]
    fn test_halt_with_leftovers_fails() {
        let p = program(
            vec![
                Instruction::new(OpCode::Push, 1),
                Instruction::new(OpCode::Push, 1),
                Instruction::HALT,
            ],
            vec![],
        );
        assert_eq!(run(&p, &mut NullApi), Err(Error::Unbalanced(2)));
    }

    #[test]
    fn test_unknown_opcode_is_skipped() {
        let p = program(
            vec![
                Instruction {
                    opcode: 777,
                    arg0: 0,
                    arg1: 0,
                },
                Instruction::new(OpCode::Push, 1),
                Instruction::HALT,
            ],
            vec![],
        );
        assert_eq!(run(&p, &mut NullApi), Ok(true));
    }

    #[test]
    fn test_missing_halt_runs_off_the_end() {
        // Not a legal compiler output, but the VM must not panic
        let p = program(vec![Instruction::new(OpCode::Push, 1)], vec![]);
        assert_eq!(run(&p, &mut NullApi), Ok(true));
    }
}
