//! Tunable resource ceilings a host can apply to compilation and execution.
//! Plays the same role as the teacher's `MAX_CYCLE_COUNT` constant: not a
//! strategic restriction on well-behaved expressions, just a backstop
//! against pathological ones (a huge array literal, runaway stack growth
//! from a deeply nested expression) eating unbounded host memory.

use crate::consts::{DEFAULT_MAX_INSTRUCTIONS, DEFAULT_MAX_STACK_DEPTH, INITIAL_STACK_CAPACITY};

/// Resource ceilings applied by [Compiler](crate::Compiler) and
/// [Runtime](crate::machine::Runtime). The defaults are generous enough
/// that no expression a human would hand-author can hit them; they exist
/// for hosts embedding `ceval` with untrusted or generated source text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Capacity reserved up front for a [Runtime](crate::machine::Runtime)'s
    /// evaluation stack.
    pub initial_stack_capacity: usize,
    /// Evaluation stack depth a single `Run` call may reach before
    /// aborting with [RuntimeError::StackOverflow](crate::error::RuntimeError::StackOverflow).
    pub max_stack_depth: usize,
    /// Instructions a single compiled expression may emit before `Compile`
    /// aborts with [CompileError::TooLarge](crate::error::CompileError::TooLarge).
    pub max_instructions: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            initial_stack_capacity: INITIAL_STACK_CAPACITY,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_generous_but_finite() {
        let limits = Limits::default();
        assert!(limits.max_stack_depth > INITIAL_STACK_CAPACITY);
        assert!(limits.max_instructions > 0);
    }
}
