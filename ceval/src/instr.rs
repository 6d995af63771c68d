//! The stack machine's instruction set (spec.md §4.6). Grounded on the
//! teacher's `Instruction<M>` enum in `crates/core/src/ast.rs`, generalized
//! from a register machine's operand shapes to a pure stack machine's.

use std::fmt::{self, Display, Formatter};

/// A single bytecode operation. `Jump`/`JumpIfTrue`/`JumpIfFalse` carry an
/// address that starts life as a label index and is rewritten to an
/// absolute instruction address by
/// [ProgramBuilder::finish_expr](crate::builder::ProgramBuilder::finish_expr).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Op {
    PushNumber(f64),
    PushString(usize),
    PushBool(bool),
    /// Pop `n` cells (top-of-stack is the last element) and push one array.
    PushArray(usize),
    LoadConst(usize),
    LoadInput(usize),
    Duplicate,

    Add,
    Sub,
    Mul,
    Div,

    CmpLT,
    CmpLE,
    CmpGT,
    CmpGE,

    CmpEqNumber,
    CmpEqString,
    CmpEqBool,
    CmpEqArrayNumber,
    CmpEqArrayString,
    CmpEqArrayBool,

    And,
    Or,
    Negate,

    InArrayNumber,
    InArrayString,

    /// Address starts as a label index, ends as an absolute address.
    Jump(i64),
    JumpIfTrue(i64),
    JumpIfFalse(i64),

    Call(usize),

    Return,
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One instruction plus the label index it targets, before back-patching.
/// Non-jump instructions store their operand directly in [Op]; this extra
/// layer exists only so the builder can find "this instruction's jump
/// target" without matching on every jump variant by hand.
pub type Instruction = Op;
