//! Accumulates constants, interned strings, input slots, and per-expression
//! instruction streams, and manages labels with back-patching (spec.md §3
//! "Program builder", §4.6 "Labels"). Grounded on
//! `original_source/expr/runtime/builder.go`'s `Builder`, preferred here
//! over the teacher's own `delabel.rs` pass: the teacher resolves labels to
//! *relative* offsets in a post-parse pass over the whole program, while
//! spec.md calls for labels back-patched to *absolute* addresses at the end
//! of each expression — the shape `original_source` already uses. See
//! DESIGN.md for this choice.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::BinOp;
use crate::consts::{INTERNAL_IN_NUMBER_ARRAY, INTERNAL_IN_STRING_ARRAY};
use crate::context::Context;
use crate::instr::Op;
use crate::types::{PrimitiveType, Type};
use crate::value::Value;

/// A symbolic jump target created by [ProgramBuilder::create_label] and
/// resolved to an absolute instruction address by
/// [ProgramBuilder::finish_expr] (spec.md §4.6 "Labels").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug)]
struct LabelSlot {
    addr: Option<usize>,
}

/// One compiled top-level expression: a flat instruction stream ending in
/// `Return` (spec.md glossary "Expression").
pub type CompiledExpr = Vec<Op>;

/// An immutable compiled program (spec.md §3 "Program"). Read-only after
/// [ProgramBuilder::build]; safe to share across threads and evaluate
/// concurrently from separate [Runtime](crate::machine::Runtime) instances.
#[derive(Debug)]
pub struct Program {
    pub(crate) result_type: Type,
    pub(crate) exprs: Vec<CompiledExpr>,
    pub(crate) consts: Vec<Value>,
    pub(crate) strings: Vec<String>,
    pub(crate) input_types: Vec<Type>,
}

impl Program {
    /// The result type shared by every top-level expression (spec.md I4).
    pub fn result_type(&self) -> &Type {
        &self.result_type
    }

    /// How many `;`-separated top-level expressions this program holds.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// The declared type of each input slot, in registration order.
    pub fn input_types(&self) -> &[Type] {
        &self.input_types
    }

    /// Render the `expr_index`-th compiled expression as one instruction
    /// per line, each prefixed with its absolute address. Takes the place
    /// of the external AST-dump/Graphviz utility (spec.md §6) for hosts
    /// that just want something to print in a debugger or log line, not a
    /// rendered graph.
    pub fn describe_expr(&self, expr_index: usize) -> String {
        self.exprs[expr_index]
            .iter()
            .enumerate()
            .map(|(addr, op)| format!("{:>4}: {}", addr, op))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Accumulates a [Program] across one `Compile` call. Consumed by
/// [ProgramBuilder::build] once every top-level expression has been
/// emitted. Not `Send`/`Sync` — it is only ever used for the duration of a
/// single compile, from a single thread (spec.md "Global state. None.").
#[derive(Debug)]
pub struct ProgramBuilder {
    labels: Vec<LabelSlot>,
    instr: Vec<Op>,
    exprs: Vec<CompiledExpr>,
    consts: Vec<Value>,
    strings: Vec<String>,
    string_map: HashMap<String, usize>,
    input_types: Vec<Type>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    /// Construct a builder with the two internal `in`-over-array helpers
    /// pre-registered at constant-pool indices 0 and 1, exactly as spec.md
    /// §4.7 "Built-in functions" describes. This implementation emits `in`
    /// through the dedicated `InArrayNumber`/`InArrayString` opcodes rather
    /// than through `Call`-ing these helpers (see DESIGN.md for the
    /// tradeoff) — they are kept in the pool anyway so the constant-pool
    /// shape matches what the spec describes at construction time, and so
    /// a host inspecting `Program`'s constant pool sees the same fixed
    /// layout regardless of which `in` emission strategy is in use.
    pub fn new() -> Self {
        let mut builder = ProgramBuilder {
            labels: Vec::new(),
            instr: Vec::new(),
            exprs: Vec::new(),
            consts: Vec::new(),
            strings: Vec::new(),
            string_map: HashMap::new(),
            input_types: Vec::new(),
        };

        let number_helper = Value::host_function(
            "__in_array_number",
            vec![Type::NUMBER, Type::array(PrimitiveType::Number)],
            Type::BOOL,
            Rc::new(|_ctx: &Context, args: &[Value]| {
                let needle = args[0].as_number();
                Ok(Value::bool(
                    args[1].as_array().iter().any(|v| v.as_number() == needle),
                ))
            }),
        );
        let string_helper = Value::host_function(
            "__in_array_string",
            vec![Type::STRING, Type::array(PrimitiveType::String)],
            Type::BOOL,
            Rc::new(|_ctx: &Context, args: &[Value]| {
                let needle = args[0].as_string();
                Ok(Value::bool(
                    args[1].as_array().iter().any(|v| v.as_string() == needle),
                ))
            }),
        );
        let idx0 = builder.register_const(number_helper);
        let idx1 = builder.register_const(string_helper);
        debug_assert_eq!(idx0, INTERNAL_IN_NUMBER_ARRAY);
        debug_assert_eq!(idx1, INTERNAL_IN_STRING_ARRAY);
        builder
    }

    pub fn new_input(&mut self, ty: Type) -> usize {
        let idx = self.input_types.len();
        self.input_types.push(ty);
        idx
    }

    pub fn register_const(&mut self, value: Value) -> usize {
        let idx = self.consts.len();
        log::trace!("const pool[{}] = {}", idx, value);
        self.consts.push(value);
        idx
    }

    /// Intern `s`, returning its existing index if already interned.
    pub fn intern_string(&mut self, s: &str) -> usize {
        if let Some(&idx) = self.string_map.get(s) {
            return idx;
        }
        let idx = self.strings.len();
        self.strings.push(s.to_string());
        self.string_map.insert(s.to_string(), idx);
        idx
    }

    pub fn create_label(&mut self) -> Label {
        let idx = self.labels.len();
        self.labels.push(LabelSlot { addr: None });
        Label(idx)
    }

    pub fn assign_label(&mut self, label: Label) {
        let addr = self.instr.len();
        log::trace!("label {} -> instruction {}", label.0, addr);
        self.labels[label.0].addr = Some(addr);
    }

    fn add_instr(&mut self, op: Op) {
        self.instr.push(op);
    }

    pub fn emit_push_number(&mut self, v: f64) {
        self.add_instr(Op::PushNumber(v));
    }

    pub fn emit_push_bool(&mut self, v: bool) {
        self.add_instr(Op::PushBool(v));
    }

    pub fn emit_push_string(&mut self, str_idx: usize) {
        self.add_instr(Op::PushString(str_idx));
    }

    pub fn emit_push_array(&mut self, n: usize) {
        self.add_instr(Op::PushArray(n));
    }

    pub fn emit_load_const(&mut self, idx: usize) {
        self.add_instr(Op::LoadConst(idx));
    }

    pub fn emit_load_input(&mut self, idx: usize) {
        self.add_instr(Op::LoadInput(idx));
    }

    pub fn emit_duplicate(&mut self) {
        self.add_instr(Op::Duplicate);
    }

    pub fn emit_negate(&mut self) {
        self.add_instr(Op::Negate);
    }

    pub fn emit_and(&mut self) {
        self.add_instr(Op::And);
    }

    pub fn emit_or(&mut self) {
        self.add_instr(Op::Or);
    }

    pub fn emit_in_array_number(&mut self) {
        self.add_instr(Op::InArrayNumber);
    }

    pub fn emit_in_array_string(&mut self) {
        self.add_instr(Op::InArrayString);
    }

    pub fn emit_call(&mut self, arg_count: usize) {
        self.add_instr(Op::Call(arg_count));
    }

    pub fn emit_return(&mut self) {
        self.add_instr(Op::Return);
    }

    pub fn emit_jump(&mut self, label: Label) {
        self.add_instr(Op::Jump(label.0 as i64));
    }

    pub fn emit_jump_if_true(&mut self, label: Label) {
        self.add_instr(Op::JumpIfTrue(label.0 as i64));
    }

    pub fn emit_jump_if_false(&mut self, label: Label) {
        self.add_instr(Op::JumpIfFalse(label.0 as i64));
    }

    /// Arithmetic (`+ - * /`), relational (`< <= > >=`), and equality
    /// (`== !=`) all land here; equality picks its opcode from
    /// `operand_ty`, the operands' shared static type (spec.md §4.6 "the
    /// `in` operator when emission chooses the dedicated-op path" / the
    /// mirrored dispatch for `==`/`!=`).
    pub fn emit_binary(&mut self, op: BinOp, operand_ty: &Type) {
        let instr = match op {
            BinOp::Add => Op::Add,
            BinOp::Sub => Op::Sub,
            BinOp::Mul => Op::Mul,
            BinOp::Div => Op::Div,
            BinOp::Lt => Op::CmpLT,
            BinOp::Le => Op::CmpLE,
            BinOp::Gt => Op::CmpGT,
            BinOp::Ge => Op::CmpGE,
            BinOp::Eq | BinOp::Ne => {
                let cmp = match operand_ty {
                    Type::Primitive(PrimitiveType::Number) => Op::CmpEqNumber,
                    Type::Primitive(PrimitiveType::String) => Op::CmpEqString,
                    Type::Primitive(PrimitiveType::Bool) => Op::CmpEqBool,
                    Type::Array(PrimitiveType::Number) => Op::CmpEqArrayNumber,
                    Type::Array(PrimitiveType::String) => Op::CmpEqArrayString,
                    Type::Array(PrimitiveType::Bool) => Op::CmpEqArrayBool,
                    other => unreachable!("non-comparable type reached emit: {:?}", other),
                };
                self.add_instr(cmp);
                if op == BinOp::Ne {
                    self.add_instr(Op::Negate);
                }
                return;
            }
        };
        self.add_instr(instr);
    }

    /// Back-patch every jump emitted for the current expression from label
    /// index to absolute address, then snapshot the instruction buffer as
    /// one compiled expression (spec.md I2). Panics (a builder bug, not a
    /// user error) if a jump references a label that was never assigned.
    pub fn finish_expr(&mut self) {
        for instr in self.instr.iter_mut() {
            let label_idx = match instr {
                Op::Jump(idx) | Op::JumpIfTrue(idx) | Op::JumpIfFalse(idx) => *idx as usize,
                _ => continue,
            };
            let addr = self.labels[label_idx]
                .addr
                .unwrap_or_else(|| panic!("unassigned label {} at FinishExpr", label_idx));
            match instr {
                Op::Jump(addr_field) | Op::JumpIfTrue(addr_field) | Op::JumpIfFalse(addr_field) => {
                    *addr_field = addr as i64;
                }
                _ => unreachable!(),
            }
        }
        self.exprs.push(std::mem::take(&mut self.instr));
        self.labels.clear();
    }

    pub fn instr_len(&self) -> usize {
        self.instr.len()
    }

    pub fn build(self, result_type: Type) -> Program {
        Program {
            result_type,
            exprs: self.exprs,
            consts: self.consts,
            strings: self.strings,
            input_types: self.input_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_in_array_helpers_occupy_fixed_indices() {
        let builder = ProgramBuilder::new();
        assert_eq!(builder.consts.len(), 2);
        assert_eq!(
            builder.consts[INTERNAL_IN_NUMBER_ARRAY].function_name(),
            "__in_array_number"
        );
        assert_eq!(
            builder.consts[INTERNAL_IN_STRING_ARRAY].function_name(),
            "__in_array_string"
        );
    }

    #[test]
    fn describe_expr_renders_one_instruction_per_line() {
        let mut builder = ProgramBuilder::new();
        builder.emit_push_number(2.0);
        builder.emit_push_number(3.0);
        builder.emit_binary(BinOp::Add, &Type::NUMBER);
        builder.emit_return();
        builder.finish_expr();
        let program = builder.build(Type::NUMBER);

        let rendered = program.describe_expr(0);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("PushNumber"));
        assert!(lines[2].contains("Add"));
    }

    #[test]
    fn string_interning_deduplicates() {
        let mut builder = ProgramBuilder::new();
        let a = builder.intern_string("hello");
        let b = builder.intern_string("world");
        let c = builder.intern_string("hello");
        assert_eq!(a, c);
        assert_ne!(a, b);
    }

    #[test]
    fn finish_expr_backpatches_label_to_absolute_address() {
        let mut builder = ProgramBuilder::new();
        builder.emit_push_bool(true);
        builder.emit_duplicate();
        let end = builder.create_label();
        builder.emit_jump_if_false(end);
        builder.emit_push_bool(false);
        builder.emit_and();
        builder.assign_label(end);
        builder.emit_return();
        builder.finish_expr();

        let program = builder.build(Type::BOOL);
        let expr = &program.exprs[0];
        match expr[2] {
            Op::JumpIfFalse(addr) => assert_eq!(addr as usize, 5),
            other => panic!("expected JumpIfFalse, got {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "unassigned label")]
    fn finish_expr_panics_on_unassigned_label() {
        let mut builder = ProgramBuilder::new();
        let label = builder.create_label();
        builder.emit_jump(label);
        builder.finish_expr();
    }
}
