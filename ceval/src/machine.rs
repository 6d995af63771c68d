//! The register-less stack machine that executes a compiled [Program]
//! (spec.md §4.7). Grounded on `original_source/expr/runtime/runtime.go`'s
//! `Runtime.Run` dispatch loop, generalized from that file's register-plus-
//! stack hybrid down to the pure stack discipline spec.md calls for, in the
//! teacher's `Machine` struct style (one struct owning a stack and scratch
//! buffer, one dispatch loop over an op tag).

use crate::builder::Program;
use crate::context::Context;
use crate::error::RuntimeError;
use crate::instr::Op;
use crate::limits::Limits;
use crate::value::Value;

/// Per-evaluation state: an evaluation stack and a reusable argument
/// scratch buffer. Not `Send`/`Sync` and not shareable across concurrent
/// evaluations of the same [Program] (spec.md §5) — each caller constructs
/// its own.
pub struct Runtime<'p> {
    program: &'p Program,
    stack: Vec<Value>,
    scratch: Vec<Value>,
    limits: Limits,
}

impl<'p> Runtime<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self::with_limits(program, Limits::default())
    }

    /// As [Runtime::new], but with a caller-supplied resource ceiling
    /// instead of [Limits::default].
    pub fn with_limits(program: &'p Program, limits: Limits) -> Self {
        Runtime {
            program,
            stack: Vec::with_capacity(limits.initial_stack_capacity),
            scratch: Vec::new(),
            limits,
        }
    }

    /// Evaluate the `expr_index`-th top-level expression against `inputs`
    /// (spec.md §6 "Run"). Validates the input vector's length and
    /// per-slot types before running a single instruction (spec.md §4.7
    /// "Pre-flight checks").
    pub fn run(
        &mut self,
        ctx: &Context,
        expr_index: usize,
        inputs: &[Value],
    ) -> Result<Value, RuntimeError> {
        self.validate_inputs(inputs)?;

        self.stack.clear();
        let instrs = &self.program.exprs[expr_index];

        // The core does not poll for cancellation between instructions
        // (spec.md §5): expressions are short, so there is nothing to gain
        // from checking here. `exec_call` checks before invoking a host
        // function, since that's the one place a single instruction can
        // take arbitrarily long.
        let mut pc = 0usize;
        loop {
            match instrs[pc] {
                Op::Return => break,
                Op::Jump(addr) => {
                    pc = addr as usize;
                    continue;
                }
                Op::JumpIfTrue(addr) => {
                    let cond = self.pop().as_bool();
                    if cond {
                        pc = addr as usize;
                        continue;
                    }
                }
                Op::JumpIfFalse(addr) => {
                    let cond = self.pop().as_bool();
                    if !cond {
                        pc = addr as usize;
                        continue;
                    }
                }
                op => self.exec(op, ctx, inputs)?,
            }
            pc += 1;
        }

        if self.stack.len() != 1 {
            return Err(RuntimeError::StackImbalance {
                len: self.stack.len(),
            });
        }
        Ok(self.stack.pop().unwrap())
    }

    fn validate_inputs(&self, inputs: &[Value]) -> Result<(), RuntimeError> {
        let declared = self.program.input_types();
        if inputs.len() != declared.len() {
            return Err(RuntimeError::InputCountMismatch {
                expected: declared.len(),
                found: inputs.len(),
            });
        }
        for (slot, (value, expected)) in inputs.iter().zip(declared.iter()).enumerate() {
            let found = value.value_type();
            if &found != expected {
                return Err(RuntimeError::InputTypeMismatch {
                    slot,
                    expected: expected.clone(),
                    found,
                });
            }
        }
        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.stack
            .pop()
            .unwrap_or_else(|| unreachable!("stack underflow: compiler bug"))
    }

    /// Push `v`, rejecting growth past
    /// [Limits::max_stack_depth](crate::limits::Limits::max_stack_depth).
    fn push(&mut self, v: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.limits.max_stack_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.limits.max_stack_depth,
            });
        }
        self.stack.push(v);
        Ok(())
    }

    /// Dispatch every op except the three jumps and `Return`, which
    /// `run_inner`'s loop handles directly since only it tracks the
    /// program counter.
    fn exec(&mut self, op: Op, ctx: &Context, inputs: &[Value]) -> Result<(), RuntimeError> {
        match op {
            Op::PushNumber(n) => self.push(Value::number(n))?,
            Op::PushBool(b) => self.push(Value::bool(b))?,
            Op::PushString(idx) => {
                self.push(Value::string(self.program.strings[idx].clone()))?
            }
            Op::PushArray(n) => {
                let start = self.stack.len() - n;
                let elems = self.stack.split_off(start);
                self.push(Value::array(elems))?;
            }
            Op::LoadConst(idx) => self.push(self.program.consts[idx].clone())?,
            Op::LoadInput(idx) => self.push(inputs[idx].clone())?,
            Op::Duplicate => {
                let top = self.stack.last().expect("Duplicate on empty stack").clone();
                self.push(top)?;
            }

            Op::Add | Op::Sub | Op::Mul | Op::Div => self.exec_arith(op)?,
            Op::CmpLT | Op::CmpLE | Op::CmpGT | Op::CmpGE => self.exec_relational(op)?,

            Op::CmpEqNumber | Op::CmpEqString | Op::CmpEqBool => self.exec_eq_scalar()?,
            Op::CmpEqArrayNumber | Op::CmpEqArrayString | Op::CmpEqArrayBool => {
                self.exec_eq_array()?
            }

            Op::And => {
                let b = self.pop().as_bool();
                let a = self.pop().as_bool();
                self.push(Value::bool(a && b))?;
            }
            Op::Or => {
                let b = self.pop().as_bool();
                let a = self.pop().as_bool();
                self.push(Value::bool(a || b))?;
            }
            Op::Negate => {
                let a = self.pop().as_bool();
                self.push(Value::bool(!a))?;
            }

            Op::InArrayNumber => {
                let arr = self.pop();
                let needle = self.pop();
                let found = arr
                    .as_array()
                    .iter()
                    .any(|v| v.as_number() == needle.as_number());
                self.push(Value::bool(found))?;
            }
            Op::InArrayString => {
                let arr = self.pop();
                let needle = self.pop();
                let found = arr.as_array().iter().any(|v| v.as_string() == needle.as_string());
                self.push(Value::bool(found))?;
            }

            Op::Call(arg_count) => self.exec_call(arg_count, ctx)?,

            Op::Jump(_) | Op::JumpIfTrue(_) | Op::JumpIfFalse(_) | Op::Return => {
                unreachable!("jumps and Return are dispatched by run_inner, never reach exec")
            }
        }
        Ok(())
    }

    fn exec_arith(&mut self, op: Op) -> Result<(), RuntimeError> {
        let b = self.pop().as_number();
        let a = self.pop().as_number();
        let result = match op {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            // Plain IEEE-754 division: `1 / 0` yields `f64::INFINITY`, not a
            // runtime error, matching original_source/expr/runtime/runtime.go.
            Op::Div => a / b,
            _ => unreachable!(),
        };
        self.push(Value::number(result))
    }

    fn exec_relational(&mut self, op: Op) -> Result<(), RuntimeError> {
        let b = self.pop().as_number();
        let a = self.pop().as_number();
        let result = match op {
            Op::CmpLT => a < b,
            Op::CmpLE => a <= b,
            Op::CmpGT => a > b,
            Op::CmpGE => a >= b,
            _ => unreachable!(),
        };
        self.push(Value::bool(result))
    }

    fn exec_eq_scalar(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        self.push(Value::bool(a == b))
    }

    fn exec_eq_array(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        self.push(Value::bool(a == b))
    }

    /// Pops the callee (the topmost cell, pushed last by `emit`), then reads
    /// `arg_count` cells below it into the scratch buffer (restoring
    /// declared order), invokes the callee with `ctx`, and validates the
    /// returned value's type against its declared return type (spec.md
    /// §4.7 "Call convention"). Refuses to even start the call if `ctx` was
    /// already cancelled (spec.md §5).
    fn exec_call(&mut self, arg_count: usize, ctx: &Context) -> Result<(), RuntimeError> {
        if ctx.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }

        let callee = self.pop();
        let start = self.stack.len() - arg_count;
        self.scratch.clear();
        self.scratch.extend(self.stack.split_off(start));

        let (_params, ret_type) = {
            let (params, ret) = callee.function_signature();
            (params.to_vec(), ret.clone())
        };

        log::trace!(
            "call '{}' with {} argument(s)",
            callee.function_name(),
            self.scratch.len()
        );
        let result = callee
            .call(ctx, &self.scratch)
            .map_err(|message| RuntimeError::HostFunctionFailed {
                name: callee.function_name().to_string(),
                message,
            })?;

        let found = result.value_type();
        if found != ret_type {
            return Err(RuntimeError::ReturnTypeMismatch {
                name: callee.function_name().to_string(),
                expected: ret_type,
                found,
            });
        }
        self.push(result)
    }
}
