//! `ceval` compiles small typed expressions supplied as text into a
//! [Program], then evaluates that program repeatedly against different
//! input vectors with a [Runtime]. A host registers named inputs,
//! constants, and host functions on a [Compiler], compiles source once,
//! and hands the resulting [Program] to as many [Runtime]s as it likes —
//! a [Program] is immutable and safe to share across threads, while each
//! [Runtime] owns its own evaluation stack and is used from one thread at
//! a time.
//!
//! ```
//! use ceval::{Compiler, Context, Runtime, Type, Value};
//!
//! let mut compiler = Compiler::new();
//! compiler.register_input("a", Type::NUMBER).unwrap();
//! compiler.register_input("b", Type::NUMBER).unwrap();
//! compiler.register_const("c", Value::number(3.0)).unwrap();
//!
//! let program = compiler.compile("a + c == b").unwrap();
//!
//! let mut runtime = Runtime::new(&program);
//! let result = runtime
//!     .run(&Context::new(), 0, &[Value::number(5.0), Value::number(8.0)])
//!     .unwrap();
//! assert_eq!(result, Value::bool(true));
//! ```

#![deny(clippy::all)]

mod ast;
mod builder;
mod consts;
pub mod context;
pub mod error;
mod instr;
mod lexer;
pub mod limits;
pub mod machine;
mod parser;
pub mod span;
mod symbol;
pub mod types;
pub mod value;

pub use builder::Program;
pub use context::Context;
pub use error::{CompileError, CompileErrors, RuntimeError, RuntimeErrors, SemanticError};
pub use limits::Limits;
pub use machine::Runtime;
pub use span::Span;
pub use symbol::ScopeError as RegisterError;
pub use types::{FunctionType, PrimitiveType, Type};
pub use value::{HostFn, Value};

use std::rc::Rc;

use crate::error::{CompileError as CErr, SourceErrorWrapper, WithSource};
use crate::symbol::{Scope, Symbol};

/// Accumulates a host's registrations (inputs, constants, functions) and
/// turns source text into a [Program] (spec.md §6 "Compiler facade").
///
/// A fresh [Compiler] is needed per compile: `compile` consumes `self`,
/// the same lifecycle spec.md §3 describes ("each `Compile` call owns its
/// context for the duration of the call").
#[derive(Debug, Default)]
pub struct Compiler {
    scope: Scope,
    builder: builder::ProgramBuilder,
    limits: Limits,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            scope: Scope::new(),
            builder: builder::ProgramBuilder::new(),
            limits: Limits::default(),
        }
    }

    /// As [Compiler::new], but enforcing a caller-supplied resource
    /// ceiling instead of [Limits::default] while compiling.
    pub fn with_limits(limits: Limits) -> Self {
        Compiler {
            scope: Scope::new(),
            builder: builder::ProgramBuilder::new(),
            limits,
        }
    }

    /// Register a named input. Returns its zero-based input-vector slot,
    /// which the host uses to build the `inputs` slice passed to
    /// [Runtime::run]. Fails if `name` is already registered.
    pub fn register_input(&mut self, name: &str, ty: Type) -> Result<usize, RegisterError> {
        let slot = self.builder.new_input(ty.clone());
        self.scope.register(name, Symbol::Input { slot, ty })?;
        Ok(slot)
    }

    /// Register a named constant, materialized at compile time through
    /// `LoadConst`. Fails if `name` is already registered.
    pub fn register_const(&mut self, name: &str, value: Value) -> Result<(), RegisterError> {
        let ty = value.value_type();
        let index = self.builder.register_const(value);
        self.scope.register(name, Symbol::Const { index, ty })
    }

    /// Register a named host function, callable from compiled expressions.
    /// `func` receives the evaluation's [Context] and its positional
    /// arguments, and must return a [Value] of exactly `return_type`
    /// (checked at call time — a mismatch is a
    /// [RuntimeError::ReturnTypeMismatch]). Fails if `name` is already
    /// registered.
    pub fn register_func<F>(
        &mut self,
        name: &str,
        func: F,
        return_type: Type,
        param_types: Vec<Type>,
    ) -> Result<(), RegisterError>
    where
        F: Fn(&Context, &[Value]) -> Result<Value, String> + 'static,
    {
        let value = Value::host_function(name, param_types, return_type, Rc::new(func));
        self.register_const(name, value)
    }

    /// Parse `source` and run it through ResolveNames → CheckTypes → Fold
    /// → Emit (spec.md §4.5), producing an immutable [Program]. Every
    /// top-level expression (`;`-separated) must agree on its result type
    /// (spec.md I4).
    pub fn compile(self, source: &str) -> Result<Program, CompileErrors> {
        let Compiler {
            scope,
            mut builder,
            limits,
        } = self;

        log::trace!("parsing {} byte(s) of source", source.len());
        let mut program = parser::parse_program(source)
            .map_err(|(err, span)| Self::wrap(source, err, span))?;
        log::trace!("parsed {} top-level expression(s)", program.exprs.len());

        log::trace!("pass: resolve names");
        for expr in program.exprs.iter_mut() {
            expr.resolve_names(&scope)
                .map_err(|(err, span)| Self::wrap(source, err, span))?;
        }
        log::trace!("pass: check types");
        for expr in program.exprs.iter_mut() {
            expr.check_types()
                .map_err(|(err, span)| Self::wrap(source, CErr::Semantic(err), span))?;
        }
        let result_type = program
            .result_type()
            .map_err(|(err, span)| Self::wrap(source, CErr::Semantic(err), span))?;
        log::debug!("program result type resolved to {}", result_type);
        log::trace!("pass: fold constants");
        for expr in program.exprs.iter_mut() {
            expr.fold();
        }
        log::trace!("pass: emit bytecode");
        for expr in program.exprs.iter() {
            let span = expr.span;
            expr.emit(&mut builder);
            builder.emit_return();
            let found = builder.instr_len();
            if found > limits.max_instructions {
                return Err(Self::wrap(
                    source,
                    CErr::TooLarge {
                        limit: limits.max_instructions,
                        found,
                    },
                    span,
                ));
            }
            builder.finish_expr();
        }

        Ok(builder.build(result_type))
    }

    fn wrap(source: &str, err: CompileError, span: Span) -> CompileErrors {
        WithSource::new(vec![SourceErrorWrapper::new(err, span, source)], source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str, setup: impl FnOnce(&mut Compiler)) -> Program {
        let mut compiler = Compiler::new();
        setup(&mut compiler);
        compiler.compile(src).unwrap()
    }

    // spec.md §8 scenario 1
    #[test]
    fn scenario_arithmetic_with_parens_and_folding() {
        let program = compile("2 + 3*(2+3) - 5", |_| {});
        let mut rt = Runtime::new(&program);
        let result = rt.run(&Context::new(), 0, &[]).unwrap();
        assert_eq!(result, Value::number(12.0));
    }

    // spec.md §8 scenario 2
    #[test]
    fn scenario_input_relational() {
        let program = compile("a < b", |c| {
            c.register_input("a", Type::NUMBER).unwrap();
            c.register_input("b", Type::NUMBER).unwrap();
        });
        let mut rt = Runtime::new(&program);
        let result = rt
            .run(&Context::new(), 0, &[Value::number(2.0), Value::number(2.0)])
            .unwrap();
        assert_eq!(result, Value::bool(false));
    }

    // spec.md §8 scenario 3
    #[test]
    fn scenario_string_equality() {
        let program = compile(r#""foo" == "foo""#, |_| {});
        let mut rt = Runtime::new(&program);
        let result = rt.run(&Context::new(), 0, &[]).unwrap();
        assert_eq!(result, Value::bool(true));
    }

    // spec.md §8 scenario 4
    #[test]
    fn scenario_membership_with_mixed_literal_and_input_array() {
        let program = compile("a in [1, b, 3]", |c| {
            c.register_input("a", Type::NUMBER).unwrap();
            c.register_input("b", Type::NUMBER).unwrap();
        });
        let mut rt = Runtime::new(&program);
        let result = rt
            .run(
                &Context::new(),
                0,
                &[Value::number(10.0), Value::number(10.0)],
            )
            .unwrap();
        assert_eq!(result, Value::bool(true));
    }

    // spec.md §8 scenario 5
    #[test]
    fn scenario_host_function_plus_const_plus_input() {
        let program = compile("len(a) + c == b", |c| {
            c.register_input("a", Type::STRING).unwrap();
            c.register_input("b", Type::NUMBER).unwrap();
            c.register_const("c", Value::number(3.0)).unwrap();
            c.register_func(
                "len",
                |_ctx: &Context, args: &[Value]| {
                    Ok(Value::number(args[0].as_string().len() as f64))
                },
                Type::NUMBER,
                vec![Type::STRING],
            )
            .unwrap();
        });
        let mut rt = Runtime::new(&program);
        let result = rt
            .run(
                &Context::new(),
                0,
                &[Value::string("hello"), Value::number(8.0)],
            )
            .unwrap();
        assert_eq!(result, Value::bool(true));
    }

    // spec.md §8 scenario 6
    #[test]
    fn scenario_mismatched_in_array_element_types_is_semantic_error() {
        let err = Compiler::new().compile(r#"1 in ["foo"]"#).unwrap_err();
        assert!(err.to_string().contains("Type error"));
    }

    // spec.md §8 scenario 7
    #[test]
    fn scenario_unregistered_name_is_unknown_symbol() {
        let err = Compiler::new().compile("a + 1").unwrap_err();
        assert!(err.to_string().contains("unknown name 'a'"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut compiler = Compiler::new();
        compiler.register_input("x", Type::NUMBER).unwrap();
        let err = compiler.register_const("x", Value::number(1.0)).unwrap_err();
        assert_eq!(err, RegisterError::DuplicateName("x".to_string()));
    }

    #[test]
    fn multiple_top_level_expressions_share_one_program() {
        let program = compile("1; 2; 3", |_| {});
        assert_eq!(program.expr_count(), 3);
        let mut rt = Runtime::new(&program);
        assert_eq!(rt.run(&Context::new(), 1, &[]).unwrap(), Value::number(2.0));
    }

    #[test]
    fn mismatched_top_level_result_types_are_rejected() {
        let err = Compiler::new().compile("1; \"x\"").unwrap_err();
        assert!(err.to_string().contains("Type error"));
    }
}
