//! The typed AST and its four-pass pipeline (spec.md §3, §4.5). Grounded on
//! the teacher's `Node<T, M>` span-carrying wrapper in
//! `crates/core/src/ast.rs`, with the pass-dispatch design itself grounded
//! on `original_source/expr/internal/ast/*.go`'s per-node `RunPass`
//! methods — generalized here into match arms on a single `Expr` enum
//! rather than one Go struct per node kind, since Rust's enums already give
//! us the closed variant set spec.md §3 calls for.

use crate::builder::ProgramBuilder;
use crate::error::{CompileError, SemanticError};
use crate::span::Span;
use crate::symbol::{Scope, Symbol};
use crate::types::{PrimitiveType, Type};
use crate::value::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }

    fn is_relational(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

/// What a name reference was bound to by ResolveNames, with its static type
/// carried along so CheckTypes doesn't need to re-consult the scope (nodes
/// never hold a reference back to the scope they were resolved against).
/// Stored on the node itself rather than looked up again during Emit,
/// because spec.md's lifecycle forbids re-parenting or re-resolving nodes
/// once a pass has run.
#[derive(Clone, Debug)]
enum Binding {
    Input { slot: usize, ty: Type },
    Const { index: usize, ty: Type },
}

impl Binding {
    fn ty(&self) -> &Type {
        match self {
            Binding::Input { ty, .. } => ty,
            Binding::Const { ty, .. } => ty,
        }
    }
}

#[derive(Debug)]
pub enum ExprKind {
    NumberLit(f64),
    StringLit(String),
    BoolLit(bool),
    /// An unresolved identifier; becomes a `Binding` after ResolveNames.
    SimpleRef(String),
    Negate(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    In(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    ArrayLiteral(Vec<Expr>),
}

/// One expression tree node. `ty`/`value`/`binding` start empty and are
/// filled in by CheckTypes/Fold/ResolveNames respectively; once set they
/// are never cleared (spec.md invariant I1).
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    ty: Option<Type>,
    value: Option<Value>,
    binding: Option<Binding>,
    /// Set by ResolveNames on a `Call` node once its callee name is bound;
    /// `Call`'s own `Binding` above is unused (it only applies to
    /// `SimpleRef`), so the callee's resolved symbol lives here instead.
    callee: Option<Symbol>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            ty: None,
            value: None,
            binding: None,
            callee: None,
        }
    }

    pub fn ty(&self) -> &Type {
        self.ty.as_ref().expect("ty read before CheckTypes ran")
    }

    pub fn folded_value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    // ---- ResolveNames ---------------------------------------------------

    pub fn resolve_names(&mut self, scope: &Scope) -> Result<(), (CompileError, Span)> {
        match &mut self.kind {
            ExprKind::SimpleRef(name) => {
                let symbol = scope
                    .resolve(name)
                    .map_err(|_| (CompileError::UnknownSymbol(name.clone()), self.span))?;
                self.binding = Some(match symbol {
                    Symbol::Input { slot, ty } => Binding::Input {
                        slot: *slot,
                        ty: ty.clone(),
                    },
                    Symbol::Const { index, ty } => Binding::Const {
                        index: *index,
                        ty: ty.clone(),
                    },
                });
                Ok(())
            }
            ExprKind::Call(name, args) => {
                let symbol = scope
                    .resolve(name)
                    .map_err(|_| (CompileError::UnknownSymbol(name.clone()), self.span))?;
                self.callee = Some(symbol.clone());
                for arg in args {
                    arg.resolve_names(scope)?;
                }
                Ok(())
            }
            ExprKind::NumberLit(_) | ExprKind::StringLit(_) | ExprKind::BoolLit(_) => Ok(()),
            ExprKind::Negate(e) => e.resolve_names(scope),
            ExprKind::And(a, b) | ExprKind::Or(a, b) | ExprKind::Binary(_, a, b) | ExprKind::In(a, b) => {
                a.resolve_names(scope)?;
                b.resolve_names(scope)
            }
            ExprKind::ArrayLiteral(elems) => {
                for e in elems {
                    e.resolve_names(scope)?;
                }
                Ok(())
            }
        }
    }

    // ---- CheckTypes -------------------------------------------------------

    pub fn check_types(&mut self) -> Result<(), (SemanticError, Span)> {
        let span = self.span;
        let ty = match &mut self.kind {
            ExprKind::NumberLit(_) => Type::NUMBER,
            ExprKind::StringLit(_) => Type::STRING,
            ExprKind::BoolLit(_) => Type::BOOL,
            ExprKind::SimpleRef(name) => match &self.binding {
                Some(binding) => binding.ty().clone(),
                None => unreachable!("check_types ran before resolve_names for {}", name),
            },
            ExprKind::Negate(e) => {
                e.check_types()?;
                expect_type(e, Type::BOOL)?;
                Type::BOOL
            }
            ExprKind::And(a, b) | ExprKind::Or(a, b) => {
                a.check_types()?;
                b.check_types()?;
                expect_type(a, Type::BOOL)?;
                expect_type(b, Type::BOOL)?;
                Type::BOOL
            }
            ExprKind::Binary(op, a, b) => {
                a.check_types()?;
                b.check_types()?;
                check_binary(*op, a, b).map_err(|e| (e, span))?
            }
            ExprKind::In(elem, arr) => {
                elem.check_types()?;
                arr.check_types()?;
                if !elem.ty().is_memberable() {
                    return Err((SemanticError::NotMemberable(elem.ty().clone()), span));
                }
                let elem_prim = match elem.ty() {
                    Type::Primitive(p) => *p,
                    _ => unreachable!(),
                };
                match arr.ty() {
                    Type::Array(p) if *p == elem_prim => {}
                    other => {
                        return Err((
                            SemanticError::TypeMismatch {
                                expected: Type::array(elem_prim),
                                found: other.clone(),
                            },
                            span,
                        ))
                    }
                }
                Type::BOOL
            }
            ExprKind::Call(name, args) => {
                for arg in args.iter_mut() {
                    arg.check_types()?;
                }
                let symbol = self
                    .callee
                    .as_ref()
                    .unwrap_or_else(|| unreachable!("call to {} resolved without a symbol", name));
                let (params, ret) = match symbol.ty() {
                    Type::Function(f) => (f.params.clone(), f.ret.clone()),
                    other => return Err((SemanticError::NotCallable(other.clone()), span)),
                };
                if params.len() != args.len() {
                    return Err((
                        SemanticError::ArgCountMismatch {
                            expected: params.len(),
                            found: args.len(),
                        },
                        span,
                    ));
                }
                for (i, (param_ty, arg)) in params.iter().zip(args.iter()).enumerate() {
                    if arg.ty() != param_ty {
                        return Err((
                            SemanticError::ArgTypeMismatch {
                                index: i,
                                expected: param_ty.clone(),
                                found: arg.ty().clone(),
                            },
                            arg.span,
                        ));
                    }
                }
                ret
            }
            ExprKind::ArrayLiteral(elems) => {
                for e in elems.iter_mut() {
                    e.check_types()?;
                }
                if elems.is_empty() {
                    return Err((SemanticError::EmptyArrayLiteral, span));
                }
                let first = elems[0].ty().clone();
                let elem_prim = match &first {
                    Type::Primitive(p) => *p,
                    _ => return Err((SemanticError::MixedArrayElementTypes, span)),
                };
                for e in elems.iter().skip(1) {
                    if e.ty() != &first {
                        return Err((SemanticError::MixedArrayElementTypes, e.span));
                    }
                }
                Type::Array(elem_prim)
            }
        };
        self.ty = Some(ty);
        Ok(())
    }

    // ---- Fold -------------------------------------------------------------

    pub fn fold(&mut self) {
        match &mut self.kind {
            ExprKind::NumberLit(n) => self.value = Some(Value::number(*n)),
            ExprKind::StringLit(s) => self.value = Some(Value::string(s.clone())),
            ExprKind::BoolLit(b) => self.value = Some(Value::bool(*b)),
            ExprKind::SimpleRef(_) => {}
            ExprKind::Negate(e) => {
                e.fold();
                if let Some(v) = e.value.as_ref() {
                    self.value = Some(Value::bool(!v.as_bool()));
                }
            }
            ExprKind::And(a, b) => {
                a.fold();
                // Only fold if `a` folds false (short-circuit) or both sides
                // fold: folding must never change whether `b` is evaluated.
                if let Some(av) = a.value.as_ref() {
                    if !av.as_bool() {
                        self.value = Some(Value::bool(false));
                    } else {
                        b.fold();
                        if let Some(bv) = b.value.as_ref() {
                            self.value = Some(Value::bool(bv.as_bool()));
                        }
                    }
                } else {
                    b.fold();
                }
            }
            ExprKind::Or(a, b) => {
                a.fold();
                if let Some(av) = a.value.as_ref() {
                    if av.as_bool() {
                        self.value = Some(Value::bool(true));
                    } else {
                        b.fold();
                        if let Some(bv) = b.value.as_ref() {
                            self.value = Some(Value::bool(bv.as_bool()));
                        }
                    }
                } else {
                    b.fold();
                }
            }
            ExprKind::Binary(op, a, b) => {
                a.fold();
                b.fold();
                if let (Some(av), Some(bv)) = (a.value.as_ref(), b.value.as_ref()) {
                    self.value = fold_binary(*op, a.ty(), av, bv);
                }
            }
            ExprKind::In(elem, arr) => {
                elem.fold();
                arr.fold();
            }
            ExprKind::Call(_, args) => {
                for arg in args.iter_mut() {
                    arg.fold();
                }
            }
            ExprKind::ArrayLiteral(elems) => {
                for e in elems.iter_mut() {
                    e.fold();
                }
            }
        }
    }

    // ---- Emit ---------------------------------------------------------------

    pub fn emit(&self, b: &mut ProgramBuilder) {
        if let Some(value) = &self.value {
            emit_push_literal(b, self.ty(), value);
            return;
        }
        match &self.kind {
            ExprKind::NumberLit(_) | ExprKind::StringLit(_) | ExprKind::BoolLit(_) => {
                unreachable!("literals are always folded")
            }
            ExprKind::SimpleRef(_) => match self.binding.as_ref().unwrap() {
                Binding::Input { slot, .. } => b.emit_load_input(*slot),
                Binding::Const { index, .. } => b.emit_load_const(*index),
            },
            ExprKind::Negate(e) => {
                e.emit(b);
                b.emit_negate();
            }
            ExprKind::And(a, b_expr) => {
                a.emit(b);
                b.emit_duplicate();
                let end = b.create_label();
                b.emit_jump_if_false(end);
                b_expr.emit(b);
                b.emit_and();
                b.assign_label(end);
            }
            ExprKind::Or(a, b_expr) => {
                a.emit(b);
                b.emit_duplicate();
                let end = b.create_label();
                b.emit_jump_if_true(end);
                b_expr.emit(b);
                b.emit_or();
                b.assign_label(end);
            }
            ExprKind::Binary(op, a, rhs) => {
                a.emit(b);
                rhs.emit(b);
                b.emit_binary(*op, a.ty());
            }
            ExprKind::In(elem, arr) => {
                elem.emit(b);
                arr.emit(b);
                match elem.ty() {
                    Type::Primitive(PrimitiveType::Number) => b.emit_in_array_number(),
                    Type::Primitive(PrimitiveType::String) => b.emit_in_array_string(),
                    other => unreachable!("non-memberable type reached emit: {:?}", other),
                }
            }
            ExprKind::Call(_, args) => {
                for arg in args {
                    arg.emit(b);
                }
                let symbol = self.callee.as_ref().unwrap();
                match symbol {
                    Symbol::Const { index, .. } => b.emit_load_const(*index),
                    Symbol::Input { slot, .. } => b.emit_load_input(*slot),
                }
                b.emit_call(args.len());
            }
            ExprKind::ArrayLiteral(elems) => {
                for e in elems {
                    e.emit(b);
                }
                b.emit_push_array(elems.len());
            }
        }
    }
}

fn expect_type(e: &Expr, expected: Type) -> Result<(), (SemanticError, Span)> {
    if e.ty() != &expected {
        Err((
            SemanticError::TypeMismatch {
                expected,
                found: e.ty().clone(),
            },
            e.span,
        ))
    } else {
        Ok(())
    }
}

fn check_binary(op: BinOp, a: &Expr, b: &Expr) -> Result<Type, SemanticError> {
    if op.is_arithmetic() {
        expect_type_bare(a, Type::NUMBER)?;
        expect_type_bare(b, Type::NUMBER)?;
        Ok(Type::NUMBER)
    } else if op.is_relational() {
        expect_type_bare(a, Type::NUMBER)?;
        expect_type_bare(b, Type::NUMBER)?;
        Ok(Type::BOOL)
    } else {
        // Eq / Ne
        if a.ty() != b.ty() {
            return Err(SemanticError::TypeMismatch {
                expected: a.ty().clone(),
                found: b.ty().clone(),
            });
        }
        if !a.ty().is_comparable() {
            return Err(SemanticError::NotComparable(a.ty().clone()));
        }
        Ok(Type::BOOL)
    }
}

fn expect_type_bare(e: &Expr, expected: Type) -> Result<(), SemanticError> {
    if e.ty() != &expected {
        Err(SemanticError::TypeMismatch {
            expected,
            found: e.ty().clone(),
        })
    } else {
        Ok(())
    }
}

fn fold_binary(op: BinOp, operand_ty: &Type, a: &Value, b: &Value) -> Option<Value> {
    if op.is_arithmetic() {
        let (x, y) = (a.as_number(), b.as_number());
        let n = match op {
            BinOp::Add => x + y,
            BinOp::Sub => x - y,
            BinOp::Mul => x * y,
            BinOp::Div => x / y,
            _ => unreachable!(),
        };
        return Some(Value::number(n));
    }
    if op.is_relational() {
        let (x, y) = (a.as_number(), b.as_number());
        let r = match op {
            BinOp::Lt => x < y,
            BinOp::Le => x <= y,
            BinOp::Gt => x > y,
            BinOp::Ge => x >= y,
            _ => unreachable!(),
        };
        return Some(Value::bool(r));
    }
    // Eq/Ne: only fold scalar primitives, matching spec.md §4.5 ("equality
    // of primitives is foldable"); array equality is left to emission.
    let primitive = matches!(
        operand_ty,
        Type::Primitive(PrimitiveType::Number | PrimitiveType::String | PrimitiveType::Bool)
    );
    if !primitive {
        return None;
    }
    let eq = a == b;
    Some(Value::bool(if op == BinOp::Eq { eq } else { !eq }))
}

fn emit_push_literal(b: &mut ProgramBuilder, ty: &Type, value: &Value) {
    match ty {
        Type::Primitive(PrimitiveType::Number) => b.emit_push_number(value.as_number()),
        Type::Primitive(PrimitiveType::Bool) => b.emit_push_bool(value.as_bool()),
        Type::Primitive(PrimitiveType::String) => {
            let idx = b.intern_string(value.as_string());
            b.emit_push_string(idx);
        }
        other => unreachable!("folded literal has non-scalar type {:?}", other),
    }
}

/// A whole compiled unit: one or more `;`-separated top-level expressions
/// that must all agree on their result type (spec.md §3 "Program", I4).
pub struct Program {
    pub exprs: Vec<Expr>,
}

impl Program {
    pub fn result_type(&self) -> Result<Type, (SemanticError, Span)> {
        let mut iter = self.exprs.iter();
        let first = iter
            .next()
            .expect("grammar requires at least one top-level expression");
        let first_ty = first.ty().clone();
        for e in iter {
            if e.ty() != &first_ty {
                return Err((
                    SemanticError::TypeMismatch {
                        expected: first_ty,
                        found: e.ty().clone(),
                    },
                    e.span,
                ));
            }
        }
        Ok(first_ty)
    }
}

/// Used only by tests that need to build an `Expr` without going through
/// the parser.
#[cfg(test)]
pub(crate) fn leaf(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::initial())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    #[test]
    fn check_types_rejects_mixed_array_literal() {
        let mut expr = leaf(ExprKind::ArrayLiteral(vec![
            leaf(ExprKind::NumberLit(1.0)),
            leaf(ExprKind::StringLit("x".into())),
        ]));
        let (err, _span) = expr.check_types().unwrap_err();
        assert_eq!(err, SemanticError::MixedArrayElementTypes);
    }

    #[test]
    fn check_types_rejects_empty_array_literal() {
        let mut expr = leaf(ExprKind::ArrayLiteral(vec![]));
        let (err, _span) = expr.check_types().unwrap_err();
        assert_eq!(err, SemanticError::EmptyArrayLiteral);
    }

    #[test]
    fn check_types_resolves_simple_ref_type_from_binding() {
        let mut scope = Scope::new();
        scope
            .register(
                "x",
                Symbol::Input {
                    slot: 0,
                    ty: Type::NUMBER,
                },
            )
            .unwrap();
        let mut expr = leaf(ExprKind::SimpleRef("x".into()));
        expr.resolve_names(&scope).unwrap();
        expr.check_types().unwrap();
        assert_eq!(expr.ty(), &Type::NUMBER);
    }

    #[test]
    fn fold_propagates_through_arithmetic() {
        let mut expr = leaf(ExprKind::Binary(
            BinOp::Add,
            Box::new(leaf(ExprKind::NumberLit(2.0))),
            Box::new(leaf(ExprKind::NumberLit(3.0))),
        ));
        expr.check_types().unwrap();
        expr.fold();
        assert_eq!(expr.folded_value().unwrap().as_number(), 5.0);
    }

    #[test]
    fn and_short_circuit_does_not_fold_rhs_when_lhs_true_is_unknown() {
        let mut scope = Scope::new();
        scope
            .register(
                "a",
                Symbol::Input {
                    slot: 0,
                    ty: Type::BOOL,
                },
            )
            .unwrap();
        let mut expr = leaf(ExprKind::And(
            Box::new(leaf(ExprKind::SimpleRef("a".into()))),
            Box::new(leaf(ExprKind::BoolLit(true))),
        ));
        expr.resolve_names(&scope).unwrap();
        expr.check_types().unwrap();
        expr.fold();
        assert!(expr.folded_value().is_none());
    }

    #[test]
    fn and_folds_false_without_touching_rhs() {
        let mut expr = leaf(ExprKind::And(
            Box::new(leaf(ExprKind::BoolLit(false))),
            Box::new(leaf(ExprKind::BoolLit(true))),
        ));
        expr.check_types().unwrap();
        expr.fold();
        assert_eq!(expr.folded_value().unwrap().as_bool(), false);
    }

    #[test]
    fn unknown_symbol_carries_span() {
        let scope = Scope::new();
        let mut expr = leaf(ExprKind::SimpleRef("missing".into()));
        let (err, span) = expr.resolve_names(&scope).unwrap_err();
        assert_eq!(err, CompileError::UnknownSymbol("missing".into()));
        assert_eq!(span, Span::initial());
    }
}
