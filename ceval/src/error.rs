//! The error taxonomy: [CompileError] (raised while turning source text
//! into a [Program](crate::builder::Program)) and [RuntimeError] (raised
//! while a [Runtime](crate::machine::Runtime) evaluates one). Grounded on
//! `crates/core/src/error.rs`'s `SourceError`/`SourceErrorWrapper`/
//! `WithSource` machinery, with the error enums themselves replaced by the
//! four-kind taxonomy `original_source/expr/exprerrors/errors.go` and
//! `types/errors.go` implement.

use std::fmt::{self, Debug, Display, Formatter};

use crate::span::{self, Span};
use crate::types::Type;

/// An error that originates in source code and knows how to render itself
/// against a slice of that source.
pub trait SourceError: Debug {
    fn type_label(&self) -> &'static str;
    fn fmt_msg(&self, f: &mut Formatter<'_>, spanned_src: &str) -> fmt::Result;
}

/// Finer-grained reasons CheckTypes can reject an otherwise well-formed
/// expression. Kept separate from [CompileError] so `UnknownSymbol` (a
/// ResolveNames failure) stays a distinct top-level case, matching
/// spec.md §7's four-way split.
#[derive(Clone, Debug, PartialEq)]
pub enum SemanticError {
    TypeMismatch { expected: Type, found: Type },
    OperatorNotSupported { op: &'static str, operand: Type },
    NotComparable(Type),
    NotMemberable(Type),
    NotCallable(Type),
    NotAnArray(Type),
    ArgCountMismatch { expected: usize, found: usize },
    ArgTypeMismatch { index: usize, expected: Type, found: Type },
    EmptyArrayLiteral,
    MixedArrayElementTypes,
}

impl Display for SemanticError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            Self::OperatorNotSupported { op, operand } => {
                write!(f, "operator '{}' does not support {}", op, operand)
            }
            Self::NotComparable(ty) => write!(f, "{} is not comparable", ty),
            Self::NotMemberable(ty) => {
                write!(f, "{} cannot appear on the left of 'in'", ty)
            }
            Self::NotCallable(ty) => write!(f, "{} is not callable", ty),
            Self::NotAnArray(ty) => write!(f, "expected an array, found {}", ty),
            Self::ArgCountMismatch { expected, found } => write!(
                f,
                "expected {} argument(s), found {}",
                expected, found
            ),
            Self::ArgTypeMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "argument {}: expected {}, found {}",
                index, expected, found
            ),
            Self::EmptyArrayLiteral => {
                write!(f, "cannot infer element type of an empty array literal")
            }
            Self::MixedArrayElementTypes => {
                write!(f, "array literal elements must all share one type")
            }
        }
    }
}

/// An error raised while compiling source text into a program. A compile
/// error always indicates a flaw in the input expression or its
/// registration, never an internal bug.
#[derive(Clone, Debug, PartialEq)]
pub enum CompileError {
    /// The lexer or parser could not make sense of the input. `expected`
    /// names the grammar construct that was being parsed.
    Parse { expected: &'static str },
    /// ResolveNames encountered an identifier with no matching registration.
    UnknownSymbol(String),
    /// CheckTypes or Fold rejected an otherwise well-formed expression.
    Semantic(SemanticError),
    /// A single top-level expression emitted more instructions than
    /// [Limits::max_instructions](crate::limits::Limits::max_instructions)
    /// allows.
    TooLarge { limit: usize, found: usize },
}

impl SourceError for CompileError {
    fn type_label(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "Syntax",
            Self::UnknownSymbol(_) => "Name",
            Self::Semantic(_) => "Type",
            Self::TooLarge { .. } => "Resource",
        }
    }

    fn fmt_msg(&self, f: &mut Formatter<'_>, spanned_src: &str) -> fmt::Result {
        match self {
            Self::Parse { expected } => write!(f, "expected {}", expected),
            Self::UnknownSymbol(name) => write!(f, "unknown name '{}'", name),
            Self::Semantic(err) => write!(f, "{} (`{}`)", err, spanned_src),
            Self::TooLarge { limit, found } => write!(
                f,
                "expression compiled to {} instructions, exceeding the limit of {} (`{}`)",
                found, limit, spanned_src
            ),
        }
    }
}

/// An error raised while a compiled program is running. Always a flaw in
/// the inputs or a host function's own behavior, never an internal bug in
/// the machine (those panic, per spec.md §7).
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeError {
    InputCountMismatch { expected: usize, found: usize },
    InputTypeMismatch { slot: usize, expected: Type, found: Type },
    HostFunctionFailed { name: String, message: String },
    /// A host function returned a value whose type disagrees with the
    /// return type it was registered with (spec.md §4.7 "Call convention").
    ReturnTypeMismatch { name: String, expected: Type, found: Type },
    /// The stack held something other than exactly one value at `Return`
    /// (spec.md §4.7 "Post-condition", §7 "unbalanced stack at Return"). A
    /// compiler bug, never a flaw in the source expression.
    StackImbalance { len: usize },
    /// Evaluation stack depth exceeded
    /// [Limits::max_stack_depth](crate::limits::Limits::max_stack_depth).
    /// A resource ceiling, not a compiler bug — a sufficiently deep or wide
    /// expression can legitimately hit this.
    StackOverflow { limit: usize },
    /// `Run` was asked to evaluate against a [Context] that was already
    /// cancelled before the first host-function call.
    Cancelled,
}

impl SourceError for RuntimeError {
    fn type_label(&self) -> &'static str {
        "Runtime"
    }

    fn fmt_msg(&self, f: &mut Formatter<'_>, _spanned_src: &str) -> fmt::Result {
        match self {
            Self::InputCountMismatch { expected, found } => write!(
                f,
                "expected {} input value(s), got {}",
                expected, found
            ),
            Self::InputTypeMismatch {
                slot,
                expected,
                found,
            } => write!(
                f,
                "input {}: expected {}, found {}",
                slot, expected, found
            ),
            Self::HostFunctionFailed { name, message } => {
                write!(f, "host function '{}' failed: {}", name, message)
            }
            Self::ReturnTypeMismatch { name, expected, found } => write!(
                f,
                "host function '{}' returned {} but was registered with return type {}",
                name, found, expected
            ),
            Self::StackImbalance { len } => {
                write!(f, "invalid program: stack len = {}", len)
            }
            Self::StackOverflow { limit } => {
                write!(f, "evaluation stack exceeded depth limit of {}", limit)
            }
            Self::Cancelled => write!(f, "evaluation was cancelled"),
        }
    }
}

/// An error paired with the [Span] of source it came from, plus a copy of
/// the spanned slice so `Display` works without needing the full source
/// text re-handed in.
#[derive(Clone, Debug)]
pub struct SourceErrorWrapper<E: SourceError + Clone + 'static>(SourceErrorWrapperInner<E>);

impl<E: SourceError + Clone + 'static> std::error::Error for SourceErrorWrapper<E> {}

#[derive(Clone, Debug)]
struct SourceErrorWrapperInner<E> {
    error: E,
    span: Span,
    spanned_source: String,
}

impl<E: SourceError + Clone + 'static> SourceErrorWrapper<E> {
    pub fn new(error: E, span: Span, src: &str) -> Self {
        Self(SourceErrorWrapperInner {
            error,
            span,
            spanned_source: span.get_source_slice(src).to_string(),
        })
    }

    pub fn span(&self) -> Span {
        self.0.span
    }

    pub fn error(&self) -> &E {
        &self.0.error
    }
}

impl<E: SourceError + Clone + 'static> Display for SourceErrorWrapperInner<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error at {}:{}: ",
            self.error.type_label(),
            self.span.start_line,
            self.span.start_col,
        )?;
        self.error.fmt_msg(f, &self.spanned_source)
    }
}

impl<E: SourceError + Clone + 'static> Display for SourceErrorWrapper<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// One or more [SourceErrorWrapper]s plus the source text they refer to, so
/// the whole batch can be rendered together with highlighted source lines.
#[derive(Clone, Debug)]
pub struct WithSource<E: SourceError + Clone + 'static> {
    errors: Vec<SourceErrorWrapper<E>>,
    source_code: String,
}

impl<E: SourceError + Clone + 'static> std::error::Error for WithSource<E> {}

impl<E: SourceError + Clone + 'static> WithSource<E> {
    pub fn new(errors: impl IntoIterator<Item = SourceErrorWrapper<E>>, source: String) -> Self {
        Self {
            errors: errors.into_iter().collect(),
            source_code: source,
        }
    }

    pub fn errors(&self) -> &[SourceErrorWrapper<E>] {
        &self.errors
    }
}

impl<E: SourceError + Clone + 'static> Display for WithSource<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
            if f.alternate() {
                span::fmt_src_highlights(f, &error.span(), &self.source_code)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for SemanticError {}
impl std::error::Error for CompileError {}
impl std::error::Error for RuntimeError {}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { expected } => write!(f, "expected {}", expected),
            Self::UnknownSymbol(name) => write!(f, "unknown name '{}'", name),
            Self::Semantic(err) => Display::fmt(err, f),
            Self::TooLarge { limit, found } => write!(
                f,
                "expression compiled to {} instructions, exceeding the limit of {}",
                found, limit
            ),
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputCountMismatch { expected, found } => {
                write!(f, "expected {} input value(s), got {}", expected, found)
            }
            Self::InputTypeMismatch { slot, expected, found } => {
                write!(f, "input {}: expected {}, found {}", slot, expected, found)
            }
            Self::HostFunctionFailed { name, message } => {
                write!(f, "host function '{}' failed: {}", name, message)
            }
            Self::ReturnTypeMismatch { name, expected, found } => write!(
                f,
                "host function '{}' returned {} but was registered with return type {}",
                name, found, expected
            ),
            Self::StackImbalance { len } => {
                write!(f, "invalid program: stack len = {}", len)
            }
            Self::StackOverflow { limit } => {
                write!(f, "evaluation stack exceeded depth limit of {}", limit)
            }
            Self::Cancelled => write!(f, "evaluation was cancelled"),
        }
    }
}

pub type CompileErrors = WithSource<CompileError>;
pub type RuntimeErrors = WithSource<RuntimeError>;
