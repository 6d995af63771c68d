//! The closed universe of compile-time types. See `SPEC_FULL.md` §3/§4.1.
//!
//! Primitive types are singletons (equality is identity); [Type::Array] and
//! [Type::Function] equality is structural, matching the original
//! `types.Type.Equal` behavior this module is grounded on.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// A primitive element type: the only types an [Array](Type::Array) can
/// hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Number,
    String,
    Bool,
}

impl Display for PrimitiveType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Bool => "bool",
        };
        write!(f, "{}", s)
    }
}

/// The full static type of a value, a symbol, or an expression node.
///
/// `Void` is a transient marker only: it is the type CheckTypes assigns to
/// an empty array literal before that literal is rejected as a compile
/// error (spec.md §3, "Type"). No value ever has type `Void` at runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Primitive(PrimitiveType),
    Array(PrimitiveType),
    Function(Arc<FunctionType>),
    Void,
}

/// The signature of a function-typed value: an ordered parameter list and a
/// return type. Wrapped in `Arc` so `Value`/`Type` stay cheap to clone.
#[derive(Debug, PartialEq)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl Type {
    pub const NUMBER: Type = Type::Primitive(PrimitiveType::Number);
    pub const STRING: Type = Type::Primitive(PrimitiveType::String);
    pub const BOOL: Type = Type::Primitive(PrimitiveType::Bool);

    pub fn array(elem: PrimitiveType) -> Type {
        Type::Array(elem)
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function(Arc::new(FunctionType { params, ret }))
    }

    /// Whether this type can appear as the element type of an array literal
    /// and be compared with `==`/`!=` (spec.md §4.5 typing table).
    pub fn is_comparable(&self) -> bool {
        matches!(
            self,
            Type::Primitive(_) | Type::Array(_)
        )
    }

    /// Whether this type is valid on the left-hand side of `in` (spec.md
    /// §4.5: `e in arr` requires `e` to be number or string).
    pub fn is_memberable(&self) -> bool {
        matches!(
            self,
            Type::Primitive(PrimitiveType::Number)
                | Type::Primitive(PrimitiveType::String)
        )
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p),
            Type::Array(elem) => write!(f, "array of {}", elem),
            Type::Function(func) => {
                write!(f, "function(")?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", func.ret)
            }
            Type::Void => write!(f, "void"),
        }
    }
}
