//! Runtime values: the tagged cell shape shared by constants and stack
//! slots (spec.md §3 "Value", §4.7). Grounded on
//! `original_source/expr/runtime/value.go`'s `Value` struct, which stores a
//! `float64` plus an `interface{}` for anything that doesn't fit in one.

use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use crate::context::Context;
use crate::types::{PrimitiveType, Type};

/// A host function callable from a compiled expression. Receives the
/// evaluation's [Context] (spec.md §4.7 "Call convention") alongside its
/// positional arguments.
///
/// Boxed so host registration can capture arbitrary closures, matching the
/// teacher's pattern of storing trait objects in the constant pool rather
/// than function pointers.
pub type HostFn = Rc<dyn Fn(&Context, &[Value]) -> Result<Value, String>>;

/// Non-numeric payload for a [Value]. Kept out of `Value` itself so the
/// common number/bool case stays a plain `f64` with no heap touch.
#[derive(Clone)]
enum Payload {
    String(Rc<String>),
    Array(Rc<Vec<Value>>),
    Function {
        name: Rc<String>,
        params: Vec<Type>,
        ret: Type,
        func: HostFn,
    },
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Payload::String(s) => write!(f, "String({:?})", s),
            Payload::Array(a) => write!(f, "Array({:?})", a),
            Payload::Function { name, .. } => write!(f, "Function({:?})", name),
        }
    }
}

/// A single value flowing through the stack machine: a number/bool `f64`
/// core plus an optional heap payload for strings, arrays and functions.
///
/// Booleans are encoded as `0.0`/`1.0` in `number`, same as the original's
/// "everything is a float64 plus a tag" representation; this avoids a
/// separate bool variant for a type with exactly two values.
#[derive(Clone, Debug)]
pub struct Value {
    number: f64,
    payload: Option<Payload>,
}

impl Value {
    pub fn number(n: f64) -> Self {
        Value {
            number: n,
            payload: None,
        }
    }

    pub fn bool(b: bool) -> Self {
        Value {
            number: if b { 1.0 } else { 0.0 },
            payload: None,
        }
    }

    pub fn string<S: Into<String>>(s: S) -> Self {
        Value {
            number: 0.0,
            payload: Some(Payload::String(Rc::new(s.into()))),
        }
    }

    pub fn array(elems: Vec<Value>) -> Self {
        Value {
            number: elems.len() as f64,
            payload: Some(Payload::Array(Rc::new(elems))),
        }
    }

    pub fn host_function<S: Into<String>>(
        name: S,
        params: Vec<Type>,
        ret: Type,
        func: HostFn,
    ) -> Self {
        Value {
            number: 0.0,
            payload: Some(Payload::Function {
                name: Rc::new(name.into()),
                params,
                ret,
                func,
            }),
        }
    }

    pub fn as_number(&self) -> f64 {
        self.number
    }

    pub fn as_bool(&self) -> bool {
        self.number != 0.0
    }

    pub fn as_string(&self) -> &str {
        match &self.payload {
            Some(Payload::String(s)) => s.as_str(),
            _ => panic!("value is not a string"),
        }
    }

    pub fn as_array(&self) -> &[Value] {
        match &self.payload {
            Some(Payload::Array(a)) => a.as_slice(),
            _ => panic!("value is not an array"),
        }
    }

    /// Invoke this value as a function. Panics if it isn't one; the caller
    /// (the `Call` instruction handler) only ever reaches this after
    /// CheckTypes has already proven the callee is function-typed.
    pub fn call(&self, ctx: &Context, args: &[Value]) -> Result<Value, String> {
        match &self.payload {
            Some(Payload::Function { func, .. }) => func(ctx, args),
            _ => panic!("value is not callable"),
        }
    }

    pub fn function_name(&self) -> &str {
        match &self.payload {
            Some(Payload::Function { name, .. }) => name.as_str(),
            _ => panic!("value is not a function"),
        }
    }

    /// This function's declared parameter types and return type, as
    /// registered at `RegisterFunc` time. Used by the `Call` instruction
    /// handler to validate the value the host actually returned.
    pub fn function_signature(&self) -> (&[Type], &Type) {
        match &self.payload {
            Some(Payload::Function { params, ret, .. }) => (params.as_slice(), ret),
            _ => panic!("value is not a function"),
        }
    }

    /// Reconstruct this value's static type. Used by the builder when it
    /// needs to know the type of a registered constant or host function.
    pub fn value_type(&self) -> Type {
        match &self.payload {
            None => Type::NUMBER,
            Some(Payload::String(_)) => Type::STRING,
            Some(Payload::Array(elems)) => {
                let elem_ty = elems
                    .first()
                    .map(|v| match v.value_type() {
                        Type::Primitive(p) => p,
                        _ => PrimitiveType::Number,
                    })
                    .unwrap_or(PrimitiveType::Number);
                Type::Array(elem_ty)
            }
            Some(Payload::Function { params, ret, .. }) => {
                Type::function(params.clone(), ret.clone())
            }
        }
    }
}

impl PartialEq for Value {
    /// Identity equality for numbers/strings/bools, structural for arrays,
    /// per spec.md §4.5's equality table. Functions are never compared with
    /// `==` in the grammar, so there is no function arm here to get wrong.
    fn eq(&self, other: &Self) -> bool {
        match (&self.payload, &other.payload) {
            (None, None) => self.number == other.number,
            (Some(Payload::String(a)), Some(Payload::String(b))) => a == b,
            (Some(Payload::Array(a)), Some(Payload::Array(b))) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.payload {
            None => write!(f, "{}", self.number),
            Some(Payload::String(s)) => write!(f, "{}", s),
            Some(Payload::Array(elems)) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            Some(Payload::Function { name, .. }) => write!(f, "<function {}>", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_equality_is_by_value() {
        assert_eq!(Value::number(1.0), Value::number(1.0));
        assert_ne!(Value::number(1.0), Value::number(2.0));
    }

    #[test]
    fn bool_round_trips_through_number_encoding() {
        assert_eq!(Value::bool(true).as_number(), 1.0);
        assert_eq!(Value::bool(false).as_number(), 0.0);
        assert!(Value::bool(true).as_bool());
        assert!(!Value::bool(false).as_bool());
    }

    #[test]
    fn array_equality_is_structural() {
        let a = Value::array(vec![Value::number(1.0), Value::number(2.0)]);
        let b = Value::array(vec![Value::number(1.0), Value::number(2.0)]);
        let c = Value::array(vec![Value::number(1.0), Value::number(3.0)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn string_value_type_is_string() {
        assert_eq!(Value::string("x").value_type(), Type::STRING);
    }

    #[test]
    fn host_function_is_callable() {
        let f = Value::host_function(
            "double",
            vec![Type::NUMBER],
            Type::NUMBER,
            Rc::new(|_ctx: &Context, args: &[Value]| {
                Ok(Value::number(args[0].as_number() * 2.0))
            }),
        );
        let result = f.call(&Context::new(), &[Value::number(21.0)]).unwrap();
        assert_eq!(result.as_number(), 42.0);
    }

    #[test]
    fn function_signature_reports_params_and_return() {
        let f = Value::host_function(
            "len",
            vec![Type::STRING],
            Type::NUMBER,
            Rc::new(|_ctx: &Context, args: &[Value]| {
                Ok(Value::number(args[0].as_string().len() as f64))
            }),
        );
        let (params, ret) = f.function_signature();
        assert_eq!(params, &[Type::STRING]);
        assert_eq!(ret, &Type::NUMBER);
    }
}
