//! The symbol table: a flat name-to-symbol map populated before compilation
//! and consulted by the ResolveNames pass. Grounded on
//! `original_source/expr/internal/symbol/{scope,symbol}.go`, generalized
//! from that package's scoped-block design down to the single flat scope
//! spec.md §3 calls for (host expressions have no nested blocks).

use std::collections::HashMap;

use crate::types::Type;

/// What a name in scope refers to.
#[derive(Clone, Debug)]
pub enum Symbol {
    /// A value supplied by the host at evaluation time, read from the input
    /// vector at `slot`.
    Input { slot: usize, ty: Type },
    /// A value or function baked into the constant pool at compile time,
    /// read from the pool at `index`.
    Const { index: usize, ty: Type },
}

impl Symbol {
    pub fn ty(&self) -> &Type {
        match self {
            Symbol::Input { ty, .. } => ty,
            Symbol::Const { ty, .. } => ty,
        }
    }
}

/// Error produced when registering or resolving a name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("name '{0}' is already registered")]
    DuplicateName(String),
    #[error("unknown name '{0}'")]
    UnknownName(String),
}

/// The flat name-to-symbol map a [Compiler](crate::lib::Compiler) builds up
/// via `register_input`/`register_const`/`register_func`, then hands to
/// ResolveNames.
#[derive(Default, Debug)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            symbols: HashMap::new(),
        }
    }

    /// Register `name`, failing if it is already taken. Every host-facing
    /// registration call (input, const, func) goes through this so name
    /// collisions across the three categories are still caught.
    pub fn register(&mut self, name: &str, symbol: Symbol) -> Result<(), ScopeError> {
        if self.symbols.contains_key(name) {
            return Err(ScopeError::DuplicateName(name.to_string()));
        }
        self.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Symbol, ScopeError> {
        self.symbols
            .get(name)
            .ok_or_else(|| ScopeError::UnknownName(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_resolve() {
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
        let sym = scope.resolve("x").unwrap();
        assert_eq!(sym.ty(), &Type::NUMBER);
    }

    #[test]
    fn duplicate_name_is_rejected() {
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
        let err = scope
            .register(
                "x",
                Symbol::Const {
                    index: 0,
                    ty: Type::STRING,
                },
            )
            .unwrap_err();
        assert_eq!(err, ScopeError::DuplicateName("x".to_string()));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let scope = Scope::new();
        let err = scope.resolve("missing").unwrap_err();
        assert_eq!(err, ScopeError::UnknownName("missing".to_string()));
    }
}
