//! The cancellation/context handle forwarded to host functions on every
//! call (spec.md §5, §4.7 "Call convention"). The core interpreter never
//! polls this itself — expressions are expected to be short — but a long-
//! running host function can check [Context::is_cancelled] between steps
//! of its own work, or the runtime can refuse to even start a call once
//! cancellation has been requested.

use std::cell::Cell;
use std::rc::Rc;

/// A handle shared between a [Runtime](crate::machine::Runtime) and every
/// host function it calls during one evaluation. Cheap to clone; clones
/// share the same underlying cancellation flag.
#[derive(Clone, Default, Debug)]
pub struct Context {
    cancelled: Rc<Cell<bool>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the evaluation this context is attached to.
    /// Takes effect the next time the runtime is about to invoke a host
    /// function; does not interrupt a host function already in progress.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}
