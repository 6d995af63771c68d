/// The initial capacity reserved for a [Runtime](crate::machine::Runtime)'s
/// evaluation stack. Expressions that need more than this will simply grow
/// the stack; this just avoids a handful of small reallocations for the
/// common case.
pub const INITIAL_STACK_CAPACITY: usize = 30;

/// Constant-pool index of the internal `in`-over-number-array helper,
/// registered at [ProgramBuilder](crate::builder::ProgramBuilder)
/// construction.
pub const INTERNAL_IN_NUMBER_ARRAY: usize = 0;

/// Constant-pool index of the internal `in`-over-string-array helper.
pub const INTERNAL_IN_STRING_ARRAY: usize = 1;

/// Default ceiling on evaluation stack depth (see [crate::limits::Limits]),
/// playing the role the teacher's `MAX_CYCLE_COUNT` plays for its register
/// machine: a backstop against pathological input, not a tuning knob most
/// hosts will ever touch.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 10_000;

/// Default ceiling on instructions emitted for a single top-level
/// expression (see [crate::limits::Limits]).
pub const DEFAULT_MAX_INSTRUCTIONS: usize = 100_000;
