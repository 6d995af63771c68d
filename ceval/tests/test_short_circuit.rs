//! P5 (spec.md §8): short-circuit emission must never invoke the right-hand
//! operand of `&&`/`||` once the left-hand operand already decides the
//! result. Each test registers a host function with a counter side effect
//! as the right-hand operand and asserts it is (or isn't) called.

use ceval::{Compiler, Context, Runtime, Type, Value};
use std::cell::Cell;
use std::rc::Rc;

fn counting_bool_identity(counter: Rc<Cell<u32>>) -> impl Fn(&Context, &[Value]) -> Result<Value, String> {
    move |_ctx: &Context, args: &[Value]| {
        counter.set(counter.get() + 1);
        Ok(Value::bool(args[0].as_bool()))
    }
}

// spec.md §8 scenario 8
#[test]
fn scenario_8_false_and_side_effect_short_circuits() {
    let counter = Rc::new(Cell::new(0u32));
    let mut c = Compiler::new();
    c.register_func("side", counting_bool_identity(counter.clone()), Type::BOOL, vec![Type::BOOL])
        .unwrap();
    let program = c.compile("false && side(true)").unwrap();

    let mut rt = Runtime::new(&program);
    let result = rt.run(&Context::new(), 0, &[]).unwrap();

    assert_eq!(result, Value::bool(false));
    assert_eq!(counter.get(), 0);
}

#[test]
fn true_or_side_effect_short_circuits() {
    let counter = Rc::new(Cell::new(0u32));
    let mut c = Compiler::new();
    c.register_func("side", counting_bool_identity(counter.clone()), Type::BOOL, vec![Type::BOOL])
        .unwrap();
    let program = c.compile("true || side(false)").unwrap();

    let mut rt = Runtime::new(&program);
    let result = rt.run(&Context::new(), 0, &[]).unwrap();

    assert_eq!(result, Value::bool(true));
    assert_eq!(counter.get(), 0);
}

#[test]
fn true_and_side_effect_does_invoke_rhs() {
    let counter = Rc::new(Cell::new(0u32));
    let mut c = Compiler::new();
    c.register_func("side", counting_bool_identity(counter.clone()), Type::BOOL, vec![Type::BOOL])
        .unwrap();
    let program = c.compile("true && side(true)").unwrap();

    let mut rt = Runtime::new(&program);
    let result = rt.run(&Context::new(), 0, &[]).unwrap();

    assert_eq!(result, Value::bool(true));
    assert_eq!(counter.get(), 1);
}

#[test]
fn false_or_side_effect_does_invoke_rhs() {
    let counter = Rc::new(Cell::new(0u32));
    let mut c = Compiler::new();
    c.register_func("side", counting_bool_identity(counter.clone()), Type::BOOL, vec![Type::BOOL])
        .unwrap();
    let program = c.compile("false || side(false)").unwrap();

    let mut rt = Runtime::new(&program);
    let result = rt.run(&Context::new(), 0, &[]).unwrap();

    assert_eq!(result, Value::bool(false));
    assert_eq!(counter.get(), 1);
}

#[test]
fn short_circuit_holds_across_repeated_runs_of_the_same_runtime() {
    // A single `Runtime` is reused across evaluations (spec.md §5); the
    // short-circuit behavior must hold on every call, not just the first.
    let counter = Rc::new(Cell::new(0u32));
    let mut c = Compiler::new();
    c.register_input("a", Type::BOOL).unwrap();
    c.register_func("side", counting_bool_identity(counter.clone()), Type::BOOL, vec![Type::BOOL])
        .unwrap();
    let program = c.compile("a && side(true)").unwrap();

    let mut rt = Runtime::new(&program);
    rt.run(&Context::new(), 0, &[Value::bool(false)]).unwrap();
    rt.run(&Context::new(), 0, &[Value::bool(false)]).unwrap();
    assert_eq!(counter.get(), 0);

    rt.run(&Context::new(), 0, &[Value::bool(true)]).unwrap();
    assert_eq!(counter.get(), 1);
}
