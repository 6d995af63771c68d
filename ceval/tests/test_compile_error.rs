//! Integration tests for `ceval` that expect compile errors. Every source
//! string here should fail somewhere in the Compile pipeline (spec.md §7).

use ceval::{Compiler, Context, Limits, PrimitiveType, Type, Value};

/// Compiles `$src` against a fresh [Compiler] with no registrations, and
/// asserts the rendered error contains `$needle`.
macro_rules! assert_compile_error {
    ($src:expr, $needle:expr $(,)?) => {{
        let err = Compiler::new().compile($src).unwrap_err();
        let rendered = err.to_string();
        assert!(
            rendered.contains($needle),
            "expected error containing {:?}, got {:?}",
            $needle,
            rendered
        );
    }};
}

#[test]
fn test_parse_errors() {
    assert_compile_error!("", "Syntax error");
    assert_compile_error!("1 +", "Syntax error");
    assert_compile_error!("(1 + 2", "Syntax error");
    assert_compile_error!("1 2", "Syntax error");
}

#[test]
fn test_unterminated_string_is_a_parse_error() {
    assert_compile_error!("\"unterminated", "Syntax error");
}

#[test]
fn test_unknown_character_is_a_parse_error() {
    assert_compile_error!("1 + $", "Syntax error");
}

#[test]
fn test_unregistered_name_is_unknown_symbol() {
    assert_compile_error!("a + 1", "Name error");
    assert_compile_error!("a + 1", "unknown name 'a'");
}

#[test]
fn test_unregistered_function_is_unknown_symbol() {
    assert_compile_error!("missing(1)", "unknown name 'missing'");
}

#[test]
fn test_arithmetic_on_strings_is_a_type_error() {
    assert_compile_error!(r#""a" + "b""#, "Type error");
    assert_compile_error!(r#""a" + "b""#, "expected number, found string");
}

#[test]
fn test_mismatched_relational_operands_is_a_type_error() {
    let mut c = Compiler::new();
    c.register_input("a", Type::NUMBER).unwrap();
    let err = c.compile(r#"a < "b""#).unwrap_err();
    assert!(err.to_string().contains("expected number, found string"));
}

#[test]
fn test_equality_requires_matching_array_element_types() {
    assert_compile_error!(r#"[1, 2] == ["a", "b"]"#, "Type error");
}

#[test]
fn test_in_requires_memberable_left_operand() {
    assert_compile_error!("true in [true, false]", "cannot appear on the left of 'in'");
}

#[test]
fn test_in_requires_array_right_operand() {
    let mut c = Compiler::new();
    c.register_input("a", Type::NUMBER).unwrap();
    let err = c.compile("a in a").unwrap_err();
    assert!(err.to_string().contains("expected array of number, found number"));
}

#[test]
fn test_mismatched_in_array_element_types_is_semantic_error() {
    assert_compile_error!(r#"1 in ["foo"]"#, "Type error");
}

#[test]
fn test_empty_array_literal_is_rejected() {
    assert_compile_error!("[] == [1]", "cannot infer element type");
}

#[test]
fn test_mixed_array_element_types_is_rejected() {
    assert_compile_error!(r#"[1, "a"]"#, "must all share one type");
}

#[test]
fn test_calling_a_non_function_is_rejected() {
    let mut c = Compiler::new();
    c.register_const("x", Value::number(1.0)).unwrap();
    let err = c.compile("x(1)").unwrap_err();
    assert!(err.to_string().contains("is not callable"));
}

#[test]
fn test_wrong_argument_count_is_rejected() {
    let mut c = Compiler::new();
    c.register_func(
        "len",
        |_ctx: &Context, args: &[Value]| Ok(Value::number(args[0].as_string().len() as f64)),
        Type::NUMBER,
        vec![Type::STRING],
    )
    .unwrap();
    let err = c.compile(r#"len("a", "b")"#).unwrap_err();
    assert!(err.to_string().contains("expected 1 argument(s), found 2"));
}

#[test]
fn test_wrong_argument_type_is_rejected() {
    let mut c = Compiler::new();
    c.register_func(
        "len",
        |_ctx: &Context, args: &[Value]| Ok(Value::number(args[0].as_string().len() as f64)),
        Type::NUMBER,
        vec![Type::STRING],
    )
    .unwrap();
    let err = c.compile("len(1)").unwrap_err();
    assert!(err.to_string().contains("argument 0: expected string, found number"));
}

#[test]
fn test_mismatched_top_level_result_types_are_rejected() {
    assert_compile_error!(r#"1; "x""#, "Type error");
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let mut c = Compiler::new();
    c.register_input("x", Type::NUMBER).unwrap();
    let err = c.register_input("x", Type::NUMBER).unwrap_err();
    assert_eq!(err.to_string(), "name 'x' is already registered");
}

#[test]
fn test_too_many_instructions_is_a_resource_error() {
    // Nest enough additions that the emitted instruction count blows past
    // a tiny caller-supplied limit. Doubling the leaf count 7 times yields
    // 128 leaves (well past the 100-instruction ceiling below) without the
    // source string itself blowing up.
    let mut source = String::from("1");
    for _ in 0..7 {
        source = format!("({}) + ({})", source, source);
    }
    let err = Compiler::with_limits(Limits {
        max_instructions: 100,
        ..Limits::default()
    })
    .compile(&source)
    .unwrap_err();
    assert!(err.to_string().contains("Resource error"));
    assert!(err.to_string().contains("exceeding the limit of 100"));
}

#[test]
fn test_array_input_type_round_trips_through_registration() {
    let mut c = Compiler::new();
    c.register_input("a", Type::array(PrimitiveType::Number))
        .unwrap();
    c.compile("a == a").unwrap();
}
