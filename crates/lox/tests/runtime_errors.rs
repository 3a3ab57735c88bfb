//! Runtime errors raised by the evaluator per spec §7, each asserted against the
//! `[<message> line <N>]` wire format from §6.

mod common;
use common::run_runtime_error;
use pretty_assertions::assert_eq;

#[test]
fn undefined_property_access_reports_the_access_line() {
    let message = run_runtime_error(
        r"
        class T {}
        var t = T();
        print t.x;
        ",
    );
    assert_eq!(message, "[Undefined property 'x'. line 4]");
}

#[test]
fn calling_a_non_callable_value_is_rejected() {
    let message = run_runtime_error("var x = 1; x();");
    assert!(
        message.contains("Can only call functions and classes"),
        "message: {message}"
    );
}

#[test]
fn arity_mismatch_is_rejected() {
    let message = run_runtime_error("fun f(a, b) { return a + b; } f(1);");
    assert!(
        message.contains("Expected 2 arguments but got 1"),
        "message: {message}"
    );
}

#[test]
fn unary_minus_on_non_number_is_a_type_error() {
    let message = run_runtime_error(r#"print -"oops";"#);
    assert!(
        message.contains("Operand must be a number"),
        "message: {message}"
    );
}

#[test]
fn arithmetic_on_mismatched_types_is_a_type_error() {
    let message = run_runtime_error(r#"print "a" - "b";"#);
    assert!(
        message.contains("Operands must be numbers"),
        "message: {message}"
    );
}

#[test]
fn property_access_on_non_instance_is_rejected() {
    let message = run_runtime_error("print (1).x;");
    assert!(
        message.contains("Only instances have properties"),
        "message: {message}"
    );
}

#[test]
fn superclass_expression_must_evaluate_to_a_class() {
    let message = run_runtime_error(
        r"
        var NotAClass = 1;
        class Sub < NotAClass {}
        ",
    );
    assert!(
        message.contains("Superclass must be a class"),
        "message: {message}"
    );
}

#[test]
fn division_by_zero_yields_infinity_rather_than_erroring() {
    // No runtime error should be raised: IEEE infinity, not a panic.
    let stdout = common::run_ok("print 1 / 0;");
    assert_eq!(stdout, "inf\n");
}

#[test]
fn nan_is_not_equal_to_itself() {
    let stdout = common::run_ok("var n = 0 / 0; print n == n;");
    assert_eq!(stdout, "false\n");
}
