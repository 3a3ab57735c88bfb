//! Diagnostics the resolver must collect per spec §4.3/§4.7/§7, each keyed to the
//! `ErrorKind` its message encodes.

mod common;
use common::{run_pre_execution_errors, run_warnings};

#[test]
fn self_referential_initializer_is_rejected() {
    let diagnostics = run_pre_execution_errors(r#"{ var a = "outer"; { var a = a; } }"#);
    assert!(
        diagnostics
            .iter()
            .any(|d| d.contains("Can't read local variable in its own initializer")),
        "diagnostics: {diagnostics:?}"
    );
}

#[test]
fn duplicate_local_in_same_block_is_rejected() {
    let diagnostics = run_pre_execution_errors("{ var x = 1; var x = 2; print x; }");
    assert!(
        diagnostics
            .iter()
            .any(|d| d.contains("Already a variable with this name in this scope")),
        "diagnostics: {diagnostics:?}"
    );
}

#[test]
fn globals_may_be_redeclared() {
    // Top-level `var` redeclaration is explicitly permitted (§4.3); this must run clean.
    common::run_ok("var x = 1; var x = 2; print x;");
}

#[test]
fn undefined_variable_reference_is_rejected() {
    let diagnostics = run_pre_execution_errors("print nonexistent;");
    assert!(
        diagnostics
            .iter()
            .any(|d| d.contains("Undefined variable 'nonexistent'")),
        "diagnostics: {diagnostics:?}"
    );
}

#[test]
fn unused_local_is_reported_as_a_non_fatal_warning() {
    // §9 permits downgrading UNUSED_LOCAL to a warning; this crate does so (see
    // `ErrorKind::is_warning`), so the program still runs to completion.
    let warnings = run_warnings("fun f() { var unused = 1; } f();");
    assert!(
        warnings
            .iter()
            .any(|d| d.contains("Local variable not used")),
        "warnings: {warnings:?}"
    );
}

#[test]
fn unused_parameter_is_reported_as_a_non_fatal_warning() {
    let warnings = run_warnings("fun f(unused) { print \"body\"; } f(1);");
    assert!(
        warnings
            .iter()
            .any(|d| d.contains("Local variable not used")),
        "warnings: {warnings:?}"
    );
}

#[test]
fn return_at_top_level_is_rejected() {
    let diagnostics = run_pre_execution_errors("return 1;");
    assert!(
        diagnostics
            .iter()
            .any(|d| d.contains("Can't return from top-level code")),
        "diagnostics: {diagnostics:?}"
    );
}

#[test]
fn return_value_from_initializer_is_rejected() {
    let diagnostics = run_pre_execution_errors("class C { init() { return 1; } }");
    assert!(
        diagnostics
            .iter()
            .any(|d| d.contains("Can't return a value from an initializer")),
        "diagnostics: {diagnostics:?}"
    );
}

#[test]
fn bare_return_from_initializer_is_allowed() {
    common::run_ok("class C { init() { return; } } C();");
}

#[test]
fn this_outside_class_is_rejected() {
    let diagnostics = run_pre_execution_errors("print this;");
    assert!(
        diagnostics
            .iter()
            .any(|d| d.contains("Can't use 'this' outside of a class")),
        "diagnostics: {diagnostics:?}"
    );
}

#[test]
fn super_outside_class_is_rejected() {
    let diagnostics = run_pre_execution_errors("class A { f() { print super.f(); } } A();");
    assert!(
        diagnostics
            .iter()
            .any(|d| d.contains("Can't use 'super' in a class with no superclass")),
        "diagnostics: {diagnostics:?}"
    );
}

#[test]
fn class_inheriting_from_itself_is_rejected() {
    let diagnostics = run_pre_execution_errors("class A < A {}");
    assert!(
        diagnostics
            .iter()
            .any(|d| d.contains("A class can't inherit from itself")),
        "diagnostics: {diagnostics:?}"
    );
}

#[test]
fn collected_diagnostics_surface_more_than_one_error() {
    // The resolver doesn't stop at the first problem: both should be reported together.
    let diagnostics = run_pre_execution_errors("return 1; print this;");
    assert!(diagnostics.len() >= 2, "diagnostics: {diagnostics:?}");
}
