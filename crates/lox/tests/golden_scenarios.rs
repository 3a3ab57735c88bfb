//! End-to-end scenarios exercising the full scan → parse → resolve → evaluate pipeline,
//! mirroring the literal input/output fixtures enumerated in the specification.

mod common;
use common::run_ok;
use pretty_assertions::assert_eq;

#[test]
fn closure_captures_the_binding_live_at_definition_time() {
    let stdout = run_ok(
        r#"
        var a = "global";
        {
            fun f() { print a; }
            f();
            var a = "block";
            f();
        }
        "#,
    );
    assert_eq!(stdout, "global\nglobal\n");
}

#[test]
fn counter_closure_mutates_across_calls() {
    let stdout = run_ok(
        r"
        fun makeCounter() {
            var i = 0;
            fun c() {
                i = i + 1;
                print i;
            }
            return c;
        }
        var c = makeCounter();
        c();
        c();
        ",
    );
    assert_eq!(stdout, "1.000000\n2.000000\n");
}

#[test]
fn single_inheritance_with_super_call_and_override() {
    let stdout = run_ok(
        r#"
        class A {
            cook() { print "Fry until golden brown."; }
        }
        class B < A {
            cook() {
                super.cook();
                print "Pipe full of custard and coat with chocolate.";
            }
        }
        B().cook();
        "#,
    );
    assert_eq!(
        stdout,
        "Fry until golden brown.\nPipe full of custard and coat with chocolate.\n"
    );
}

#[test]
fn bare_return_inside_init_still_yields_the_instance() {
    let stdout = run_ok(
        r"
        class C {
            init(n) {
                this.n = n;
                return;
            }
        }
        print C(7).n;
        ",
    );
    assert_eq!(stdout, "7.000000\n");
}

#[test]
fn and_or_return_operand_values_not_coerced_booleans() {
    let stdout = run_ok(
        r#"
        print "hi" or 2;
        print nil or "fallback";
        print "hi" and 2;
        print nil and "unreached";
        "#,
    );
    assert_eq!(stdout, "hi\nfallback\n2.000000\nnil\n");
}

#[test]
fn logical_operators_short_circuit() {
    let stdout = run_ok(
        r#"
        fun sideEffect() { print "evaluated"; return true; }
        if (true or sideEffect()) { print "short-circuited or"; }
        if (false and sideEffect()) { print "unreached"; } else { print "short-circuited and"; }
        "#,
    );
    assert_eq!(stdout, "short-circuited or\nshort-circuited and\n");
}

#[test]
fn break_unwinds_only_the_nearest_loop() {
    let stdout = run_ok(
        r"
        var i = 0;
        while (true) {
            i = i + 1;
            if (i >= 3) break;
        }
        print i;
        ",
    );
    assert_eq!(stdout, "3.000000\n");
}

#[test]
fn for_loop_desugars_to_while_with_initializer_and_increment() {
    let stdout = run_ok(
        r"
        var total = 0;
        for (var i = 0; i < 5; i = i + 1) {
            total = total + i;
        }
        print total;
        ",
    );
    assert_eq!(stdout, "10.000000\n");
}

#[test]
fn ternary_evaluates_only_the_chosen_branch() {
    let stdout = run_ok(
        r#"
        fun boom() { print "should not run"; return 1; }
        print true ? "yes" : boom();
        "#,
    );
    assert_eq!(stdout, "yes\n");
}

#[test]
fn string_number_concatenation_coerces_the_number() {
    let stdout = run_ok(r#"print "count: " + 3;"#);
    assert_eq!(stdout, "count: 3.000000\n");
}

#[test]
fn class_is_callable_as_a_constructor_and_fields_are_dynamic() {
    let stdout = run_ok(
        r"
        class Point {
            init(x, y) { this.x = x; this.y = y; }
        }
        var p = Point(1, 2);
        p.z = 3;
        print p.x + p.y + p.z;
        ",
    );
    assert_eq!(stdout, "6.000000\n");
}

#[test]
fn function_literal_closes_over_its_definition_environment() {
    let stdout = run_ok(
        r"
        var adders = nil;
        {
            var x = 10;
            adders = fun(y) { return x + y; };
        }
        print adders(5);
        ",
    );
    assert_eq!(stdout, "15.000000\n");
}
