//! Benchmarks exercising the interpreter end to end (scan → parse → resolve → evaluate).
//!
//! Bodies are written to avoid constant folding: each one accumulates a runtime value
//! through a loop rather than returning a literal, so the measured time reflects actual
//! tree-walking work rather than a short-circuited constant return.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lox::RunOutcome;

fn run_source(source: &str) {
    match lox::run(source, Box::new(std::io::sink()), true) {
        RunOutcome::Ok(_warnings) => {}
        RunOutcome::PreExecution(diagnostics) => panic!("unexpected diagnostics: {diagnostics:?}"),
        RunOutcome::Runtime(err) => panic!("unexpected runtime error: {err:?}"),
    }
}

const ARITHMETIC_LOOP: &str = "
var total = 0;
var i = 0;
while (i < 5000) {
    total = total + i * 2 - 1;
    i = i + 1;
}
";

const FIBONACCI_RECURSIVE: &str = "
fun fib(n) {
    if (n < 2) return n;
    return fib(n - 1) + fib(n - 2);
}
fib(20);
";

const CLOSURE_COUNTER: &str = "
fun makeCounter() {
    var i = 0;
    fun counter() {
        i = i + 1;
        return i;
    }
    return counter;
}
var c = makeCounter();
var i = 0;
while (i < 2000) {
    c();
    i = i + 1;
}
";

const METHOD_DISPATCH: &str = "
class Animal {
    init(name) { this.name = name; }
    speak() { return this.name; }
}
class Dog < Animal {
    speak() { return super.speak() + \" barks\"; }
}
var d = Dog(\"Rex\");
var i = 0;
while (i < 2000) {
    d.speak();
    i = i + 1;
}
";

fn bench_arithmetic_loop(c: &mut Criterion) {
    c.bench_function("arithmetic_loop", |b| {
        b.iter(|| run_source(black_box(ARITHMETIC_LOOP)));
    });
}

fn bench_fibonacci_recursive(c: &mut Criterion) {
    c.bench_function("fibonacci_recursive", |b| {
        b.iter(|| run_source(black_box(FIBONACCI_RECURSIVE)));
    });
}

fn bench_closure_counter(c: &mut Criterion) {
    c.bench_function("closure_counter", |b| {
        b.iter(|| run_source(black_box(CLOSURE_COUNTER)));
    });
}

fn bench_method_dispatch(c: &mut Criterion) {
    c.bench_function("method_dispatch", |b| {
        b.iter(|| run_source(black_box(METHOD_DISPATCH)));
    });
}

criterion_group!(
    benches,
    bench_arithmetic_loop,
    bench_fibonacci_recursive,
    bench_closure_counter,
    bench_method_dispatch
);
criterion_main!(benches);
