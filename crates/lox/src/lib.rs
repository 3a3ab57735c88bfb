//! A tree-walking interpreter for Lox: lexer, recursive-descent parser, static
//! resolver, and an environment-walking evaluator, wired together by [`run`] and
//! [`Repl`].
//!
//! The phase order is fixed: scan, parse, resolve, then — only if no diagnostic was
//! raised in any of the first three phases — evaluate. A runtime error is reported the
//! same way a pre-execution diagnostic is, but the two are structurally distinct types
//! (see `error.rs`).

pub mod ast;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod token;
pub mod value;

use std::io::Write;

use error::{Diagnostic, RuntimeError};
use interpreter::Interpreter;
use resolver::{Bindings, Resolver};

/// The outcome of a full `run`: either the diagnostics stopping execution before it
/// started, or the single runtime error (if any) that stopped it partway through.
/// `Ok` still carries any non-fatal diagnostics (currently just `UNUSED_LOCAL`
/// warnings, per `ErrorKind::is_warning`) collected along the way.
pub enum RunOutcome {
    Ok(Vec<Diagnostic>),
    PreExecution(Vec<Diagnostic>),
    Runtime(RuntimeError),
}

/// Scans, parses, resolves, and (if clean) evaluates `source` against a fresh
/// interpreter, writing `print` output to `out`. `test_mode` pins `clock()` to zero.
#[must_use]
pub fn run(source: &str, out: Box<dyn Write>, test_mode: bool) -> RunOutcome {
    let (tokens, lex_diagnostics) = lexer::scan(source);
    let (program, parse_diagnostics) = parser::parse(tokens);
    let (bindings, resolve_diagnostics) = Resolver::new().resolve_program(&program);

    let mut diagnostics = lex_diagnostics;
    diagnostics.extend(parse_diagnostics);
    diagnostics.extend(resolve_diagnostics);
    if diagnostics.iter().any(|d| !d.kind.is_warning()) {
        return RunOutcome::PreExecution(diagnostics);
    }

    let interpreter = Interpreter::new(bindings, out, test_mode);
    match interpreter.interpret(&program) {
        Ok(()) => RunOutcome::Ok(diagnostics),
        Err(err) => RunOutcome::Runtime(err),
    }
}

/// What a single REPL line produced, once scanned, parsed, and (if clean) evaluated.
/// `Value`/`Ran` carry any non-fatal warnings collected while resolving the line.
pub enum ReplOutcome {
    /// The line was a bare expression; here is its value, already stringified.
    Value(String, Vec<Diagnostic>),
    /// The line ran as one or more statements with no directly-printed result.
    Ran(Vec<Diagnostic>),
    PreExecution(Vec<Diagnostic>),
    Runtime(RuntimeError),
}

/// A REPL session: one [`Interpreter`] (and its accumulating globals environment) plus
/// one [`Resolver`] (and its accumulating globals table) shared across every line, so
/// a `var`/`fun`/`class` declared on an earlier line resolves correctly on a later one.
pub struct Repl {
    interpreter: Interpreter,
    resolver: Resolver,
}

impl Repl {
    #[must_use]
    pub fn new(out: Box<dyn Write>, test_mode: bool) -> Self {
        Self {
            interpreter: Interpreter::new(Bindings::default(), out, test_mode),
            resolver: Resolver::new(),
        }
    }

    /// Per §4.9: try parsing `line` as a single expression first and echo its value;
    /// otherwise re-parse it as a full declaration/statement sequence and run it for
    /// side effects. Each line is resolved independently against the session's shared
    /// globals table — local scopes never persist across lines, only globals do.
    pub fn eval_line(&mut self, line: &str) -> ReplOutcome {
        let (tokens, lex_diagnostics) = lexer::scan(line);

        if lex_diagnostics.is_empty()
            && let Some(expr) = parser::Parser::new(tokens.clone()).parse_single_expression()
        {
            let program = [ast::Stmt::Expression(expr)];
            let (bindings, diagnostics) = self.resolver.resolve_line(&program);
            if diagnostics.iter().any(|d| !d.kind.is_warning()) {
                return ReplOutcome::PreExecution(diagnostics);
            }
            self.interpreter.set_bindings(bindings);
            let ast::Stmt::Expression(expr) = &program[0] else {
                unreachable!()
            };
            return match self.interpreter.eval_top_level_expr(expr) {
                Ok(value) => {
                    ReplOutcome::Value(value.stringify(value::NumberFormat::Shortest), diagnostics)
                }
                Err(err) => ReplOutcome::Runtime(err),
            };
        }

        let (program, parse_diagnostics) = parser::parse(tokens);
        let (bindings, resolve_diagnostics) = self.resolver.resolve_line(&program);

        let mut diagnostics = lex_diagnostics;
        diagnostics.extend(parse_diagnostics);
        diagnostics.extend(resolve_diagnostics);
        if diagnostics.iter().any(|d| !d.kind.is_warning()) {
            return ReplOutcome::PreExecution(diagnostics);
        }

        self.interpreter.set_bindings(bindings);
        match self.interpreter.interpret(&program) {
            Ok(()) => ReplOutcome::Ran(diagnostics),
            Err(err) => ReplOutcome::Runtime(err),
        }
    }
}
