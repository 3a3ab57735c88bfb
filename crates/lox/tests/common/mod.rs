//! Shared helpers for the integration-test binaries under `tests/`. Each `tests/*.rs`
//! file is compiled as its own crate, so not every helper here is used by every one of
//! them — `dead_code` is allowed at the module level rather than annotating each helper.
#![allow(dead_code)]

use std::{cell::RefCell, io, rc::Rc};

use lox::RunOutcome;

/// A `Write` sink backed by a shared buffer, so a test can inspect `print` output after
/// `run` has consumed the `Box<dyn Write>` it was handed.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("print output is valid utf-8")
    }
}

pub fn run_ok(source: &str) -> String {
    let buf = SharedBuf::default();
    match lox::run(source, Box::new(buf.clone()), true) {
        RunOutcome::Ok(_warnings) => {}
        RunOutcome::PreExecution(diagnostics) => panic!("unexpected diagnostics: {diagnostics:?}"),
        RunOutcome::Runtime(err) => panic!("unexpected runtime error: {err}"),
    }
    buf.contents()
}

pub fn run_warnings(source: &str) -> Vec<String> {
    let buf = SharedBuf::default();
    match lox::run(source, Box::new(buf), true) {
        RunOutcome::Ok(warnings) => warnings.iter().map(ToString::to_string).collect(),
        RunOutcome::PreExecution(diagnostics) => {
            panic!("expected only warnings, got fatal diagnostics: {diagnostics:?}")
        }
        RunOutcome::Runtime(err) => {
            panic!("expected a clean run with warnings, got runtime error: {err}")
        }
    }
}

pub fn run_pre_execution_errors(source: &str) -> Vec<String> {
    let buf = SharedBuf::default();
    match lox::run(source, Box::new(buf), true) {
        RunOutcome::PreExecution(diagnostics) => {
            diagnostics.iter().map(ToString::to_string).collect()
        }
        RunOutcome::Ok(_) => panic!("expected pre-execution diagnostics, program ran cleanly"),
        RunOutcome::Runtime(err) => {
            panic!("expected pre-execution diagnostics, got runtime error: {err}")
        }
    }
}

pub fn run_runtime_error(source: &str) -> String {
    let buf = SharedBuf::default();
    match lox::run(source, Box::new(buf), true) {
        RunOutcome::Runtime(err) => err.to_string(),
        RunOutcome::Ok(_) => panic!("expected a runtime error, program ran cleanly"),
        RunOutcome::PreExecution(diagnostics) => {
            panic!("expected a runtime error, got diagnostics: {diagnostics:?}")
        }
    }
}
