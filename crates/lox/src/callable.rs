//! The callable protocol shared by user functions, bound methods, and native functions.
//!
//! Grounded on the teacher's `Function` (`function.rs`), which pairs a parameter list
//! with closure/cell-capture fields and a `class_cell_slot` used for `super` binding;
//! here the bytecode-frame capture becomes a plain `Rc<Environment>` closure, since a
//! tree walker doesn't need a separate cell-indirection layer — the environment chain
//! *is* the capture.

use std::{fmt, rc::Rc};

use crate::{
    ast::FunctionDecl,
    environment::Environment,
    interpreter::{Interpreter, Signal, Unwind},
    value::Value,
};

/// Anything that can appear on the left of a `Call` expression as a function (as
/// opposed to a class constructor, which is dispatched separately — see
/// `class::LoxClass::instantiate`).
pub trait Callable: fmt::Debug {
    fn arity(&self) -> usize;
    fn call(&self, interp: &Interpreter, args: Vec<Value>) -> Result<Value, Unwind>;
    /// Used by `Value`'s stringifier: `<fn name>`.
    fn display_name(&self) -> &str;
}

/// A user-defined function, function literal, or method, paired with the environment
/// active at its definition site. A bound method is the same struct with `closure`
/// rewrapped by one extra environment binding `this` (see `class::LoxInstance::get`).
#[derive(Debug)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<Environment>,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<Environment>,
        is_initializer: bool,
    ) -> Rc<Self> {
        Rc::new(Self {
            declaration,
            closure,
            is_initializer,
        })
    }

    /// Rewraps this function's closure with a fresh environment binding `this` (slot 0)
    /// to `instance`, producing the bound method `LoxInstance::get` hands out.
    #[must_use]
    pub fn bind(&self, instance: Value) -> Rc<Self> {
        let env = Environment::new(Some(Rc::clone(&self.closure)));
        env.define(instance);
        Rc::new(Self {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        })
    }

    fn name(&self) -> &str {
        self.declaration
            .name
            .as_ref()
            .map_or("anonymous", |t| t.lexeme.as_ref())
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interp: &Interpreter, args: Vec<Value>) -> Result<Value, Unwind> {
        let env = Environment::new(Some(Rc::clone(&self.closure)));
        for arg in args {
            env.define(arg);
        }

        match interp.execute_block(&self.declaration.body, env) {
            Ok(()) => Ok(if self.is_initializer {
                self.closure.get(0)
            } else {
                Value::Nil
            }),
            Err(Unwind::Signal(Signal::Return(value))) => Ok(if self.is_initializer {
                self.closure.get(0)
            } else {
                value
            }),
            Err(other) => Err(other),
        }
    }

    fn display_name(&self) -> &str {
        self.name()
    }
}

/// The body of a native function: takes the interpreter (for things like `clock`'s
/// wall-clock read) and the already-evaluated argument list, and returns a `Value`.
type NativeBody = Box<dyn Fn(&Interpreter, Vec<Value>) -> Value>;

/// Opaque foreign code exposed to Lox as a builtin. The interpreter registers exactly
/// one, `clock`, per spec §4.4 / §6.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeBody,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, interp: &Interpreter, args: Vec<Value>) -> Result<Value, Unwind> {
        Ok((self.func)(interp, args))
    }

    fn display_name(&self) -> &str {
        self.name
    }
}
