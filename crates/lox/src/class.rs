//! Classes, instances, and the method-resolution protocol for single inheritance.
//!
//! Grounded on the teacher's `types/class.rs`, trimmed from Python's full MRO and
//! metaclass machinery down to Lox's single superclass chain; the method-table-plus-
//! field-map split comes from cpplox's `loxclass.h`/`loxinstance.h`.

use std::{cell::RefCell, fmt, rc::Rc};

use ahash::AHashMap;

use crate::{
    callable::{Callable, LoxFunction},
    error::{RuntimeError, RuntimeErrorKind},
    interpreter::Interpreter,
    token::Token,
    value::Value,
};

/// A class: its own method table plus an optional superclass link. Method lookup walks
/// the chain; Lox has no multiple inheritance, so there is no MRO to compute.
#[derive(Debug)]
pub struct LoxClass {
    pub name: Rc<str>,
    methods: AHashMap<Rc<str>, Rc<LoxFunction>>,
    pub superclass: Option<Rc<Self>>,
}

impl LoxClass {
    #[must_use]
    pub fn new(
        name: Rc<str>,
        methods: AHashMap<Rc<str>, Rc<LoxFunction>>,
        superclass: Option<Rc<Self>>,
    ) -> Self {
        Self {
            name,
            methods,
            superclass,
        }
    }

    /// Looks up `name` in this class's own table, then delegates to the superclass chain.
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass.as_ref().and_then(|s| s.find_method(name))
    }

    /// The arity a constructor call must satisfy: `init`'s arity if defined, else zero.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Constructs a fresh instance and runs `init` (if any) against `args`.
    ///
    /// # Panics
    ///
    /// Panics if `init`'s body produces a `Break` signal — the resolver rejects `break`
    /// outside a loop, so a function body can only ever unwind via `Return` or an error.
    pub fn instantiate(
        self: &Rc<Self>,
        interp: &Interpreter,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let instance = Rc::new(RefCell::new(LoxInstance {
            class: Rc::clone(self),
            fields: AHashMap::default(),
        }));
        if let Some(init) = self.find_method("init") {
            let bound = init.bind(Value::Instance(Rc::clone(&instance)));
            bound.call(interp, args).map_err(|unwind| {
                unwind
                    .into_runtime_error()
                    .expect("init body cannot escape a Return/Break signal")
            })?;
        }
        Ok(Value::Instance(instance))
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A live object: its class plus an unbounded, interior-mutable field map. Fields take
/// priority over methods on `get`, matching cpplox's `loxinstance.cpp`.
#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: AHashMap<Rc<str>, Value>,
}

impl LoxInstance {
    /// Reads `name` off `instance`: a field if one exists, else a method bound to this
    /// instance, else `UNDEFINED_PROPERTY`.
    pub fn get(instance: &Rc<RefCell<Self>>, name: &Token) -> Result<Value, RuntimeError> {
        {
            let this = instance.borrow();
            if let Some(value) = this.fields.get(name.lexeme.as_ref()) {
                return Ok(value.clone());
            }
        }
        let class = Rc::clone(&instance.borrow().class);
        if let Some(method) = class.find_method(name.lexeme.as_ref()) {
            let bound = method.bind(Value::Instance(Rc::clone(instance)));
            return Ok(Value::Callable(bound));
        }
        Err(RuntimeError::new(
            RuntimeErrorKind::UndefinedProperty,
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Unconditionally overwrites or creates the field named `name`.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(Rc::clone(&name.lexeme), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
