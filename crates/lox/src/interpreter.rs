//! The tree-walking evaluator: drives environments, callables, and class dispatch
//! against the AST and the resolver's binding side table.
//!
//! Grounded on cpplox's `Interpreter` (`interpreter.cpp`) for per-node semantics (the
//! `valueStack_`-based visitor becomes direct recursive evaluation returning `Value`),
//! and on the teacher's `run.rs`/`bytecode/vm/mod.rs` for the shape of a driver that
//! owns the output sink and reports a single fatal error per run rather than collecting
//! many, the way the resolver does.

use std::{
    cell::{Cell, RefCell},
    io::Write,
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

use ahash::AHashMap;

use crate::{
    ast::{Expr, ExprKind, LiteralValue, LogicalOp, Stmt},
    callable::{LoxFunction, NativeFunction},
    class::LoxClass,
    environment::Environment,
    error::{RuntimeError, RuntimeErrorKind},
    resolver::Bindings,
    token::{Token, TokenKind},
    value::{NumberFormat, Value},
};

/// The non-error control-flow channel `return` and `break` travel through. Distinct
/// from [`RuntimeError`] — a `Signal` escaping the top-level `interpret` call would be
/// an internal bug, not a user-facing condition (the resolver guarantees it never does).
#[derive(Debug, Clone)]
pub enum Signal {
    Return(Value),
    Break,
}

/// Either a fatal runtime error or a control-flow signal unwinding to its catcher
/// (function-call frame for `Return`, nearest `while` for `Break`).
#[derive(Debug, Clone)]
pub enum Unwind {
    Error(RuntimeError),
    Signal(Signal),
}

impl Unwind {
    #[must_use]
    pub fn into_runtime_error(self) -> Option<RuntimeError> {
        match self {
            Self::Error(err) => Some(err),
            Self::Signal(_) => None,
        }
    }
}

impl From<RuntimeError> for Unwind {
    fn from(err: RuntimeError) -> Self {
        Self::Error(err)
    }
}

/// The host call-stack depth at which a runaway recursive Lox program is reported as a
/// `STACK_OVERFLOW` runtime error instead of being left to crash the host process.
const MAX_CALL_DEPTH: usize = 400;

/// Owns the current environment pointer, the globals environment, the resolver's
/// binding side table, and the output sink `print` writes to.
pub struct Interpreter {
    pub globals: Rc<Environment>,
    environment: RefCell<Rc<Environment>>,
    bindings: RefCell<Bindings>,
    out: RefCell<Box<dyn Write>>,
    depth: Cell<usize>,
    test_mode: bool,
}

impl Interpreter {
    /// Builds an interpreter whose globals environment matches the slot layout the
    /// resolver assumed (`clock` at slot 0, see `Resolver::new`). `test_mode` pins
    /// `clock()` to zero for deterministic golden tests.
    #[must_use]
    pub fn new(bindings: Bindings, out: Box<dyn Write>, test_mode: bool) -> Self {
        let globals = Environment::new(None);
        let clock = NativeFunction {
            name: "clock",
            arity: 0,
            func: Box::new(|interp: &Self, _args| {
                if interp.test_mode {
                    Value::Number(0.0)
                } else {
                    let millis = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_or(0.0, |d| d.as_millis() as f64);
                    Value::Number(millis)
                }
            }),
        };
        globals.define(Value::Callable(Rc::new(clock)));

        Self {
            environment: RefCell::new(Rc::clone(&globals)),
            globals,
            bindings: RefCell::new(bindings),
            out: RefCell::new(out),
            depth: Cell::new(0),
            test_mode,
        }
    }

    /// Swaps in a fresh binding side table. Used between REPL lines, where each line is
    /// parsed and resolved independently (and so has its own `ExprId` numbering) while
    /// the environment chain underneath keeps accumulating declarations.
    pub fn set_bindings(&self, bindings: Bindings) {
        *self.bindings.borrow_mut() = bindings;
    }

    /// Evaluates a single top-level expression, as the REPL does for a bare-expression
    /// line. A `Signal` can never legally escape here (`return`/`break` are statements,
    /// unreachable from expression grammar), so one is treated as a parser/resolver bug.
    pub fn eval_top_level_expr(&self, expr: &Expr) -> Result<Value, RuntimeError> {
        match self.eval_expr(expr) {
            Ok(value) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
            Err(Unwind::Signal(_)) => unreachable!("a bare expression cannot contain return/break"),
        }
    }

    /// Executes the whole program, stopping at the first runtime error (there is at
    /// most one per `interpret` call).
    pub fn interpret(&self, program: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in program {
            match self.exec_stmt(stmt) {
                Ok(()) => {}
                Err(Unwind::Error(err)) => return Err(err),
                Err(Unwind::Signal(_)) => {
                    unreachable!("resolver rejects return/break that would escape the top level")
                }
            }
        }
        Ok(())
    }

    /// Runs `stmts` under a fresh environment chained onto `env`'s enclosing pointer,
    /// restoring the prior "current environment" on every exit path — normal,
    /// `Signal`, or error. Shared by `Block` and function-call frames.
    pub fn execute_block(&self, stmts: &[Stmt], env: Rc<Environment>) -> Result<(), Unwind> {
        let depth = self.depth.get() + 1;
        if depth > MAX_CALL_DEPTH {
            return Err(
                RuntimeError::new(RuntimeErrorKind::StackOverflow, 0, "Stack overflow.").into(),
            );
        }
        self.depth.set(depth);

        let previous = self.environment.replace(env);
        let result = stmts.iter().try_for_each(|stmt| self.exec_stmt(stmt));
        self.environment.replace(previous);

        self.depth.set(depth - 1);
        result
    }

    fn current_env(&self) -> Rc<Environment> {
        Rc::clone(&self.environment.borrow())
    }

    fn exec_stmt(&self, stmt: &Stmt) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval_expr(expr)?;
                Ok(())
            }
            Stmt::Print(expr) => {
                let value = self.eval_expr(expr)?;
                writeln!(
                    self.out.borrow_mut(),
                    "{}",
                    value.stringify(NumberFormat::Fixed)
                )
                .expect("print sink accepts writes");
                Ok(())
            }
            Stmt::Var { initializer, .. } => {
                let value = match initializer {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                self.current_env().define(value);
                Ok(())
            }
            Stmt::Block(stmts) => {
                let env = Environment::new(Some(self.current_env()));
                self.execute_block(stmts, env)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.exec_stmt(then_branch)
                } else if let Some(branch) = else_branch {
                    self.exec_stmt(branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.eval_expr(condition)?.is_truthy() {
                    match self.exec_stmt(body) {
                        Ok(()) => {}
                        Err(Unwind::Signal(Signal::Break)) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }
            Stmt::Break(_) => Err(Unwind::Signal(Signal::Break)),
            Stmt::Function(decl) => {
                let function = LoxFunction::new(Rc::clone(decl), self.current_env(), false);
                self.current_env().define(Value::Callable(function));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                Err(Unwind::Signal(Signal::Return(value)))
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.exec_class_decl(name, superclass.as_ref(), methods),
        }
    }

    fn exec_class_decl(
        &self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::ast::FunctionDecl>],
    ) -> Result<(), Unwind> {
        let superclass_value = match superclass {
            Some(expr) => {
                let value = self.eval_expr(expr)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        return Err(RuntimeError::new(
                            RuntimeErrorKind::SuperNotClass,
                            name.line,
                            "Superclass must be a class.",
                        )
                        .into());
                    }
                }
            }
            None => None,
        };

        let slot = self.current_env().define(Value::Nil);

        let method_closure = match &superclass_value {
            Some(superclass) => {
                let env = Environment::new(Some(self.current_env()));
                env.define(Value::Class(Rc::clone(superclass)));
                env
            }
            None => self.current_env(),
        };

        let mut method_table = AHashMap::default();
        for method in methods {
            let method_name = method
                .name
                .as_ref()
                .expect("every method has a name")
                .lexeme
                .clone();
            let is_initializer = method_name.as_ref() == "init";
            let function = LoxFunction::new(
                Rc::clone(method),
                Rc::clone(&method_closure),
                is_initializer,
            );
            method_table.insert(method_name, function);
        }

        let class = Rc::new(LoxClass::new(
            Rc::clone(&name.lexeme),
            method_table,
            superclass_value,
        ));
        self.current_env().assign(slot, Value::Class(class));
        Ok(())
    }

    fn eval_expr(&self, expr: &Expr) -> Result<Value, Unwind> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(literal_value(literal)),
            ExprKind::Grouping(inner) => self.eval_expr(inner),
            ExprKind::Unary { op, rhs } => self.eval_unary(op, rhs),
            ExprKind::Binary { lhs, op, rhs } => self.eval_binary(lhs, op, rhs),
            ExprKind::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(cond)?.is_truthy() {
                    self.eval_expr(then_branch)
                } else {
                    self.eval_expr(else_branch)
                }
            }
            ExprKind::Logical { lhs, op, rhs } => {
                let left = self.eval_expr(lhs)?;
                match op {
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    LogicalOp::And if !left.is_truthy() => Ok(left),
                    _ => self.eval_expr(rhs),
                }
            }
            ExprKind::Variable(_) => Ok(self.read_binding(expr.id)),
            ExprKind::This(_) => Ok(self.read_binding(expr.id)),
            ExprKind::Assign { value, .. } => {
                let value = self.eval_expr(value)?;
                self.write_binding(expr.id, value.clone());
                Ok(value)
            }
            ExprKind::Call {
                callee,
                paren,
                args,
            } => self.eval_call(callee, paren, args),
            ExprKind::FunctionLiteral(decl) => Ok(Value::Callable(LoxFunction::new(
                Rc::clone(decl),
                self.current_env(),
                false,
            ))),
            ExprKind::PropertyGet { object, name } => {
                let object = self.eval_expr(object)?;
                match object {
                    Value::Instance(instance) => {
                        crate::class::LoxInstance::get(&instance, name).map_err(Unwind::from)
                    }
                    _ => Err(RuntimeError::new(
                        RuntimeErrorKind::OnlyInstances,
                        name.line,
                        "Only instances have properties.",
                    )
                    .into()),
                }
            }
            ExprKind::PropertySet {
                object,
                name,
                value,
            } => {
                let object = self.eval_expr(object)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::OnlyInstances,
                        name.line,
                        "Only instances have fields.",
                    )
                    .into());
                };
                let value = self.eval_expr(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }
            ExprKind::Super { method, .. } => self.eval_super(expr.id, method),
        }
    }

    fn eval_unary(&self, op: &Token, rhs: &Expr) -> Result<Value, Unwind> {
        let value = self.eval_expr(rhs)?;
        match op.kind {
            TokenKind::Bang => Ok(Value::Boolean(!value.is_truthy())),
            TokenKind::Minus => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(type_error(
                    op.line,
                    &format!("Operand must be a number, got {}.", other.type_name()),
                )),
            },
            _ => unreachable!("unary operator set is fixed by the parser"),
        }
    }

    fn eval_binary(&self, lhs: &Expr, op: &Token, rhs: &Expr) -> Result<Value, Unwind> {
        let left = self.eval_expr(lhs)?;
        let right = self.eval_expr(rhs)?;

        match op.kind {
            TokenKind::Comma => Ok(left),
            TokenKind::BangEqual => Ok(Value::Boolean(!left.lox_eq(&right))),
            TokenKind::EqualEqual => Ok(Value::Boolean(left.lox_eq(&right))),
            TokenKind::Plus => eval_plus(left, right, op.line),
            TokenKind::Minus => numeric_op(left, right, op.line, |a, b| Value::Number(a - b)),
            TokenKind::Star => numeric_op(left, right, op.line, |a, b| Value::Number(a * b)),
            TokenKind::Slash => numeric_op(left, right, op.line, |a, b| Value::Number(a / b)),
            TokenKind::Greater => numeric_op(left, right, op.line, |a, b| Value::Boolean(a > b)),
            TokenKind::GreaterEqual => {
                numeric_op(left, right, op.line, |a, b| Value::Boolean(a >= b))
            }
            TokenKind::Less => numeric_op(left, right, op.line, |a, b| Value::Boolean(a < b)),
            TokenKind::LessEqual => numeric_op(left, right, op.line, |a, b| Value::Boolean(a <= b)),
            _ => unreachable!("binary operator set is fixed by the parser"),
        }
    }

    fn eval_call(&self, callee: &Expr, paren: &Token, args: &[Expr]) -> Result<Value, Unwind> {
        let callee_value = self.eval_expr(callee)?;
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expr(arg)?);
        }

        match callee_value {
            Value::Callable(callable) => {
                check_arity(callable.arity(), arg_values.len(), paren)?;
                callable.call(self, arg_values)
            }
            Value::Class(class) => {
                check_arity(class.arity(), arg_values.len(), paren)?;
                class.instantiate(self, arg_values).map_err(Unwind::from)
            }
            other => Err(RuntimeError::new(
                RuntimeErrorKind::NotCallable,
                paren.line,
                format!(
                    "Can only call functions and classes, not {}.",
                    other.type_name()
                ),
            )
            .into()),
        }
    }

    fn eval_super(&self, id: crate::ast::ExprId, method: &Token) -> Result<Value, Unwind> {
        let bindings = self.bindings.borrow();
        let binding = bindings
            .get(&id)
            .expect("resolver binds every `super` expression");
        let depth = binding.depth.expect("`super` is always a local binding");
        let superclass_value = self.current_env().get_at(binding.slot, depth);
        let Value::Class(superclass) = superclass_value else {
            unreachable!("the resolver only binds `super` to the synthetic superclass slot")
        };
        let this_value = self.current_env().get_at(0, depth - 1);

        let method = superclass
            .find_method(method.lexeme.as_ref())
            .ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::UndefinedProperty,
                    method.line,
                    format!("Undefined property '{}'.", method.lexeme),
                )
            })?;
        Ok(Value::Callable(method.bind(this_value)))
    }

    fn read_binding(&self, id: crate::ast::ExprId) -> Value {
        let bindings = self.bindings.borrow();
        let binding = bindings
            .get(&id)
            .expect("resolver binds every variable-bearing expression");
        match binding.depth {
            Some(depth) => self.current_env().get_at(binding.slot, depth),
            None => self.globals.get(binding.slot),
        }
    }

    fn write_binding(&self, id: crate::ast::ExprId, value: Value) {
        let bindings = self.bindings.borrow();
        let binding = bindings
            .get(&id)
            .expect("resolver binds every variable-bearing expression");
        match binding.depth {
            Some(depth) => self.current_env().assign_at(binding.slot, value, depth),
            None => self.globals.assign(binding.slot, value),
        }
    }
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::String(s) => Value::String(Rc::clone(s)),
        LiteralValue::Boolean(b) => Value::Boolean(*b),
        LiteralValue::Nil => Value::Nil,
    }
}

fn type_error(line: u32, message: &str) -> Unwind {
    RuntimeError::new(RuntimeErrorKind::Type, line, message.to_string()).into()
}

fn numeric_op(
    left: Value,
    right: Value,
    line: u32,
    f: impl FnOnce(f64, f64) -> Value,
) -> Result<Value, Unwind> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(f(a, b)),
        _ => Err(type_error(line, "Operands must be numbers.")),
    }
}

fn eval_plus(left: Value, right: Value, line: u32) -> Result<Value, Unwind> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(Rc::from(format!("{a}{b}")))),
        (Value::Number(a), Value::String(b)) => Ok(Value::String(Rc::from(format!(
            "{}{b}",
            Value::Number(a).stringify(NumberFormat::Fixed)
        )))),
        (Value::String(a), Value::Number(b)) => Ok(Value::String(Rc::from(format!(
            "{a}{}",
            Value::Number(b).stringify(NumberFormat::Fixed)
        )))),
        _ => Err(type_error(
            line,
            "Operands must be two numbers or two strings.",
        )),
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<(), Unwind> {
    if expected != got {
        return Err(RuntimeError::new(
            RuntimeErrorKind::Arity,
            paren.line,
            format!("Expected {expected} arguments but got {got}."),
        )
        .into());
    }
    Ok(())
}
