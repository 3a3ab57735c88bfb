//! Static resolution: assigns a `(slot, depth)` pair to every variable-bearing
//! expression and validates the well-formedness conditions in spec §4.3/§4.7.
//!
//! Grounded directly on cpplox's `Resolver` (`resolver.cpp`): parallel scope-stack
//! vectors (`name → slot`, `name → defined?`, usage tracking), the `declare`/`define`
//! two-step that makes `var a = a;` a diagnosable self-reference, and the
//! `FunctionType`/`ClassType` state machines gating `return`/`this`/`super` legality.
//! The one deliberate addition beyond the original is `SUPER_OUTSIDE_SUBCLASS`, resolved
//! at resolve time here since "does this class have a superclass" is statically known
//! (see SPEC_FULL.md §4.3 and DESIGN.md).

use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::{
    ast::{Expr, ExprId, ExprKind, FunctionDecl, Stmt},
    error::{Diagnostic, ErrorKind, Where},
    token::{Token, TokenKind},
};

/// The resolver's output for one variable use: which slot, and how many enclosing
/// hops away (`None` means the flat global environment).
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub slot: usize,
    pub depth: Option<usize>,
}

/// The side table mapping expression node identity to its resolved binding.
pub type Bindings = AHashMap<ExprId, Binding>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarState {
    Declared,
    Defined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

struct Scope {
    slots: AHashMap<Rc<str>, usize>,
    state: AHashMap<Rc<str>, VarState>,
    used: AHashSet<Rc<str>>,
    /// Line of the declaring token, kept only to give `UNUSED_LOCAL` a real line number.
    declared_at: AHashMap<Rc<str>, u32>,
    next_slot: usize,
}

impl Scope {
    fn new() -> Self {
        Self {
            slots: AHashMap::default(),
            state: AHashMap::default(),
            used: AHashSet::default(),
            declared_at: AHashMap::default(),
            next_slot: 0,
        }
    }
}

/// Walks the AST once, producing [`Bindings`] and collecting every resolve-phase
/// [`Diagnostic`] instead of stopping at the first.
pub struct Resolver {
    scopes: Vec<Scope>,
    globals: AHashMap<Rc<str>, usize>,
    next_global_slot: usize,
    bindings: Bindings,
    diagnostics: Vec<Diagnostic>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Resolver {
    /// Creates a resolver with the global slot layout matching the interpreter's native
    /// globals environment (`clock` occupies slot 0 in both).
    #[must_use]
    pub fn new() -> Self {
        let mut resolver = Self {
            scopes: Vec::new(),
            globals: AHashMap::default(),
            next_global_slot: 0,
            bindings: Bindings::default(),
            diagnostics: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        };
        resolver.define_global(&Rc::from("clock"));
        resolver
    }

    #[must_use]
    pub fn resolve_program(mut self, program: &[Stmt]) -> (Bindings, Vec<Diagnostic>) {
        for stmt in program {
            self.resolve_stmt(stmt);
        }
        (self.bindings, self.diagnostics)
    }

    /// Resolves one REPL line against persistent global state: the globals table and
    /// (empty, top-level) scope stack carry over from the previous line so earlier
    /// `var`/`fun`/`class` declarations stay visible, while the per-line bindings and
    /// diagnostics start fresh.
    pub fn resolve_line(&mut self, program: &[Stmt]) -> (Bindings, Vec<Diagnostic>) {
        self.bindings = Bindings::default();
        self.diagnostics = Vec::new();
        for stmt in program {
            self.resolve_stmt(stmt);
        }
        (
            std::mem::take(&mut self.bindings),
            std::mem::take(&mut self.diagnostics),
        )
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Block(stmts) => {
                self.begin_scope();
                for stmt in stmts {
                    self.resolve_stmt(stmt);
                }
                self.end_scope();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(branch) = else_branch {
                    self.resolve_stmt(branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Break(_) => {}
            Stmt::Function(decl) => {
                let name = decl
                    .name
                    .as_ref()
                    .expect("a declared function statement always has a name");
                self.declare(name);
                self.define(name);
                self.resolve_function(decl, FunctionType::Function);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.diag(
                        ErrorKind::ReturnAtTop,
                        keyword,
                        "Can't return from top-level code.",
                    );
                }
                if value.is_some() && self.current_function == FunctionType::Initializer {
                    self.diag(
                        ErrorKind::ReturnFromInit,
                        keyword,
                        "Can't return a value from an initializer.",
                    );
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) {
        let enclosing_class = self.current_class;
        self.declare(name);

        let mut has_superclass = false;
        if let Some(superclass_expr) = superclass {
            if let ExprKind::Variable(super_name) = &superclass_expr.kind
                && super_name.lexeme == name.lexeme
            {
                self.diag(
                    ErrorKind::SelfInherit,
                    super_name,
                    "A class can't inherit from itself.",
                );
            }
            self.resolve_expr(superclass_expr);
            has_superclass = true;
            self.current_class = ClassType::Subclass;
            self.begin_scope();
            self.define_synthetic("super");
        } else {
            self.current_class = ClassType::Class;
        }

        self.begin_scope();
        self.define_synthetic("this");

        for method in methods {
            let kind = if method
                .name
                .as_ref()
                .is_some_and(|n| n.lexeme.as_ref() == "init")
            {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();
        if has_superclass {
            self.end_scope();
        }

        self.define(name);
        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &Rc<FunctionDecl>, kind: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Unary { rhs, .. } => self.resolve_expr(rhs),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            ExprKind::Grouping(inner) => self.resolve_expr(inner),
            ExprKind::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            ExprKind::Logical { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            ExprKind::Variable(name) => self.resolve_variable_read(expr.id, name),
            ExprKind::Assign { name, value } => {
                self.resolve_expr(value);
                self.resolve_local_or_global(expr.id, name);
            }
            ExprKind::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::FunctionLiteral(decl) => self.resolve_function(decl, FunctionType::Function),
            ExprKind::PropertyGet { object, .. } => self.resolve_expr(object),
            ExprKind::PropertySet { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }
            ExprKind::This(keyword) => {
                if self.current_class == ClassType::None {
                    self.diag(
                        ErrorKind::ThisOutsideClass,
                        keyword,
                        "Can't use 'this' outside of a class.",
                    );
                }
                self.resolve_local_or_global(expr.id, keyword);
            }
            ExprKind::Super { keyword, .. } => {
                if self.current_class != ClassType::Subclass {
                    let message = if self.current_class == ClassType::None {
                        "Can't use 'super' outside of a class."
                    } else {
                        "Can't use 'super' in a class with no superclass."
                    };
                    self.diag(ErrorKind::SuperOutsideSubclass, keyword, message);
                }
                self.resolve_local_or_global(expr.id, keyword);
            }
        }
    }

    fn resolve_variable_read(&mut self, id: ExprId, name: &Token) {
        if let Some(scope) = self.scopes.last()
            && scope.state.get(name.lexeme.as_ref()) == Some(&VarState::Declared)
        {
            self.diag(
                ErrorKind::SelfInit,
                name,
                "Can't read local variable in its own initializer.",
            );
        }
        self.resolve_local_or_global(id, name);
    }

    fn resolve_local_or_global(&mut self, id: ExprId, name: &Token) {
        for (hops, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(&slot) = scope.slots.get(name.lexeme.as_ref()) {
                scope.used.insert(Rc::clone(&name.lexeme));
                self.bindings.insert(
                    id,
                    Binding {
                        slot,
                        depth: Some(hops),
                    },
                );
                return;
            }
        }

        if let Some(&slot) = self.globals.get(name.lexeme.as_ref()) {
            self.bindings.insert(id, Binding { slot, depth: None });
            return;
        }

        self.diag(
            ErrorKind::Undefined,
            name,
            format!("Undefined variable '{}'.", name.lexeme),
        );
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.state.contains_key(name.lexeme.as_ref()) {
            self.diag(
                ErrorKind::DuplicateLocal,
                name,
                "Already a variable with this name in this scope.",
            );
            return;
        }
        scope
            .state
            .insert(Rc::clone(&name.lexeme), VarState::Declared);
        scope.declared_at.insert(Rc::clone(&name.lexeme), name.line);
    }

    fn define(&mut self, name: &Token) -> usize {
        if let Some(scope) = self.scopes.last_mut() {
            let slot = scope.next_slot;
            scope.next_slot += 1;
            scope.slots.insert(Rc::clone(&name.lexeme), slot);
            scope
                .state
                .insert(Rc::clone(&name.lexeme), VarState::Defined);
            scope.declared_at.insert(Rc::clone(&name.lexeme), name.line);
            slot
        } else {
            self.define_global(&name.lexeme)
        }
    }

    fn define_global(&mut self, name: &Rc<str>) -> usize {
        let slot = self.next_global_slot;
        self.next_global_slot += 1;
        self.globals.insert(Rc::clone(name), slot);
        slot
    }

    /// Binds `this`/`super` directly at slot 0 of a freshly begun scope.
    fn define_synthetic(&mut self, name: &'static str) {
        let scope = self.scopes.last_mut().expect("a scope was just begun");
        let key: Rc<str> = Rc::from(name);
        let slot = scope.next_slot;
        scope.next_slot += 1;
        scope.slots.insert(Rc::clone(&key), slot);
        scope.state.insert(key, VarState::Defined);
    }

    fn begin_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    fn end_scope(&mut self) {
        let scope = self
            .scopes
            .pop()
            .expect("end_scope without a matching begin_scope");
        for name in scope.state.keys() {
            let is_synthetic = name.as_ref() == "this" || name.as_ref() == "super";
            if !is_synthetic && !scope.used.contains(name) {
                let line = scope.declared_at.get(name).copied().unwrap_or(0);
                self.diagnostics.push(Diagnostic::new(
                    ErrorKind::UnusedLocal,
                    line,
                    Where::AtLexeme(name.to_string()),
                    "Local variable not used.",
                ));
            }
        }
    }

    fn diag(&mut self, kind: ErrorKind, token: &Token, message: impl Into<String>) {
        let location = if token.kind == TokenKind::Eof {
            Where::AtEnd
        } else {
            Where::AtLexeme(token.lexeme.to_string())
        };
        self.diagnostics
            .push(Diagnostic::new(kind, token.line, location, message));
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
