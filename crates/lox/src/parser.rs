//! Recursive-descent parser: tokens in, an AST plus collected diagnostics out.
//!
//! Grounded on the teacher's own recursive-descent expression parser (`parser.rs`'s
//! precedence-climbing `parse_expr`) for the shape of a Pratt-free, one-function-per-
//! precedence-level cascade, and on cpplox's `Parser` (`parser.cpp`) for the exact
//! grammar this crate targets (comma, ternary, and the assignment-target check are
//! cpplox's own extensions to the book grammar). Errors are collected and the parser
//! synchronizes to the next statement boundary rather than aborting on the first one.

use std::rc::Rc;

use crate::{
    ast::{Expr, ExprId, ExprKind, FunctionDecl, LiteralValue, LogicalOp, Stmt},
    error::{Diagnostic, ErrorKind, Where},
    token::{Literal, Token, TokenKind},
};

const MAX_PARAMS: usize = 255;

/// Signals "a diagnostic was already recorded, unwind to the nearest recovery point" —
/// never surfaced to callers directly.
struct ParseError;

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Vec<Diagnostic>,
    loop_depth: u32,
    next_expr_id: ExprId,
}

impl Parser {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            loop_depth: 0,
            next_expr_id: 0,
        }
    }

    /// Parses a whole program: zero or more declarations until `Eof`.
    #[must_use]
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<Diagnostic>) {
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => stmts.push(stmt),
                Err(ParseError) => self.synchronize(),
            }
        }
        (stmts, self.diagnostics)
    }

    /// Tries to parse the whole token stream as a single expression followed by `Eof`,
    /// consuming no trailing semicolon. Used by the REPL to decide whether a line is a
    /// bare expression (echo its value) or a full statement sequence. Returns `None`
    /// (discarding any diagnostics raised along the way) on any parse failure or
    /// leftover input, leaving statement-mode parsing to retry from scratch.
    #[must_use]
    pub fn parse_single_expression(mut self) -> Option<Expr> {
        let expr = self.expression().ok()?;
        if self.diagnostics.is_empty() && self.check(TokenKind::Eof) {
            Some(expr)
        } else {
            None
        }
    }

    // --- declarations -------------------------------------------------------------

    fn declaration(&mut self) -> PResult<Stmt> {
        if self.match_token(TokenKind::Class) {
            return self.class_declaration();
        }
        if self.check(TokenKind::Fun) && self.check_next(TokenKind::Identifier) {
            self.advance();
            return self
                .function_declaration()
                .map(|decl| Stmt::Function(Rc::new(decl)));
        }
        if self.match_token(TokenKind::Var) {
            return self.var_declaration();
        }
        self.statement()
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name = self
            .consume(TokenKind::Identifier, "Expect class name.")?
            .clone();

        let superclass = if self.match_token(TokenKind::Less) {
            let super_name = self
                .consume(TokenKind::Identifier, "Expect superclass name.")?
                .clone();
            Some(self.expr(super_name.line, ExprKind::Variable(super_name)))
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(Rc::new(self.function_declaration()?));
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    /// Parses `IDENT "(" params? ")" block`, shared by named functions and methods.
    fn function_declaration(&mut self) -> PResult<FunctionDecl> {
        let name = self
            .consume(TokenKind::Identifier, "Expect function name.")?
            .clone();
        let (params, body) = self.function_tail("function")?;
        Ok(FunctionDecl {
            name: Some(name),
            params,
            body,
        })
    }

    fn function_tail(&mut self, kind: &str) -> PResult<(Vec<Token>, Vec<Stmt>)> {
        self.consume(
            TokenKind::LeftParen,
            &format!("Expect '(' after {kind} name."),
        )?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_PARAMS {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                params.push(
                    self.consume(TokenKind::Identifier, "Expect parameter name.")?
                        .clone(),
                );
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(
            TokenKind::LeftBrace,
            &format!("Expect '{{' before {kind} body."),
        )?;
        let body = self.block()?;
        Ok((params, body))
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name = self
            .consume(TokenKind::Identifier, "Expect variable name.")?
            .clone();
        let initializer = if self.match_token(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    // --- statements -----------------------------------------------------------------

    fn statement(&mut self) -> PResult<Stmt> {
        if self.match_token(TokenKind::Print) {
            return self.print_statement();
        }
        if self.match_token(TokenKind::LeftBrace) {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.match_token(TokenKind::If) {
            return self.if_statement();
        }
        if self.match_token(TokenKind::While) {
            return self.while_statement();
        }
        if self.match_token(TokenKind::For) {
            return self.for_statement();
        }
        if self.match_token(TokenKind::Return) {
            return self.return_statement();
        }
        if self.match_token(TokenKind::Break) {
            return self.break_statement();
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => stmts.push(stmt),
                Err(ParseError) => self.synchronize(),
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        Ok(Stmt::While {
            condition,
            body: Box::new(body?),
        })
    }

    /// Desugars directly into `Block{ initializer?; While{ cond; Block{body; increment?} } }`,
    /// with the increment living *inside* the while body so `break` still exits the loop
    /// without running it once more.
    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_token(TokenKind::Semicolon) {
            None
        } else if self.match_token(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenKind::Semicolon) {
            let line = self.peek().line;
            self.expr(line, ExprKind::Literal(LiteralValue::Boolean(true)))
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        self.loop_depth += 1;
        let body_result = self.statement();
        self.loop_depth -= 1;
        let mut body = body_result?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let loop_stmt = Stmt::While {
            condition,
            body: Box::new(body),
        };

        Ok(match initializer {
            Some(initializer) => Stmt::Block(vec![initializer, loop_stmt]),
            None => loop_stmt,
        })
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn break_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        if self.loop_depth == 0 {
            self.diag(
                ErrorKind::BreakOutsideLoop,
                &keyword,
                "Can't use 'break' outside of a loop.",
            );
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after 'break'.")?;
        Ok(Stmt::Break(keyword))
    }

    // --- expressions ------------------------------------------------------------

    fn expression(&mut self) -> PResult<Expr> {
        self.comma()
    }

    fn comma(&mut self) -> PResult<Expr> {
        let mut expr = self.assignment()?;
        while self.match_token(TokenKind::Comma) {
            let op = self.previous().clone();
            let rhs = self.assignment()?;
            expr = self.expr(
                op.line,
                ExprKind::Binary {
                    lhs: Box::new(expr),
                    op,
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(expr)
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.logic_or()?;

        if self.match_token(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;
            return match expr.kind {
                ExprKind::Variable(name) => Ok(self.expr(
                    equals.line,
                    ExprKind::Assign {
                        name,
                        value: Box::new(value),
                    },
                )),
                ExprKind::PropertyGet { object, name } => Ok(self.expr(
                    equals.line,
                    ExprKind::PropertySet {
                        object,
                        name,
                        value: Box::new(value),
                    },
                )),
                _ => {
                    self.diag(ErrorKind::Parse, &equals, "Invalid assignment target.");
                    Err(ParseError)
                }
            };
        }

        Ok(expr)
    }

    fn logic_or(&mut self) -> PResult<Expr> {
        let mut expr = self.logic_and()?;
        while self.match_token(TokenKind::Or) {
            let line = self.previous().line;
            let rhs = self.logic_and()?;
            expr = self.expr(
                line,
                ExprKind::Logical {
                    lhs: Box::new(expr),
                    op: LogicalOp::Or,
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_token(TokenKind::And) {
            let line = self.previous().line;
            let rhs = self.equality()?;
            expr = self.expr(
                line,
                ExprKind::Logical {
                    lhs: Box::new(expr),
                    op: LogicalOp::And,
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.ternary()?;
        while self.match_any(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let rhs = self.ternary()?;
            expr = self.expr(
                op.line,
                ExprKind::Binary {
                    lhs: Box::new(expr),
                    op,
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(expr)
    }

    fn ternary(&mut self) -> PResult<Expr> {
        let mut expr = self.comparison()?;
        while self.match_token(TokenKind::Question) {
            let line = self.previous().line;
            let then_branch = self.expression()?;
            self.consume(TokenKind::Colon, "Expect ':' in ternary expression.")?;
            let else_branch = self.comparison()?;
            expr = self.expr(
                line,
                ExprKind::Ternary {
                    cond: Box::new(expr),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
            );
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.term()?;
        while self.match_any(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let rhs = self.term()?;
            expr = self.expr(
                op.line,
                ExprKind::Binary {
                    lhs: Box::new(expr),
                    op,
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr = self.factor()?;
        while self.match_any(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = self.previous().clone();
            let rhs = self.factor()?;
            expr = self.expr(
                op.line,
                ExprKind::Binary {
                    lhs: Box::new(expr),
                    op,
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        while self.match_any(&[TokenKind::Star, TokenKind::Slash]) {
            let op = self.previous().clone();
            let rhs = self.unary()?;
            expr = self.expr(
                op.line,
                ExprKind::Binary {
                    lhs: Box::new(expr),
                    op,
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.match_any(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let rhs = self.unary()?;
            return Ok(self.expr(
                op.line,
                ExprKind::Unary {
                    op,
                    rhs: Box::new(rhs),
                },
            ));
        }
        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.match_token(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(TokenKind::Dot) {
                let name = self
                    .consume(TokenKind::Identifier, "Expect property name after '.'.")?
                    .clone();
                expr = self.expr(
                    name.line,
                    ExprKind::PropertyGet {
                        object: Box::new(expr),
                        name,
                    },
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_PARAMS {
                    self.error_at_current("Can't have more than 255 arguments.");
                }
                args.push(self.assignment()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self
            .consume(TokenKind::RightParen, "Expect ')' after arguments.")?
            .clone();
        Ok(self.expr(
            paren.line,
            ExprKind::Call {
                callee: Box::new(callee),
                paren,
                args,
            },
        ))
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::False => {
                self.advance();
                Ok(self.expr(token.line, ExprKind::Literal(LiteralValue::Boolean(false))))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.expr(token.line, ExprKind::Literal(LiteralValue::Boolean(true))))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(self.expr(token.line, ExprKind::Literal(LiteralValue::Nil)))
            }
            TokenKind::Number => {
                self.advance();
                let Some(Literal::Number(n)) = token.literal else {
                    unreachable!("scanner always attaches a literal to Number")
                };
                Ok(self.expr(token.line, ExprKind::Literal(LiteralValue::Number(n))))
            }
            TokenKind::String => {
                self.advance();
                let Some(Literal::String(s)) = token.literal else {
                    unreachable!("scanner always attaches a literal to String")
                };
                Ok(self.expr(token.line, ExprKind::Literal(LiteralValue::String(s))))
            }
            TokenKind::This => {
                self.advance();
                Ok(self.expr(token.line, ExprKind::This(token)))
            }
            TokenKind::Super => {
                self.advance();
                let keyword = token;
                self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
                let method = self
                    .consume(TokenKind::Identifier, "Expect superclass method name.")?
                    .clone();
                Ok(self.expr(keyword.line, ExprKind::Super { keyword, method }))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(self.expr(token.line, ExprKind::Variable(token)))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                Ok(self.expr(token.line, ExprKind::Grouping(Box::new(inner))))
            }
            TokenKind::Fun => {
                self.advance();
                let (params, body) = self.function_tail("function")?;
                Ok(self.expr(
                    token.line,
                    ExprKind::FunctionLiteral(Rc::new(FunctionDecl {
                        name: None,
                        params,
                        body,
                    })),
                ))
            }
            _ => {
                self.error_at_current("Expect expression.");
                Err(ParseError)
            }
        }
    }

    // --- token-stream plumbing -----------------------------------------------------

    fn expr(&mut self, line: u32, kind: ExprKind) -> Expr {
        let id = self.next_expr_id;
        self.next_expr_id += 1;
        Expr { id, line, kind }
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|&kind| self.check(kind)) && {
            self.advance();
            true
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        self.error_at_current(message);
        Err(ParseError)
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.peek().clone();
        self.diag(ErrorKind::Parse, &token, message);
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

    /// Discards tokens until the start of what looks like the next statement, so one
    /// syntax error doesn't suppress every diagnostic after it.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

/// Convenience entry point mirroring `lexer::scan`.
#[must_use]
pub fn parse(tokens: Vec<Token>) -> (Vec<Stmt>, Vec<Diagnostic>) {
    Parser::new(tokens).parse()
}
