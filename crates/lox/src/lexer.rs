//! Hand-written scanner: source bytes in, a terminated `Vec<Token>` out.
//!
//! Grounded on the original cpplox `Scanner` (`start`/`current`/`line` cursor trio,
//! per-character `scanToken` dispatch, nesting-aware block comments). Errors are
//! collected rather than raised so the driver can surface every lexical mistake in
//! one pass instead of stopping at the first.

use std::rc::Rc;

use crate::{
    error::{Diagnostic, ErrorKind, Where},
    token::{Literal, Token, TokenKind},
};

fn keyword(text: &str) -> Option<TokenKind> {
    use TokenKind::{
        And, Break, Class, Else, False, For, Fun, If, Nil, Or, Print, Return, Super, This, True,
        Var, While,
    };
    Some(match text {
        "and" => And,
        "break" => Break,
        "class" => Class,
        "else" => Else,
        "false" => False,
        "for" => For,
        "fun" => Fun,
        "if" => If,
        "nil" => Nil,
        "or" => Or,
        "print" => Print,
        "return" => Return,
        "super" => Super,
        "this" => This,
        "true" => True,
        "var" => Var,
        "while" => While,
        _ => return None,
    })
}

/// Scans `source` into a token stream and a list of lexical diagnostics. The token
/// stream is always `Eof`-terminated, even when diagnostics were emitted.
pub struct Scanner<'a> {
    source: &'a [u8],
    start: usize,
    current: usize,
    line: u32,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn scan(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens.push(Token::new(TokenKind::Eof, "", self.line));
        (self.tokens, self.diagnostics)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current] as char;
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current] as char
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1] as char
        }
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] as char != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn lexeme(&self) -> &str {
        std::str::from_utf8(&self.source[self.start..self.current])
            .expect("source is valid UTF-8 ASCII-superset")
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = self.lexeme().to_owned();
        self.tokens.push(Token::new(kind, lexeme, self.line));
    }

    fn error(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(
            ErrorKind::Lex,
            self.line,
            Where::Empty,
            message,
        ));
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            '-' => self.add_token(TokenKind::Minus),
            '+' => self.add_token(TokenKind::Plus),
            ';' => self.add_token(TokenKind::Semicolon),
            '*' => self.add_token(TokenKind::Star),
            '?' => self.add_token(TokenKind::Question),
            ':' => self.add_token(TokenKind::Colon),
            '!' => {
                let kind = if self.matches('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            '=' => {
                let kind = if self.matches('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.matches('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            '>' => {
                let kind = if self.matches('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            '/' => {
                if self.matches('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.matches('*') {
                    self.block_comment();
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if is_alpha(c) => self.identifier(),
            _ => self.error("Unexpected character."),
        }
    }

    fn block_comment(&mut self) {
        let opened_at = self.line;
        let mut depth = 1usize;
        while depth > 0 && !self.is_at_end() {
            match (self.peek(), self.peek_next()) {
                ('*', '/') => {
                    self.advance();
                    self.advance();
                    depth -= 1;
                }
                ('/', '*') => {
                    self.advance();
                    self.advance();
                    depth += 1;
                }
                ('\n', _) => {
                    self.line += 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
        if depth > 0 {
            let line = self.line;
            self.diagnostics.push(Diagnostic::new(
                ErrorKind::Lex,
                opened_at,
                Where::Empty,
                format!("Unterminated block comment (reached line {line})."),
            ));
        }
    }

    fn string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.error("Unterminated string.");
            return;
        }

        self.advance(); // closing quote
        let value: Rc<str> = self.lexeme()[1..self.lexeme().len() - 1].into();
        let lexeme = self.lexeme().to_owned();
        self.tokens.push(Token::with_literal(
            TokenKind::String,
            lexeme,
            self.line,
            Literal::String(value),
        ));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let value: f64 = self
            .lexeme()
            .parse()
            .expect("scanned digits form a valid float");
        let lexeme = self.lexeme().to_owned();
        self.tokens.push(Token::with_literal(
            TokenKind::Number,
            lexeme,
            self.line,
            Literal::Number(value),
        ));
    }

    fn identifier(&mut self) {
        while is_alphanumeric(self.peek()) {
            self.advance();
        }
        let kind = keyword(self.lexeme()).unwrap_or(TokenKind::Identifier);
        self.add_token(kind);
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alphanumeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

/// Convenience entry point: scan `source`, returning the tokens and any diagnostics.
#[must_use]
pub fn scan(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Scanner::new(source).scan()
}
