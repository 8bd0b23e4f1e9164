//! Diagnostics: formatting and severity bookkeeping for everything the
//! scanner, parser, resolver and interpreter report to the user.
//!
//! Severity is split across two independent sticky flags that together drive
//! the process exit code (see [`crate::run`]):
//!
//! * `had_syntax_error` — set by [`Diagnostics::scanner_error`] and
//!   [`Diagnostics::parse_error`]. A pipeline stage that leaves this set
//!   short-circuits the remaining stages.
//! * `had_runtime_error` — set by [`Diagnostics::runtime_error`] once
//!   execution starts; it never blocks earlier stages because it can only be
//!   raised after they've already succeeded.
//!
//! [`Diagnostics::resolver_error`] is a warning-only channel: it prints but
//! never sets either flag, matching the distinction the language draws
//! between "this program is broken" (errors) and "this program is probably
//! wrong" (warnings about unused locals, `self`/`super` misuse, returning a
//! value from an initializer, and the like).

use substring::Substring;

use crate::token::{Location, Token, Type};

/// A fixed fallback width used to draw the separator rule around a
/// diagnostic. Real terminal-width detection is outside this crate's scope.
const RULE_WIDTH: usize = 60;

pub struct Diagnostics {
    source_lines: Vec<String>,
    had_syntax_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new(source: &str) -> Self {
        Diagnostics {
            source_lines: source.lines().map(str::to_owned).collect(),
            had_syntax_error: false,
            had_runtime_error: false,
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_syntax_error || self.had_runtime_error
    }

    pub fn had_syntax_error(&self) -> bool {
        self.had_syntax_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clears the syntax-error flag between REPL lines. Runtime errors are
    /// intentionally left alone: they don't block subsequent input.
    pub fn reset(&mut self) {
        self.had_syntax_error = false;
    }

    pub fn scanner_error(&mut self, location: Location, message: impl Into<String>) {
        self.report("SYNTAX ERROR", location, 1, &message.into());
        self.had_syntax_error = true;
    }

    pub fn parse_error(&mut self, token: &Token, message: impl Into<String>) {
        self.report_token("ERROR", token, &message.into());
        self.had_syntax_error = true;
    }

    /// Warning-only channel: reported but never blocks the pipeline.
    pub fn resolver_error(&mut self, token: &Token, message: impl Into<String>) {
        self.report_token("WARNING", token, &message.into());
    }

    pub fn runtime_error(&mut self, error: &RuntimeError) {
        self.report_token("RUNTIME ERROR", &error.token, &error.message);
        self.had_runtime_error = true;
    }

    fn report_token(&self, kind: &str, token: &Token, message: &str) {
        let length = token.length.max(1);
        self.report(kind, token.location, length, message);
    }

    fn report(&self, kind: &str, location: Location, length: usize, message: &str) {
        let rule = "-".repeat(RULE_WIDTH);
        eprintln!("{rule}");
        eprintln!("[line {location}] {kind}: {message}");

        if let Some(line) = self.source_lines.get(location.line.saturating_sub(1)) {
            eprintln!("{line}");
            let column = location.column.saturating_sub(1);
            let indent = line.substring(0, column.min(line.len())).chars().count();
            eprintln!("{}{}", " ".repeat(indent), "^".repeat(length));
        }

        eprintln!("{rule}");
    }
}

/// Raised by the parser, and caught one statement at a time by
/// [`crate::parser::Parser::declaration`], to drop a broken statement and
/// resynchronize at the next statement boundary rather than aborting the
/// whole parse. Reported through [`Diagnostics::parse_error`] before being
/// thrown.
#[derive(Debug)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        ParseError { token, message: message.into() }
    }

    pub fn is_at_eof(&self) -> bool {
        self.token.r#type == Type::Eof
    }
}

/// Raised by the evaluator whenever an operation cannot proceed: wrong
/// operand types, calling a non-callable value, an undefined variable, a
/// division by zero, and so on.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        RuntimeError { token, message: message.into() }
    }
}
