#![allow(clippy::needless_return)]

//! Basalt is a small dynamically typed, class-based language with a
//! tree-walk interpreter. It is a hobby project and is not intended for
//! production use.
//!
//! Basalt is dynamically typed: the type of a variable is determined at
//! runtime rather than checked ahead of time. It has lexical scoping,
//! first-class functions (including anonymous function literals) and
//! single-inheritance classes.
//!
//! ## Scanning
//! The first step is scanning: turning source text into a flat list of
//! tokens. The scanner is implemented in [`scanner`] as a one-pass,
//! lookahead-based state machine over the source's characters. It reports
//! syntax errors (an unterminated string, an unexpected character) through
//! [`error::Diagnostics::scanner_error`] and keeps scanning past them so
//! multiple mistakes can be fixed in one pass.
//!
//! ## Parsing
//! The second step is parsing: converting the token list into an abstract
//! syntax tree. The parser ([`parser`]) is a hand-written recursive-descent
//! parser. [`ast::Expr`] nodes produce a [`value::Value`] when evaluated;
//! [`ast::Stmt`] nodes perform an action and produce nothing. The parser
//! recovers from a broken statement by synchronizing at the next statement
//! boundary, so later statements still get checked.
//!
//! ## Resolving
//! The third step is static scope analysis ([`resolver`]): a pre-pass over
//! the AST that, for every variable reference, works out how many enclosing
//! scopes to skip to find its declaration. This is what lets closures and
//! shadowed locals behave correctly without a name lookup at every access.
//! The resolver also emits warnings for suspicious-but-legal code (an
//! unused local, `self` outside a class) that don't block execution.
//!
//! ## Interpreting
//! The last step is interpreting ([`interpreter`]): walking the AST and
//! evaluating each node directly, using the scope distances the resolver
//! computed to look variables up in the right [`environment::Environment`].
//! Runtime errors (calling a non-callable value, dividing by zero, an
//! undefined property) are caught here and reported without a full process
//! abort, matching how a REPL is expected to keep accepting input.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub mod ast;
pub mod class;
pub mod environment;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use error::Diagnostics;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// Top-level driver: owns the interpreter across a whole run (a script, or a
/// whole REPL session) and funnels source text through scan → parse →
/// resolve → interpret, short-circuiting as soon as a stage reports an
/// error.
pub struct Basalt {
    interpreter: Interpreter,
}

impl Basalt {
    pub fn new(stdout: Box<dyn Write>) -> Self {
        Basalt { interpreter: Interpreter::new(stdout) }
    }

    pub fn run_file(&mut self, path: &str) {
        let contents = fs::read_to_string(path).unwrap_or_else(|err| {
            eprintln!("Could not read file '{path}': {err}");
            process::exit(74);
        });

        let diagnostics = self.run_source(&contents);

        if diagnostics.had_syntax_error() {
            process::exit(65);
        }
        if diagnostics.had_runtime_error() {
            process::exit(70);
        }
    }

    pub fn run_prompt(&mut self) {
        let mut editor = DefaultEditor::new().expect("readline editor to initialize");
        let history_path = history_path();

        if let Some(path) = &history_path {
            let _ = editor.load_history(path);
        }

        loop {
            match editor.readline("plox_v0.1 $> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(&line);
                    if line.trim() == "exit" {
                        break;
                    }
                    self.run_source(&line);
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Readline error: {err}");
                    break;
                }
            }
        }

        if let Some(path) = &history_path {
            let _ = editor.save_history(path);
        }
    }

    /// Runs one unit of source (a whole file, or a single REPL line) through
    /// the full pipeline and returns its diagnostics. Public so integration
    /// tests and embedders can drive the interpreter without going through
    /// a file or a terminal.
    pub fn run_source(&mut self, source: &str) -> Diagnostics {
        let mut diagnostics = Diagnostics::new(source);

        let tokens = Scanner::new(source, &mut diagnostics).scan_tokens();
        if diagnostics.had_error() {
            return diagnostics;
        }

        let statements = Parser::new(tokens, &mut diagnostics).parse();
        if diagnostics.had_error() {
            return diagnostics;
        }

        let locals = Resolver::new(&mut diagnostics).analyze(&statements);
        if diagnostics.had_error() {
            return diagnostics;
        }

        self.interpreter.resolve(locals);
        self.interpreter.interpret(&statements, &mut diagnostics);
        diagnostics
    }
}

/// Where the REPL keeps its line history. Falls back to no persistence (a
/// session-only history) if the home directory can't be found.
fn history_path() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".basalt_history"))
}

/// Convenience entry point equivalent to `Basalt::new(Box::new(io::stdout()))`.
pub fn stdout_driver() -> Basalt {
    Basalt::new(Box::new(io::stdout()))
}
