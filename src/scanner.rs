use std::str::CharIndices;

use peekmore::{PeekMore, PeekMoreIterator};

use crate::ast::Literal;
use crate::error::Diagnostics;
use crate::token::{Location, Token, Type};

/// Turns source text into a flat token stream. Positions are tracked in
/// characters, not bytes, so identifiers and strings containing non-ASCII
/// text don't throw off column numbers; lexemes are still sliced out of the
/// original source by byte offset for zero-copy substrings.
pub struct Scanner<'a> {
    source: &'a str,
    chars: PeekMoreIterator<CharIndices<'a>>,
    start: usize,
    current: usize,
    line: usize,
    line_start_char: usize,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, diagnostics: &'a mut Diagnostics) -> Self {
        Scanner {
            source,
            chars: source.char_indices().peekmore(),
            start: 0,
            current: 0,
            line: 1,
            line_start_char: 0,
            diagnostics,
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while !self.is_at_end() {
            self.start = self.current;
            if let Some(token) = self.scan_token() {
                tokens.push(token);
            }
        }

        tokens.push(Token::eof(Location::new(self.line, self.column())));
        tokens
    }

    fn column(&self) -> usize {
        self.current - self.line_start_char + 1
    }

    fn start_column(&self) -> usize {
        self.start - self.line_start_char + 1
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    /// Byte offset of the char at logical position `self.current`, or the
    /// source's length if we're at (or past) the end.
    fn byte_offset(&mut self) -> usize {
        self.chars.peek().map(|&(byte, _)| byte).unwrap_or(self.source.len())
    }

    fn advance(&mut self) -> char {
        let (_, c) = self.chars.next().expect("advance called past end of source");
        self.current += 1;
        c
    }

    fn peek(&mut self) -> char {
        self.chars.peek().map(|&(_, c)| c).unwrap_or('\0')
    }

    fn peek_next(&mut self) -> char {
        self.chars.peek_nth(1).map(|&(_, c)| c).unwrap_or('\0')
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn lexeme(&mut self, start_byte: usize) -> String {
        let end_byte = self.byte_offset();
        self.source[start_byte..end_byte].to_string()
    }

    fn scan_token(&mut self) -> Option<Token> {
        let start_byte = self.byte_offset();
        let c = self.advance();

        let result = match c {
            '(' => self.single(Type::LeftParen),
            ')' => self.single(Type::RightParen),
            '{' => self.single(Type::LeftBrace),
            '}' => self.single(Type::RightBrace),
            ',' => self.single(Type::Comma),
            '.' => self.single(Type::Dot),
            ';' => self.single(Type::Semicolon),
            '?' => self.single(Type::QuestionMark),
            '%' => self.single(Type::Modulo),

            '*' => Some(if self.match_char('=') { Type::StarAssign } else { Type::Star }),
            '+' => Some(if self.match_char('+') {
                Type::PlusPlus
            } else if self.match_char('=') {
                Type::PlusAssign
            } else {
                Type::Plus
            }),
            '-' => Some(if self.match_char('-') {
                Type::MinusMinus
            } else if self.match_char('=') {
                Type::MinusAssign
            } else if self.match_char('>') {
                Type::RightArrow
            } else {
                Type::Minus
            }),
            '!' => Some(if self.match_char('=') { Type::BangEqual } else { Type::Bang }),
            '=' => Some(if self.match_char('=') { Type::EqualEqual } else { Type::Equal }),
            '<' => Some(if self.match_char('=') {
                Type::LessEqual
            } else if self.match_char('<') {
                Type::LeftShift
            } else if self.match_char('-') {
                Type::LeftArrow
            } else {
                Type::Less
            }),
            '>' => Some(if self.match_char('=') {
                Type::GreaterEqual
            } else if self.match_char('>') {
                Type::RightShift
            } else {
                Type::Greater
            }),
            ':' => Some(if self.match_char(':') { Type::DoubleColon } else { Type::Colon }),

            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                    None
                } else if self.match_char('*') {
                    self.block_comment();
                    None
                } else if self.match_char('=') {
                    Some(Type::SlashAssign)
                } else {
                    Some(Type::Slash)
                }
            }

            ' ' | '\r' | '\t' => None,
            '\n' => {
                self.newline();
                None
            }

            '\'' => return self.string(start_byte),
            '"' => return self.multiline_string(start_byte),

            c if c.is_ascii_digit() => return self.number(start_byte),
            c if c.is_alphabetic() || c == '_' => return self.identifier(start_byte),

            other => {
                let location = Location::new(self.line, self.start_column());
                self.diagnostics.scanner_error(location, format!("Unexpected character: '{other}'"));
                None
            }
        };

        result.map(|r#type| self.emit(r#type, start_byte, None))
    }

    fn single(&mut self, r#type: Type) -> Option<Type> {
        Some(r#type)
    }

    fn newline(&mut self) {
        self.line += 1;
        self.line_start_char = self.current;
    }

    fn emit(&mut self, r#type: Type, start_byte: usize, literal: Option<Literal>) -> Token {
        let lexeme = self.lexeme(start_byte);
        Token::new(r#type, lexeme, literal, Location::new(self.line, self.start_column()))
    }

    fn block_comment(&mut self) {
        loop {
            if self.is_at_end() {
                let location = Location::new(self.line, self.start_column());
                self.diagnostics.scanner_error(location, "Unterminated block comment. Missing '*/'.".to_string());
                return;
            }
            if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                return;
            }
            if self.peek() == '\n' {
                self.newline();
            }
            self.advance();
        }
    }

    /// Single-quoted strings are single-line: a literal newline or `;`
    /// before the closing quote is an error.
    fn string(&mut self, start_byte: usize) -> Option<Token> {
        let mut value = String::new();
        loop {
            if self.is_at_end() {
                let location = Location::new(self.line, self.start_column());
                self.diagnostics.scanner_error(location, "String never terminated. Missing ' at end.".to_string());
                return None;
            }
            let c = self.peek();
            if c == '\'' {
                break;
            }
            if c == '\n' || c == ';' {
                let location = Location::new(self.line, self.start_column());
                self.diagnostics.scanner_error(location, "Unterminated string. Missing ' at end.".to_string());
                return None;
            }
            value.push(self.advance());
        }

        self.advance(); // closing quote
        Some(self.emit(Type::String, start_byte, Some(Literal::String(value))))
    }

    /// Double-quoted strings may span multiple lines.
    fn multiline_string(&mut self, start_byte: usize) -> Option<Token> {
        let mut value = String::new();
        loop {
            if self.is_at_end() {
                let location = Location::new(self.line, self.start_column());
                self.diagnostics.scanner_error(location, "Unterminated multiline string. Missing \" at end.".to_string());
                return None;
            }
            let c = self.peek();
            if c == '"' {
                break;
            }
            if c == '\n' {
                value.push(self.advance());
                self.newline();
                continue;
            }
            value.push(self.advance());
        }

        self.advance(); // closing quote
        Some(self.emit(Type::String, start_byte, Some(Literal::String(value))))
    }

    fn number(&mut self, start_byte: usize) -> Option<Token> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let lexeme = self.lexeme(start_byte);
        let value: f64 = lexeme.parse().expect("scanned digits always form a valid number");
        Some(Token::new(Type::Number, lexeme, Some(Literal::Number(value)), Location::new(self.line, self.start_column())))
    }

    fn identifier(&mut self, start_byte: usize) -> Option<Token> {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let lexeme = self.lexeme(start_byte);
        let r#type = keyword(&lexeme).unwrap_or(Type::Identifier);
        Some(Token::new(r#type, lexeme, None, Location::new(self.line, self.start_column())))
    }
}

fn keyword(word: &str) -> Option<Type> {
    Some(match word {
        "and" => Type::And,
        "class" => Type::Class,
        "else" => Type::Else,
        "false" => Type::False,
        "fn" => Type::Fn,
        "for" => Type::For,
        "if" => Type::If,
        "none" => Type::None,
        "or" => Type::Or,
        "echo" => Type::Echo,
        "return" => Type::Return,
        "super" => Type::Super,
        "self" => Type::SelfKw,
        "true" => Type::True,
        "let" => Type::Let,
        "while" => Type::While,
        _ => return Option::None,
    })
}
