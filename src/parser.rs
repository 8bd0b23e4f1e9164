use std::rc::Rc;

use crate::ast::{Expr, FunctionDecl, Literal, NodeIdGenerator, Stmt};
use crate::error::{Diagnostics, ParseError};
use crate::token::{Token, Type};

type ParseResult<T> = Result<T, ParseError>;

/// Returns whether the next token is any of the given types, consuming it if so.
macro_rules! advance_if {
    ( $self:ident, $( $type:expr ),+ ) => {
        {
            if $( $self.check($type) )||* {
                $self.advance();
                true
            } else {
                false
            }
        }
    }
}

/// Recursive-descent parser turning a token stream into a list of statements.
///
/// - Program     -> Declaration* EOF ;
/// - Block       -> "{" Declaration* "}" ;
/// - Declaration -> ClassDecl | FunDecl | VarDecl | Statement ;
/// - ClassDecl   -> "class" IDENTIFIER ( "<" IDENTIFIER ">" )? "{" Function* "}" ;
/// - FunDecl     -> "fn" Function ;
/// - VarDecl     -> "let" IDENTIFIER ( "=" Expression )? ";" ;
/// - Function    -> IDENTIFIER "(" Parameters? ")" Block ;
/// - Parameters  -> IDENTIFIER ( "," IDENTIFIER )* ;
/// - Statement   -> ExprStmt | ForStmt | IfStmt | EchoStmt | ReturnStmt | WhileStmt | Block ;
/// - ExprStmt    -> Expression ";" ;
/// - ForStmt     -> "for" ( VarDecl | ExprStmt | ";" ) Expression? ";" Expression? Statement ;
/// - IfStmt      -> "if" Expression ":" Statement ( "else" Statement )? ;
/// - EchoStmt    -> "echo" Expression ";" ;
/// - ReturnStmt  -> "return" Expression? ";" ;
/// - WhileStmt   -> "while" Expression ":" Statement ;
/// - Expression  -> Assignment ;
/// - Assignment  -> ( Call "." )? IDENTIFIER "=" Assignment | Ternary ;
/// - Ternary     -> LogicOr ( "?" Ternary ":" Ternary )* ;
/// - LogicOr     -> LogicAnd ( "or" LogicAnd )* ;
/// - LogicAnd    -> Equality ( "and" Equality )* ;
/// - Equality    -> Comparison ( ( "!=" | "==" ) Comparison )* ;
/// - Comparison  -> Compound ( ( ">" | ">=" | "<" | "<=" ) Compound )* ;
/// - Compound    -> Term ( ( "+=" | "-=" | "*=" | "/=" ) Term )* ;
/// - Term        -> Modulo ( ( "+" | "-" ) Modulo )* ;
/// - Modulo      -> Factor ( "%" Factor )* ;
/// - Factor      -> Increment ( ( "*" | "/" ) Increment )* ;
/// - Unary       -> ( "!" | "-" ) Unary | Increment ;
/// - Increment   -> ( "++" | "--" ) Increment | Call ( "++" | "--" )? ;
/// - Arguments   -> Expression ( "," Expression )* ;
/// - Call        -> Anonym ( "(" Arguments? ")" | "." IDENTIFIER )* ;
/// - Anonym      -> "fn" "(" Parameters? ")" Block | Primary ;
/// - Primary     -> NUMBER | STRING | "false" | "true" | "none" | "self"
///                | "(" Expression ")" | IDENTIFIER | "super" "::" IDENTIFIER ;
pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: &'a mut Diagnostics,
    ids: NodeIdGenerator,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, diagnostics: &'a mut Diagnostics) -> Self {
        Parser { tokens, current: 0, diagnostics, ids: NodeIdGenerator::new() }
    }

    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        statements
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if advance_if!(self, Type::Class) {
            self.class_declaration()
        } else if advance_if!(self, Type::Fn) {
            self.function("function").map(|decl| Stmt::Function(Rc::new(decl)))
        } else if advance_if!(self, Type::Let) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(error) => {
                self.diagnostics.parse_error(&error.token, error.message.clone());
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(Type::Identifier, "Expected class name.")?;

        let mut superclass = None;
        if advance_if!(self, Type::Less) {
            let super_name = self.consume(Type::Identifier, "Expected superclass name.")?;
            superclass = Some(Expr::Variable { id: self.ids.next(), name: super_name });
            self.consume(Type::Greater, "Expected '>' after superclass name.")?;
        }

        self.consume(Type::LeftBrace, "Expected '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            methods.push(Rc::new(self.function("method")?));
        }

        self.consume(Type::RightBrace, "Expected '}' after class body.")?;

        Ok(Stmt::Class { name, superclass, methods })
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(Type::Identifier, "Expected variable name.")?;

        let initializer = if advance_if!(self, Type::Equal) { Some(self.expression()?) } else { None };

        self.consume(Type::Semicolon, "Expected ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if advance_if!(self, Type::For) {
            self.for_statement()
        } else if advance_if!(self, Type::If) {
            self.if_statement()
        } else if advance_if!(self, Type::Echo) {
            self.echo_statement()
        } else if advance_if!(self, Type::Return) {
            self.return_statement()
        } else if advance_if!(self, Type::While) {
            self.while_statement()
        } else if advance_if!(self, Type::LeftBrace) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        let initializer = if advance_if!(self, Type::Semicolon) {
            None
        } else if advance_if!(self, Type::Let) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(Type::Semicolon) { self.expression()? } else { Expr::Literal(Literal::Bool(true)) };
        self.consume(Type::Semicolon, "Expected ';' after loop condition.")?;

        let increment = if self.check_statement_start() { None } else { Some(self.expression()?) };

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        body = Stmt::While { condition, body: Box::new(body) };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    /// `for` has no parentheses around its clauses, so the optional
    /// increment expression is disambiguated from the loop body by checking
    /// whether the next token can only begin a statement.
    fn check_statement_start(&self) -> bool {
        matches!(self.peek().r#type, Type::LeftBrace | Type::If | Type::While | Type::For | Type::Return | Type::Echo)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let condition = self.expression()?;
        self.consume(Type::Colon, "Expected ':' after condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if advance_if!(self, Type::Else) { Some(Box::new(self.statement()?)) } else { None };
        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    fn echo_statement(&mut self) -> ParseResult<Stmt> {
        let value = self.expression()?;
        self.consume(Type::Semicolon, "Expected ';' after value.")?;
        Ok(Stmt::Echo(value))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if !self.check(Type::Semicolon) { Some(self.expression()?) } else { None };
        self.consume(Type::Semicolon, "Expected ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        let condition = self.expression()?;
        self.consume(Type::Colon, "Expected ':' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(Type::Semicolon, "Expected ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn function(&mut self, kind: &str) -> ParseResult<FunctionDecl> {
        let name = self.consume(Type::Identifier, &format!("Expected {kind} name."))?;
        let (params, body) = self.function_tail(kind)?;
        Ok(FunctionDecl { name: Some(name), params, body: Rc::new(body) })
    }

    fn function_tail(&mut self, kind: &str) -> ParseResult<(Vec<Token>, Vec<Stmt>)> {
        self.consume(Type::LeftParen, &format!("Expected '(' after {kind} name."))?;
        let mut params = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.diagnostics.parse_error(&token, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(Type::Identifier, "Expected parameter name.")?);
                if !advance_if!(self, Type::Comma) {
                    break;
                }
            }
        }
        self.consume(Type::RightParen, "Expected ')' after parameters.")?;
        self.consume(Type::LeftBrace, &format!("Expected '{{' before {kind} body."))?;
        let body = self.block()?;
        Ok((params, body))
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(Type::RightBrace, "Expected '}' after block.")?;
        Ok(statements)
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.ternary()?;

        if advance_if!(self, Type::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign { id: self.ids.next(), name, value: Box::new(value) }),
                Expr::Get { object, name } => Ok(Expr::Set { object, name, value: Box::new(value) }),
                _ => {
                    // Not a fatal error: the expression is still returned so
                    // parsing can continue past a bad assignment target.
                    self.diagnostics.parse_error(&equals, "Invalid assignment target.");
                    Ok(expr)
                }
            };
        }

        Ok(expr)
    }

    fn ternary(&mut self) -> ParseResult<Expr> {
        let mut expr = self.or()?;

        while advance_if!(self, Type::QuestionMark) {
            let then_branch = self.ternary()?;
            self.consume(Type::Colon, "Expected ':' after '?' in ternary expression.")?;
            let else_branch = self.ternary()?;
            expr = Expr::Ternary { condition: Box::new(expr), then_branch: Box::new(then_branch), else_branch: Box::new(else_branch) };
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while advance_if!(self, Type::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while advance_if!(self, Type::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while advance_if!(self, Type::BangEqual, Type::EqualEqual) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.compound_assign()?;
        while advance_if!(self, Type::Greater, Type::GreaterEqual, Type::Less, Type::LessEqual) {
            let operator = self.previous().clone();
            let right = self.compound_assign()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    /// `+=`, `-=`, `*=`, `/=` parse as ordinary [`Expr::Binary`] nodes; the
    /// evaluator rejects them at runtime unless the left operand is a plain
    /// variable reference, matching how they're specified.
    fn compound_assign(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while advance_if!(self, Type::PlusAssign, Type::MinusAssign, Type::StarAssign, Type::SlashAssign) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.modulo()?;
        while advance_if!(self, Type::Minus, Type::Plus) {
            let operator = self.previous().clone();
            let right = self.modulo()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn modulo(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while advance_if!(self, Type::Modulo) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while advance_if!(self, Type::Slash, Type::Star) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if advance_if!(self, Type::Bang, Type::Minus) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary { operator, right: Box::new(right) });
        }
        self.increment()
    }

    fn increment(&mut self) -> ParseResult<Expr> {
        if advance_if!(self, Type::PlusPlus, Type::MinusMinus) {
            let operator = self.previous().clone();
            let right = self.increment()?;
            return Ok(Expr::Prefix { operator, right: Box::new(right) });
        }

        let mut expr = self.call()?;
        if advance_if!(self, Type::PlusPlus, Type::MinusMinus) {
            let operator = self.previous().clone();
            expr = Expr::Postfix { left: Box::new(expr), operator };
        }
        Ok(expr)
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.anonym()?;

        loop {
            if advance_if!(self, Type::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if advance_if!(self, Type::Dot) {
                let name = self.consume(Type::Identifier, "Expected property name after '.'.")?;
                expr = Expr::Get { object: Box::new(expr), name };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    let token = self.peek().clone();
                    self.diagnostics.parse_error(&token, "Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !advance_if!(self, Type::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(Type::RightParen, "Expected ')' after arguments.")?;
        Ok(Expr::Call { callee: Box::new(callee), paren, arguments })
    }

    fn anonym(&mut self) -> ParseResult<Expr> {
        if !advance_if!(self, Type::Fn) {
            return self.primary();
        }

        let (params, body) = self.function_tail("anonymous")?;
        Ok(Expr::Anonym(Rc::new(FunctionDecl { name: None, params, body: Rc::new(body) })))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if advance_if!(self, Type::False) {
            return Ok(Expr::Literal(Literal::Bool(false)));
        }
        if advance_if!(self, Type::True) {
            return Ok(Expr::Literal(Literal::Bool(true)));
        }
        if advance_if!(self, Type::None) {
            return Ok(Expr::Literal(Literal::None));
        }
        if advance_if!(self, Type::Number) {
            let Some(Literal::Number(value)) = self.previous().literal else { unreachable!("scanner attaches a numeric literal to every NUMBER token") };
            return Ok(Expr::Literal(Literal::Number(value)));
        }
        if advance_if!(self, Type::String) {
            let Some(Literal::String(ref value)) = self.previous().literal else { unreachable!("scanner attaches a string literal to every STRING token") };
            return Ok(Expr::Literal(Literal::String(value.clone())));
        }
        if advance_if!(self, Type::Super) {
            let keyword = self.previous().clone();
            self.consume(Type::DoubleColon, "Expected '::' after 'super'.")?;
            let method = self.consume(Type::Identifier, "Expected superclass method name.")?;
            return Ok(Expr::Super { id: self.ids.next(), keyword, method });
        }
        if advance_if!(self, Type::SelfKw) {
            return Ok(Expr::SelfExpr { id: self.ids.next(), keyword: self.previous().clone() });
        }
        if advance_if!(self, Type::Identifier) {
            return Ok(Expr::Variable { id: self.ids.next(), name: self.previous().clone() });
        }
        if advance_if!(self, Type::LeftParen) {
            let expr = self.expression()?;
            self.consume(Type::RightParen, "Expected ')' after expression.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        let token = self.peek().clone();
        Err(ParseError::new(token, "Expected expression."))
    }

    fn check(&self, r#type: Type) -> bool {
        !self.is_at_end() && self.peek().r#type == r#type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().r#type == Type::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, r#type: Type, message: &str) -> ParseResult<Token> {
        if self.check(r#type) {
            return Ok(self.advance().clone());
        }
        Err(ParseError::new(self.peek().clone(), message))
    }

    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().r#type == Type::Semicolon {
                return;
            }

            if matches!(self.peek().r#type, Type::Class | Type::Fn | Type::Let | Type::For | Type::If | Type::While | Type::Echo | Type::Return) {
                return;
            }

            self.advance();
        }
    }
}
