//! Static scope analysis: walks the AST once before execution to compute,
//! for every variable reference, how many enclosing environments to skip to
//! reach the one that defines it. The interpreter uses these distances
//! instead of walking the environment chain by name at every lookup.
//!
//! Distances are keyed by [`NodeId`] rather than by the referencing token or
//! a structural hash of the expression, so two lexically identical
//! references in different scopes (e.g. the same variable name shadowed in a
//! nested block) never collide.

use std::collections::{HashMap, HashSet};
use std::mem;

use crate::ast::{Expr, NodeId, Stmt};
use crate::error::Diagnostics;
use crate::token::Token;

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Anon,
    Method,
    Initializer,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'a> {
    diagnostics: &'a mut Diagnostics,
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<NodeId, usize>,
    current_function: FunctionType,
    current_class: ClassType,
    /// Every local declared by a `let` statement, for the unused-variable
    /// sweep at the end of [`Resolver::analyze`].
    declared: Vec<Token>,
    /// Names that were read or written at least once.
    used: HashSet<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(diagnostics: &'a mut Diagnostics) -> Self {
        Resolver {
            diagnostics,
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            declared: Vec::new(),
            used: HashSet::new(),
        }
    }

    /// Resolves every statement and returns the distance table to hand to
    /// the interpreter, after emitting unused-variable warnings.
    pub fn analyze(mut self, statements: &[Stmt]) -> HashMap<NodeId, usize> {
        self.resolve(statements);

        for name in &self.declared {
            if !self.used.contains(&name.lexeme) {
                self.diagnostics.resolver_error(name, format!("Variable '{}' was never used.", name.lexeme));
            }
        }

        self.locals
    }

    fn resolve(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else { return };
        if scope.contains_key(&name.lexeme) {
            self.diagnostics.parse_error(name, "Already a variable with this name in this scope.");
        }
        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &Token) {
        self.used.insert(name.lexeme.clone());
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(id, depth);
                return;
            }
        }
        // Not found in any tracked scope: resolved at call time against globals.
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], kind: FunctionType) {
        let enclosing_function = mem::replace(&mut self.current_function, kind);
        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(body);
        self.end_scope();
        self.current_function = enclosing_function;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve(statements);
                self.end_scope();
            }
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Echo(expr) => self.resolve_expr(expr),
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
                self.declared.push(name.clone());
            }
            Stmt::Function(decl) => {
                let name = decl.name.as_ref().expect("named function declaration");
                self.declare(name);
                self.define(name);
                self.resolve_function(&decl.params, &decl.body, FunctionType::Function);
            }
            Stmt::Class { name, superclass, methods } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(Expr::Variable { name: super_name, .. }) = superclass {
                    if super_name.lexeme == name.lexeme {
                        self.diagnostics.resolver_error(super_name, "A class can't inherit from itself.");
                    }
                    self.current_class = ClassType::Subclass;
                    self.resolve_expr(superclass.as_ref().unwrap());
                }

                if superclass.is_some() {
                    self.begin_scope();
                    self.scopes.last_mut().unwrap().insert("super".to_string(), true);
                }

                self.begin_scope();
                self.scopes.last_mut().unwrap().insert("self".to_string(), true);

                for method in methods {
                    let kind = if method.name.as_ref().map(|n| n.lexeme.as_str()) == Some("init") {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(&method.params, &method.body, kind);
                }

                self.end_scope();
                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
            Stmt::If { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.diagnostics.parse_error(keyword, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.diagnostics.resolver_error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.diagnostics.parse_error(name, "Can't read local variable in its own initializer.");
                    }
                }
                self.resolve_local(*id, name);
            }
            Expr::SelfExpr { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.diagnostics.resolver_error(keyword, "Can't use 'self' outside of a class.");
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => self.diagnostics.resolver_error(keyword, "Can't use 'super' outside of a class."),
                    ClassType::Class => self.diagnostics.resolver_error(keyword, "Can't use 'super' in a class with no superclass."),
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Prefix { right, .. } => self.resolve_expr(right),
            Expr::Postfix { left, .. } => self.resolve_expr(left),
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Ternary { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Call { callee, arguments, .. } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::Anonym(decl) => {
                self.resolve_function(&decl.params, &decl.body, FunctionType::Anon);
            }
        }
    }
}
