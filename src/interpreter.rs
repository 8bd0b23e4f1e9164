//! Tree-walking evaluator. Consumes the AST the parser built and the scope
//! distances the resolver computed, and executes statements directly rather
//! than lowering to any intermediate form.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::ast::{Expr, NodeId, Stmt};
use crate::class::Class;
use crate::environment::{Env, Environment};
use crate::error::{Diagnostics, RuntimeError};
use crate::function::{Function, NativeFunction};
use crate::token::{self_token, Token, Type};
use crate::value::{Callable, Value};

/// Out-of-band control-flow carrier threaded through statement execution.
/// `Return` unwinds to the nearest [`Function::call`]; `Error` unwinds all
/// the way to [`Interpreter::interpret`], which reports it and stops.
pub enum Signal {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Self {
        Signal::Error(error)
    }
}

pub struct Interpreter {
    pub globals: Env,
    environment: Env,
    locals: HashMap<NodeId, usize>,
    pub stdout: Box<dyn Write>,
}

impl Interpreter {
    pub fn new(stdout: Box<dyn Write>) -> Self {
        let globals = Environment::new(None);
        for (name, native) in NativeFunction::globals() {
            globals.borrow_mut().define(name, Value::NativeFunction(native));
        }

        Interpreter { environment: globals.clone(), globals, locals: HashMap::new(), stdout }
    }

    /// Installs the scope distances the resolver computed for this program.
    pub fn resolve(&mut self, locals: HashMap<NodeId, usize>) {
        self.locals = locals;
    }

    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                Err(Signal::Error(error)) => {
                    diagnostics.runtime_error(&error);
                    return;
                }
                // The resolver rejects top-level `return` before execution
                // ever starts, so this never actually happens.
                Err(Signal::Return(_)) => return,
            }
        }
    }

    pub fn execute_block(&mut self, statements: &[Stmt], environment: Env) -> Result<(), Signal> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = statements.iter().try_for_each(|statement| self.execute(statement));

        self.environment = previous;
        result
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Signal> {
        match stmt {
            Stmt::Block(statements) => {
                let environment = Environment::new(Some(self.environment.clone()));
                self.execute_block(statements, environment)
            }
            Stmt::Expression(expr) => self.evaluate(expr).map(|_| ()),
            Stmt::Echo(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.stdout, "{value}").ok();
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::None,
                };
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }
            Stmt::Function(decl) => {
                let name = decl.name.as_ref().expect("named function declaration");
                let function = Function::new(decl.clone(), self.environment.clone(), false);
                self.environment.borrow_mut().define(&name.lexeme, Value::Function(Rc::new(function)));
                Ok(())
            }
            Stmt::Class { name, superclass, methods } => self.execute_class(name, superclass, methods),
            Stmt::If { condition, then_branch, else_branch } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::None,
                };
                Err(Signal::Return(value))
            }
        }
    }

    fn execute_class(&mut self, name: &Token, superclass: &Option<Expr>, methods: &[Rc<crate::ast::FunctionDecl>]) -> Result<(), Signal> {
        let superclass_value = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => return Err(RuntimeError::new(name.clone(), "Superclass must be a class.").into()),
            },
            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, Value::None);

        let methods_env = match &superclass_value {
            Some(superclass) => {
                let env = Environment::new(Some(self.environment.clone()));
                env.borrow_mut().define("super", Value::Class(superclass.clone()));
                env
            }
            None => self.environment.clone(),
        };

        let mut method_map = HashMap::new();
        for decl in methods {
            let method_name = decl.name.as_ref().expect("named method declaration");
            let is_initializer = method_name.lexeme == "init";
            let function = Rc::new(Function::new(decl.clone(), methods_env.clone(), is_initializer));
            method_map.insert(method_name.lexeme.clone(), function);
        }

        let class = Rc::new(Class::new(name.lexeme.clone(), superclass_value, method_map));
        self.environment.borrow_mut().assign(name, Value::Class(class))?;
        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, Signal> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal.clone())),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Variable { id, name } => Ok(self.lookup_variable(*id, name)?),
            Expr::SelfExpr { id, keyword } => Ok(self.lookup_variable(*id, keyword)?),
            Expr::Super { id, keyword, method } => self.evaluate_super(*id, keyword, method),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }
            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),
            Expr::Prefix { operator, right } => self.evaluate_step(operator, right, true),
            Expr::Postfix { left, operator } => self.evaluate_step(operator, left, false),
            Expr::Binary { left, operator, right } => self.evaluate_binary(left, operator, right),
            Expr::Logical { left, operator, right } => self.evaluate_logical(left, operator, right),
            Expr::Ternary { condition, then_branch, else_branch } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expr::Call { callee, paren, arguments } => self.evaluate_call(callee, paren, arguments),
            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_property(&object, name)
            }
            Expr::Set { object, name, value } => {
                let object = self.evaluate(object)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::new(name.clone(), "Only instances have fields.").into());
                };
                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }
            Expr::Anonym(decl) => Ok(Value::Function(Rc::new(Function::new(decl.clone(), self.environment.clone(), false)))),
        }
    }

    fn evaluate_super(&mut self, id: NodeId, keyword: &Token, method: &Token) -> Result<Value, Signal> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(RuntimeError::new(keyword.clone(), "Can't use 'super' outside of a subclass.").into());
        };
        let Value::Class(superclass) = self.environment.borrow().get_at(distance, keyword)? else {
            unreachable!("'super' always resolves to a class");
        };
        let instance = self.environment.borrow().get_at(distance - 1, &self_token())?;

        let Some(found) = superclass.find_method(&method.lexeme) else {
            return Err(RuntimeError::new(method.clone(), format!("Undefined property '{}'.", method.lexeme)).into());
        };

        Ok(Value::Function(Rc::new(found.bind(instance))))
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value, Signal> {
        let right = self.evaluate(right)?;
        match operator.r#type {
            Type::Minus => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::new(operator.clone(), "Operand must be a number.").into()),
            },
            Type::Bang => Ok(Value::Bool(!right.is_truthy())),
            _ => unreachable!("parser only produces '-' and '!' unary operators"),
        }
    }

    /// Shared implementation for prefix (`++x`) and postfix (`x++`)
    /// increment/decrement. Only plain variable targets are supported.
    fn evaluate_step(&mut self, operator: &Token, target: &Expr, prefix: bool) -> Result<Value, Signal> {
        let Expr::Variable { id, name } = target else {
            return Err(RuntimeError::new(operator.clone(), "Invalid increment/decrement target.").into());
        };

        let current = self.lookup_variable(*id, name)?;
        let Value::Number(n) = current else {
            return Err(RuntimeError::new(operator.clone(), "Operand must be a number.").into());
        };

        let delta = if operator.r#type == Type::PlusPlus { 1.0 } else { -1.0 };
        let updated = Value::Number(n + delta);
        self.assign_variable(*id, name, updated.clone())?;

        Ok(if prefix { updated } else { Value::Number(n) })
    }

    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value, Signal> {
        let left = self.evaluate(left)?;

        match operator.r#type {
            Type::Or if left.is_truthy() => Ok(left),
            Type::And if !left.is_truthy() => Ok(left),
            _ => self.evaluate(right),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value, Signal> {
        if let Some(compound) = compound_op(operator.r#type) {
            return self.evaluate_compound_assign(left, operator, compound, right);
        }

        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        arithmetic(operator, &left, &right).map_err(Signal::Error)
    }

    /// `+=`, `-=`, `*=`, `/=` arrive as ordinary [`Expr::Binary`] nodes;
    /// the left operand must be a plain variable reference.
    fn evaluate_compound_assign(&mut self, left: &Expr, operator: &Token, op: Type, right: &Expr) -> Result<Value, Signal> {
        let Expr::Variable { id, name } = left else {
            return Err(RuntimeError::new(operator.clone(), "Invalid assignment target.").into());
        };

        let current = self.lookup_variable(*id, name)?;
        let right = self.evaluate(right)?;
        let plain_operator = Token::new(op, operator.lexeme.clone(), None, operator.location);
        let updated = arithmetic(&plain_operator, &current, &right).map_err(Signal::Error)?;
        self.assign_variable(*id, name, updated.clone())?;
        Ok(updated)
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Result<Value, Signal> {
        let callee = self.evaluate(callee)?;

        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        let Some(callable) = callee.as_callable() else {
            return Err(RuntimeError::new(paren.clone(), "Can only call functions and classes.").into());
        };

        if args.len() != callable.arity() {
            let message = format!("Expected {} arguments but got {}.", callable.arity(), args.len());
            return Err(RuntimeError::new(paren.clone(), message).into());
        }

        callable.call(self, args).map_err(Signal::Error)
    }

    fn get_property(&mut self, object: &Value, name: &Token) -> Result<Value, Signal> {
        match object {
            Value::Instance(instance) => {
                let this = Value::Instance(instance.clone());
                Ok(instance.borrow().get(name, this)?)
            }
            _ => Err(RuntimeError::new(name.clone(), "Only instances have properties.").into()),
        }
    }

    fn lookup_variable(&self, id: NodeId, name: &Token) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow().get_at(distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_variable(&mut self, id: NodeId, name: &Token, value: Value) -> Result<(), RuntimeError> {
        match self.locals.get(&id) {
            Some(&distance) => {
                self.environment.borrow_mut().assign_at(distance, name, value);
                Ok(())
            }
            None => self.globals.borrow_mut().assign(name, value),
        }
    }
}

/// Maps a compound-assignment token to the plain arithmetic operator it
/// performs before writing the result back.
fn compound_op(r#type: Type) -> Option<Type> {
    match r#type {
        Type::PlusAssign => Some(Type::Plus),
        Type::MinusAssign => Some(Type::Minus),
        Type::StarAssign => Some(Type::Star),
        Type::SlashAssign => Some(Type::Slash),
        _ => None,
    }
}

fn arithmetic(operator: &Token, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match operator.r#type {
        Type::Plus => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!("{left}{right}"))),
            _ => Err(RuntimeError::new(operator.clone(), "Operands must be two numbers or at least one string.")),
        },
        Type::Minus => numeric(operator, left, right, |a, b| a - b),
        Type::Star => numeric(operator, left, right, |a, b| a * b),
        Type::Slash => {
            let (a, b) = numbers(operator, left, right)?;
            if a == 0.0 || b == 0.0 {
                return Err(RuntimeError::new(operator.clone(), "Division by zero."));
            }
            Ok(Value::Number(a / b))
        }
        Type::Modulo => {
            let (a, b) = numbers(operator, left, right)?;
            if b == 0.0 {
                return Err(RuntimeError::new(operator.clone(), "Division by zero."));
            }
            Ok(Value::Number(a % b))
        }
        Type::Greater => compare(operator, left, right, |a, b| a > b),
        Type::GreaterEqual => compare(operator, left, right, |a, b| a >= b),
        Type::Less => compare(operator, left, right, |a, b| a < b),
        Type::LessEqual => compare(operator, left, right, |a, b| a <= b),
        Type::EqualEqual => Ok(Value::Bool(left == right)),
        Type::BangEqual => Ok(Value::Bool(left != right)),
        _ => unreachable!("not a binary operator token"),
    }
}

fn numbers(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(operator.clone(), "Operands must be numbers.")),
    }
}

fn numeric(operator: &Token, left: &Value, right: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
    let (a, b) = numbers(operator, left, right)?;
    Ok(Value::Number(f(a, b)))
}

fn compare(operator: &Token, left: &Value, right: &Value, f: impl Fn(f64, f64) -> bool) -> Result<Value, RuntimeError> {
    let (a, b) = numbers(operator, left, right)?;
    Ok(Value::Bool(f(a, b)))
}
