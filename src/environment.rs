use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// Shared handle to an [`Environment`]. Closures hold clones of this handle
/// rather than the environment itself, so a function and the scope it was
/// defined in stay linked after that scope's block has finished executing.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Clone)]
pub struct Environment {
    pub enclosing: Option<Env>,
    variables: HashMap<String, Value>,
}

impl Environment {
    pub fn new(enclosing: Option<Env>) -> Env {
        Rc::new(RefCell::new(Environment { enclosing, variables: HashMap::new() }))
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    fn ancestor(&self, distance: usize) -> Env {
        let mut environment = self
            .enclosing
            .clone()
            .unwrap_or_else(|| panic!("enclosing environment to exist at depth 1"));

        for i in 1..distance {
            let parent = environment
                .borrow()
                .enclosing
                .clone()
                .unwrap_or_else(|| panic!("enclosing environment to exist at depth {i}"));
            environment = parent;
        }

        environment
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if self.variables.contains_key(&name.lexeme) {
            self.variables.insert(name.lexeme.clone(), value);
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow_mut().assign(name, value);
        }

        Err(undefined(name))
    }

    pub fn assign_at(&mut self, distance: usize, name: &Token, value: Value) {
        if distance > 0 {
            self.ancestor(distance).borrow_mut().variables.insert(name.lexeme.clone(), value);
        } else {
            self.variables.insert(name.lexeme.clone(), value);
        }
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.variables.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }

        Err(undefined(name))
    }

    pub fn get_at(&self, distance: usize, name: &Token) -> Result<Value, RuntimeError> {
        if distance > 0 {
            self.ancestor(distance).borrow().variables.get(&name.lexeme).cloned().ok_or_else(|| undefined(name))
        } else {
            self.variables.get(&name.lexeme).cloned().ok_or_else(|| undefined(name))
        }
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name.clone(), format!("Undefined variable '{}'.", name.lexeme))
}
