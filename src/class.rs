use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{Callable, Value};

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(name: String, superclass: Option<Rc<Class>>, methods: HashMap<String, Rc<Function>>) -> Self {
        Class { name, superclass, methods }
    }

    /// Looks up a method on this class, falling through to the superclass
    /// chain when it isn't defined locally.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass.as_ref().and_then(|superclass| superclass.find_method(name))
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<PloxClass {}>", self.name)
    }
}

impl Callable for Class {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    fn call(self: Rc<Self>, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        let instance = Rc::new(RefCell::new(Instance::new(self.clone())));

        if let Some(init) = self.find_method("init") {
            Rc::new(init.bind(Value::Instance(instance.clone()))).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance { class, fields: HashMap::new() }
    }

    pub fn get(&self, name: &Token, this: Value) -> Result<Value, RuntimeError> {
        if let Some(field) = self.fields.get(&name.lexeme) {
            return Ok(field.clone());
        }

        if let Some(method) = self.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(this))));
        }

        Err(RuntimeError::new(name.clone(), format!("Undefined property '{}'.", name.lexeme)))
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{} instance]", self.class)
    }
}
