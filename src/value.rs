//! Runtime value model: primitives plus the callable family (native
//! functions, user functions and bound methods, classes) and instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;

/// Name of the method run when a class is called.
pub const INITIALIZER: &str = "init";

/// Name of the zero-argument method consulted when printing an instance.
pub const TO_STRING: &str = "toString";

/// A global built-in.  Errors are plain messages; the interpreter attaches the
/// call site's line.
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> std::result::Result<Value, String>;

/// A built-in method, called with the instance it is bound to.
pub type NativeMethodFn = fn(&InstanceRef, &[Value]) -> std::result::Result<Value, String>;

pub type InstanceRef = Rc<RefCell<LoxInstance>>;

#[derive(Clone)]
pub enum Value {
    NativeFunction(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(InstanceRef),
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl Value {
    /// `nil` and `false` are falsy; everything else, `0` and `""` included,
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Name of the runtime type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NativeFunction(_) | Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
        }
    }
}

/// Magnitude from which numbers print in exponent form.
const EXPONENT_THRESHOLD: f64 = 1e21;

/// Format a number the way `print` shows it: integral values drop the `.0`
/// and huge magnitudes use exponent form.
pub fn format_number(n: f64) -> String {
    if n.abs() >= EXPONENT_THRESHOLD {
        format!("{:e}", n)
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NativeFunction(native) => write!(f, "<native fn {}>", native.name),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),

            Value::Number(n) => write!(f, "{}", format_number(*n)),

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}

// Environments hold functions whose closures hold environments, so Debug
// must stay shallow.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native functions
// ─────────────────────────────────────────────────────────────────────────────

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, func: NativeFn) -> Self {
        Self { name, arity, func }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Functions and bound methods
// ─────────────────────────────────────────────────────────────────────────────

/// What runs when a [`LoxFunction`] is called.
#[derive(Clone)]
pub enum FunctionBody {
    /// A function or method written in Lox.
    Declared(Rc<FunctionDecl>),

    /// A built-in method; `this` is read from the bound closure.
    Native {
        name: &'static str,
        arity: usize,
        func: NativeMethodFn,
    },
}

/// A closure: a body plus the environment it was created in.
pub struct LoxFunction {
    pub body: FunctionBody,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            body: FunctionBody::Declared(declaration),
            closure,
            is_initializer,
        }
    }

    pub fn native_method(
        name: &'static str,
        arity: usize,
        func: NativeMethodFn,
        closure: EnvRef,
    ) -> Self {
        Self {
            body: FunctionBody::Native { name, arity, func },
            closure,
            is_initializer: name == INITIALIZER,
        }
    }

    pub fn name(&self) -> &str {
        match &self.body {
            FunctionBody::Declared(decl) => &decl.name.lexeme,
            FunctionBody::Native { name, .. } => name,
        }
    }

    pub fn arity(&self) -> usize {
        match &self.body {
            FunctionBody::Declared(decl) => decl.params.len(),
            FunctionBody::Native { arity, .. } => *arity,
        }
    }

    /// A copy of this method whose closure binds `this` to `instance`.  The
    /// original is left untouched, so one declaration can be bound to many
    /// instances.
    pub fn bind(&self, instance: &InstanceRef) -> LoxFunction {
        debug!("Binding method '{}'", self.name());

        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", Value::Instance(Rc::clone(instance)));

        LoxFunction {
            body: self.body.clone(),
            closure: env.into_ref(),
            is_initializer: self.is_initializer,
        }
    }

    /// The instance a bound method was bound to.
    pub fn bound_this(&self) -> Option<InstanceRef> {
        match self.closure.borrow().get_local("this") {
            Some(Value::Instance(instance)) => Some(instance),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes and instances
// ─────────────────────────────────────────────────────────────────────────────

pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name: name.into(),
            superclass,
            methods,
        }
    }

    /// Unbound method lookup, walking up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class takes the arguments of its initializer, if it has one.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER)
            .map(|init| init.arity())
            .unwrap_or(0)
    }
}

pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: HashMap<String, Value>,

    /// Backing storage for the built-in `array` class.
    pub elements: Vec<Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
            elements: Vec::new(),
        }
    }

    /// Property read: fields shadow methods; methods are bound afresh on
    /// every access.
    pub fn get(instance: &InstanceRef, name: &Token) -> Result<Value> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let class = Rc::clone(&instance.borrow().class);

        match class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Function(Rc::new(method.bind(instance)))),
            None => Err(LoxError::runtime(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    /// Property write always lands in a field.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-12.0).to_string(), "-12");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn huge_numbers_print_in_exponent_form() {
        assert_eq!(format_number(1e300), "1e300");
        assert_eq!(format_number(-2.5e21), "-2.5e21");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn equality_never_crosses_types() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(1.0), Value::String("1".into()));
        assert_eq!(Value::String("a".into()), Value::String("a".into()));
    }

    #[test]
    fn method_lookup_walks_superclass_chain() {
        let closure = Environment::new().into_ref();
        let mut base_methods = HashMap::new();
        base_methods.insert(
            "size".to_string(),
            Rc::new(LoxFunction::native_method(
                "size",
                0,
                |_, _| Ok(Value::Nil),
                Rc::clone(&closure),
            )),
        );
        let base = Rc::new(LoxClass::new("Base", None, base_methods));
        let derived = LoxClass::new("Derived", Some(base), HashMap::new());

        assert!(derived.find_method("size").is_some());
        assert!(derived.find_method("missing").is_none());
        assert_eq!(derived.arity(), 0);
    }
}
