//! Built-in globals installed before any user code runs.

use std::collections::HashMap;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::environment::{EnvRef, Environment};
use crate::interpreter::Interpreter;
use crate::value::{
    InstanceRef, LoxClass, LoxFunction, NativeFunction, NativeMethodFn, Value, INITIALIZER,
};

/// Name of the built-in dynamic array class.
pub const ARRAY_CLASS: &str = "array";

/// Define every built-in in `globals`.
pub fn install(globals: &EnvRef) {
    info!("Installing native globals");

    let functions = [
        NativeFunction::new("clock", 0, clock),
        NativeFunction::new("input", 0, input),
        NativeFunction::new("parseNumber", 1, parse_number),
    ];

    let mut env = globals.borrow_mut();
    for native in functions {
        debug!("Defining native function '{}'", native.name);
        env.define(native.name, Value::NativeFunction(Rc::new(native)));
    }
    drop(env);

    let array = array_class(globals);
    globals
        .borrow_mut()
        .define(ARRAY_CLASS, Value::Class(Rc::new(array)));
}

/// Seconds since the Unix epoch, with sub-second precision.
fn clock(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    let micros = Utc::now().timestamp_micros();
    Ok(Value::Number(micros as f64 / 1_000_000.0))
}

/// One line from the interpreter's input, without its line terminator, or
/// `nil` at end of input.
fn input(interpreter: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    match interpreter.read_line() {
        Ok(Some(line)) => Ok(Value::String(line)),
        Ok(None) => Ok(Value::Nil),
        Err(e) => Err(format!("Failed to read input: {}", e)),
    }
}

fn parse_number(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| format!("Cannot parse '{}' as a number.", s)),
        other => Err(format!("Cannot parse a {} as a number.", other.type_name())),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// array
// ─────────────────────────────────────────────────────────────────────────────

fn array_class(globals: &EnvRef) -> LoxClass {
    let methods: [(&'static str, usize, NativeMethodFn); 6] = [
        (INITIALIZER, 0, array_init),
        ("size", 0, array_size),
        ("get", 1, array_get),
        ("set", 2, array_set),
        ("append", 1, array_append),
        ("pop", 0, array_pop),
    ];

    let closure: EnvRef = Environment::with_enclosing(Rc::clone(globals)).into_ref();

    let methods: HashMap<String, Rc<LoxFunction>> = methods
        .into_iter()
        .map(|(name, arity, func)| {
            let method = LoxFunction::native_method(name, arity, func, Rc::clone(&closure));
            (name.to_string(), Rc::new(method))
        })
        .collect();

    LoxClass::new(ARRAY_CLASS, None, methods)
}

/// Index argument, truncated toward zero and bounds-checked against `len`.
fn index(value: &Value, len: usize) -> Result<usize, String> {
    let n = match value {
        Value::Number(n) => n.trunc(),
        _ => return Err("Indexes can only be numbers.".to_string()),
    };

    if !n.is_finite() || n < 0.0 || n >= len as f64 {
        return Err(format!("Index {} out of range.", n));
    }

    Ok(n as usize)
}

fn array_init(this: &InstanceRef, _: &[Value]) -> Result<Value, String> {
    this.borrow_mut().elements.clear();
    Ok(Value::Nil)
}

fn array_size(this: &InstanceRef, _: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(this.borrow().elements.len() as f64))
}

fn array_get(this: &InstanceRef, args: &[Value]) -> Result<Value, String> {
    let instance = this.borrow();
    let i = index(&args[0], instance.elements.len())?;
    Ok(instance.elements[i].clone())
}

fn array_set(this: &InstanceRef, args: &[Value]) -> Result<Value, String> {
    let mut instance = this.borrow_mut();
    let i = index(&args[0], instance.elements.len())?;
    instance.elements[i] = args[1].clone();
    Ok(Value::Nil)
}

fn array_append(this: &InstanceRef, args: &[Value]) -> Result<Value, String> {
    this.borrow_mut().elements.push(args[0].clone());
    Ok(Value::Nil)
}

fn array_pop(this: &InstanceRef, _: &[Value]) -> Result<Value, String> {
    this.borrow_mut()
        .elements
        .pop()
        .ok_or_else(|| "Cannot pop from an empty array.".to_string())
}
