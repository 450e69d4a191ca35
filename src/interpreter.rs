//! Tree‑walking evaluator.
//!
//! Statements execute against a current environment cursor; expressions are
//! evaluated by recursive descent over [`Expr`].  Variable references use the
//! hop counts recorded by the resolver: a recorded reference walks exactly
//! that many environments up the chain, an unrecorded one goes straight to
//! the globals.
//!
//! `return`, `break` and `continue` travel as [`Flow`] values returned by
//! [`Interpreter::execute`], not as errors.  Runtime errors are
//! [`LoxError::Runtime`] and unwind to whoever called [`Interpreter::interpret`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::native;
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::{
    format_number, FunctionBody, InstanceRef, LoxClass, LoxFunction, LoxInstance, Value,
    INITIALIZER, TO_STRING,
};

/// Deepest allowed nesting of calls before the run is aborted.
pub const MAX_CALL_DEPTH: usize = 256;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter wired to the process's stdout and stdin.
    pub fn new() -> Self {
        Self::with_io(
            Box::new(io::stdout()),
            Box::new(BufReader::new(io::stdin())),
        )
    }

    /// Interpreter with explicit output and input sinks.
    pub fn with_io(output: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new().into_ref();
        native::install(&globals);

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
            input,
            call_depth: 0,
        }
    }

    pub fn globals(&self) -> EnvRef {
        Rc::clone(&self.globals)
    }

    /// Merge a resolution table produced by the resolver.  Entries from
    /// earlier runs are kept: closures created then may still be called.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Recording {} resolved reference(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Hop count recorded for `id`, if the reference is local.
    pub fn depth_of(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error stops the run; the environment cursor is back at the globals
    /// afterwards either way.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                self.environment = Rc::clone(&self.globals);
                self.call_depth = 0;
                return Err(e);
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Evaluate one expression and render the result the way `print` would.
    pub fn interpret_expression(&mut self, expr: &Expr) -> Result<String> {
        let result = self
            .evaluate(expr)
            .and_then(|value| self.stringify(&value, expr.line()));

        if result.is_err() {
            self.environment = Rc::clone(&self.globals);
            self.call_depth = 0;
        }

        result
    }

    /// Read one line from the input sink, without its terminator.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();

        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }

        let trimmed_len = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(trimmed_len);

        Ok(Some(buf))
    }

    /// Write one line to the output sink.
    pub fn print_line(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        self.output.flush()?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                let text = self.stringify(&value, expr.line())?;
                debug!("Printing: {}", text);
                self.print_line(&text)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {:?}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, env.into_ref())
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While {
                condition,
                body,
                initializer,
                increment,
            } => match initializer {
                // A desugared `for`: its variable lives in a scope of its own.
                Some(init) => {
                    let env = Environment::with_enclosing(Rc::clone(&self.environment));
                    let previous = std::mem::replace(&mut self.environment, env.into_ref());
                    let result = self
                        .execute(init)
                        .and_then(|_| self.run_loop(condition, body, increment.as_deref()));
                    self.environment = previous;
                    result
                }
                None => self.run_loop(condition, body, increment.as_deref()),
            },

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {:?}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Continue(_) => Ok(Flow::Continue),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass: Option<Rc<LoxClass>> = match superclass {
                    Some(var) => match self.look_up_variable(&var.name, var.id)? {
                        Value::Class(class) => Some(class),
                        _ => {
                            return Err(LoxError::runtime(
                                var.name.line,
                                "Superclass must be a class.",
                            ))
                        }
                    },
                    None => None,
                };

                // Methods may refer to the class by name before it is bound.
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil);

                let enclosing = Rc::clone(&self.environment);
                let method_env: EnvRef = match &superclass {
                    Some(class) => {
                        let mut env = Environment::with_enclosing(Rc::clone(&enclosing));
                        env.define("super", Value::Class(Rc::clone(class)));
                        env.into_ref()
                    }
                    None => Rc::clone(&enclosing),
                };

                let methods: HashMap<String, Rc<LoxFunction>> = methods
                    .iter()
                    .map(|decl| {
                        let is_initializer = decl.name.lexeme == INITIALIZER;
                        let function =
                            LoxFunction::new(Rc::clone(decl), Rc::clone(&method_env), is_initializer);
                        (decl.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = LoxClass::new(name.lexeme.clone(), superclass, methods);
                info!("Class '{}' defined", name.lexeme);

                enclosing
                    .borrow_mut()
                    .assign(name, Value::Class(Rc::new(class)))?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` with `env` as the current environment.  The previous
    /// cursor is restored on every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }

        Ok(Flow::Normal)
    }

    fn run_loop(&mut self, condition: &Expr, body: &Stmt, increment: Option<&Stmt>) -> Result<Flow> {
        while self.evaluate(condition)?.is_truthy() {
            match self.execute(body)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }

            if let Some(increment) = increment {
                self.execute(increment)?;
            }
        }

        Ok(Flow::Normal)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;
                let right_val = self.evaluate(right)?;
                evaluate_binary(operator, left_val, right_val)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                let short_circuit = match operator.token_type {
                    TokenType::OR => left_val.is_truthy(),
                    _ => !left_val.is_truthy(),
                };

                if short_circuit {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.evaluate(condition)?;

                if cond.is_truthy() {
                    match then_branch {
                        Some(then_expr) => self.evaluate(then_expr),
                        None => Ok(cond),
                    }
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable(var) => self.look_up_variable(&var.name, var.id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.depth_of(*id) {
                    Some(distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee_val, paren, args)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let instance: InstanceRef = match self.evaluate(object)? {
                    Value::Instance(instance) => instance,
                    _ => return Err(LoxError::runtime(name.line, "Only instances have fields.")),
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },
            TokenType::BANG => Ok(Value::Bool(!right_val.is_truthy())),
            _ => Err(LoxError::runtime(
                operator.line,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    /// `super.method`: the superclass sits `distance` links up, `this` one
    /// link below it.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance = self.depth_of(id).ok_or_else(|| {
            LoxError::runtime(keyword.line, "Can't use 'super' outside of a class.")
        })?;

        let superclass = match Environment::get_at(&self.environment, distance, keyword)? {
            Value::Class(class) => class,
            _ => return Err(LoxError::runtime(keyword.line, "Superclass must be a class.")),
        };

        let this_token = Token::synthetic("this", keyword.line);
        let instance = match Environment::get_at(&self.environment, distance - 1, &this_token)? {
            Value::Instance(instance) => instance,
            _ => return Err(LoxError::runtime(keyword.line, "'this' is not an instance.")),
        };

        match superclass.find_method(&method.lexeme) {
            Some(function) => Ok(Value::Function(Rc::new(function.bind(&instance)))),
            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        match self.depth_of(id) {
            Some(distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────

    /// Invokes a callable (native function, user function, or class).
    fn call_value(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> Result<Value> {
        match callee {
            Value::NativeFunction(native) => {
                check_arity(native.arity, args.len(), paren)?;
                debug!("Calling native function '{}'", native.name);
                self.enter_call(paren.line, |interp| {
                    (native.func)(interp, &args).map_err(|msg| LoxError::runtime(paren.line, msg))
                })
            }
            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren)?;
                self.enter_call(paren.line, |interp| {
                    interp.call_function(&function, args, paren.line)
                })
            }
            Value::Class(class) => {
                check_arity(class.arity(), args.len(), paren)?;
                self.enter_call(paren.line, |interp| interp.instantiate(&class, args, paren.line))
            }
            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Run `call` one level deeper, refusing past [`MAX_CALL_DEPTH`].
    fn enter_call<T, F>(&mut self, line: usize, call: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(LoxError::runtime(line, "Stack overflow."));
        }

        self.call_depth += 1;
        let result = call(self);
        self.call_depth -= 1;

        result
    }

    /// Run a function body in a fresh environment parented at its closure.
    fn call_function(&mut self, function: &LoxFunction, args: Vec<Value>, line: usize) -> Result<Value> {
        debug!("Calling function '{}'", function.name());

        match &function.body {
            FunctionBody::Declared(decl) => {
                let mut env = Environment::with_enclosing(Rc::clone(&function.closure));
                for (param, arg) in decl.params.iter().zip(args) {
                    env.define(&param.lexeme, arg);
                }

                let flow = self.execute_block(&decl.body, env.into_ref())?;

                if function.is_initializer {
                    return Environment::get_at(
                        &function.closure,
                        0,
                        &Token::synthetic("this", line),
                    );
                }

                match flow {
                    Flow::Return(value) => Ok(value),
                    _ => Ok(Value::Nil),
                }
            }

            FunctionBody::Native { func, name, .. } => {
                let this = function.bound_this().ok_or_else(|| {
                    LoxError::runtime(line, format!("Method '{}' is not bound.", name))
                })?;

                let result = func(&this, &args).map_err(|msg| LoxError::runtime(line, msg))?;

                if function.is_initializer {
                    Ok(Value::Instance(this))
                } else {
                    Ok(result)
                }
            }
        }
    }

    fn instantiate(&mut self, class: &Rc<LoxClass>, args: Vec<Value>, line: usize) -> Result<Value> {
        let instance: InstanceRef = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(class))));
        debug!("Instantiating '{}'", class.name);

        if let Some(init) = class.find_method(INITIALIZER) {
            self.call_function(&init.bind(&instance), args, line)?;
        }

        Ok(Value::Instance(instance))
    }

    /// Text `print` shows for `value`.  Instances with a zero-argument
    /// `toString` method are rendered through it.
    pub fn stringify(&mut self, value: &Value, line: usize) -> Result<String> {
        if let Value::Instance(instance) = value {
            let class = Rc::clone(&instance.borrow().class);

            if let Some(method) = class.find_method(TO_STRING) {
                if method.arity() == 0 {
                    let bound = method.bind(instance);
                    // The result is stringified one level deeper so a
                    // `toString` returning `this` hits the depth guard.
                    return self.enter_call(line, |interp| {
                        let text = interp.call_function(&bound, Vec::new(), line)?;
                        interp.stringify(&text, line)
                    });
                }
            }
        }

        Ok(value.to_string())
    }
}

fn check_arity(arity: usize, got: usize, paren: &Token) -> Result<()> {
    if arity == got {
        Ok(())
    } else {
        Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", arity, got),
        ))
    }
}

/// Arithmetic, comparison and equality on already-evaluated operands.
fn evaluate_binary(op: &Token, left: Value, right: Value) -> Result<Value> {
    debug!("Binary '{}': {:?} {:?}", op.lexeme, left, right);

    let numbers_required = || LoxError::runtime(op.line, "Operands must be numbers.");

    match op.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (Value::String(a), Value::Number(b)) => Ok(Value::String(a + &format_number(b))),
            (Value::Number(a), Value::String(b)) => Ok(Value::String(format_number(a) + &b)),
            _ => Err(LoxError::runtime(
                op.line,
                "Operands must be two numbers or include a string.",
            )),
        },

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => {
            let (a, b) = match (left, right) {
                (Value::Number(a), Value::Number(b)) => (a, b),
                _ => return Err(numbers_required()),
            };

            match op.token_type {
                TokenType::MINUS => Ok(Value::Number(a - b)),
                TokenType::STAR => Ok(Value::Number(a * b)),
                TokenType::SLASH => Ok(Value::Number(a / b)),
                TokenType::GREATER => Ok(Value::Bool(a > b)),
                TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                TokenType::LESS => Ok(Value::Bool(a < b)),
                TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime(
                    op.line,
                    format!("Invalid binary operator '{}'.", op.lexeme),
                )),
            }
        }
    }
}
