//! One interpreter session: `scan → parse → resolve → interpret`.
//!
//! The session owns a single [`Interpreter`], so globals defined by one
//! [`Lox::run`] call are visible to the next (the interactive loop relies on
//! this).  Each stage returns its [`Diagnostics`]; a stage that reported
//! anything stops the pipeline before the next one runs.

use std::io::{self, BufRead, Write};
use std::panic;
use std::thread;

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Native stack given to a session thread.  Evaluation recurses on the host
/// stack, and [`MAX_CALL_DEPTH`](crate::interpreter::MAX_CALL_DEPTH) Lox calls
/// with deep block and expression nesting in each need far more than a
/// default main thread provides.
pub const STACK_SIZE: usize = 256 * 1024 * 1024;

/// Run `work` on a thread with a [`STACK_SIZE`] stack and wait for it.
/// A panic on that thread is resumed on the caller.
pub fn with_stack<F, T>(work: F) -> io::Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    debug!("Spawning session thread with {} byte stack", STACK_SIZE);

    let handle = thread::Builder::new()
        .name("lox".to_string())
        .stack_size(STACK_SIZE)
        .spawn(work)?;

    match handle.join() {
        Ok(value) => Ok(value),
        Err(payload) => panic::resume_unwind(payload),
    }
}

pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// Session printing to stdout and reading `input()` from stdin.
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// Session with explicit output and input sinks.
    pub fn with_io(output: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        Self {
            interpreter: Interpreter::with_io(output, input),
        }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Next line from the session's input sink.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        self.interpreter.read_line()
    }

    /// Run a whole program.
    pub fn run(&mut self, source: &str) -> Result<(), Diagnostics> {
        info!("Running {} bytes of source", source.len());

        let statements = self.front_end(source)?;
        self.interpreter.interpret(&statements)?;

        info!("Run finished");
        Ok(())
    }

    /// Run one interactive line.  A line holding a single expression
    /// statement has its value echoed.
    pub fn run_line(&mut self, line: &str) -> Result<(), Diagnostics> {
        let statements = self.front_end(line)?;

        match statements.as_slice() {
            [Stmt::Expression(expr)] => {
                debug!("Echoing expression value");
                let text = self.interpreter.interpret_expression(expr)?;
                self.interpreter.print_line(&text)?;
            }
            _ => self.interpreter.interpret(&statements)?,
        }

        Ok(())
    }

    /// Scan, parse and resolve `source`, recording its resolution table in
    /// the interpreter.
    fn front_end(&mut self, source: &str) -> Result<Vec<Stmt>, Diagnostics> {
        let tokens = Scanner::new(source).scan_tokens()?;
        let statements = Parser::new(&tokens).parse()?;
        let locals = Resolver::new().resolve(&statements)?;

        self.interpreter.resolve(locals);
        Ok(statements)
    }
}
