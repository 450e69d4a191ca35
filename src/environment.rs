//! Runtime variable storage.
//!
//! An [`Environment`] maps names to values and points at its enclosing
//! environment, forming a chain rooted at the globals.  Chains are shared
//! (`Rc<RefCell<_>>`): a closure keeps its defining environment alive after
//! the call that created it has returned.
//!
//! The resolver computes, for every local variable reference, how many links
//! up the chain its binding lives.  [`Environment::get_at`] and
//! [`Environment::assign_at`] walk exactly that many links.

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to an environment.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Bind `name` in this environment, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look up a binding in this environment only.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Dynamic lookup walking the whole chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined_variable(name))
        }
    }

    /// Dynamic assignment walking the whole chain.  Never creates a binding.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined_variable(name))
        }
    }

    /// Read `name` exactly `distance` links up from `env`.
    pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value> {
        let target = Self::ancestor(env, distance, name)?;
        let value = target.borrow().get_local(&name.lexeme);

        debug!("get_at({}, '{}') -> {:?}", distance, name.lexeme, value);

        value.ok_or_else(|| undefined_variable(name))
    }

    /// Write `name` exactly `distance` links up from `env`.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
        let target = Self::ancestor(env, distance, name)?;
        let mut target = target.borrow_mut();

        match target.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(undefined_variable(name)),
        }
    }

    fn ancestor(env: &EnvRef, distance: usize, name: &Token) -> Result<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone();
            current = next.ok_or_else(|| {
                // Resolver and runtime disagree about nesting.
                LoxError::runtime(
                    name.line,
                    format!("No scope {} levels up for '{}'.", distance, name.lexeme),
                )
            })?;
        }

        Ok(current)
    }
}

fn undefined_variable(name: &Token) -> LoxError {
    LoxError::runtime(name.line, format!("Undefined variable '{}'.", name.lexeme))
}
