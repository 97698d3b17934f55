//! Call Handlers
//!
//! A call handler claims call names and executes calls for them. Commands and
//! control calls produce nothing (`CallHandler<()>`); expansions produce a
//! string (`CallHandler<String>`).
//!
//! Handlers live in `CallHandlerContainer`s. Lookup goes through the
//! container's handlers in insertion order and returns the first handler that
//! supports the name.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;

pub trait CallHandler<T> {
    /// Execute the call described by the context's current call frame.
    fn handle_call(&self, context: &mut InterpreterContext) -> Result<T, InterpreterError>;

    fn supports(&self, name: &str) -> bool;
}

/// Runs once on every context before a script is interpreted with it.
pub trait Initializer {
    fn handle_call(&self, context: &mut InterpreterContext) -> Result<(), InterpreterError>;
}

pub type ScrollCallback<T> = Rc<dyn Fn(&mut InterpreterContext) -> Result<T, InterpreterError>>;

/// A handler that maps names (and aliases) to plain functions.
pub struct CallbackCallHandler<T> {
    calls: IndexMap<String, ScrollCallback<T>>,
    aliases: IndexMap<String, String>,
}

pub type CallbackCommandHandler = CallbackCallHandler<()>;
pub type CallbackControlHandler = CallbackCallHandler<()>;
pub type CallbackExpansionHandler = CallbackCallHandler<String>;

impl<T> Default for CallbackCallHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallbackCallHandler<T> {
    pub fn new() -> Self {
        Self {
            calls: IndexMap::new(),
            aliases: IndexMap::new(),
        }
    }

    pub fn add_call<F>(&mut self, name: &str, callback: F)
    where
        F: Fn(&mut InterpreterContext) -> Result<T, InterpreterError> + 'static,
    {
        self.calls.insert(name.to_string(), Rc::new(callback));
    }

    pub fn add_alias(&mut self, alias: &str, name: &str) {
        self.aliases.insert(alias.to_string(), name.to_string());
    }

    pub fn remove_call(&mut self, name: &str) -> bool {
        self.aliases.retain(|_, target| target != name);
        self.calls.shift_remove(name).is_some()
    }

    pub fn get_callback(&self, name: &str) -> Option<ScrollCallback<T>> {
        let target = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.calls.get(target).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.calls.keys().map(String::as_str)
    }
}

impl<T> CallHandler<T> for CallbackCallHandler<T> {
    fn handle_call(&self, context: &mut InterpreterContext) -> Result<T, InterpreterError> {
        let name = context.call_name()?.to_string();
        match self.get_callback(&name) {
            Some(callback) => callback(context),
            None => Err(context.internal_error(format!("no callback registered for \"{}\"", name))),
        }
    }

    fn supports(&self, name: &str) -> bool {
        self.calls.contains_key(name) || self.aliases.contains_key(name)
    }
}

/// Runs an expansion as a command, dropping its result.
pub struct DiscardResult {
    inner: Rc<dyn CallHandler<String>>,
}

impl DiscardResult {
    pub fn new(inner: Rc<dyn CallHandler<String>>) -> Self {
        Self { inner }
    }
}

impl CallHandler<()> for DiscardResult {
    fn handle_call(&self, context: &mut InterpreterContext) -> Result<(), InterpreterError> {
        self.inner.handle_call(context).map(|_| ())
    }

    fn supports(&self, name: &str) -> bool {
        self.inner.supports(name)
    }
}

/// An ordered, named collection of handlers.
pub struct CallHandlerContainer<T> {
    handlers: IndexMap<String, Rc<dyn CallHandler<T>>>,
    generated: usize,
}

impl<T> Clone for CallHandlerContainer<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            generated: self.generated,
        }
    }
}

impl<T> Default for CallHandlerContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallHandlerContainer<T> {
    pub fn new() -> Self {
        Self {
            handlers: IndexMap::new(),
            generated: 0,
        }
    }

    /// Add a handler under `name`, replacing any handler already there. An
    /// empty name gets a generated one. Returns the name used.
    pub fn add(&mut self, handler: Rc<dyn CallHandler<T>>, name: &str) -> String {
        let name = if name.is_empty() {
            self.generated += 1;
            format!("__handler_{}", self.generated)
        } else {
            name.to_string()
        };
        self.handlers.insert(name.clone(), handler);
        name
    }

    pub fn add_all(&mut self, handlers: impl IntoIterator<Item = Rc<dyn CallHandler<T>>>) {
        for handler in handlers {
            self.add(handler, "");
        }
    }

    /// Name a handler was registered under.
    pub fn find(&self, handler: &Rc<dyn CallHandler<T>>) -> Option<&str> {
        self.handlers
            .iter()
            .find(|(_, h)| std::ptr::addr_eq(Rc::as_ptr(h), Rc::as_ptr(handler)))
            .map(|(name, _)| name.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<Rc<dyn CallHandler<T>>> {
        self.handlers.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn CallHandler<T>>> {
        self.handlers.get(name).cloned()
    }

    /// First handler, in insertion order, that supports `call_name`.
    pub fn get_for_call(&self, call_name: &str) -> Option<Rc<dyn CallHandler<T>>> {
        self.handlers
            .values()
            .find(|h| h.supports(call_name))
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<dyn CallHandler<T>>)> {
        self.handlers.iter().map(|(name, h)| (name.as_str(), h))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// A read-only view over several containers, searched in order.
pub struct ChoiceCallHandlerContainer<'a, T> {
    containers: Vec<&'a CallHandlerContainer<T>>,
}

impl<'a, T> ChoiceCallHandlerContainer<'a, T> {
    pub fn new(containers: Vec<&'a CallHandlerContainer<T>>) -> Self {
        Self { containers }
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn CallHandler<T>>> {
        self.containers.iter().find_map(|c| c.get(name))
    }

    pub fn get_for_call(&self, call_name: &str) -> Option<Rc<dyn CallHandler<T>>> {
        self.containers.iter().find_map(|c| c.get_for_call(call_name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Rc<dyn CallHandler<T>>)> + '_ {
        self.containers.iter().copied().flat_map(|c| c.iter())
    }
}
