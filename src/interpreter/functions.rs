//! Runtime-Defined Calls
//!
//! Calls a script defines with `%def`. Each call runs in a fresh variable
//! scope with its parameters bound as locals. A definition whose last
//! parameter starts with `*` collects any surplus arguments, joined with
//! spaces.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::types::AstNode;
use crate::interpreter::call_handler::CallHandler;
use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;

#[derive(Debug, Clone)]
pub struct RuntimeCall {
    pub name: String,
    pub body: Rc<AstNode>,
    /// Parameter names in order. The collecting parameter, if any, is last
    /// and stored without its `*`.
    pub params: Vec<String>,
    pub collects_rest: bool,
}

impl RuntimeCall {
    pub fn new(name: impl Into<String>, body: Rc<AstNode>, params: &[String]) -> Self {
        let mut params = params.to_vec();
        let mut collects_rest = false;
        if let Some(last) = params.last_mut() {
            if let Some(stripped) = last.strip_prefix('*') {
                *last = stripped.to_string();
                collects_rest = true;
            }
        }
        Self {
            name: name.into(),
            body,
            params,
            collects_rest,
        }
    }

    /// Number of parameters bound one argument each.
    pub fn positional_count(&self) -> usize {
        if self.collects_rest {
            self.params.len() - 1
        } else {
            self.params.len()
        }
    }
}

#[derive(Default)]
pub struct RuntimeCallHandler {
    calls: RefCell<IndexMap<String, RuntimeCall>>,
}

impl RuntimeCallHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a call.
    pub fn define(&self, name: &str, body: Rc<AstNode>, params: &[String]) {
        tracing::debug!(name, ?params, "define runtime call");
        self.calls
            .borrow_mut()
            .insert(name.to_string(), RuntimeCall::new(name, body, params));
    }

    pub fn undefine(&self, name: &str) -> bool {
        self.calls.borrow_mut().shift_remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<RuntimeCall> {
        self.calls.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.calls.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.calls.borrow().keys().cloned().collect()
    }

    fn invoke(&self, context: &mut InterpreterContext) -> Result<String, InterpreterError> {
        let name = context.call_name()?.to_string();
        let call = match self.get(&name) {
            Some(call) => call,
            None => return Err(context.internal_error(format!("runtime call \"{}\" is not defined", name))),
        };

        let args = context.args()?.to_vec();
        let positional = call.positional_count();
        if call.collects_rest {
            if args.len() < positional {
                return Err(context.error(format!(
                    "{}: Invalid # of arguments (expected at least {})",
                    name, positional
                )));
            }
        } else if args.len() != positional {
            return Err(context.error(format!(
                "{}: Invalid # of arguments (expected {})",
                name, positional
            )));
        }

        context.call_context_mut()?.runtime_call = true;
        context.vars_mut().new_scope();

        for (param, arg) in call.params.iter().zip(args.iter()).take(positional) {
            context.set_var(param, arg.as_str());
        }
        if call.collects_rest {
            if let Some(rest_param) = call.params.get(positional) {
                context.set_var(rest_param, args[positional..].join(" "));
            }
        }

        tracing::trace!(name = %name, depth = context.call_depth(), "enter runtime call");
        let result = context.interpret_statement(&call.body);
        let destroyed = context.vars_mut().destroy_scope();

        match result {
            Ok(()) | Err(InterpreterError::Return(_)) => {}
            Err(e) => return Err(e),
        }
        destroyed.map_err(|e| context.internal_error(e.to_string()))?;

        Ok(context.call_context()?.return_value.clone().unwrap_or_default())
    }
}

impl CallHandler<()> for RuntimeCallHandler {
    fn handle_call(&self, context: &mut InterpreterContext) -> Result<(), InterpreterError> {
        self.invoke(context).map(|_| ())
    }

    fn supports(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl CallHandler<String> for RuntimeCallHandler {
    fn handle_call(&self, context: &mut InterpreterContext) -> Result<String, InterpreterError> {
        self.invoke(context)
    }

    fn supports(&self, name: &str) -> bool {
        self.contains(name)
    }
}
