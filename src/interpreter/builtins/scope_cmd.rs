//! nonlocal, global - Redirect variable access to outer scopes
//!
//! Inside a `%def` call, `nonlocal NAME` makes reads and writes of NAME go to
//! the caller's scope, and `global NAME` makes them go to the outermost scope.
//! The declaration lasts until the current scope is destroyed.

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::datatypes::require_arg_length;

pub fn handle_nonlocal(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    require_arg_length(context, 1)?;
    let name = context.args()?[0].clone();
    context.vars_mut().declare_nonlocal(&name);
    Ok(())
}

pub fn handle_global(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    require_arg_length(context, 1)?;
    let name = context.args()?[0].clone();
    context.vars_mut().declare_global(&name);
    Ok(())
}
