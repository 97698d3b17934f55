//! set, unset - Assign and delete variables

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;

/// `set NAME value...`
///
/// The value is every argument after the name, joined with single spaces.
/// `set NAME` alone stores an empty string.
pub fn handle_set(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    let args = context.args()?.to_vec();
    match args.split_first() {
        Some((name, value)) => {
            context.set_var(name, value.join(" "));
            Ok(())
        }
        None => Err(context.error("set: variable name is not specified")),
    }
}

/// `unset NAME`
pub fn handle_unset(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    let name = match context.args()?.first() {
        Some(name) => name.clone(),
        None => return Err(context.error("unset: variable name is not specified")),
    };
    if context.vars_mut().del_var(&name).is_err() {
        return Err(context.error(format!("unset: no such variable {}", name)));
    }
    Ok(())
}
