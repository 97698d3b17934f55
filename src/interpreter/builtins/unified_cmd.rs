//! use-unified-commands - Let expansions run as commands
//!
//! After `use-unified-commands`, a command name that no command handler
//! claims is looked up among the expansions instead, and the expansion's
//! result is dropped. The switch belongs to the context and stays on for the
//! rest of its life.

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;

pub fn handle_use_unified_commands(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    tracing::debug!("unified commands enabled");
    context.enable_unified_commands();
    Ok(())
}
