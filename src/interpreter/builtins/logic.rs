//! Logic expansions: not and or xor
//!
//! `xor` over more than two arguments is a parity check: true when an odd
//! number of arguments are true.

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::datatypes::{apply_reduce_bool_op, apply_unary_bool_op, bool_to_str};

pub fn handle_not(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    Ok(bool_to_str(apply_unary_bool_op(context, |b| !b)?).to_string())
}

pub fn handle_and(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    Ok(bool_to_str(apply_reduce_bool_op(context, |a, b| a && b)?).to_string())
}

pub fn handle_or(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    Ok(bool_to_str(apply_reduce_bool_op(context, |a, b| a || b)?).to_string())
}

pub fn handle_xor(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    Ok(bool_to_str(apply_reduce_bool_op(context, |a, b| a ^ b)?).to_string())
}
