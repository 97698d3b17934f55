//! repeat, for, while - Looping control calls

use std::rc::Rc;

use crate::ast::types::AstNode;
use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::datatypes::str_to_bool;

fn arg_node(context: &InterpreterContext, index: usize) -> Result<Rc<AstNode>, InterpreterError> {
    match context.arg_nodes()?.get(index) {
        Some(node) => Ok(Rc::clone(node)),
        None => Err(context.internal_error(format!("no source node for argument {}", index))),
    }
}

/// `%repeat(n) body`
pub fn handle_repeat(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    if context.args()?.len() != 1 {
        return Err(context.error("repeat requires exactly one argument, the number of times to repeat"));
    }
    let count_node = arg_node(context, 0)?;
    context.set_current_node(count_node);

    let raw = context.args()?[0].clone();
    let times: i64 = match raw.trim().parse() {
        Ok(n) => n,
        Err(_) => return Err(context.error(format!("'{}' is not a valid integer", raw))),
    };

    let body = context.control_node()?;
    for _ in 0..times.max(0) {
        context.interpret_statement(&body)?;
    }
    Ok(())
}

/// `%for(VAR in items...) body`
///
/// VAR is bound to each item in turn and deleted after the last iteration.
pub fn handle_for(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    let args = context.args()?.to_vec();
    if args.len() < 2 {
        return Err(context.error("bad format in %for: expected %for(VARNAME in ARGS)"));
    }
    let (var_name, keyword, items) = (&args[0], &args[1], &args[2..]);
    if keyword != "in" {
        let node = arg_node(context, 1)?;
        context.set_current_node(node);
        return Err(context.error(format!("unexpected token '{}', should be 'in'", keyword)));
    }

    let body = context.control_node()?;
    for item in items {
        context.set_var(var_name, item.as_str());
        context.interpret_statement(&body)?;
    }
    if context.vars().has_var(var_name) {
        context.del_var(var_name)?;
    }
    Ok(())
}

/// `%while(cond) body`
///
/// The condition's source node is evaluated again before every iteration.
pub fn handle_while(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    if context.args()?.len() != 1 {
        return Err(context.error("while: needs one and only one argument"));
    }
    let cond_node = arg_node(context, 0)?;
    let body = context.control_node()?;

    let mut cond = context.args()?[0].clone();
    while str_to_bool(&cond) {
        context.interpret_statement(&body)?;
        cond = match context.interpret_string_or_expansion(&cond_node)?.into_iter().next() {
            Some(value) => value,
            None => {
                context.set_current_node(Rc::clone(&cond_node));
                return Err(context.error("while: condition expanded to nothing"));
            }
        };
    }
    Ok(())
}
