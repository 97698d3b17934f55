//! Random expansions: select shuffle uniform

use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::datatypes::{require_arg_length, require_numeric_arg, Number};

/// One argument, picked at random.
pub fn handle_select(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    require_arg_length(context, 1)?;
    match context.args()?.choose(&mut thread_rng()) {
        Some(choice) => Ok(choice.clone()),
        None => Err(context.internal_error("select: no arguments to choose from")),
    }
}

/// All arguments in random order, joined with spaces.
pub fn handle_shuffle(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let mut args = context.args()?.to_vec();
    args.shuffle(&mut thread_rng());
    Ok(args.join(" "))
}

/// `uniform a b` is a random float between the bounds, both included. The
/// bounds may be given in either order.
pub fn handle_uniform(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let args = context.args()?;
    if args.len() != 2 {
        return Err(context.error(format!("uniform: must have two args. (got {})", args.join(", "))));
    }
    let mut lower = require_numeric_arg(context, 0)?.as_f64();
    let mut upper = require_numeric_arg(context, 1)?.as_f64();
    if !lower.is_finite() || !upper.is_finite() {
        return Err(context.error("uniform: bounds must be finite"));
    }
    if lower > upper {
        std::mem::swap(&mut lower, &mut upper);
    }

    let value = if lower == upper {
        lower
    } else {
        thread_rng().gen_range(lower..=upper)
    };
    Ok(Number::Float(value).to_string())
}
