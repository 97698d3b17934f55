//! Comparison expansions: eq? (==) neq? === > < >= <= in?
//!
//! `eq?` and `neq?` compare numerically when both sides are numbers, so
//! `$(== 1 1.0)` is true. `===` always compares the raw strings.

use std::cmp::Ordering;

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::datatypes::{bool_to_str, require_all_numeric, str_to_numeric, Number};

fn require_two(context: &InterpreterContext) -> Result<(String, String), InterpreterError> {
    let args = context.args()?;
    if args.len() != 2 {
        return Err(context.error(format!("{}: must have exactly 2 args", context.call_name()?)));
    }
    Ok((args[0].clone(), args[1].clone()))
}

fn equals(context: &InterpreterContext) -> Result<bool, InterpreterError> {
    let (a, b) = require_two(context)?;
    match (str_to_numeric(&a), str_to_numeric(&b)) {
        (Some(x), Some(y)) => Ok(x.compare(&y) == Some(Ordering::Equal)),
        _ => Ok(a == b),
    }
}

fn numeric_order(context: &InterpreterContext) -> Result<Option<Ordering>, InterpreterError> {
    let (a, b) = require_two(context)?;
    let nums: Vec<Number> = require_all_numeric(context, 0, &[a, b])?;
    Ok(nums[0].compare(&nums[1]))
}

pub fn handle_equals(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    Ok(bool_to_str(equals(context)?).to_string())
}

pub fn handle_not_equals(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    Ok(bool_to_str(!equals(context)?).to_string())
}

pub fn handle_str_equals(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let (a, b) = require_two(context)?;
    Ok(bool_to_str(a == b).to_string())
}

pub fn handle_gt(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let order = numeric_order(context)?;
    Ok(bool_to_str(order == Some(Ordering::Greater)).to_string())
}

pub fn handle_lt(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let order = numeric_order(context)?;
    Ok(bool_to_str(order == Some(Ordering::Less)).to_string())
}

pub fn handle_gte(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let order = numeric_order(context)?;
    Ok(bool_to_str(matches!(order, Some(Ordering::Greater | Ordering::Equal))).to_string())
}

pub fn handle_lte(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let order = numeric_order(context)?;
    Ok(bool_to_str(matches!(order, Some(Ordering::Less | Ordering::Equal))).to_string())
}

/// `in? x items...` is true when `x` equals one of the items.
pub fn handle_in(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let args = context.args()?;
    match args.split_first() {
        Some((needle, haystack)) => Ok(bool_to_str(haystack.contains(needle)).to_string()),
        None => Err(context.error(format!(
            "{} requires at least one argument",
            context.call_name()?
        ))),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::builtins::testing::{eval, run_script};

    #[test]
    fn test_weak_and_strong_equality() {
        assert_eq!(eval("== 1 1.0"), "1");
        assert_eq!(eval("eq? abc abc"), "1");
        assert_eq!(eval("eq? abc 1"), "0");
        assert_eq!(eval("neq? 2 2.0"), "0");
        assert_eq!(eval("=== 1 1.0"), "0");
        assert_eq!(eval("=== x x"), "1");
    }

    #[test]
    fn test_ordering() {
        assert_eq!(eval("> 3 2"), "1");
        assert_eq!(eval("> 2 3"), "0");
        assert_eq!(eval("< 1.5 2"), "1");
        assert_eq!(eval(">= 2 2.0"), "1");
        assert_eq!(eval("<= 3 2"), "0");
    }

    #[test]
    fn test_membership() {
        assert_eq!(eval("in? b a b c"), "1");
        assert_eq!(eval("in? d a b c"), "0");
        assert_eq!(eval("in? d"), "0");
    }

    #[test]
    fn test_errors() {
        let (result, _) = run_script("print $(> 1 2 3)");
        assert!(result.unwrap_err().to_string().contains(">: must have exactly 2 args"));
        let (result, _) = run_script("print $(< a 2)");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("<: a is not a valid int or float"));
        let (result, _) = run_script("print $(in?)");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("in? requires at least one argument"));
    }
}
