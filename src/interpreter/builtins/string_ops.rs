//! String and vector expansions
//!
//! Indices and lengths count characters, not bytes. A "vector" is a string
//! of whitespace-separated elements, which is what a spread `$*name` splits.

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::datatypes::{bool_to_str, numeric_error, require_all_numeric, require_arg_length, Number};
use crate::interpreter::helpers::options::{ArgOption, OptionType, Signature};

/// `cat a b ...` concatenates its arguments with nothing in between.
pub fn handle_cat(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    Ok(context.args()?.concat())
}

/// `getc s i`. A negative index counts from the end.
pub fn handle_getc(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let signature = Signature::new()
        .option(ArgOption::new("string", OptionType::Str))
        .option(ArgOption::new("index", OptionType::Int));
    let values = signature.convert(context)?;
    let index = values[1].as_int().unwrap_or_default();
    let chars: Vec<char> = values[0].as_str().unwrap_or_default().chars().collect();

    let len = chars.len() as i64;
    let resolved = if index < 0 { index + len } else { index };
    if resolved < 0 || resolved >= len {
        return Err(context.error(format!("getc: string index {} out of range", index)));
    }
    Ok(chars[resolved as usize].to_string())
}

pub fn handle_len(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    require_arg_length(context, 1)?;
    Ok(context.args()?[0].chars().count().to_string())
}

pub fn handle_ord(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    require_arg_length(context, 1)?;
    let s = &context.args()?[0];
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok((c as u32).to_string()),
        _ => Err(context.error(format!(
            "ord: expected a character, but string of length {} found",
            s.chars().count()
        ))),
    }
}

pub fn handle_chr(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let signature = Signature::new().option(ArgOption::new("code", OptionType::Int));
    let code = signature.convert(context)?[0].as_int().unwrap_or_default();
    match u32::try_from(code).ok().and_then(char::from_u32) {
        Some(c) => Ok(c.to_string()),
        None => Err(context.error(format!("chr: {} is not a valid code point", code))),
    }
}

pub fn handle_vempty(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    require_arg_length(context, 1)?;
    Ok(bool_to_str(context.args()?[0].is_empty()).to_string())
}

pub fn handle_vhead(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    require_arg_length(context, 1)?;
    match context.args()?[0].split_whitespace().next() {
        Some(head) => Ok(head.to_string()),
        None => Err(context.error("vhead: vector is empty")),
    }
}

/// Everything after the first element, with the original spacing between
/// the remaining elements kept.
pub fn handle_vtail(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    require_arg_length(context, 1)?;
    let vector = context.args()?[0].trim_start();
    match vector.find(char::is_whitespace) {
        Some(end) => Ok(vector[end..].trim_start().to_string()),
        None => Ok(String::new()),
    }
}

pub fn handle_vlen(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    require_arg_length(context, 1)?;
    Ok(context.args()?[0].split_whitespace().count().to_string())
}

/// `rangev a b` lists the integers from `a` up to, not including, `b`.
pub fn handle_rangev(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    require_arg_length(context, 2)?;
    let nums = require_all_numeric(context, 0, &context.args()?[..2])?;
    let bounds = (nums[0].to_int(), nums[1].to_int());
    let (start, end) = match bounds {
        (Ok(Number::Int(a)), Ok(Number::Int(b))) => (a, b),
        (Err(e), _) | (_, Err(e)) => return Err(numeric_error(context, e)),
        _ => return Err(context.internal_error("rangev: bounds did not convert to integers")),
    };
    Ok((start..end).map(|i| i.to_string()).collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::builtins::testing::{error_position, eval, run_script};

    #[test]
    fn test_cat() {
        assert_eq!(eval("cat a b \"c d\""), "abc d");
        assert_eq!(eval("concat x \"!\""), "x!");
        assert_eq!(eval("cat"), "");
    }

    #[test]
    fn test_characters() {
        assert_eq!(eval("getc Hello 4"), "o");
        assert_eq!(eval("getc Hello -1"), "o");
        assert_eq!(eval("getc héllo 1"), "é");
        assert_eq!(eval("len héllo"), "5");
        assert_eq!(eval("ord h"), "104");
        assert_eq!(eval("chr 104"), "h");
    }

    #[test]
    fn test_character_errors() {
        let (result, _) = run_script("print $(getc abc 3)");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("getc: string index 3 out of range"));
        let (result, _) = run_script("print $(ord ab)");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("ord: expected a character, but string of length 2 found"));
        let (result, _) = run_script("print $(getc abc 1.5)");
        assert_eq!(error_position(result), ("index: '1.5' is not a valid integer".to_string(), 1, 18));
        let (result, _) = run_script("print $(chr -1)");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("chr: -1 is not a valid code point"));
    }

    #[test]
    fn test_vectors() {
        assert_eq!(eval("vempty? \"\""), "1");
        assert_eq!(eval("vempty? \"a\""), "0");
        assert_eq!(eval("vhead \"2 4 8 16\""), "2");
        assert_eq!(eval("vtail \"2 4 8 16\""), "4 8 16");
        assert_eq!(eval("vtail \"  2   4 8\""), "4 8");
        assert_eq!(eval("vtail 2"), "");
        assert_eq!(eval("vlen \" a b  c d \""), "4");
        assert_eq!(eval("rangev 0 4"), "0 1 2 3");
        assert_eq!(eval("rangev 4 0"), "");
    }

    #[test]
    fn test_vhead_of_empty_vector() {
        let (result, _) = run_script("print $(vhead \"  \")");
        assert!(result.unwrap_err().to_string().contains("vhead: vector is empty"));
    }
}
