//! return, stop - Nonlocal exits
//!
//! Both commands end by raising a signal rather than returning normally.
//! `Return` unwinds to the innermost `%def` call, `Stop` unwinds the whole run.

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::{InterpreterError, ReturnSignal, StopSignal};

/// `return value...`
///
/// Stores the arguments, joined with spaces, as the return value of the
/// innermost runtime-defined call. Outside any such call this is an error.
pub fn handle_return(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    let value = context.args()?.join(" ");
    context.set_retval(value)?;
    Err(ReturnSignal.into())
}

pub fn handle_stop(_context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    Err(StopSignal.into())
}

#[cfg(test)]
mod tests {
    use crate::interpreter::builtins::testing::run_script;

    #[test]
    fn test_return_value() {
        let script = r#"
%def(greet name) {
    return hello $name
    print unreachable
}
print $(greet world)
"#;
        let (result, out) = run_script(script);
        assert!(result.is_ok());
        assert_eq!(out, "hello world\n");
    }

    #[test]
    fn test_return_from_nested_control() {
        let script = r#"
%def(first-even *xs) {
    %for(x in $*xs) {
        %if($(== $(% $x 2) 0)) return $x
    }
    return none
}
print $(first-even 3 5 8 9 10)
print $(first-even 1 3)
"#;
        let (result, out) = run_script(script);
        assert!(result.is_ok());
        assert_eq!(out, "8\nnone\n");
    }

    #[test]
    fn test_return_outside_function() {
        let (result, _) = run_script("return 5");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot return outside of function"));
    }

    #[test]
    fn test_stop_is_not_an_error() {
        let (result, out) = run_script("print a\n%repeat(3) { print b; stop }\nprint c");
        assert!(result.is_ok());
        assert_eq!(out, "a\nb\n");
    }
}
