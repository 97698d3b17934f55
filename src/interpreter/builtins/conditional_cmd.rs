//! if, elif, else - Conditional control calls
//!
//! The three calls talk to each other through the `else_signal` flag on the
//! frame that contains them. `%if` and `%elif` set it when their condition was
//! false; `%elif` only runs while it is set, and `%else` runs and clears it.

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::datatypes::str_to_bool;

fn cond_base(context: &mut InterpreterContext, respect_else_signal: bool) -> Result<(), InterpreterError> {
    if context.args()?.len() != 1 {
        return Err(context.error(format!(
            "{}: needs one and only one argument",
            context.call_name()?
        )));
    }
    if respect_else_signal && !context.parent_call_context()?.else_signal {
        return Ok(());
    }

    let check = str_to_bool(&context.args()?[0]);
    if check {
        let body = context.control_node()?;
        context.interpret_statement(&body)?;
    }
    context.parent_call_context_mut()?.else_signal = !check;
    Ok(())
}

pub fn handle_if(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    cond_base(context, false)
}

pub fn handle_elif(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    cond_base(context, true)
}

pub fn handle_else(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    if !context.args()?.is_empty() {
        return Err(context.error("else: does not take arguments"));
    }
    if context.parent_call_context()?.else_signal {
        let body = context.control_node()?;
        context.interpret_statement(&body)?;
        context.parent_call_context_mut()?.else_signal = false;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::interpreter::builtins::testing::run_script;

    #[test]
    fn test_if_chain() {
        let script = r#"
%def(classify n) {
    %if($(< $n 0)) {
        return negative
    } %elif($(== $n 0)) {
        return zero
    } %else {
        return positive
    }
}
print $(classify -3) $(classify 0) $(classify 7)
"#;
        let (result, out) = run_script(script);
        assert!(result.is_ok());
        assert_eq!(out, "negative zero positive\n");
    }

    #[test]
    fn test_else_runs_once() {
        let (result, out) = run_script("%if($false) print a\n%else print b\n%else print c");
        assert!(result.is_ok());
        assert_eq!(out, "b\n");
    }

    #[test]
    fn test_elif_skipped_after_true_if() {
        let (result, out) = run_script("%if($true) print a\n%elif($true) print b\n%else print c");
        assert!(result.is_ok());
        assert_eq!(out, "a\n");
    }

    #[test]
    fn test_signals_are_per_frame() {
        let script = r#"
%if($false) {
    %if($true) print inner
}
%else print outer
"#;
        let (result, out) = run_script(script);
        assert!(result.is_ok());
        assert_eq!(out, "outer\n");
    }

    #[test]
    fn test_argument_count() {
        let (result, _) = run_script("%if(a b) print x");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("if: needs one and only one argument"));

        let (result, _) = run_script("%if($false) print x\n%else(1) print y");
        assert!(result.unwrap_err().to_string().contains("else: does not take arguments"));
    }
}
