//! backtrace - Print the active call stack

use crate::interpreter::builtins::stdio_cmd::StdIo;
use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;

pub fn handle_backtrace(context: &mut InterpreterContext, stdio: &StdIo) -> Result<(), InterpreterError> {
    let trace = format!("{}\n", context.get_backtrace());
    stdio
        .write_str(&trace)
        .map_err(|e| context.error(format!("backtrace: {}", e)))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::builtins::testing::run_script;

    #[test]
    fn test_backtrace_from_runtime_call() {
        let (result, out) = run_script("%def(f x) { %if($true) backtrace }\nf arg");
        assert!(result.is_ok());
        assert_eq!(
            out,
            "backtrace (most recent call last)\n\
             ID FLAGS NAME+ARGS\n\
             0  ---   \"__main__\"\n\
             1  --r   \"f\" \"arg\"\n\
             2  !--   \"if\" \"1\"\n\
             3  ---   \"backtrace\"\n"
        );
    }
}
