//! Builtin Calls
//!
//! The standard library of Scrolls calls, grouped the way hosts enable them:
//! - base: variables, scopes, `return`/`stop`, control calls, arithmetic,
//!   comparison, logic and string expansions, plus `$true`/`$false`
//! - stdio: `print`, `write`, `input`
//! - files: `file-open`, `file-read`, `file-close`
//! - random: `select`, `shuffle`, `uniform`
//! - debug: `backtrace`
//! - unified: `use-unified-commands`
//!
//! Every group is a plain call handler registered through the interpreter's
//! public containers, the same way a host adds its own calls.

pub mod arithmetic;
pub mod comparison;
pub mod conditional_cmd;
pub mod debug_cmd;
pub mod def_cmd;
pub mod file_cmd;
pub mod logic;
pub mod loop_cmd;
pub mod random_ops;
pub mod return_cmd;
pub mod scope_cmd;
pub mod set_cmd;
pub mod stdio_cmd;
pub mod string_ops;
pub mod unified_cmd;

use std::rc::Rc;

pub use stdio_cmd::StdIo;

use crate::interpreter::call_handler::{
    CallbackCommandHandler, CallbackControlHandler, CallbackExpansionHandler, Initializer,
};
use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::execution_engine::Interpreter;
use crate::interpreter::helpers::datatypes::{FALSE, TRUE};

/// Sets `$true` and `$false` before every run.
pub struct BuiltinInitializer;

impl Initializer for BuiltinInitializer {
    fn handle_call(&self, context: &mut InterpreterContext) -> Result<(), InterpreterError> {
        context.set_var("true", TRUE);
        context.set_var("false", FALSE);
        Ok(())
    }
}

pub fn base_commands() -> CallbackCommandHandler {
    let mut handler = CallbackCommandHandler::new();
    handler.add_call("set", set_cmd::handle_set);
    handler.add_call("unset", set_cmd::handle_unset);
    handler.add_call("stop", return_cmd::handle_stop);
    handler.add_call("return", return_cmd::handle_return);
    handler.add_call("nonlocal", scope_cmd::handle_nonlocal);
    handler.add_call("global", scope_cmd::handle_global);
    handler
}

pub fn base_controls() -> CallbackControlHandler {
    let mut handler = CallbackControlHandler::new();
    handler.add_call("repeat", loop_cmd::handle_repeat);
    handler.add_call("for", loop_cmd::handle_for);
    handler.add_call("if", conditional_cmd::handle_if);
    handler.add_call("elif", conditional_cmd::handle_elif);
    handler.add_call("else", conditional_cmd::handle_else);
    handler.add_call("while", loop_cmd::handle_while);
    handler.add_call("def", def_cmd::handle_def);
    handler
}

pub fn arithmetic_expansions() -> CallbackExpansionHandler {
    let mut handler = CallbackExpansionHandler::new();
    handler.add_call("toint", arithmetic::handle_toint);
    handler.add_call("tofloat", arithmetic::handle_tofloat);
    handler.add_call("+", arithmetic::handle_add);
    handler.add_call("-", arithmetic::handle_sub);
    handler.add_call("*", arithmetic::handle_mul);
    handler.add_call("/", arithmetic::handle_div);
    handler.add_call("//", arithmetic::handle_floor_div);
    handler.add_call("%", arithmetic::handle_mod);
    handler.add_call("**", arithmetic::handle_pow);
    handler.add_call("sqrt", arithmetic::handle_sqrt);
    handler.add_call("round", arithmetic::handle_round);
    handler.add_call("floor", arithmetic::handle_floor);
    handler.add_call("ceil", arithmetic::handle_ceil);
    handler
}

pub fn comparison_expansions() -> CallbackExpansionHandler {
    let mut handler = CallbackExpansionHandler::new();
    handler.add_call("eq?", comparison::handle_equals);
    handler.add_alias("==", "eq?");
    handler.add_call("neq?", comparison::handle_not_equals);
    handler.add_call("===", comparison::handle_str_equals);
    handler.add_call(">", comparison::handle_gt);
    handler.add_call("<", comparison::handle_lt);
    handler.add_call(">=", comparison::handle_gte);
    handler.add_call("<=", comparison::handle_lte);
    handler.add_call("in?", comparison::handle_in);
    handler
}

pub fn logic_expansions() -> CallbackExpansionHandler {
    let mut handler = CallbackExpansionHandler::new();
    handler.add_call("not", logic::handle_not);
    handler.add_call("and", logic::handle_and);
    handler.add_call("or", logic::handle_or);
    handler.add_call("xor", logic::handle_xor);
    handler
}

pub fn string_expansions() -> CallbackExpansionHandler {
    let mut handler = CallbackExpansionHandler::new();
    handler.add_call("cat", string_ops::handle_cat);
    handler.add_alias("concat", "cat");
    handler.add_call("getc", string_ops::handle_getc);
    handler.add_call("len", string_ops::handle_len);
    handler.add_call("ord", string_ops::handle_ord);
    handler.add_call("chr", string_ops::handle_chr);
    handler.add_call("vempty?", string_ops::handle_vempty);
    handler.add_call("vhead", string_ops::handle_vhead);
    handler.add_call("vtail", string_ops::handle_vtail);
    handler.add_call("vlen", string_ops::handle_vlen);
    handler.add_call("rangev", string_ops::handle_rangev);
    handler
}

pub fn random_expansions() -> CallbackExpansionHandler {
    let mut handler = CallbackExpansionHandler::new();
    handler.add_call("select", random_ops::handle_select);
    handler.add_call("shuffle", random_ops::handle_shuffle);
    handler.add_call("uniform", random_ops::handle_uniform);
    handler
}

pub fn stdio_commands(stdio: &StdIo) -> CallbackCommandHandler {
    let mut handler = CallbackCommandHandler::new();
    let out = stdio.clone();
    handler.add_call("print", move |ctx| stdio_cmd::handle_print(ctx, &out));
    let out = stdio.clone();
    handler.add_call("write", move |ctx| stdio_cmd::handle_write(ctx, &out));
    let input = stdio.clone();
    handler.add_call("input", move |ctx| stdio_cmd::handle_input(ctx, &input));
    handler
}

pub fn file_commands() -> CallbackCommandHandler {
    let mut handler = CallbackCommandHandler::new();
    handler.add_call("file-close", file_cmd::handle_close);
    handler
}

pub fn file_expansions() -> CallbackExpansionHandler {
    let mut handler = CallbackExpansionHandler::new();
    handler.add_call("file-open", file_cmd::handle_open);
    handler.add_call("file-read", file_cmd::handle_read);
    handler
}

pub fn debug_commands(stdio: &StdIo) -> CallbackCommandHandler {
    let mut handler = CallbackCommandHandler::new();
    let out = stdio.clone();
    handler.add_call("backtrace", move |ctx| debug_cmd::handle_backtrace(ctx, &out));
    handler
}

pub fn unified_commands() -> CallbackCommandHandler {
    let mut handler = CallbackCommandHandler::new();
    handler.add_call("use-unified-commands", unified_cmd::handle_use_unified_commands);
    handler
}

// =============================================================================
// REGISTRATION
// =============================================================================

pub fn register_base(interpreter: &mut Interpreter) {
    interpreter.command_handlers_mut().add(Rc::new(base_commands()), "base");
    interpreter.control_handlers_mut().add(Rc::new(base_controls()), "base");
    let expansions = interpreter.expansion_handlers_mut();
    expansions.add(Rc::new(arithmetic_expansions()), "arithmetic");
    expansions.add(Rc::new(comparison_expansions()), "comparison");
    expansions.add(Rc::new(logic_expansions()), "logic");
    expansions.add(Rc::new(string_expansions()), "string");
    interpreter.add_initializer(Rc::new(BuiltinInitializer));
    tracing::debug!("registered base builtins");
}

pub fn register_stdio(interpreter: &mut Interpreter, stdio: &StdIo) {
    interpreter.command_handlers_mut().add(Rc::new(stdio_commands(stdio)), "stdio");
}

pub fn register_files(interpreter: &mut Interpreter) {
    interpreter.command_handlers_mut().add(Rc::new(file_commands()), "file");
    interpreter.expansion_handlers_mut().add(Rc::new(file_expansions()), "file");
}

pub fn register_random(interpreter: &mut Interpreter) {
    interpreter.expansion_handlers_mut().add(Rc::new(random_expansions()), "rand");
}

pub fn register_debug(interpreter: &mut Interpreter, stdio: &StdIo) {
    interpreter.command_handlers_mut().add(Rc::new(debug_commands(stdio)), "debug");
}

pub fn register_unified(interpreter: &mut Interpreter) {
    interpreter.command_handlers_mut().add(Rc::new(unified_commands()), "unified");
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::io::{BufRead, Cursor, Write};
    use std::rc::Rc;

    use super::*;
    use crate::error::ScrollError;
    use crate::interpreter::types::ExecutionLimits;

    /// Run a script with every builtin group loaded. Returns the result and
    /// everything written to the script's stdout.
    pub fn run_script_with_input(script: &str, input: &str) -> (Result<(), ScrollError>, String) {
        let out = Rc::new(RefCell::new(Vec::<u8>::new()));
        let writer: Rc<RefCell<dyn Write>> = out.clone();
        let reader: Rc<RefCell<dyn BufRead>> = Rc::new(RefCell::new(Cursor::new(input.as_bytes().to_vec())));
        let stdio = StdIo::new(writer, reader);

        let mut interpreter = Interpreter::new(ExecutionLimits::default());
        register_base(&mut interpreter);
        register_stdio(&mut interpreter, &stdio);
        register_files(&mut interpreter);
        register_random(&mut interpreter);
        register_debug(&mut interpreter, &stdio);
        register_unified(&mut interpreter);
        let interpreter = Rc::new(interpreter);

        let result = interpreter.run(script).map(|_| ());
        let text = String::from_utf8_lossy(&out.borrow()).into_owned();
        (result, text)
    }

    pub fn run_script(script: &str) -> (Result<(), ScrollError>, String) {
        run_script_with_input(script, "")
    }

    /// Message and 1-based line and column of a failed run's error.
    pub fn error_position(result: Result<(), ScrollError>) -> (String, usize, usize) {
        match result {
            Err(ScrollError::Interpreter(e)) => {
                let (line, column) = e.site().map(|s| (s.line, s.column)).unwrap_or_default();
                (e.message(), line, column)
            }
            other => panic!("expected an interpreter error, got {:?}", other.err().map(|e| e.to_string())),
        }
    }

    /// Value of a single expansion call, e.g. `eval("+ 1 2")`.
    pub fn eval(call: &str) -> String {
        let (result, out) = run_script(&format!("write $({})", call));
        if let Err(e) = result {
            panic!("$({}) failed:\n{}", call, e);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::testing::run_script;
    use super::*;

    #[test]
    fn test_true_and_false_are_set() {
        let (result, out) = run_script("print $true $false");
        assert!(result.is_ok());
        assert_eq!(out, "1 0\n");
    }

    #[test]
    fn test_groups_claim_their_names() {
        assert!(base_controls().names().any(|n| n == "def"));
        let comparisons = comparison_expansions();
        assert!(crate::interpreter::call_handler::CallHandler::supports(&comparisons, "=="));
        assert!(!crate::interpreter::call_handler::CallHandler::supports(&comparisons, "+"));
    }

    #[test]
    fn test_interpreter_without_stdio() {
        let mut interpreter = Interpreter::default();
        register_base(&mut interpreter);
        let err = Rc::new(interpreter).run("set x 1\nprint $x").err().unwrap();
        assert!(err.to_string().contains("unknown command \"print\""));
    }
}
