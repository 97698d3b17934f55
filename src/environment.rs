//! Scrolls Environment
//!
//! Main entry point for hosts. An `Environment` owns an interpreter loaded
//! with the builtin groups its options ask for, plus one long-lived context,
//! so variables and `%def` definitions carry over from one `exec` to the next.

use std::io::BufRead;
use std::rc::Rc;

use crate::error::ScrollError;
use crate::interpreter::builtins::{self, StdIo};
use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::execution_engine::Interpreter;
use crate::interpreter::types::ExecutionLimits;
use crate::parser::ConsumeRestTriggers;

/// Which builtin groups to load. The base group is always loaded.
#[derive(Debug, Clone)]
pub struct EnvironmentOptions {
    pub limits: ExecutionLimits,
    /// `print`, `write`, `input`
    pub stdio: bool,
    /// `file-open`, `file-read`, `file-close`
    pub files: bool,
    /// `select`, `shuffle`, `uniform`
    pub random: bool,
    /// `backtrace`
    pub debug: bool,
    /// `use-unified-commands`
    pub unified: bool,
    /// Commands whose line tail is read as one literal argument
    pub consume_rest_triggers: ConsumeRestTriggers,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            limits: ExecutionLimits::default(),
            stdio: true,
            files: true,
            random: true,
            debug: false,
            unified: true,
            consume_rest_triggers: ConsumeRestTriggers::new(),
        }
    }
}

pub struct Environment {
    interpreter: Rc<Interpreter>,
    context: InterpreterContext,
}

impl Environment {
    /// Create an environment talking to the process's stdout and stdin.
    pub fn new(options: EnvironmentOptions) -> Self {
        Self::with_stdio(options, StdIo::process())
    }

    pub fn with_stdio(options: EnvironmentOptions, stdio: StdIo) -> Self {
        let mut interpreter = Interpreter::new(options.limits.clone());
        builtins::register_base(&mut interpreter);
        if options.stdio {
            builtins::register_stdio(&mut interpreter, &stdio);
        }
        if options.files {
            builtins::register_files(&mut interpreter);
        }
        if options.random {
            builtins::register_random(&mut interpreter);
        }
        if options.debug {
            builtins::register_debug(&mut interpreter, &stdio);
        }
        if options.unified {
            builtins::register_unified(&mut interpreter);
        }
        for (name, count) in &options.consume_rest_triggers {
            interpreter.add_consume_rest_trigger(name, *count);
        }
        tracing::debug!(?options, "environment created");

        Self {
            interpreter: Rc::new(interpreter),
            context: InterpreterContext::new(),
        }
    }

    pub fn interpreter(&self) -> &Rc<Interpreter> {
        &self.interpreter
    }

    pub fn context(&self) -> &InterpreterContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut InterpreterContext {
        &mut self.context
    }

    /// Run a script in the environment's context.
    pub fn exec(&mut self, script: &str) -> Result<(), ScrollError> {
        self.interpreter.run_with_context(script, &mut self.context)
    }

    /// Read-eval loop over `reader`.
    ///
    /// Lines are collected until they parse. A parse error at the end of the
    /// collected text means the statement is unfinished, so the next line is
    /// read before trying again. Failures go to `on_error` and the loop moves
    /// on. `stop` or the end of input ends the loop.
    pub fn repl<R, F>(&mut self, mut reader: R, mut on_error: F) -> Result<(), ScrollError>
    where
        R: BufRead,
        F: FnMut(&ScrollError),
    {
        let mut pending = String::new();
        loop {
            let mut line = String::new();
            let at_end = reader.read_line(&mut line)? == 0;
            pending.push_str(&line);

            let tree = match self.interpreter.parse(&pending) {
                Ok(tree) => tree,
                Err(e) if e.is_eof() && !at_end => continue,
                Err(e) => {
                    pending.clear();
                    on_error(&ScrollError::Parse(e));
                    if at_end {
                        return Ok(());
                    }
                    continue;
                }
            };
            pending.clear();

            self.interpreter.init_context(&mut self.context)?;
            for statement in &tree.root.children {
                match self.interpreter.interpret_statement(&mut self.context, statement) {
                    Ok(()) => {}
                    Err(InterpreterError::Stop(_)) => {
                        tracing::debug!("repl stopped");
                        return Ok(());
                    }
                    Err(InterpreterError::Return(_)) => {
                        let err = self.context.error("returning only allowed in functions");
                        on_error(&ScrollError::Interpreter(err));
                        break;
                    }
                    Err(e) => {
                        on_error(&ScrollError::Interpreter(e));
                        break;
                    }
                }
            }

            if at_end {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::{BufRead, Cursor, Write};

    fn make_env(options: EnvironmentOptions, input: &str) -> (Environment, Rc<RefCell<Vec<u8>>>) {
        let out = Rc::new(RefCell::new(Vec::new()));
        let writer: Rc<RefCell<dyn Write>> = out.clone();
        let reader: Rc<RefCell<dyn BufRead>> = Rc::new(RefCell::new(Cursor::new(input.as_bytes().to_vec())));
        (Environment::with_stdio(options, StdIo::new(writer, reader)), out)
    }

    fn output(out: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&out.borrow()).into_owned()
    }

    #[test]
    fn test_exec_keeps_state() {
        let (mut env, out) = make_env(EnvironmentOptions::default(), "");
        env.exec("set name world\n%def(greet who) print hello $who").unwrap();
        env.exec("greet $name").unwrap();
        assert_eq!(output(&out), "hello world\n");
    }

    #[test]
    fn test_exec_error_leaves_environment_usable() {
        let (mut env, out) = make_env(EnvironmentOptions::default(), "");
        let err = env.exec("%def(f) { print in-f; print $missing }\nf").unwrap_err();
        assert_eq!(err.message(), "No such variable missing.");
        assert_eq!(env.context().call_depth(), 0);
        assert_eq!(env.context().vars().scope_count(), 1);
        env.exec("print after").unwrap();
        assert_eq!(output(&out), "in-f\nafter\n");
    }

    #[test]
    fn test_parse_error() {
        let (mut env, _) = make_env(EnvironmentOptions::default(), "");
        let err = env.exec("print $(+ 1 2").unwrap_err();
        assert!(matches!(err, ScrollError::Parse(_)));
    }

    #[test]
    fn test_consume_rest_triggers_option() {
        let options = EnvironmentOptions {
            consume_rest_triggers: [("print".to_string(), 0)].into_iter().collect(),
            ..EnvironmentOptions::default()
        };
        let (mut env, out) = make_env(options, "");
        env.exec("set x 1\nprint a  \"b\" $x").unwrap();
        env.repl(Cursor::new("print $x  y\n"), |e| panic!("{}", e)).unwrap();
        assert_eq!(output(&out), "a  \"b\" $x\n$x  y\n");
    }

    #[test]
    fn test_groups_follow_options() {
        let options = EnvironmentOptions {
            files: false,
            random: false,
            ..EnvironmentOptions::default()
        };
        let (mut env, _) = make_env(options, "");
        let err = env.exec("print $(select a b)").unwrap_err();
        assert_eq!(err.message(), "unknown expansion \"select\"");
        let err = env.exec("file-close 0").unwrap_err();
        assert_eq!(err.message(), "unknown command \"file-close\"");
        let err = env.exec("backtrace").unwrap_err();
        assert_eq!(err.message(), "unknown command \"backtrace\"");
    }

    #[test]
    fn test_statement_limit_option() {
        let options = EnvironmentOptions {
            limits: ExecutionLimits { max_statements: 5, ..ExecutionLimits::default() },
            ..EnvironmentOptions::default()
        };
        let (mut env, _) = make_env(options, "");
        let err = env.exec("%while($true) set x 1").unwrap_err();
        assert_eq!(err.message(), "Exceeded maximum statement limit of 5.");
    }

    #[test]
    fn test_repl_collects_unfinished_statements() {
        let (mut env, out) = make_env(EnvironmentOptions::default(), "");
        let input = "%def(f x) {\n    print got $x\n}\nf 1\nprint $nope\nf 2\nstop\nprint unreachable\n";
        let mut errors = Vec::new();
        env.repl(Cursor::new(input), |e| errors.push(e.message())).unwrap();

        assert_eq!(output(&out), "got 1\ngot 2\n");
        assert_eq!(errors, vec!["No such variable nope.".to_string()]);
    }

    #[test]
    fn test_repl_reports_return_and_bad_syntax() {
        let (mut env, out) = make_env(EnvironmentOptions::default(), "");
        let input = "return 1\n}\nprint ok";
        let mut errors = Vec::new();
        env.repl(Cursor::new(input), |e| errors.push(e.message())).unwrap();

        assert_eq!(output(&out), "ok\n");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "cannot return outside of function");
    }

    #[test]
    fn test_repl_unfinished_at_end_of_input() {
        let (mut env, _) = make_env(EnvironmentOptions::default(), "");
        let mut errors = Vec::new();
        env.repl(Cursor::new("%repeat(2) {\n print a\n"), |e| errors.push(e.to_string())).unwrap();
        assert_eq!(errors.len(), 1);
    }
}
