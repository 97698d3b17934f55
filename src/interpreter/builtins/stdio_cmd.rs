//! print, write, input - Console commands
//!
//! The commands talk to a `StdIo`, which is the process's stdout/stdin by
//! default. Hosts and tests can hand in any writer and buffered reader.

use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;

#[derive(Clone)]
pub struct StdIo {
    out: Rc<RefCell<dyn Write>>,
    input: Rc<RefCell<dyn BufRead>>,
}

impl StdIo {
    pub fn new(out: Rc<RefCell<dyn Write>>, input: Rc<RefCell<dyn BufRead>>) -> Self {
        Self { out, input }
    }

    /// The process's own stdout and stdin.
    pub fn process() -> Self {
        Self::new(
            Rc::new(RefCell::new(io::stdout())),
            Rc::new(RefCell::new(BufReader::new(io::stdin()))),
        )
    }

    pub fn write_str(&self, s: &str) -> io::Result<()> {
        let mut out = self.out.borrow_mut();
        out.write_all(s.as_bytes())?;
        out.flush()
    }

    /// One line without its line ending, or `None` at end of input.
    pub fn read_line(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.borrow_mut().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

fn output(context: &InterpreterContext, stdio: &StdIo, text: &str) -> Result<(), InterpreterError> {
    stdio
        .write_str(text)
        .map_err(|e| context.error(format!("{}: {}", context.call_name().unwrap_or("output"), e)))
}

/// `print args...` writes the arguments joined by spaces, then a newline.
pub fn handle_print(context: &mut InterpreterContext, stdio: &StdIo) -> Result<(), InterpreterError> {
    let line = format!("{}\n", context.args()?.join(" "));
    output(context, stdio, &line)
}

/// `write args...` is `print` without the newline.
pub fn handle_write(context: &mut InterpreterContext, stdio: &StdIo) -> Result<(), InterpreterError> {
    let text = context.args()?.join(" ");
    output(context, stdio, &text)
}

/// `input NAME` reads one line into the variable NAME.
pub fn handle_input(context: &mut InterpreterContext, stdio: &StdIo) -> Result<(), InterpreterError> {
    let name = match context.args()?.first() {
        Some(name) => name.clone(),
        None => return Err(context.error("input: variable name is not specified")),
    };
    match stdio.read_line() {
        Ok(Some(line)) => {
            context.set_var(&name, line);
            Ok(())
        }
        Ok(None) => Err(context.error("input: end of input")),
        Err(e) => Err(context.error(format!("input: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::builtins::testing::{run_script, run_script_with_input};

    #[test]
    fn test_print_and_write() {
        let (result, out) = run_script("write a b\nwrite \" c\"\nprint\nprint x   y");
        assert!(result.is_ok());
        assert_eq!(out, "a b c\nx y\n");
    }

    #[test]
    fn test_input_lines() {
        let (result, out) = run_script_with_input("input a\ninput b\nprint $b $a", "first\r\nsecond\n");
        assert!(result.is_ok());
        assert_eq!(out, "second first\n");
    }

    #[test]
    fn test_input_errors() {
        let (result, _) = run_script_with_input("input", "x\n");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("input: variable name is not specified"));
        let (result, _) = run_script_with_input("input a", "");
        assert!(result.unwrap_err().to_string().contains("input: end of input"));
    }

    #[test]
    fn test_read_line_without_trailing_newline() {
        let out: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(Vec::new()));
        let input: Rc<RefCell<dyn BufRead>> = Rc::new(RefCell::new(io::Cursor::new("last".as_bytes().to_vec())));
        let stdio = StdIo::new(out, input);
        assert_eq!(stdio.read_line().unwrap().as_deref(), Some("last"));
        assert_eq!(stdio.read_line().unwrap(), None);
    }
}
