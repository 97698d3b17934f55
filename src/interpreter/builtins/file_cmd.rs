//! file-open, file-read, file-close - File handles
//!
//! `file-open` and `file-read` are expansions, `file-close` is a command.
//! Handles are the integer ids the context hands out.

use std::io::Read;

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::options::{ArgOption, OptionType, OptionValue, Signature};

fn require_fid(context: &InterpreterContext) -> Result<u64, InterpreterError> {
    let signature = Signature::new().option(ArgOption::new("fid", OptionType::Int));
    let fid = signature.convert(context)?[0].as_int().unwrap_or_default();
    u64::try_from(fid).map_err(|_| context.error(format!("file already closed, or not open (fid {})", fid)))
}

/// `file-open path [mode]`, mode defaulting to `r`.
pub fn handle_open(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let signature = Signature::new()
        .option(ArgOption::new("path", OptionType::Str))
        .option(ArgOption::new("mode", OptionType::Str).default_value(OptionValue::Str("r".to_string())));
    let values = signature.convert(context)?;
    let path = values[0].as_str().unwrap_or_default().to_string();
    let mode = values[1].as_str().unwrap_or("r").to_string();
    Ok(context.open_file(&path, &mode)?.to_string())
}

/// `file-read fid` returns everything from the current position to the end.
pub fn handle_read(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let fid = require_fid(context)?;
    let mut content = String::new();
    let read = context.get_file(fid)?.read_to_string(&mut content);
    read.map_err(|e| context.error(format!("file-read: {}", e)))?;
    Ok(content)
}

pub fn handle_close(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    let fid = require_fid(context)?;
    context.close_file(fid)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::interpreter::builtins::testing::{error_position, run_script};

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_open_read_close() {
        let file = temp_file("line one\nline two");
        let script = format!(
            "set f $(file-open \"{}\")\nwrite $(file-read $f)\nwrite \"|\" $(file-read $f)\nfile-close $f",
            file.path().display()
        );
        let (result, out) = run_script(&script);
        assert!(result.is_ok());
        assert_eq!(out, "line one\nline two| ");
    }

    #[test]
    fn test_closed_handle() {
        let file = temp_file("x");
        let script = format!(
            "set f $(file-open \"{}\" r)\nfile-close $f\nfile-close $f",
            file.path().display()
        );
        let (result, _) = run_script(&script);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("file already closed, or not open (fid 0)"));
    }

    #[test]
    fn test_missing_file_and_bad_mode() {
        let (result, _) = run_script("print $(file-open /no/such/file)");
        assert!(result.unwrap_err().to_string().contains("/no/such/file does not exist"));

        let file = temp_file("x");
        let script = format!("print $(file-open \"{}\" q)", file.path().display());
        let (result, _) = run_script(&script);
        assert!(result.unwrap_err().to_string().contains("invalid file mode \"q\""));
    }

    #[test]
    fn test_bad_fid() {
        let (result, _) = run_script("file-close nope");
        assert_eq!(error_position(result), ("fid: 'nope' is not a valid integer".to_string(), 1, 12));
        let (result, _) = run_script("file-close");
        assert_eq!(error_position(result).0, "fid is a required argument that is missing");
        let (result, _) = run_script("print $(file-read 7)");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("file already closed, or not open (fid 7)"));
    }
}
