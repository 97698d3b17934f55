//! Parser Types
//!
//! Error types shared by the parser and its callers.

use std::fmt;
use thiserror::Error;

use crate::parser::lexer::LexerError;

/// Broad classification of a parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific token was expected and something else was found
    Expect,
    /// The script ended before the construct being parsed was complete
    Eof,
    Syntax,
    Lexer,
}

/// A parse failure.
///
/// `fatal` errors are commit points: combinators that backtrack on ordinary
/// failures pass fatal ones straight through to the caller.
#[derive(Debug, Clone, Error)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// Script text consumed when the error was raised
    pub history: String,
    pub fatal: bool,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        line: usize,
        column: usize,
        history: String,
        fatal: bool,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column,
            history,
            fatal,
        }
    }

    pub fn from_lexer(err: LexerError, history: String) -> Self {
        let kind = if err.at_eof {
            ParseErrorKind::Eof
        } else {
            ParseErrorKind::Lexer
        };
        Self::new(kind, err.message, err.line, err.column, history, true)
    }

    pub fn into_fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    /// The script ended early. A REPL should read more input and retry.
    pub fn is_eof(&self) -> bool {
        self.kind == ParseErrorKind::Eof
    }

    fn source_line(&self) -> Option<&str> {
        if self.line == 0 {
            return None;
        }
        self.history.lines().nth(self.line - 1)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)?;
        if let Some(line) = self.source_line() {
            write!(
                f,
                "\n    {}\n    {}^",
                line,
                " ".repeat(self.column.saturating_sub(1))
            )?;
        }
        Ok(())
    }
}
