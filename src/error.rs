//! Crate-level error type
//!
//! What a host sees from running a script: it either failed to parse, failed
//! while running, or input/output around the run failed.

use thiserror::Error;

use crate::interpreter::errors::InterpreterError;
use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum ScrollError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Interpreter(#[from] InterpreterError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrollError {
    /// The bare error message, without position or backtrace.
    pub fn message(&self) -> String {
        match self {
            ScrollError::Parse(e) => e.message.clone(),
            ScrollError::Interpreter(e) => e.message(),
            ScrollError::Io(e) => e.to_string(),
        }
    }
}
