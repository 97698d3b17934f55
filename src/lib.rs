//! scrolls - An embeddable command language
//!
//! Scrolls scripts are made of commands (`print hello`), control calls
//! (`%if($x) { ... }`) and expansions (`$name`, `$(+ 1 2)`). This library
//! provides the tokenizer and parser, the AST, and a tree-walking interpreter
//! whose calls are all supplied by pluggable handlers.
//!
//! Quick start:
//!
//! ```no_run
//! use scrolls::{Environment, EnvironmentOptions};
//!
//! let mut env = Environment::new(EnvironmentOptions::default());
//! env.exec("%for(x in 1 2 3) print $(* $x $x)").unwrap();
//! ```

pub mod ast;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod logging;
pub mod parser;

pub use ast::types::*;
pub use environment::{Environment, EnvironmentOptions};
pub use error::ScrollError;
pub use interpreter::{
    CallHandler, CallbackCommandHandler, CallbackControlHandler, CallbackExpansionHandler, ExecutionLimits,
    Interpreter, InterpreterContext, InterpreterError,
};
pub use parser::{parse, parse_one, ParseError, ParseErrorKind};
