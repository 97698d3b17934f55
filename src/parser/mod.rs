//! Parser module for Scrolls scripts
//!
//! This module contains the tokenizer and parser for Scrolls scripts.

pub mod types;
pub mod lexer;
pub mod parser;

// Re-exports
pub use types::{ParseError, ParseErrorKind};
pub use lexer::{ConsumeRestTriggers, LexerError, Token, TokenStream, TokenType, Tokenizer};
pub use parser::{
    parse, parse_one, parse_one_with_triggers, parse_scroll, parse_statement, parse_with_triggers, ParseResult, Parser,
};
