//! Abstract Syntax Tree (AST) Types for Scrolls
//!
//! Architecture:
//!   Input → Tokenizer → Parser → AST → Interpreter → Output

pub mod types;

pub use types::{Ast, AstNode, AstNodeType, AstStateError};
