//! Abstract Syntax Tree (AST) Types for Scrolls
//!
//! Scrolls trees are deliberately untyped: every node is an `AstNode` with a
//! kind, an optional source token and an ordered list of children. The
//! interpreter checks shapes as it walks.
//!
//! Children are shared through `Rc` so that control calls and runtime-defined
//! calls can hold on to the statement they execute after the walk that found
//! them has moved on. The tree itself is never mutated after parsing.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::parser::lexer::Token;

// =============================================================================
// NODE KINDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AstNodeType {
    Root,
    Block,
    CommandCall,
    CommandArguments,
    ControlCall,
    ControlArguments,
    Expansion,
    /// Arity marker: the expansion produces one value
    ExpansionSingle,
    /// Arity marker: the expansion is split on whitespace
    ExpansionSpread,
    ExpansionVar,
    ExpansionCall,
    ExpansionArguments,
    String,
    None,
    Eof,
}

impl AstNodeType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Root => "ROOT",
            Self::Block => "BLOCK",
            Self::CommandCall => "COMMAND_CALL",
            Self::CommandArguments => "COMMAND_ARGUMENTS",
            Self::ControlCall => "CONTROL_CALL",
            Self::ControlArguments => "CONTROL_ARGUMENTS",
            Self::Expansion => "EXPANSION",
            Self::ExpansionSingle => "EXPANSION_SINGLE",
            Self::ExpansionSpread => "EXPANSION_SPREAD",
            Self::ExpansionVar => "EXPANSION_VAR",
            Self::ExpansionCall => "EXPANSION_CALL",
            Self::ExpansionArguments => "EXPANSION_ARGUMENTS",
            Self::String => "STRING",
            Self::None => "NONE",
            Self::Eof => "EOF",
        }
    }
}

impl fmt::Display for AstNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raised when a node is asked for something its shape does not have.
#[derive(Debug, Clone, Error)]
#[error("{message} (node {node_type})")]
pub struct AstStateError {
    pub message: String,
    pub node_type: AstNodeType,
}

// =============================================================================
// NODES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub node_type: AstNodeType,
    pub children: Vec<Rc<AstNode>>,
    token: Option<Token>,
}

impl AstNode {
    pub fn new(node_type: AstNodeType, token: Option<Token>) -> Self {
        Self {
            node_type,
            children: Vec::new(),
            token,
        }
    }

    pub fn with_children(node_type: AstNodeType, token: Option<Token>, children: Vec<AstNode>) -> Self {
        Self {
            node_type,
            children: children.into_iter().map(Rc::new).collect(),
            token,
        }
    }

    pub fn push(&mut self, child: AstNode) {
        self.children.push(Rc::new(child));
    }

    pub fn child(&self, index: usize) -> Option<&Rc<AstNode>> {
        self.children.get(index)
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn set_token(&mut self, token: Token) {
        self.token = Some(token);
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// The node's token, for nodes that must have one.
    pub fn tok(&self) -> Result<&Token, AstStateError> {
        self.token.as_ref().ok_or_else(|| AstStateError {
            message: "node has no token".to_string(),
            node_type: self.node_type,
        })
    }

    /// Build a new node of `node_type` sharing this node's token. With
    /// `as_child` the new node takes this one as its only child.
    pub fn wrap(self, node_type: AstNodeType, as_child: bool) -> AstNode {
        let mut wrapper = AstNode::new(node_type, self.token.clone());
        if as_child {
            wrapper.push(self);
        }
        wrapper
    }

    /// Literal content of a STRING node.
    pub fn str_content(&self) -> Result<&str, AstStateError> {
        if self.node_type != AstNodeType::String {
            return Err(AstStateError {
                message: "str_content is only valid on STRING nodes".to_string(),
                node_type: self.node_type,
            });
        }
        Ok(&self.tok()?.value)
    }

    /// Every node in this subtree (this one included) that satisfies `pred`,
    /// in pre-order.
    pub fn find_all<'a>(&'a self, pred: &dyn Fn(&AstNode) -> bool) -> Vec<&'a AstNode> {
        let mut found = Vec::new();
        self.collect_matching(pred, &mut found);
        found
    }

    fn collect_matching<'a>(&'a self, pred: &dyn Fn(&AstNode) -> bool, found: &mut Vec<&'a AstNode>) {
        if pred(self) {
            found.push(self);
        }
        for child in &self.children {
            child.collect_matching(pred, found);
        }
    }

    pub fn to_dict(&self) -> Value {
        let tok = self
            .token
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "None".to_string());
        let children: Vec<Value> = self.children.iter().map(|c| c.to_dict()).collect();
        json!({
            "_type": self.node_type,
            "_tok": tok,
            "children": children,
        })
    }

    /// Pretty JSON dump of the subtree: sorted keys, four-space indent.
    pub fn prettify(&self) -> String {
        let value = self.to_dict();
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        if value.serialize(&mut serializer).is_err() {
            return value.to_string();
        }
        String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
    }
}

/// A parsed script: its ROOT node and the text it was parsed from.
#[derive(Debug, Clone)]
pub struct Ast {
    pub root: Rc<AstNode>,
    pub script: String,
}

impl Ast {
    pub fn new(root: AstNode, script: String) -> Self {
        Self {
            root: Rc::new(root),
            script,
        }
    }

    pub fn prettify(&self) -> String {
        self.root.prettify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::TokenType;

    fn string_node(value: &str) -> AstNode {
        let tok = Token::new(TokenType::StringLiteral, value, 1, 1, Rc::from(value));
        AstNode::new(AstNodeType::String, Some(tok))
    }

    #[test]
    fn test_wrap_as_child() {
        let wrapped = string_node("print").wrap(AstNodeType::CommandCall, true);
        assert_eq!(wrapped.node_type, AstNodeType::CommandCall);
        assert_eq!(wrapped.children.len(), 1);
        assert_eq!(wrapped.tok().unwrap().value, "print");
    }

    #[test]
    fn test_str_content_requires_string_node() {
        let node = string_node("x");
        assert_eq!(node.str_content().unwrap(), "x");
        let block = AstNode::new(AstNodeType::Block, None);
        assert!(block.str_content().is_err());
        assert!(block.tok().is_err());
    }

    #[test]
    fn test_find_all_preorder() {
        let mut root = AstNode::new(AstNodeType::Root, None);
        root.push(string_node("a"));
        let mut block = AstNode::new(AstNodeType::Block, None);
        block.push(string_node("b"));
        root.push(block);

        let strings = root.find_all(&|n| n.node_type == AstNodeType::String);
        let values: Vec<_> = strings.iter().map(|n| n.str_content().unwrap()).collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_prettify_format() {
        let node = string_node("hi");
        let expected = "{\n    \"_tok\": \"STRING_LITERAL:'hi'\",\n    \"_type\": \"STRING\",\n    \"children\": []\n}";
        assert_eq!(node.prettify(), expected);
    }

    #[test]
    fn test_to_dict_without_token() {
        let node = AstNode::new(AstNodeType::Block, None);
        assert_eq!(node.to_dict()["_tok"], "None");
    }
}
