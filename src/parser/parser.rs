//! Recursive Descent Parser for Scrolls
//!
//! Grammar:
//!
//! ```text
//! root       := (statement | SEP)* EOF
//! statement  := block | control | command
//! block      := '{' (statement | SEP)* '}'
//! control    := '%' LITERAL ( statement | '(' string* ')' statement )
//! command    := string string*
//! string     := expansion | LITERAL
//! expansion  := '$' '*'? ( '(' string string* ')' | string )
//! ```
//!
//! Alternatives are tried in order and backtrack on ordinary failures.
//! Fatal errors mark points past which the input can only be one construct,
//! and abort the whole parse.

use std::rc::Rc;

use crate::ast::types::{Ast, AstNode, AstNodeType};
use crate::parser::lexer::{ConsumeRestTriggers, Token, TokenStream, TokenType, Tokenizer};
use crate::parser::types::{ParseError, ParseErrorKind};

pub type ParseResult<T> = Result<T, ParseError>;

type Rule<S> = fn(&mut Parser<S>) -> ParseResult<AstNode>;

/// Parse a complete script from a token stream
pub fn parse_scroll<S: TokenStream>(stream: S) -> ParseResult<Ast> {
    Parser::new(stream).parse_scroll()
}

/// Parse the first statement of a token stream
pub fn parse_statement<S: TokenStream>(stream: S) -> ParseResult<Rc<AstNode>> {
    Parser::new(stream).parse_statement()
}

/// Parse a script string
pub fn parse(script: &str) -> ParseResult<Ast> {
    parse_scroll(Tokenizer::new(script))
}

/// Parse a single statement from a string
pub fn parse_one(script: &str) -> ParseResult<Rc<AstNode>> {
    parse_statement(Tokenizer::new(script))
}

/// Parse a script string whose tokenizer honours `triggers`
pub fn parse_with_triggers(script: &str, triggers: &ConsumeRestTriggers) -> ParseResult<Ast> {
    parse_scroll(Tokenizer::new(script).with_consume_rest_triggers(triggers))
}

pub fn parse_one_with_triggers(script: &str, triggers: &ConsumeRestTriggers) -> ParseResult<Rc<AstNode>> {
    parse_statement(Tokenizer::new(script).with_consume_rest_triggers(triggers))
}

pub struct Parser<S: TokenStream> {
    stream: S,
    /// Tokens pulled from the stream so far. Backtracking rewinds `pos`.
    tokens: Vec<Token>,
    pos: usize,
}

impl<S: TokenStream> Parser<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            tokens: Vec::new(),
            pos: 0,
        }
    }

    pub fn into_stream(self) -> S {
        self.stream
    }

    pub fn parse_scroll(&mut self) -> ParseResult<Ast> {
        let first = self.current()?;
        let children = self.statement_list(true)?;
        let root = AstNode::with_children(AstNodeType::Root, Some(first), children);
        tracing::debug!(statements = root.children.len(), "parsed script");
        Ok(Ast::new(root, self.stream.history()))
    }

    pub fn parse_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        while self.check(TokenType::CommandSep)? {
            self.advance()?;
        }
        self.statement().map(Rc::new)
    }

    // ===========================================================================
    // HELPER METHODS
    // ===========================================================================

    fn fill(&mut self) -> ParseResult<()> {
        while self.tokens.len() <= self.pos {
            if self.stream.after_eof() {
                return Err(self.error(ParseErrorKind::Eof, "Unexpected end of script.", false));
            }
            let token = self
                .stream
                .next_token()
                .map_err(|e| ParseError::from_lexer(e, self.stream.history()))?;
            self.tokens.push(token);
        }
        Ok(())
    }

    fn current(&mut self) -> ParseResult<Token> {
        self.fill()?;
        Ok(self.tokens[self.pos].clone())
    }

    fn check(&mut self, token_type: TokenType) -> ParseResult<bool> {
        Ok(self.current()?.token_type == token_type)
    }

    fn advance(&mut self) -> ParseResult<Token> {
        let token = self.current()?;
        if token.token_type == TokenType::Eof {
            return Err(self.error(ParseErrorKind::Eof, "Unexpected end of script.", false));
        }
        self.pos += 1;
        Ok(token)
    }

    /// Consume the current token if it has the given type
    fn get(&mut self, token_type: TokenType) -> ParseResult<Option<Token>> {
        if self.check(token_type)? {
            self.advance().map(Some)
        } else {
            Ok(None)
        }
    }

    fn expect(&mut self, token_type: TokenType, fatal: bool) -> ParseResult<Token> {
        let token = self.current()?;
        if token.token_type == token_type {
            return self.advance();
        }
        let kind = if token.token_type == TokenType::Eof {
            ParseErrorKind::Eof
        } else {
            ParseErrorKind::Expect
        };
        Err(self.error(
            kind,
            format!("expected {} here, but got {}", token_type, token.token_type),
            fatal,
        ))
    }

    fn error(&self, kind: ParseErrorKind, message: impl Into<String>, fatal: bool) -> ParseError {
        let (line, column) = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1));
        ParseError::new(kind, message, line, column, self.stream.history(), fatal)
    }

    // ===========================================================================
    // COMBINATORS
    // ===========================================================================

    /// First rule that succeeds. Ordinary failures rewind and try the next rule.
    fn choice(&mut self, rules: &[Rule<S>]) -> ParseResult<AstNode> {
        let start = self.pos;
        let mut last_error = None;
        for rule in rules {
            match rule(self) {
                Ok(node) => return Ok(node),
                Err(e) if e.fatal => return Err(e),
                Err(e) => {
                    self.pos = start;
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| self.error(ParseErrorKind::Syntax, "no alternatives to parse", false)))
    }

    /// Apply a rule until it fails. Only fatal errors escape.
    fn greedy(&mut self, rule: Rule<S>) -> ParseResult<Vec<AstNode>> {
        let mut nodes = Vec::new();
        loop {
            let start = self.pos;
            match rule(self) {
                Ok(node) => nodes.push(node),
                Err(e) if e.fatal => return Err(e),
                Err(_) => {
                    self.pos = start;
                    return Ok(nodes);
                }
            }
        }
    }

    /// Run a rule only to see whether it matches; the position is always restored.
    fn parse_try(&mut self, rule: Rule<S>) -> bool {
        let start = self.pos;
        let matched = rule(self).is_ok();
        self.pos = start;
        matched
    }

    // ===========================================================================
    // GRAMMAR
    // ===========================================================================

    fn statement_list(&mut self, top_level: bool) -> ParseResult<Vec<AstNode>> {
        let mut nodes = Vec::new();
        loop {
            let token = self.current()?;
            match token.token_type {
                TokenType::CloseBlock if top_level => {
                    return Err(self.error(ParseErrorKind::Syntax, "Unexpected block close.", true));
                }
                TokenType::CloseBlock => return Ok(nodes),
                TokenType::Eof if top_level => return Ok(nodes),
                TokenType::Eof => {
                    return Err(self.error(
                        ParseErrorKind::Eof,
                        "Unexpected end of script while parsing block.",
                        true,
                    ));
                }
                TokenType::CommandSep => {
                    self.advance()?;
                    continue;
                }
                _ => {}
            }

            match self.statement() {
                Ok(node) => nodes.push(node),
                Err(e) if e.fatal => return Err(e),
                Err(_) => {
                    return Err(self.error(ParseErrorKind::Syntax, "Expected statement or block here.", true));
                }
            }
        }
    }

    fn statement(&mut self) -> ParseResult<AstNode> {
        tracing::trace!(pos = self.pos, "parse statement");
        self.choice(&[Self::block, Self::control, Self::command])
    }

    fn block(&mut self) -> ParseResult<AstNode> {
        let open = self.expect(TokenType::OpenBlock, false)?;
        let children = self.statement_list(false)?;
        self.expect(TokenType::CloseBlock, true)?;
        Ok(AstNode::with_children(AstNodeType::Block, Some(open), children))
    }

    fn command(&mut self) -> ParseResult<AstNode> {
        let name = self.eventual_string()?;
        let args = self.greedy(Self::eventual_string)?;
        let args_token = first_token(&args).or_else(|| name.token().cloned());
        let mut call = name.wrap(AstNodeType::CommandCall, true);
        call.push(AstNode::with_children(AstNodeType::CommandArguments, args_token, args));
        Ok(call)
    }

    fn control(&mut self) -> ParseResult<AstNode> {
        let sigil = self.expect(TokenType::ControlSigil, false)?;
        let name = self.strtok()?;

        let start = self.pos;
        let (args, body) = match self.statement() {
            Ok(body) => (AstNode::new(AstNodeType::ControlArguments, body.token().cloned()), body),
            Err(e) if e.fatal => return Err(e),
            Err(_) => {
                self.pos = start;
                let args = self.control_args()?;
                let body = self.statement()?;
                (args, body)
            }
        };

        Ok(AstNode::with_children(
            AstNodeType::ControlCall,
            Some(sigil),
            vec![name, args, body],
        ))
    }

    fn control_args(&mut self) -> ParseResult<AstNode> {
        let open = self.expect(TokenType::OpenArgs, false)?;
        let args = self.greedy(Self::eventual_string)?;
        self.expect(TokenType::CloseArgs, true)?;
        Ok(AstNode::with_children(AstNodeType::ControlArguments, Some(open), args))
    }

    fn eventual_string(&mut self) -> ParseResult<AstNode> {
        self.choice(&[Self::expansion, Self::strtok])
    }

    fn strtok(&mut self) -> ParseResult<AstNode> {
        let token = self.expect(TokenType::StringLiteral, false)?;
        Ok(AstNode::new(AstNodeType::String, Some(token)))
    }

    fn expansion(&mut self) -> ParseResult<AstNode> {
        let sigil = self.expect(TokenType::ExpansionSigil, false)?;
        let arity = match self.get(TokenType::SpreadSigil)? {
            Some(spread) => AstNode::new(AstNodeType::ExpansionSpread, Some(spread)),
            None => AstNode::new(AstNodeType::ExpansionSingle, Some(sigil.clone())),
        };
        let body = self.choice(&[Self::expansion_call, Self::expansion_var])?;
        Ok(AstNode::with_children(AstNodeType::Expansion, Some(sigil), vec![arity, body]))
    }

    fn expansion_var(&mut self) -> ParseResult<AstNode> {
        Ok(self.eventual_string()?.wrap(AstNodeType::ExpansionVar, true))
    }

    fn expansion_call(&mut self) -> ParseResult<AstNode> {
        self.expect(TokenType::OpenArgs, false)?;
        let name = self.eventual_string().map_err(ParseError::into_fatal)?;
        let args = self.greedy(Self::eventual_string)?;
        self.expect(TokenType::CloseArgs, true)?;

        let args_token = first_token(&args).or_else(|| name.token().cloned());
        let call_token = name.token().cloned();
        Ok(AstNode::with_children(
            AstNodeType::ExpansionCall,
            call_token,
            vec![name, AstNode::with_children(AstNodeType::ExpansionArguments, args_token, args)],
        ))
    }
}

fn first_token(nodes: &[AstNode]) -> Option<Token> {
    nodes.first().and_then(|n| n.token().cloned())
}
