//! Tokenizer for Scrolls Scripts
//!
//! The tokenizer turns script text into the token stream the parser consumes.
//! It handles:
//! - Command separators and brackets
//! - Quoted and bare string literals
//! - Sigils (`$`, `$*`, `%`)
//! - Comments
//! - Consume-rest triggers: a command named in the trigger table reads a
//!   fixed number of ordinary arguments, then takes the rest of the line
//!   verbatim as one more string literal

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Expansion sigil, `$name` / `$(call ...)`
pub const EXPANSION_SIGIL: char = '$';
/// Spread sigil, only meaningful directly after the expansion sigil
pub const SPREAD_SIGIL: char = '*';
/// Control sigil, `%name(args) statement`
pub const CONTROL_SIGIL: char = '%';
pub const COMMENT_CHAR: char = '#';
pub const QUOTE_CHAR: char = '"';
pub const ESCAPE_CHAR: char = '\\';

/// Token types for the Scrolls tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    StringLiteral,
    /// Reserved. Whitespace is skipped and never handed to the parser.
    Whitespace,
    CommandSep,
    OpenArgs,
    CloseArgs,
    OpenBlock,
    CloseBlock,
    ExpansionSigil,
    SpreadSigil,
    ControlSigil,
    Eof,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StringLiteral => "STRING_LITERAL",
            Self::Whitespace => "WHITESPACE",
            Self::CommandSep => "COMMAND_SEP",
            Self::OpenArgs => "OPEN_ARGS",
            Self::CloseArgs => "CLOSE_ARGS",
            Self::OpenBlock => "OPEN_BLOCK",
            Self::CloseBlock => "CLOSE_BLOCK",
            Self::ExpansionSigil => "EXPANSION_SIGIL",
            Self::SpreadSigil => "SPREAD_SIGIL",
            Self::ControlSigil => "CONTROL_SIGIL",
            Self::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token produced by the tokenizer
#[derive(Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub line: usize,
    pub column: usize,
    /// For STRING_LITERAL tokens: written in double quotes
    pub quoted: bool,
    /// The script this token was read from. Only used for error context.
    source: Rc<str>,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: impl Into<String>,
        line: usize,
        column: usize,
        source: Rc<str>,
    ) -> Self {
        Self {
            token_type,
            value: value.into(),
            line,
            column,
            quoted: false,
            source,
        }
    }

    pub fn with_quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The full source line this token sits on.
    pub fn source_line(&self) -> Option<&str> {
        if self.line == 0 {
            return None;
        }
        self.source.lines().nth(self.line - 1)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.token_type == other.token_type
            && self.value == other.value
            && self.line == other.line
            && self.column == other.column
            && self.quoted == other.quoted
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("token_type", &self.token_type)
            .field("value", &self.value)
            .field("line", &self.line)
            .field("column", &self.column)
            .field("quoted", &self.quoted)
            .finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:'{}'", self.token_type.as_str(), self.value)
    }
}

/// Error thrown when the tokenizer encounters invalid input
#[derive(Debug, Clone)]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// The input ran out before the construct was closed
    pub at_eof: bool,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for LexerError {}

impl LexerError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            at_eof: false,
        }
    }

    pub fn unexpected_eof(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            at_eof: true,
            ..Self::new(message, line, column)
        }
    }
}

/// Command names that take the rest of their line as a single literal,
/// mapped to the number of ordinary arguments read before it.
pub type ConsumeRestTriggers = HashMap<String, usize>;

/// The contract the parser consumes tokens through.
pub trait TokenStream {
    /// Produce the next token. The last token of a stream is always `Eof`.
    fn next_token(&mut self) -> Result<Token, LexerError>;

    /// True once the `Eof` token has been produced.
    fn after_eof(&self) -> bool;

    /// All script text consumed so far.
    fn history(&self) -> String;
}

lazy_static::lazy_static! {
    /// Single-character delimiters
    static ref DELIMITERS: HashMap<char, TokenType> = {
        let mut m = HashMap::new();
        m.insert('(', TokenType::OpenArgs);
        m.insert(')', TokenType::CloseArgs);
        m.insert('{', TokenType::OpenBlock);
        m.insert('}', TokenType::CloseBlock);
        m.insert(';', TokenType::CommandSep);
        m
    };
}

/// Check if a character ends a bare string literal
fn is_literal_boundary(c: char) -> bool {
    c.is_whitespace() || c == QUOTE_CHAR || DELIMITERS.contains_key(&c)
}

/// Check if a character can start whatever follows an expansion sigil
fn starts_expansion_body(c: char) -> bool {
    c == '(' || c == QUOTE_CHAR || !is_literal_boundary(c)
}

pub struct Tokenizer {
    input: Vec<char>,
    source: Rc<str>,
    pos: usize,
    line: usize,
    column: usize,
    /// Open `(` brackets; newlines inside argument lists are plain whitespace
    args_depth: usize,
    /// The previous token was an expansion sigil
    after_expansion_sigil: bool,
    emitted_eof: bool,
    triggers: ConsumeRestTriggers,
    /// The next token begins a statement
    statement_start: bool,
    /// The next literal names a control call
    after_control_sigil: bool,
    /// One entry per open `(`: true when it opened an expansion call
    paren_kinds: Vec<bool>,
    last_type: Option<TokenType>,
    /// Ordinary arguments left before the rest of the line is taken whole
    pending_rest: Option<usize>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            source: Rc::from(input),
            pos: 0,
            line: 1,
            column: 1,
            args_depth: 0,
            after_expansion_sigil: false,
            emitted_eof: false,
            triggers: ConsumeRestTriggers::new(),
            statement_start: true,
            after_control_sigil: false,
            paren_kinds: Vec::new(),
            last_type: None,
            pending_rest: None,
        }
    }

    pub fn with_consume_rest_triggers(mut self, triggers: &ConsumeRestTriggers) -> Self {
        self.triggers = triggers.clone();
        self
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.read_token()?;
            let done = token.token_type == TokenType::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn make_token(&self, token_type: TokenType, value: impl Into<String>, line: usize, column: usize) -> Token {
        Token::new(token_type, value, line, column, Rc::clone(&self.source))
    }

    /// Skip whitespace and comments. Stops at a newline that separates commands.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.current() {
            if c == '\n' && self.args_depth == 0 {
                break;
            } else if c.is_whitespace() {
                self.advance();
            } else if c == COMMENT_CHAR {
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_token(&mut self) -> Result<Token, LexerError> {
        let token = match self.read_rest_of_line() {
            Some(token) => token,
            None => self.scan_token()?,
        };
        self.track(&token);
        Ok(token)
    }

    /// Once a triggered command has its ordinary arguments, everything up to
    /// the newline is one literal. Nothing is produced for an empty rest.
    fn read_rest_of_line(&mut self) -> Option<Token> {
        if self.pending_rest != Some(0) || self.args_depth != 0 || self.after_expansion_sigil {
            return None;
        }
        self.pending_rest = None;

        while self.current().is_some_and(|c| c != '\n' && c.is_whitespace()) {
            self.advance();
        }
        let (line, column) = (self.line, self.column);
        let mut value = String::new();
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            value.push(c);
            self.advance();
        }
        let value = value.trim_end();
        if value.is_empty() {
            return None;
        }
        Some(
            self.make_token(TokenType::StringLiteral, value, line, column)
                .with_quoted(true),
        )
    }

    /// Follow statement boundaries so triggers only fire on command names.
    fn track(&mut self, token: &Token) {
        let was_start = std::mem::take(&mut self.statement_start);
        let last_type = self.last_type.replace(token.token_type);

        match token.token_type {
            TokenType::CommandSep | TokenType::OpenBlock | TokenType::CloseBlock => {
                self.statement_start = true;
                self.pending_rest = None;
            }
            TokenType::ControlSigil => self.after_control_sigil = true,
            TokenType::StringLiteral if std::mem::take(&mut self.after_control_sigil) => {
                self.statement_start = true;
            }
            TokenType::StringLiteral if self.args_depth == 0 => {
                if was_start {
                    self.pending_rest = self.triggers.get(&token.value).copied();
                } else {
                    self.count_rest_arg();
                }
            }
            TokenType::OpenArgs => {
                let expansion = matches!(last_type, Some(TokenType::ExpansionSigil | TokenType::SpreadSigil));
                self.paren_kinds.push(expansion);
            }
            TokenType::CloseArgs => {
                let expansion = self.paren_kinds.pop().unwrap_or(false);
                if self.args_depth == 0 {
                    if expansion {
                        self.count_rest_arg();
                    } else {
                        self.statement_start = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn count_rest_arg(&mut self) {
        if let Some(n) = self.pending_rest.as_mut() {
            *n = n.saturating_sub(1);
        }
    }

    fn scan_token(&mut self) -> Result<Token, LexerError> {
        self.skip_trivia();

        let (line, column) = (self.line, self.column);
        let after_sigil = std::mem::take(&mut self.after_expansion_sigil);

        let c = match self.current() {
            Some(c) => c,
            None => {
                self.emitted_eof = true;
                return Ok(self.make_token(TokenType::Eof, "", line, column));
            }
        };

        if after_sigil && c == SPREAD_SIGIL && self.peek(1).is_some_and(starts_expansion_body) {
            self.advance();
            return Ok(self.make_token(TokenType::SpreadSigil, SPREAD_SIGIL, line, column));
        }

        if c == '\n' {
            self.advance();
            return Ok(self.make_token(TokenType::CommandSep, "\n", line, column));
        }

        if let Some(&token_type) = DELIMITERS.get(&c) {
            self.advance();
            match token_type {
                TokenType::OpenArgs => self.args_depth += 1,
                TokenType::CloseArgs => self.args_depth = self.args_depth.saturating_sub(1),
                _ => {}
            }
            return Ok(self.make_token(token_type, c, line, column));
        }

        if c == QUOTE_CHAR {
            return self.read_quoted(line, column);
        }

        if c == EXPANSION_SIGIL && self.is_expansion_start() {
            self.advance();
            self.after_expansion_sigil = true;
            return Ok(self.make_token(TokenType::ExpansionSigil, EXPANSION_SIGIL, line, column));
        }

        if c == CONTROL_SIGIL && self.peek(1).is_some_and(|n| n == QUOTE_CHAR || !is_literal_boundary(n)) {
            self.advance();
            return Ok(self.make_token(TokenType::ControlSigil, CONTROL_SIGIL, line, column));
        }

        Ok(self.read_literal(line, column))
    }

    fn is_expansion_start(&self) -> bool {
        match self.peek(1) {
            Some(SPREAD_SIGIL) => self.peek(2).is_some_and(starts_expansion_body),
            Some(n) => starts_expansion_body(n),
            None => false,
        }
    }

    fn read_literal(&mut self, line: usize, column: usize) -> Token {
        let mut value = String::new();
        while let Some(c) = self.current() {
            if is_literal_boundary(c) {
                break;
            }
            value.push(c);
            self.advance();
        }
        self.make_token(TokenType::StringLiteral, value, line, column)
    }

    fn read_quoted(&mut self, line: usize, column: usize) -> Result<Token, LexerError> {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(LexerError::unexpected_eof(
                        "Unterminated string literal",
                        line,
                        column,
                    ))
                }
                Some(QUOTE_CHAR) => break,
                Some(ESCAPE_CHAR) => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(c @ (QUOTE_CHAR | ESCAPE_CHAR | EXPANSION_SIGIL)) => value.push(c),
                    Some(c) => {
                        value.push(ESCAPE_CHAR);
                        value.push(c);
                    }
                    None => {
                        return Err(LexerError::unexpected_eof(
                            "Unterminated string literal",
                            line,
                            column,
                        ))
                    }
                },
                Some(c) => value.push(c),
            }
        }

        Ok(self
            .make_token(TokenType::StringLiteral, value, line, column)
            .with_quoted(true))
    }
}

impl TokenStream for Tokenizer {
    fn next_token(&mut self) -> Result<Token, LexerError> {
        if self.emitted_eof {
            return Err(LexerError::unexpected_eof(
                "Read past end of script",
                self.line,
                self.column,
            ));
        }
        let token = self.read_token()?;
        tracing::trace!(token = %token, "read token");
        Ok(token)
    }

    fn after_eof(&self) -> bool {
        self.emitted_eof
    }

    fn history(&self) -> String {
        self.input[..self.pos].iter().collect()
    }
}
