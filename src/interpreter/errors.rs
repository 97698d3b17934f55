//! Interpreter Errors
//!
//! Error types raised while walking a Scrolls tree:
//! - script errors: bad arguments, unset variables, exceeded limits
//! - missing calls: no handler claims the called name
//! - internal errors: the interpreter's own invariants do not hold
//! - stop/return: nonlocal exits, never reported as failures
//!
//! Every reportable error carries an `ErrorSite` captured from the context
//! at the moment it was created.

use std::fmt;

/// Where an error happened and what the call stack looked like at the time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSite {
    pub line: usize,
    pub column: usize,
    pub source_line: Option<String>,
    pub backtrace: String,
}

impl ErrorSite {
    fn write_report(&self, f: &mut fmt::Formatter<'_>, message: &str) -> fmt::Result {
        if !self.backtrace.is_empty() {
            writeln!(f, "{}", self.backtrace)?;
            writeln!(f)?;
        }
        if self.line > 0 {
            writeln!(f, "where:")?;
            writeln!(f, "  line {}, column {}", self.line, self.column)?;
            if let Some(source) = &self.source_line {
                writeln!(f, "    {}", source)?;
                writeln!(f, "    {}^", " ".repeat(self.column.saturating_sub(1)))?;
            }
            writeln!(f)?;
        }
        write!(f, "error: {}", message)
    }
}

/// Which kind of call could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Command,
    Control,
    Expansion,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Command => "command",
            CallKind::Control => "control",
            CallKind::Expansion => "expansion",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-facing script failure.
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    pub site: ErrorSite,
}

impl ScriptError {
    pub fn new(message: impl Into<String>, site: ErrorSite) -> Self {
        Self { message: message.into(), site }
    }

    /// An error with no position, for failures detected away from the script.
    pub fn detached(message: impl Into<String>) -> Self {
        Self::new(message, ErrorSite::default())
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.site.write_report(f, &self.message)
    }
}

impl std::error::Error for ScriptError {}

/// No handler supports the called name.
#[derive(Debug, Clone)]
pub struct MissingCallError {
    pub kind: CallKind,
    pub name: String,
    pub site: ErrorSite,
}

impl MissingCallError {
    pub fn new(kind: CallKind, name: impl Into<String>, site: ErrorSite) -> Self {
        Self { kind, name: name.into(), site }
    }

    pub fn message(&self) -> String {
        format!("unknown {} \"{}\"", self.kind, self.name)
    }
}

impl fmt::Display for MissingCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.site.write_report(f, &self.message())
    }
}

impl std::error::Error for MissingCallError {}

/// The interpreter was driven into a state it does not support.
#[derive(Debug, Clone)]
pub struct InternalInterpreterError {
    pub message: String,
    pub site: ErrorSite,
}

impl InternalInterpreterError {
    pub fn new(message: impl Into<String>, site: ErrorSite) -> Self {
        Self { message: message.into(), site }
    }
}

impl fmt::Display for InternalInterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.site.write_report(f, &format!("internal: {}", self.message))
    }
}

impl std::error::Error for InternalInterpreterError {}

/// Raised by `return`. Unwinds to the innermost runtime-defined call.
#[derive(Debug, Clone, Default)]
pub struct ReturnSignal;

impl fmt::Display for ReturnSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "return")
    }
}

impl std::error::Error for ReturnSignal {}

/// Raised by `stop`. Unwinds the whole run.
#[derive(Debug, Clone, Default)]
pub struct StopSignal;

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stop")
    }
}

impl std::error::Error for StopSignal {}

/// Unified error enum for everything a handler can raise.
#[derive(Debug, Clone)]
pub enum InterpreterError {
    Script(ScriptError),
    MissingCall(MissingCallError),
    Internal(InternalInterpreterError),
    Return(ReturnSignal),
    Stop(StopSignal),
}

impl InterpreterError {
    /// Stop and return are control transfers, not failures.
    pub fn is_signal(&self) -> bool {
        matches!(self, InterpreterError::Return(_) | InterpreterError::Stop(_))
    }

    pub fn message(&self) -> String {
        match self {
            InterpreterError::Script(e) => e.message.clone(),
            InterpreterError::MissingCall(e) => e.message(),
            InterpreterError::Internal(e) => e.message.clone(),
            InterpreterError::Return(e) => e.to_string(),
            InterpreterError::Stop(e) => e.to_string(),
        }
    }

    pub fn site(&self) -> Option<&ErrorSite> {
        match self {
            InterpreterError::Script(e) => Some(&e.site),
            InterpreterError::MissingCall(e) => Some(&e.site),
            InterpreterError::Internal(e) => Some(&e.site),
            InterpreterError::Return(_) | InterpreterError::Stop(_) => None,
        }
    }
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpreterError::Script(e) => write!(f, "{}", e),
            InterpreterError::MissingCall(e) => write!(f, "{}", e),
            InterpreterError::Internal(e) => write!(f, "{}", e),
            InterpreterError::Return(e) => write!(f, "{}", e),
            InterpreterError::Stop(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for InterpreterError {}

impl From<ScriptError> for InterpreterError {
    fn from(e: ScriptError) -> Self { InterpreterError::Script(e) }
}

impl From<MissingCallError> for InterpreterError {
    fn from(e: MissingCallError) -> Self { InterpreterError::MissingCall(e) }
}

impl From<InternalInterpreterError> for InterpreterError {
    fn from(e: InternalInterpreterError) -> Self { InterpreterError::Internal(e) }
}

impl From<ReturnSignal> for InterpreterError {
    fn from(e: ReturnSignal) -> Self { InterpreterError::Return(e) }
}

impl From<StopSignal> for InterpreterError {
    fn from(e: StopSignal) -> Self { InterpreterError::Stop(e) }
}
