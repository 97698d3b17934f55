//! Interpreter module
//!
//! The Scrolls tree walker, its run state, the call handler machinery and
//! the builtin call library.

pub mod builtins;
pub mod call_handler;
pub mod context;
pub mod errors;
pub mod execution_engine;
pub mod functions;
pub mod helpers;
pub mod types;

pub use call_handler::{
    CallHandler, CallHandlerContainer, CallbackCallHandler, CallbackCommandHandler, CallbackControlHandler,
    CallbackExpansionHandler, ChoiceCallHandlerContainer, DiscardResult, Initializer, ScrollCallback,
};
pub use context::{InterpreterContext, RUNTIME_DEF_HANDLER};
pub use errors::{
    CallKind, ErrorSite, InternalInterpreterError, InterpreterError, MissingCallError, ReturnSignal, ScriptError,
    StopSignal,
};
pub use execution_engine::Interpreter;
pub use functions::{RuntimeCall, RuntimeCallHandler};
pub use types::{ArgSourceMap, CallContext, ExecutionLimits, ScopeError, ScopedVarStore, VarScope};
