//! Interpreter Context
//!
//! All mutable state of one script run: variables, the call stack, runtime
//! definitions and open files. A context can be reused across runs, which is
//! how the REPL keeps variables and `%def` definitions between inputs.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::rc::Rc;

use crate::ast::types::AstNode;
use crate::interpreter::call_handler::{CallHandler, CallHandlerContainer, ChoiceCallHandlerContainer};
use crate::interpreter::errors::{
    CallKind, ErrorSite, InternalInterpreterError, InterpreterError, MissingCallError, ScriptError,
};
use crate::interpreter::execution_engine::Interpreter;
use crate::interpreter::functions::RuntimeCallHandler;
use crate::interpreter::types::{ArgSourceMap, CallContext, ScopedVarStore};

/// Container name the runtime call handlers are registered under.
pub const RUNTIME_DEF_HANDLER: &str = "__def__";

pub struct InterpreterContext {
    current_node: Option<Rc<AstNode>>,
    call_context: Option<CallContext>,
    call_stack: Vec<CallContext>,
    interpreter: Option<Rc<Interpreter>>,
    vars: ScopedVarStore,
    pub statement_count: u64,

    static_commands: Option<Rc<CallHandlerContainer<()>>>,
    static_expansions: Option<Rc<CallHandlerContainer<String>>>,
    runtime_commands: CallHandlerContainer<()>,
    runtime_expansions: CallHandlerContainer<String>,
    runtime_command_calls: Rc<RuntimeCallHandler>,
    runtime_expansion_calls: Rc<RuntimeCallHandler>,

    open_files: HashMap<u64, File>,
    next_fid: u64,
    unified_commands: bool,
}

impl Default for InterpreterContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpreterContext {
    pub fn new() -> Self {
        let runtime_command_calls = Rc::new(RuntimeCallHandler::new());
        let runtime_expansion_calls = Rc::new(RuntimeCallHandler::new());

        let mut runtime_commands = CallHandlerContainer::new();
        let command_handler: Rc<dyn CallHandler<()>> = runtime_command_calls.clone();
        runtime_commands.add(command_handler, RUNTIME_DEF_HANDLER);

        let mut runtime_expansions = CallHandlerContainer::new();
        let expansion_handler: Rc<dyn CallHandler<String>> = runtime_expansion_calls.clone();
        runtime_expansions.add(expansion_handler, RUNTIME_DEF_HANDLER);

        Self {
            current_node: None,
            call_context: None,
            call_stack: Vec::new(),
            interpreter: None,
            vars: ScopedVarStore::new(),
            statement_count: 0,
            static_commands: None,
            static_expansions: None,
            runtime_commands,
            runtime_expansions,
            runtime_command_calls,
            runtime_expansion_calls,
            open_files: HashMap::new(),
            next_fid: 0,
            unified_commands: false,
        }
    }

    // ===========================================================================
    // NODES & INTERPRETER
    // ===========================================================================

    pub fn current_node(&self) -> Result<Rc<AstNode>, InterpreterError> {
        match &self.current_node {
            Some(node) => Ok(Rc::clone(node)),
            None => Err(self.internal_error("Current node is not initialized.")),
        }
    }

    pub fn set_current_node(&mut self, node: Rc<AstNode>) {
        self.current_node = Some(node);
    }

    pub fn interpreter(&self) -> Result<Rc<Interpreter>, InterpreterError> {
        match &self.interpreter {
            Some(interpreter) => Ok(Rc::clone(interpreter)),
            None => Err(self.internal_error("Interpreter is not initialized.")),
        }
    }

    pub fn set_interpreter(&mut self, interpreter: Rc<Interpreter>) {
        self.interpreter = Some(interpreter);
    }

    /// Run a statement with this context's interpreter.
    pub fn interpret_statement(&mut self, node: &Rc<AstNode>) -> Result<(), InterpreterError> {
        let interpreter = self.interpreter()?;
        interpreter.interpret_statement(self, node)
    }

    /// Evaluate a string or expansion node with this context's interpreter.
    pub fn interpret_string_or_expansion(&mut self, node: &Rc<AstNode>) -> Result<Vec<String>, InterpreterError> {
        let interpreter = self.interpreter()?;
        interpreter.interpret_string_or_expansion(self, node)
    }

    // ===========================================================================
    // VARIABLES
    // ===========================================================================

    pub fn vars(&self) -> &ScopedVarStore {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut ScopedVarStore {
        &mut self.vars
    }

    pub fn get_var(&self, name: &str) -> Result<String, InterpreterError> {
        match self.vars.get_var(name) {
            Some(value) => Ok(value.clone()),
            None => Err(self.error(format!("No such variable {}.", name))),
        }
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<String>) {
        self.vars.set_var(name, value);
    }

    pub fn del_var(&mut self, name: &str) -> Result<(), InterpreterError> {
        self.vars.del_var(name).map_err(|e| self.error(e.to_string()))
    }

    // ===========================================================================
    // CALLS
    // ===========================================================================

    pub fn call_context(&self) -> Result<&CallContext, InterpreterError> {
        match &self.call_context {
            Some(call) => Ok(call),
            None => Err(self.internal_error("Current context is not a call.")),
        }
    }

    pub fn call_context_mut(&mut self) -> Result<&mut CallContext, InterpreterError> {
        if self.call_context.is_none() {
            return Err(self.internal_error("Current context is not a call."));
        }
        self.call_context
            .as_mut()
            .ok_or_else(|| InternalInterpreterError::new("Current context is not a call.", ErrorSite::default()).into())
    }

    pub fn call_name(&self) -> Result<&str, InterpreterError> {
        Ok(&self.call_context()?.call_name)
    }

    pub fn args(&self) -> Result<&[String], InterpreterError> {
        Ok(&self.call_context()?.args)
    }

    pub fn arg_nodes(&self) -> Result<&ArgSourceMap, InterpreterError> {
        Ok(&self.call_context()?.arg_nodes)
    }

    pub fn control_node(&self) -> Result<Rc<AstNode>, InterpreterError> {
        match &self.call_context()?.control_node {
            Some(node) => Ok(Rc::clone(node)),
            None => Err(self.internal_error("Current context is not a control call.")),
        }
    }

    /// Make a fresh call frame current, replacing whatever frame was current.
    pub fn set_call(
        &mut self,
        call_name: impl Into<String>,
        args: Vec<String>,
        arg_nodes: ArgSourceMap,
        control_node: Option<Rc<AstNode>>,
    ) {
        self.call_context = Some(CallContext::new(call_name, args, arg_nodes, control_node));
    }

    /// The frame a whole script runs in.
    pub fn set_base_call(&mut self) {
        self.set_call("__main__", Vec::new(), ArgSourceMap::new(), None);
    }

    /// Save the current frame on the stack. `set_call` is expected next.
    pub fn push_call(&mut self) -> Result<(), InterpreterError> {
        match self.call_context.take() {
            Some(call) => {
                self.call_stack.push(call);
                Ok(())
            }
            None => Err(self.internal_error("Current context is not a call.")),
        }
    }

    /// Discard the current frame and restore the last pushed one.
    pub fn pop_call(&mut self) -> Result<(), InterpreterError> {
        match self.call_stack.pop() {
            Some(call) => {
                self.call_context = Some(call);
                Ok(())
            }
            None => Err(self.internal_error("Cannot pop call. No calls pushed.")),
        }
    }

    pub fn call_stack(&self) -> &[CallContext] {
        &self.call_stack
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn parent_call_context(&self) -> Result<&CallContext, InterpreterError> {
        let name = self.call_name()?;
        match self.call_stack.last() {
            Some(parent) => Ok(parent),
            None => Err(self.internal_error(format!("Cannot get parent of base call \"{}\".", name))),
        }
    }

    pub fn parent_call_context_mut(&mut self) -> Result<&mut CallContext, InterpreterError> {
        let name = self.call_name()?.to_string();
        if self.call_stack.is_empty() {
            return Err(self.internal_error(format!("Cannot get parent of base call \"{}\".", name)));
        }
        self.call_stack.last_mut().ok_or_else(|| {
            InternalInterpreterError::new(format!("Cannot get parent of base call \"{}\".", name), ErrorSite::default())
                .into()
        })
    }

    /// Hand a return value to the innermost runtime-defined call on the stack.
    pub fn set_retval(&mut self, value: impl Into<String>) -> Result<(), InterpreterError> {
        self.call_context()?;
        if self.call_stack.is_empty() {
            return Err(self.error("cannot return, no call stack (outside calls)"));
        }
        if let Some(frame) = self.call_stack.iter_mut().rev().find(|c| c.runtime_call) {
            frame.return_value = Some(value.into());
            return Ok(());
        }
        Err(self.error("cannot return outside of function"))
    }

    // ===========================================================================
    // HANDLERS
    // ===========================================================================

    pub fn init_handlers(
        &mut self,
        static_commands: Rc<CallHandlerContainer<()>>,
        static_expansions: Rc<CallHandlerContainer<String>>,
    ) {
        self.static_commands = Some(static_commands);
        self.static_expansions = Some(static_expansions);
    }

    /// Runtime command handlers first, then the interpreter's own.
    pub fn all_commands(&self) -> Result<ChoiceCallHandlerContainer<'_, ()>, InterpreterError> {
        match &self.static_commands {
            Some(statics) => Ok(ChoiceCallHandlerContainer::new(vec![&self.runtime_commands, statics.as_ref()])),
            None => Err(self.internal_error("Bad context: command handlers not initialized.")),
        }
    }

    /// Runtime expansion handlers first, then the interpreter's own.
    pub fn all_expansions(&self) -> Result<ChoiceCallHandlerContainer<'_, String>, InterpreterError> {
        match &self.static_expansions {
            Some(statics) => Ok(ChoiceCallHandlerContainer::new(vec![&self.runtime_expansions, statics.as_ref()])),
            None => Err(self.internal_error("Bad context: expansion handlers not initialized.")),
        }
    }

    pub fn runtime_commands(&mut self) -> &mut CallHandlerContainer<()> {
        &mut self.runtime_commands
    }

    pub fn runtime_expansions(&mut self) -> &mut CallHandlerContainer<String> {
        &mut self.runtime_expansions
    }

    /// The handler holding `%def` commands.
    pub fn runtime_command_calls(&self) -> Rc<RuntimeCallHandler> {
        Rc::clone(&self.runtime_command_calls)
    }

    /// The handler holding `%def` expansions (definitions that `return`).
    pub fn runtime_expansion_calls(&self) -> Rc<RuntimeCallHandler> {
        Rc::clone(&self.runtime_expansion_calls)
    }

    pub fn unified_commands(&self) -> bool {
        self.unified_commands
    }

    /// Let expansions be called as commands, discarding their result.
    pub fn enable_unified_commands(&mut self) {
        self.unified_commands = true;
    }

    // ===========================================================================
    // FILES
    // ===========================================================================

    pub fn open_file(&mut self, path: &str, mode: &str) -> Result<u64, InterpreterError> {
        let p = Path::new(path);
        if !p.exists() {
            return Err(self.error(format!("{} does not exist", path)));
        }
        if !p.is_file() {
            return Err(self.error(format!("{} is not a file", path)));
        }

        let options = match open_options(mode) {
            Some(options) => options,
            None => return Err(self.error(format!("invalid file mode \"{}\"", mode))),
        };
        let file = options.open(p).map_err(|e| self.error(format!("{}: {}", path, e)))?;

        let fid = self.next_fid;
        self.next_fid += 1;
        self.open_files.insert(fid, file);
        tracing::debug!(fid, path, mode, "opened file");
        Ok(fid)
    }

    pub fn get_file(&mut self, fid: u64) -> Result<&mut File, InterpreterError> {
        let message = format!("file already closed, or not open (fid {})", fid);
        if !self.open_files.contains_key(&fid) {
            return Err(self.error(message));
        }
        self.open_files
            .get_mut(&fid)
            .ok_or_else(|| ScriptError::detached(message).into())
    }

    pub fn close_file(&mut self, fid: u64) -> Result<(), InterpreterError> {
        match self.open_files.remove(&fid) {
            Some(_) => {
                tracing::debug!(fid, "closed file");
                Ok(())
            }
            None => Err(self.error(format!("file already closed, or not open (fid {})", fid))),
        }
    }

    // ===========================================================================
    // ERRORS
    // ===========================================================================

    fn error_site(&self) -> ErrorSite {
        self.error_site_at(self.current_node.as_ref())
    }

    fn error_site_at(&self, node: Option<&Rc<AstNode>>) -> ErrorSite {
        let token = node.and_then(|n| n.token());
        match token {
            Some(tok) => ErrorSite {
                line: tok.line,
                column: tok.column,
                source_line: tok.source_line().map(str::to_string),
                backtrace: self.get_backtrace(),
            },
            None => ErrorSite {
                backtrace: self.get_backtrace(),
                ..ErrorSite::default()
            },
        }
    }

    /// A script error positioned at the current node.
    pub fn error(&self, message: impl Into<String>) -> InterpreterError {
        ScriptError::new(message, self.error_site()).into()
    }

    /// A script error positioned at the node that produced argument `index`
    /// of the current call. Falls back to the current node.
    pub fn error_at_arg(&self, index: usize, message: impl Into<String>) -> InterpreterError {
        let node = self
            .arg_nodes()
            .ok()
            .and_then(|nodes| nodes.get(index))
            .or(self.current_node.as_ref());
        ScriptError::new(message, self.error_site_at(node)).into()
    }

    pub fn internal_error(&self, message: impl Into<String>) -> InterpreterError {
        InternalInterpreterError::new(message, self.error_site()).into()
    }

    pub fn missing_call_error(&self, kind: CallKind, name: &str) -> InterpreterError {
        MissingCallError::new(kind, name, self.error_site()).into()
    }

    pub fn get_backtrace(&self) -> String {
        let stack: Vec<&CallContext> = self.call_stack.iter().chain(self.call_context.iter()).collect();
        if stack.is_empty() {
            return String::new();
        }
        let id_size = stack.len().to_string().len();

        let mut trace = vec![
            "backtrace (most recent call last)".to_string(),
            CallContext::trace_banner(id_size),
        ];
        trace.extend(stack.iter().enumerate().map(|(id, call)| call.trace_str(id, id_size)));
        trace.join("\n")
    }
}

/// Translate a text-mode file mode ("r", "w+", ...) into open options.
fn open_options(mode: &str) -> Option<OpenOptions> {
    let mode: String = mode.chars().filter(|c| *c != 'b' && *c != 't').collect();
    let mut options = OpenOptions::new();
    match mode.as_str() {
        "r" => options.read(true),
        "r+" => options.read(true).write(true),
        "w" => options.write(true).truncate(true).create(true),
        "w+" => options.read(true).write(true).truncate(true).create(true),
        "a" => options.append(true).create(true),
        "a+" => options.read(true).append(true).create(true),
        "x" => options.write(true).create_new(true),
        "x+" => options.read(true).write(true).create_new(true),
        _ => return None,
    };
    Some(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn make_context() -> InterpreterContext {
        let mut ctx = InterpreterContext::new();
        ctx.set_base_call();
        ctx
    }

    #[test]
    fn test_push_and_pop_restore_frames() {
        let mut ctx = make_context();
        ctx.push_call().unwrap();
        ctx.set_call("inner", vec!["a".to_string()], ArgSourceMap::new(), None);
        assert_eq!(ctx.call_name().unwrap(), "inner");
        assert_eq!(ctx.parent_call_context().unwrap().call_name, "__main__");
        ctx.pop_call().unwrap();
        assert_eq!(ctx.call_name().unwrap(), "__main__");
        assert!(matches!(ctx.pop_call(), Err(InterpreterError::Internal(_))));
    }

    #[test]
    fn test_parent_of_base_call() {
        let ctx = make_context();
        let err = ctx.parent_call_context().unwrap_err();
        assert!(err.message().contains("base call \"__main__\""));
    }

    #[test]
    fn test_set_retval_outside_function() {
        let mut ctx = make_context();
        let err = ctx.set_retval("1").unwrap_err();
        assert_eq!(err.message(), "cannot return, no call stack (outside calls)");

        ctx.push_call().unwrap();
        ctx.set_call("return", vec![], ArgSourceMap::new(), None);
        let err = ctx.set_retval("1").unwrap_err();
        assert_eq!(err.message(), "cannot return outside of function");
    }

    #[test]
    fn test_set_retval_finds_runtime_frame() {
        let mut ctx = make_context();
        ctx.push_call().unwrap();
        ctx.set_call("f", vec![], ArgSourceMap::new(), None);
        ctx.call_context_mut().unwrap().runtime_call = true;
        ctx.push_call().unwrap();
        ctx.set_call("%if", vec![], ArgSourceMap::new(), None);
        ctx.push_call().unwrap();
        ctx.set_call("return", vec!["5".to_string()], ArgSourceMap::new(), None);

        ctx.set_retval("5").unwrap();
        ctx.pop_call().unwrap();
        ctx.pop_call().unwrap();
        assert_eq!(ctx.call_context().unwrap().return_value.as_deref(), Some("5"));
    }

    #[test]
    fn test_backtrace_lists_stack() {
        let mut ctx = make_context();
        ctx.push_call().unwrap();
        ctx.set_call("print", vec!["hi".to_string()], ArgSourceMap::new(), None);
        assert_eq!(
            ctx.get_backtrace(),
            "backtrace (most recent call last)\nID FLAGS NAME+ARGS\n0  ---   \"__main__\"\n1  ---   \"print\" \"hi\""
        );
    }

    #[test]
    fn test_handlers_require_init() {
        let ctx = make_context();
        assert!(ctx.all_commands().is_err());
        assert!(ctx.all_expansions().is_err());
    }

    #[test]
    fn test_unknown_variable() {
        let mut ctx = make_context();
        assert_eq!(ctx.get_var("nope").unwrap_err().message(), "No such variable nope.");
        ctx.set_var("x", "1");
        assert_eq!(ctx.get_var("x").unwrap(), "1");
        ctx.del_var("x").unwrap();
        assert!(ctx.del_var("x").is_err());
    }

    #[test]
    fn test_file_lifecycle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"hello").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let mut ctx = make_context();
        let fid = ctx.open_file(&path, "r").unwrap();
        let mut content = String::new();
        ctx.get_file(fid).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
        ctx.close_file(fid).unwrap();
        assert!(ctx.get_file(fid).is_err());
        assert!(ctx.close_file(fid).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let mut ctx = make_context();
        let err = ctx.open_file("/definitely/not/here.txt", "r").unwrap_err();
        assert!(err.message().ends_with("does not exist"));
    }
}
