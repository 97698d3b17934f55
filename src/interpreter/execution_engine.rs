//! Execution Engine
//!
//! The tree walker that ties all interpreter components together:
//!
//! interpret_ast -> interpret_root -> interpret_statement -> interpret_call -> handler
//!
//! The `Interpreter` itself is immutable once configured. All run state lives
//! in an `InterpreterContext`, so one interpreter can drive many contexts.

use std::rc::Rc;

use crate::ast::types::{Ast, AstNode, AstNodeType};
use crate::error::ScrollError;
use crate::interpreter::call_handler::{CallHandler, CallHandlerContainer, DiscardResult, Initializer};
use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::{CallKind, InterpreterError};
use crate::interpreter::types::{ArgSourceMap, ExecutionLimits};
use crate::parser::{parse_one_with_triggers, parse_with_triggers, ConsumeRestTriggers, ParseError};

type Resolved<T> = Result<Option<Rc<dyn CallHandler<T>>>, InterpreterError>;

pub struct Interpreter {
    command_handlers: Rc<CallHandlerContainer<()>>,
    control_handlers: Rc<CallHandlerContainer<()>>,
    expansion_handlers: Rc<CallHandlerContainer<String>>,
    initializers: Vec<Rc<dyn Initializer>>,
    consume_rest_triggers: ConsumeRestTriggers,
    limits: ExecutionLimits,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(ExecutionLimits::default())
    }
}

impl Interpreter {
    pub fn new(limits: ExecutionLimits) -> Self {
        Self {
            command_handlers: Rc::new(CallHandlerContainer::new()),
            control_handlers: Rc::new(CallHandlerContainer::new()),
            expansion_handlers: Rc::new(CallHandlerContainer::new()),
            initializers: Vec::new(),
            consume_rest_triggers: ConsumeRestTriggers::new(),
            limits,
        }
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    pub fn command_handlers(&self) -> &CallHandlerContainer<()> {
        &self.command_handlers
    }

    pub fn command_handlers_mut(&mut self) -> &mut CallHandlerContainer<()> {
        Rc::make_mut(&mut self.command_handlers)
    }

    pub fn control_handlers(&self) -> &CallHandlerContainer<()> {
        &self.control_handlers
    }

    pub fn control_handlers_mut(&mut self) -> &mut CallHandlerContainer<()> {
        Rc::make_mut(&mut self.control_handlers)
    }

    pub fn expansion_handlers(&self) -> &CallHandlerContainer<String> {
        &self.expansion_handlers
    }

    pub fn expansion_handlers_mut(&mut self) -> &mut CallHandlerContainer<String> {
        Rc::make_mut(&mut self.expansion_handlers)
    }

    /// Make `name` take the rest of its line as one argument after `count`
    /// ordinary ones. Applies to every script this interpreter parses.
    pub fn add_consume_rest_trigger(&mut self, name: &str, count: usize) {
        self.consume_rest_triggers.insert(name.to_string(), count);
    }

    pub fn consume_rest_triggers(&self) -> &ConsumeRestTriggers {
        &self.consume_rest_triggers
    }

    pub fn add_initializer(&mut self, initializer: Rc<dyn Initializer>) {
        self.initializers.push(initializer);
    }

    pub fn apply_initializers(&self, context: &mut InterpreterContext) -> Result<(), InterpreterError> {
        for initializer in &self.initializers {
            initializer.handle_call(context)?;
        }
        Ok(())
    }

    pub fn over_statement_limit(&self, context: &InterpreterContext) -> bool {
        self.limits.max_statements != 0 && context.statement_count > self.limits.max_statements
    }

    pub fn over_call_depth_limit(&self, context: &InterpreterContext) -> bool {
        self.limits.max_call_depth != 0 && context.call_depth() > self.limits.max_call_depth
    }

    // ===========================================================================
    // RUNNING SCRIPTS
    // ===========================================================================

    /// Parse a script and return its tree as pretty JSON.
    pub fn test_parse(&self, script: &str) -> Result<String, ParseError> {
        Ok(self.parse(script)?.prettify())
    }

    /// Parse a script with this interpreter's consume-rest triggers.
    pub fn parse(&self, script: &str) -> Result<Ast, ParseError> {
        parse_with_triggers(script, &self.consume_rest_triggers)
    }

    /// Prepare a context for a run with this interpreter.
    pub fn init_context(self: &Rc<Self>, context: &mut InterpreterContext) -> Result<(), InterpreterError> {
        context.set_interpreter(Rc::clone(self));
        context.set_base_call();
        context.init_handlers(Rc::clone(&self.command_handlers), Rc::clone(&self.expansion_handlers));
        self.apply_initializers(context)
    }

    /// Run a script in a fresh context and hand the context back.
    pub fn run(self: &Rc<Self>, script: &str) -> Result<InterpreterContext, ScrollError> {
        let mut context = InterpreterContext::new();
        self.run_with_context(script, &mut context)?;
        Ok(context)
    }

    /// Run a script in an existing context, keeping its variables and definitions.
    pub fn run_with_context(self: &Rc<Self>, script: &str, context: &mut InterpreterContext) -> Result<(), ScrollError> {
        let tree = self.parse(script)?;
        self.interpret_ast(&tree, context)?;
        Ok(())
    }

    /// Run the first statement of `statement`.
    pub fn run_statement(self: &Rc<Self>, statement: &str, context: &mut InterpreterContext) -> Result<(), ScrollError> {
        let node = parse_one_with_triggers(statement, &self.consume_rest_triggers)?;
        self.init_context(context)?;
        let result = self.interpret_statement(context, &node);
        self.finish_run(context, result)?;
        Ok(())
    }

    pub fn interpret_ast(self: &Rc<Self>, tree: &Ast, context: &mut InterpreterContext) -> Result<(), InterpreterError> {
        self.init_context(context)?;
        let result = self.interpret_root(context, &tree.root);
        self.finish_run(context, result)
    }

    /// Stop ends a run normally. A return that reaches the top was made
    /// outside any runtime-defined call.
    fn finish_run(&self, context: &InterpreterContext, result: Result<(), InterpreterError>) -> Result<(), InterpreterError> {
        match result {
            Err(InterpreterError::Stop(_)) => {
                tracing::debug!("script stopped");
                Ok(())
            }
            Err(InterpreterError::Return(_)) => Err(context.error("returning only allowed in functions")),
            other => other,
        }
    }

    // ===========================================================================
    // STATEMENTS
    // ===========================================================================

    pub fn interpret_root(&self, context: &mut InterpreterContext, node: &Rc<AstNode>) -> Result<(), InterpreterError> {
        if node.node_type != AstNodeType::Root {
            return Err(context.internal_error(format!("Expected ROOT, got {}", node.node_type)));
        }
        for statement in &node.children {
            self.interpret_statement(context, statement)?;
        }
        Ok(())
    }

    pub fn interpret_block(&self, context: &mut InterpreterContext, node: &Rc<AstNode>) -> Result<(), InterpreterError> {
        for statement in &node.children {
            self.interpret_statement(context, statement)?;
        }
        Ok(())
    }

    pub fn interpret_statement(&self, context: &mut InterpreterContext, node: &Rc<AstNode>) -> Result<(), InterpreterError> {
        context.set_current_node(Rc::clone(node));

        match node.node_type {
            AstNodeType::ControlCall => self.interpret_control(context, node)?,
            AstNodeType::CommandCall => self.interpret_command(context, node)?,
            AstNodeType::Block => self.interpret_block(context, node)?,
            other => return Err(context.internal_error(format!("Bad statement type {}", other))),
        }

        context.statement_count += 1;
        if self.over_statement_limit(context) {
            return Err(context.error(format!(
                "Exceeded maximum statement limit of {}.",
                self.limits.max_statements
            )));
        }
        Ok(())
    }

    // ===========================================================================
    // CALLS
    // ===========================================================================

    pub fn interpret_control(&self, context: &mut InterpreterContext, node: &Rc<AstNode>) -> Result<(), InterpreterError> {
        let controls = Rc::clone(&self.control_handlers);
        self.interpret_call(context, node, CallKind::Control, |_, name| Ok(controls.get_for_call(name)))
    }

    pub fn interpret_command(&self, context: &mut InterpreterContext, node: &Rc<AstNode>) -> Result<(), InterpreterError> {
        self.interpret_call(context, node, CallKind::Command, resolve_command)
    }

    pub fn interpret_expansion_call(&self, context: &mut InterpreterContext, node: &Rc<AstNode>) -> Result<String, InterpreterError> {
        self.interpret_call(context, node, CallKind::Expansion, |ctx, name| {
            Ok(ctx.all_expansions()?.get_for_call(name))
        })
    }

    /// Evaluate a call node's name and arguments, push a frame, dispatch to
    /// the first handler that supports the name, and pop the frame again
    /// whatever the outcome.
    pub fn interpret_call<T, R>(
        &self,
        context: &mut InterpreterContext,
        node: &Rc<AstNode>,
        kind: CallKind,
        resolve: R,
    ) -> Result<T, InterpreterError>
    where
        R: Fn(&InterpreterContext, &str) -> Resolved<T>,
    {
        let expected = match kind {
            CallKind::Command => AstNodeType::CommandCall,
            CallKind::Control => AstNodeType::ControlCall,
            CallKind::Expansion => AstNodeType::ExpansionCall,
        };
        if node.node_type != expected {
            return Err(context.internal_error(format!(
                "interpret_call: Expected {}, got {}",
                expected, node.node_type
            )));
        }
        let (name_node, args_node) = match (node.child(0), node.child(1)) {
            (Some(name), Some(args)) => (Rc::clone(name), Rc::clone(args)),
            _ => return Err(context.internal_error(format!("Malformed {} node", node.node_type))),
        };
        let control_node = match kind {
            CallKind::Control => match node.child(2) {
                Some(body) => Some(Rc::clone(body)),
                None => return Err(context.internal_error("Control call has no statement")),
            },
            _ => None,
        };

        let mut arg_nodes = ArgSourceMap::new();
        let mut raw_call = self.interpret_string_or_expansion(context, &name_node)?;
        if raw_call.is_empty() {
            context.set_current_node(Rc::clone(&name_node));
            return Err(context.error("Call name must not expand to empty string."));
        }
        arg_nodes.add_args(raw_call.len() - 1, &name_node);

        for arg_node in &args_node.children {
            let values = self.interpret_string_or_expansion(context, arg_node)?;
            arg_nodes.add_args(values.len(), arg_node);
            raw_call.extend(values);
        }

        let call_name = raw_call.remove(0);
        context.set_current_node(Rc::clone(node));

        context.push_call()?;
        context.set_call(call_name, raw_call, arg_nodes, control_node);
        let result = self.dispatch_call(context, &name_node, kind, resolve);
        let popped = context.pop_call();

        let value = result?;
        popped?;
        Ok(value)
    }

    fn dispatch_call<T, R>(
        &self,
        context: &mut InterpreterContext,
        name_node: &Rc<AstNode>,
        kind: CallKind,
        resolve: R,
    ) -> Result<T, InterpreterError>
    where
        R: Fn(&InterpreterContext, &str) -> Resolved<T>,
    {
        if self.over_call_depth_limit(context) {
            return Err(context.error(format!(
                "Maximum call stack depth ({}) exceeded.",
                self.limits.max_call_depth
            )));
        }

        let name = context.call_name()?.to_string();
        let handler = match resolve(context, &name)? {
            Some(handler) => handler,
            None => {
                context.set_current_node(Rc::clone(name_node));
                return Err(context.missing_call_error(kind, &name));
            }
        };

        tracing::trace!(kind = %kind, name = %name, depth = context.call_depth(), "dispatch call");
        handler.handle_call(context)
    }

    // ===========================================================================
    // STRINGS & EXPANSIONS
    // ===========================================================================

    /// Evaluate a STRING or EXPANSION node. Spread expansions can produce any
    /// number of values, everything else exactly one.
    pub fn interpret_string_or_expansion(
        &self,
        context: &mut InterpreterContext,
        node: &Rc<AstNode>,
    ) -> Result<Vec<String>, InterpreterError> {
        match node.node_type {
            AstNodeType::String => match node.str_content() {
                Ok(value) => Ok(vec![value.to_string()]),
                Err(e) => Err(context.internal_error(e.to_string())),
            },
            AstNodeType::Expansion => self.interpret_expansion(context, node),
            other => {
                context.set_current_node(Rc::clone(node));
                Err(context.internal_error(format!("Expected STRING or EXPANSION, got {}", other)))
            }
        }
    }

    pub fn interpret_expansion(&self, context: &mut InterpreterContext, node: &Rc<AstNode>) -> Result<Vec<String>, InterpreterError> {
        context.set_current_node(Rc::clone(node));
        let (arity, body) = match (node.child(0), node.child(1)) {
            (Some(arity), Some(body)) => (Rc::clone(arity), Rc::clone(body)),
            _ => return Err(context.internal_error("Malformed EXPANSION node")),
        };
        let spread = match arity.node_type {
            AstNodeType::ExpansionSingle => false,
            AstNodeType::ExpansionSpread => true,
            other => return Err(context.internal_error(format!("Bad expansion arity {}", other))),
        };
        self.interpret_sub_expansion(context, node, &body, spread)
    }

    /// Evaluate the body of an EXPANSION node: a variable or a call.
    pub fn interpret_sub_expansion(
        &self,
        context: &mut InterpreterContext,
        node: &Rc<AstNode>,
        body: &Rc<AstNode>,
        spread: bool,
    ) -> Result<Vec<String>, InterpreterError> {
        match body.node_type {
            AstNodeType::ExpansionVar if spread => {
                let name = self.variable_name(context, body)?;
                Ok(context
                    .vars()
                    .get_var(&name)
                    .map(String::as_str)
                    .map(split_values)
                    .unwrap_or_default())
            }
            AstNodeType::ExpansionVar => {
                let name = self.variable_name(context, body)?;
                context.set_current_node(Rc::clone(node));
                Ok(vec![context.get_var(&name)?])
            }
            AstNodeType::ExpansionCall => {
                let value = self.interpret_expansion_call(context, body)?;
                if spread {
                    Ok(split_values(&value))
                } else {
                    Ok(vec![value])
                }
            }
            other => Err(context.internal_error(format!("Bad expansion body {}", other))),
        }
    }

    /// Value of the variable an EXPANSION_VAR node names.
    pub fn interpret_variable_reference(&self, context: &mut InterpreterContext, node: &Rc<AstNode>) -> Result<String, InterpreterError> {
        let name = self.variable_name(context, node)?;
        context.set_current_node(Rc::clone(node));
        context.get_var(&name)
    }

    fn variable_name(&self, context: &mut InterpreterContext, node: &Rc<AstNode>) -> Result<String, InterpreterError> {
        match node.child(0) {
            Some(name_node) => {
                let name_node = Rc::clone(name_node);
                Ok(self.interpret_string_or_expansion(context, &name_node)?.join(" "))
            }
            None => Err(context.internal_error("Malformed EXPANSION_VAR node")),
        }
    }
}

/// Commands come from the context's runtime and static containers. With
/// unified commands on, an expansion may stand in for a missing command.
fn resolve_command(context: &InterpreterContext, name: &str) -> Resolved<()> {
    if let Some(handler) = context.all_commands()?.get_for_call(name) {
        return Ok(Some(handler));
    }
    if !context.unified_commands() {
        return Ok(None);
    }
    Ok(context
        .all_expansions()?
        .get_for_call(name)
        .map(|expansion| Rc::new(DiscardResult::new(expansion)) as Rc<dyn CallHandler<()>>))
}

fn split_values(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::interpreter::call_handler::{CallbackCommandHandler, CallbackControlHandler, CallbackExpansionHandler};

    type Log = Rc<RefCell<Vec<String>>>;

    fn make_interpreter(limits: ExecutionLimits, log: &Log) -> Rc<Interpreter> {
        Rc::new(build_interpreter(limits, log))
    }

    fn build_interpreter(limits: ExecutionLimits, log: &Log) -> Interpreter {
        let mut interpreter = Interpreter::new(limits);

        let mut commands = CallbackCommandHandler::new();
        let sink = Rc::clone(log);
        commands.add_call("emit", move |ctx| {
            sink.borrow_mut().push(ctx.args()?.join("|"));
            Ok(())
        });
        commands.add_call("set", |ctx| {
            let args = ctx.args()?.to_vec();
            ctx.set_var(&args[0], args[1..].join(" "));
            Ok(())
        });
        commands.add_call("stop", |_| Err(crate::interpreter::errors::StopSignal.into()));
        commands.add_call("return", |_| Err(crate::interpreter::errors::ReturnSignal.into()));
        interpreter.command_handlers_mut().add(Rc::new(commands), "test");

        let mut controls = CallbackControlHandler::new();
        controls.add_call("twice", |ctx| {
            let body = ctx.control_node()?;
            ctx.interpret_statement(&body)?;
            ctx.interpret_statement(&body)
        });
        controls.add_call("forever", |ctx| {
            let body = ctx.control_node()?;
            loop {
                ctx.interpret_statement(&body)?;
            }
        });
        interpreter.control_handlers_mut().add(Rc::new(controls), "test");

        let mut expansions = CallbackExpansionHandler::new();
        expansions.add_call("cat", |ctx| Ok(ctx.args()?.concat()));
        expansions.add_call("words", |_| Ok(" a  b\tc ".to_string()));
        interpreter.expansion_handlers_mut().add(Rc::new(expansions), "test");

        interpreter
    }

    fn run(script: &str) -> (Result<InterpreterContext, ScrollError>, Vec<String>) {
        let log: Log = Rc::default();
        let interpreter = make_interpreter(ExecutionLimits::default(), &log);
        let result = interpreter.run(script);
        let lines = log.borrow().clone();
        (result, lines)
    }

    #[test]
    fn test_arguments_and_variables() {
        let (result, log) = run("set x hello world\nemit $x $(cat a b) \"q w\"");
        assert!(result.is_ok());
        assert_eq!(log, vec!["hello world|ab|q w"]);
    }

    #[test]
    fn test_spread_expansion() {
        let (_, log) = run("set xs 1 2 3\nemit $*xs $*(words) $*unset");
        assert_eq!(log, vec!["1|2|3|a|b|c"]);
    }

    #[test]
    fn test_name_from_expansion_with_extra_args() {
        let (_, log) = run("set cmd emit first\n$*cmd second");
        assert_eq!(log, vec!["first|second"]);
    }

    #[test]
    fn test_unset_variable_is_error() {
        let (result, log) = run("emit before\nemit $nope");
        assert_eq!(log, vec!["before"]);
        match result {
            Err(ScrollError::Interpreter(e)) => {
                assert_eq!(e.message(), "No such variable nope.");
                let site = e.site().unwrap();
                assert_eq!((site.line, site.column), (2, 6));
            }
            _ => panic!("expected interpreter error"),
        }
    }

    #[test]
    fn test_missing_call_points_at_name() {
        let (result, _) = run("emit a\n  frobnicate x");
        match result {
            Err(ScrollError::Interpreter(InterpreterError::MissingCall(e))) => {
                assert_eq!(e.name, "frobnicate");
                assert_eq!((e.site.line, e.site.column), (2, 3));
            }
            _ => panic!("expected missing call"),
        }
    }

    #[test]
    fn test_empty_call_name() {
        let (result, _) = run("$*unset a");
        let err = result.err().unwrap().to_string();
        assert!(err.contains("Call name must not expand to empty string."));
    }

    #[test]
    fn test_control_call_runs_body() {
        let (_, log) = run("%twice { emit a; emit b }");
        assert_eq!(log, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn test_stop_ends_run_quietly() {
        let (result, log) = run("emit a\nstop\nemit b");
        assert!(result.is_ok());
        assert_eq!(log, vec!["a"]);
    }

    #[test]
    fn test_return_at_top_level() {
        let (result, _) = run("return");
        let err = result.err().unwrap();
        assert!(err.to_string().contains("returning only allowed in functions"));
    }

    #[test]
    fn test_statement_limit() {
        let log: Log = Rc::default();
        let limits = ExecutionLimits { max_statements: 10, ..ExecutionLimits::default() };
        let interpreter = make_interpreter(limits, &log);
        let err = interpreter.run("%forever emit x").err().unwrap();
        assert!(err.to_string().contains("Exceeded maximum statement limit of 10."));
        assert_eq!(log.borrow().len(), 11);
    }

    #[test]
    fn test_stack_is_unwound_after_error() {
        let log: Log = Rc::default();
        let interpreter = make_interpreter(ExecutionLimits::default(), &log);
        let mut ctx = InterpreterContext::new();
        assert!(interpreter.run_with_context("%twice { emit $nope }", &mut ctx).is_err());
        assert_eq!(ctx.call_depth(), 0);
        assert!(interpreter.run_with_context("emit ok", &mut ctx).is_ok());
        assert_eq!(*log.borrow(), vec!["ok"]);
    }

    #[test]
    fn test_run_statement_keeps_context() {
        let log: Log = Rc::default();
        let interpreter = make_interpreter(ExecutionLimits::default(), &log);
        let mut ctx = InterpreterContext::new();
        interpreter.run_statement("set v kept", &mut ctx).unwrap();
        interpreter.run_statement("emit $v", &mut ctx).unwrap();
        assert_eq!(*log.borrow(), vec!["kept"]);
    }

    #[test]
    fn test_consume_rest_trigger_applies_to_runs() {
        let log: Log = Rc::default();
        let mut interpreter = build_interpreter(ExecutionLimits::default(), &log);
        interpreter.add_consume_rest_trigger("emit", 1);
        let interpreter = Rc::new(interpreter);

        let mut ctx = InterpreterContext::new();
        interpreter
            .run_with_context("set x 1\nemit $x $x  \"not\" quoted\nemit a", &mut ctx)
            .unwrap();
        interpreter.run_statement("emit b c d", &mut ctx).unwrap();
        assert_eq!(*log.borrow(), vec!["1|$x  \"not\" quoted", "a", "b|c d"]);

        let dump = interpreter.test_parse("emit a b c").unwrap();
        assert!(dump.contains("STRING_LITERAL:'b c'"));
    }

    #[test]
    fn test_test_parse_dumps_tree() {
        let dump = Interpreter::default().test_parse("emit a").unwrap();
        assert!(dump.contains("\"_type\": \"ROOT\""));
        assert!(dump.contains("\"_type\": \"COMMAND_CALL\""));
    }
}
