//! Interpreter Types
//!
//! Type definitions for the interpreter state: call frames, variable
//! scopes and execution limits.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::types::AstNode;

/// Maps argument indices to the tree node that produced them.
///
/// A single node can produce several arguments (a spread expansion), so the
/// map records one entry per produced argument.
#[derive(Debug, Clone, Default)]
pub struct ArgSourceMap {
    sources: BTreeMap<usize, Rc<AstNode>>,
    count: usize,
}

impl ArgSourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the next `count` arguments came from `source`.
    pub fn add_args(&mut self, count: usize, source: &Rc<AstNode>) {
        for i in 0..count {
            self.sources.insert(self.count + i, Rc::clone(source));
        }
        self.count += count;
    }

    pub fn get(&self, index: usize) -> Option<&Rc<AstNode>> {
        self.sources.get(&index)
    }

    /// Total number of arguments recorded so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Everything needed to run one call. Control calls are calls too, but they
/// do not get a variable scope of their own.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub call_name: String,
    pub args: Vec<String>,
    pub arg_nodes: ArgSourceMap,
    /// The statement a control call governs
    pub control_node: Option<Rc<AstNode>>,
    /// Set by `return` inside a runtime-defined call
    pub return_value: Option<String>,
    /// Defined by the script at runtime (`%def`)
    pub runtime_call: bool,
    /// Read by `%elif`/`%else`. Set on the parent frame by `%if`/`%elif`.
    pub else_signal: bool,
}

const TRACE_ID_TITLE: &str = "ID";

impl CallContext {
    pub fn new(
        call_name: impl Into<String>,
        args: Vec<String>,
        arg_nodes: ArgSourceMap,
        control_node: Option<Rc<AstNode>>,
    ) -> Self {
        Self {
            call_name: call_name.into(),
            args,
            arg_nodes,
            control_node,
            ..Self::default()
        }
    }

    fn id_width(id_size: usize) -> usize {
        id_size.max(TRACE_ID_TITLE.len())
    }

    /// Header line for a backtrace listing.
    pub fn trace_banner(id_size: usize) -> String {
        format!(
            "{:<width$} {:<5} {}",
            TRACE_ID_TITLE,
            "FLAGS",
            "NAME+ARGS",
            width = Self::id_width(id_size)
        )
    }

    pub fn trace_str(&self, id: usize, id_size: usize) -> String {
        format!("{:<width$} {}", id, self, width = Self::id_width(id_size))
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags: String = [
            if self.control_node.is_some() { '!' } else { '-' },
            if self.else_signal { 'e' } else { '-' },
            if self.runtime_call { 'r' } else { '-' },
        ]
        .iter()
        .collect();

        let name_and_args: Vec<String> = std::iter::once(&self.call_name)
            .chain(self.args.iter())
            .map(|s| format!("\"{}\"", s))
            .collect();

        write!(f, "{:<5} {}", flags, name_and_args.join(" "))
    }
}

// =============================================================================
// VARIABLE SCOPES
// =============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("There must be at least one scope.")]
    LastScope,
    #[error("no such variable {0}")]
    NoSuchVariable(String),
}

#[derive(Debug, Clone, Default)]
pub struct VarScope {
    pub vars: HashMap<String, String>,
    /// Names that read and write the enclosing scope
    pub nonlocals: HashSet<String>,
    /// Names that read and write the global scope
    pub globals: HashSet<String>,
}

/// A stack of variable scopes. Index 0 is the global scope and always exists.
#[derive(Debug, Clone)]
pub struct ScopedVarStore {
    scopes: Vec<VarScope>,
}

impl Default for ScopedVarStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopedVarStore {
    pub fn new() -> Self {
        Self {
            scopes: vec![VarScope::default()],
        }
    }

    pub fn new_scope(&mut self) {
        self.scopes.push(VarScope::default());
    }

    pub fn destroy_scope(&mut self) -> Result<(), ScopeError> {
        if self.scopes.len() == 1 {
            return Err(ScopeError::LastScope);
        }
        self.scopes.pop();
        Ok(())
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn current_scope(&self) -> &VarScope {
        &self.scopes[self.scopes.len() - 1]
    }

    fn current_index(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn declare_nonlocal(&mut self, name: &str) {
        let idx = self.current_index();
        self.scopes[idx].nonlocals.insert(name.to_string());
    }

    pub fn declare_global(&mut self, name: &str) {
        let idx = self.current_index();
        self.scopes[idx].globals.insert(name.to_string());
    }

    /// Walk down the stack following nonlocal/global declarations.
    ///
    /// A read search falls back to the global scope when the scope it lands
    /// on does not define the name, and fails if neither does.
    fn search_scope(&self, name: &str, read_search: bool) -> Option<usize> {
        let mut idx = self.current_index();

        loop {
            let scope = &self.scopes[idx];
            if scope.globals.contains(name) {
                return Some(0);
            }
            if scope.nonlocals.contains(name) && idx > 0 {
                idx -= 1;
                continue;
            }
            break;
        }

        if !read_search {
            return Some(idx);
        }

        if self.scopes[idx].vars.contains_key(name) {
            Some(idx)
        } else if idx > 0 && self.scopes[0].vars.contains_key(name) {
            Some(0)
        } else {
            None
        }
    }

    /// Scope a read of `name` resolves to, if any scope defines it.
    pub fn get_scope_for_read(&self, name: &str) -> Option<&VarScope> {
        self.search_scope(name, true).map(|idx| &self.scopes[idx])
    }

    /// Scope a write of `name` lands in.
    pub fn get_scope_for_write(&mut self, name: &str) -> &mut VarScope {
        let idx = self.search_scope(name, false).unwrap_or(0);
        &mut self.scopes[idx]
    }

    pub fn get_var(&self, name: &str) -> Option<&String> {
        self.get_scope_for_read(name)?.vars.get(name)
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.get_var(name).is_some()
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<String>) {
        self.get_scope_for_write(name).vars.insert(name.to_string(), value.into());
    }

    /// Delete a variable. The write scope is tried first, then the current one.
    pub fn del_var(&mut self, name: &str) -> Result<(), ScopeError> {
        if self.get_scope_for_write(name).vars.remove(name).is_some() {
            return Ok(());
        }
        let current = self.current_index();
        if self.scopes[current].vars.remove(name).is_some() {
            return Ok(());
        }
        Err(ScopeError::NoSuchVariable(name.to_string()))
    }
}

// =============================================================================
// LIMITS
// =============================================================================

/// Execution limits to guard runaway scripts
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Maximum number of statements to execute. 0 means unlimited.
    pub max_statements: u64,
    /// Maximum depth of the call stack. 0 means unlimited.
    pub max_call_depth: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_statements: 0,
            max_call_depth: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_scope_always_present() {
        let mut store = ScopedVarStore::new();
        assert_eq!(store.destroy_scope(), Err(ScopeError::LastScope));
        store.new_scope();
        assert!(store.destroy_scope().is_ok());
        assert_eq!(store.scope_count(), 1);
    }

    #[test]
    fn test_local_shadows_and_reads_fall_back_to_global() {
        let mut store = ScopedVarStore::new();
        store.set_var("g", "global");
        store.set_var("x", "outer");
        store.new_scope();
        store.set_var("x", "inner");
        assert_eq!(store.get_var("x").unwrap(), "inner");
        assert_eq!(store.get_var("g").unwrap(), "global");
        store.destroy_scope().unwrap();
        assert_eq!(store.get_var("x").unwrap(), "outer");
    }

    #[test]
    fn test_middle_scope_not_visible_without_nonlocal() {
        let mut store = ScopedVarStore::new();
        store.new_scope();
        store.set_var("m", "middle");
        store.new_scope();
        assert!(store.get_var("m").is_none());
        store.declare_nonlocal("m");
        assert_eq!(store.get_var("m").unwrap(), "middle");
        store.set_var("m", "changed");
        store.destroy_scope().unwrap();
        assert_eq!(store.get_var("m").unwrap(), "changed");
    }

    #[test]
    fn test_read_and_write_scopes_differ_for_undeclared_names() {
        let mut store = ScopedVarStore::new();
        store.set_var("g", "1");
        store.new_scope();
        assert!(store.get_scope_for_read("g").unwrap().vars.contains_key("g"));
        assert!(!store.get_scope_for_write("g").vars.contains_key("g"));
        assert!(store.get_scope_for_read("nope").is_none());
    }

    #[test]
    fn test_global_declaration_writes_global_scope() {
        let mut store = ScopedVarStore::new();
        store.new_scope();
        store.new_scope();
        store.declare_global("count");
        store.set_var("count", "3");
        store.destroy_scope().unwrap();
        store.destroy_scope().unwrap();
        assert_eq!(store.get_var("count").unwrap(), "3");
    }

    #[test]
    fn test_del_var() {
        let mut store = ScopedVarStore::new();
        store.set_var("a", "1");
        assert!(store.del_var("a").is_ok());
        assert!(!store.has_var("a"));
        assert_eq!(
            store.del_var("a"),
            Err(ScopeError::NoSuchVariable("a".to_string()))
        );
    }

    #[test]
    fn test_arg_source_map_counts_per_argument() {
        let node = Rc::new(AstNode::new(crate::ast::types::AstNodeType::String, None));
        let other = Rc::new(AstNode::new(crate::ast::types::AstNodeType::Expansion, None));
        let mut map = ArgSourceMap::new();
        map.add_args(1, &node);
        map.add_args(3, &other);
        map.add_args(0, &node);
        assert_eq!(map.len(), 4);
        assert!(Rc::ptr_eq(map.get(0).unwrap(), &node));
        assert!(Rc::ptr_eq(map.get(3).unwrap(), &other));
        assert!(map.get(4).is_none());
    }

    #[test]
    fn test_trace_format() {
        let mut call = CallContext::new("print", vec!["a b".to_string()], ArgSourceMap::new(), None);
        call.runtime_call = true;
        assert_eq!(CallContext::trace_banner(1), "ID FLAGS NAME+ARGS");
        assert_eq!(call.trace_str(0, 1), "0  --r   \"print\" \"a b\"");
    }
}
