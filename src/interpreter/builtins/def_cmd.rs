//! def - Define a call from script code
//!
//! `%def(name params...) body` registers `name` with the context's runtime
//! call handlers. A body that contains a `return` command anywhere becomes an
//! expansion (`$(name ...)`), any other body becomes a command. Defining a
//! name removes any earlier definition of the other kind.

use crate::ast::types::{AstNode, AstNodeType};
use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::datatypes::require_arg_length;

pub fn handle_def(context: &mut InterpreterContext) -> Result<(), InterpreterError> {
    require_arg_length(context, 1)?;
    let args = context.args()?.to_vec();
    let (name, params) = (&args[0], &args[1..]);
    let body = context.control_node()?;

    let commands = context.runtime_command_calls();
    let expansions = context.runtime_expansion_calls();
    if contains_return(&body) {
        expansions.define(name, body, params);
        commands.undefine(name);
    } else {
        commands.define(name, body, params);
        expansions.undefine(name);
    }
    Ok(())
}

fn is_return_call(node: &AstNode) -> bool {
    node.node_type == AstNodeType::CommandCall
        && node
            .child(0)
            .is_some_and(|name| name.node_type == AstNodeType::String && name.str_content().is_ok_and(|s| s == "return"))
}

fn contains_return(body: &AstNode) -> bool {
    !body.find_all(&is_return_call).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::builtins::testing::run_script;
    use crate::parser::parse_one;

    #[test]
    fn test_contains_return() {
        assert!(contains_return(&parse_one("{ print a; %if($x) { return 1 } }").unwrap()));
        assert!(!contains_return(&parse_one("{ print return; set x $(return) }").unwrap()));
    }

    #[test]
    fn test_define_command() {
        let script = r#"
%def(greet who) print hello $who
greet world
"#;
        let (result, out) = run_script(script);
        assert!(result.is_ok());
        assert_eq!(out, "hello world\n");
    }

    #[test]
    fn test_collecting_parameter() {
        let script = r#"
%def(show x *rest) {
    print x is $x
    %for(r in $*rest) print rest $r
}
show 10 foo bar
show 11
"#;
        let (result, out) = run_script(script);
        assert!(result.is_ok());
        assert_eq!(out, "x is 10\nrest foo\nrest bar\nx is 11\n");
    }

    #[test]
    fn test_recursion() {
        let script = r#"
%def(fact n) {
    %if($(<= $n 1)) return 1
    return $(* $n $(fact $(- $n 1)))
}
print $(fact 10)
"#;
        let (result, out) = run_script(script);
        assert!(result.is_ok());
        assert_eq!(out, "3628800\n");
    }

    #[test]
    fn test_redefine_switches_kind() {
        let script = r#"
%def(f) return one
%def(f) print two
f
print $(f)
"#;
        let (result, out) = run_script(script);
        assert_eq!(out, "two\n");
        assert!(result.unwrap_err().to_string().contains("unknown expansion \"f\""));
    }

    #[test]
    fn test_arity() {
        let (result, _) = run_script("%def(f a b) print $a\nf 1");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("f: Invalid # of arguments (expected 2)"));
    }

    #[test]
    fn test_locals_do_not_leak() {
        let (result, out) = run_script("%def(f a) set b $a\nf 1\nprint $b");
        assert_eq!(out, "");
        assert!(result.unwrap_err().to_string().contains("No such variable b."));
    }
}
