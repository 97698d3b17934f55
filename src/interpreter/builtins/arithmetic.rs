//! Arithmetic expansions: + - * / // % ** toint tofloat sqrt round floor ceil
//!
//! Integers stay integers until a float takes part. `/` always produces a
//! float, `//` and `%` round toward negative infinity.
//!
//! `-`, `/` and `//` take any number of arguments after the first:
//! `$(- 10 1 2 3)` is `10 - (1 + 2 + 3)` and `$(/ 60 2 3)` is `60 / (2 * 3)`.

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::datatypes::{
    self, apply_binary_num_op, apply_mass_binary_num_op, apply_reduce_binary_num_op, apply_unary_num_op,
    numeric_error, require_numeric_arg, BinaryNumOp, Number, UnaryNumOp,
};

fn unary(context: &InterpreterContext, op: UnaryNumOp) -> Result<String, InterpreterError> {
    Ok(apply_unary_num_op(context, op)?.to_string())
}

fn reduce(context: &InterpreterContext, op: BinaryNumOp) -> Result<String, InterpreterError> {
    Ok(apply_reduce_binary_num_op(context, op, 0)?.to_string())
}

fn mass(context: &InterpreterContext, reduce_op: BinaryNumOp, final_op: BinaryNumOp) -> Result<String, InterpreterError> {
    Ok(apply_mass_binary_num_op(context, reduce_op, final_op)?.to_string())
}

pub fn handle_toint(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    unary(context, datatypes::to_int)
}

pub fn handle_tofloat(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    unary(context, datatypes::to_float)
}

pub fn handle_add(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    reduce(context, datatypes::add)
}

/// With a single argument, `-` negates it.
pub fn handle_sub(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    if context.args()?.len() == 1 {
        return unary(context, datatypes::neg);
    }
    mass(context, datatypes::add, datatypes::sub)
}

pub fn handle_mul(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    reduce(context, datatypes::mul)
}

pub fn handle_div(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    mass(context, datatypes::mul, datatypes::true_div)
}

pub fn handle_floor_div(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    mass(context, datatypes::mul, datatypes::floor_div)
}

pub fn handle_mod(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    Ok(apply_binary_num_op(context, datatypes::modulo)?.to_string())
}

/// Successive powers: `$(** 2 3 2)` is `(2 ** 3) ** 2`.
pub fn handle_pow(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    reduce(context, datatypes::pow)
}

pub fn handle_sqrt(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    unary(context, datatypes::sqrt)
}

/// `round x` gives an integer, `round x digits` a float. Ties go to the even
/// neighbour.
pub fn handle_round(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    let x = require_numeric_arg(context, 0)?;

    let rounded = match context.args()?.get(1) {
        None => datatypes::round_to_int(x),
        Some(_) => {
            let digits = match require_numeric_arg(context, 1)?.to_int() {
                Ok(Number::Int(d)) => i32::try_from(d).unwrap_or(if d < 0 { i32::MIN } else { i32::MAX }),
                Ok(Number::Float(_)) => 0,
                Err(e) => return Err(numeric_error(context, e)),
            };
            datatypes::round_to_digits(x, digits)
        }
    };
    rounded.map(|n| n.to_string()).map_err(|e| numeric_error(context, e))
}

pub fn handle_floor(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    unary(context, datatypes::floor)
}

pub fn handle_ceil(context: &mut InterpreterContext) -> Result<String, InterpreterError> {
    unary(context, datatypes::ceil)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::builtins::testing::{error_position, eval, run_script};

    #[test]
    fn test_int_and_float_arithmetic() {
        assert_eq!(eval("+ 1 2 3"), "6");
        assert_eq!(eval("+ 1 2.5"), "3.5");
        assert_eq!(eval("* 2 3 4"), "24");
        assert_eq!(eval("* 2 1.5"), "3.0");
        assert_eq!(eval("- 10 1 2 3"), "4");
        assert_eq!(eval("- 5"), "-5");
        assert_eq!(eval("- 1.5 0.5"), "1.0");
    }

    #[test]
    fn test_division() {
        assert_eq!(eval("/ 7 2"), "3.5");
        assert_eq!(eval("/ 60 2 3"), "10.0");
        assert_eq!(eval("// 7 2"), "3");
        assert_eq!(eval("// -7 2"), "-4");
        assert_eq!(eval("// 7.0 2"), "3.0");
        assert_eq!(eval("% -7 3"), "2");
        assert_eq!(eval("% 7 -3"), "-2");
    }

    #[test]
    fn test_powers_and_roots() {
        assert_eq!(eval("** 2 10"), "1024");
        assert_eq!(eval("** 2 3 2"), "64");
        assert_eq!(eval("** 2 -1"), "0.5");
        assert_eq!(eval("sqrt 16"), "4.0");
    }

    #[test]
    fn test_conversions_and_rounding() {
        assert_eq!(eval("toint 3.9"), "3");
        assert_eq!(eval("toint -3.9"), "-3");
        assert_eq!(eval("tofloat 2"), "2.0");
        assert_eq!(eval("round 2.5"), "2");
        assert_eq!(eval("round 3.5"), "4");
        assert_eq!(eval("round 3.14159 2"), "3.14");
        assert_eq!(eval("floor -1.5"), "-2");
        assert_eq!(eval("ceil 1.2"), "2");
    }

    #[test]
    fn test_division_by_zero() {
        let (result, _) = run_script("print $(/ 1 0)");
        assert!(result.unwrap_err().to_string().contains("/: division by zero"));
        let (result, _) = run_script("print $(% 1 0)");
        assert!(result.unwrap_err().to_string().contains("%: division by zero"));
    }

    #[test]
    fn test_overflow() {
        let (result, _) = run_script("print $(* 9223372036854775807 2)");
        assert!(result.unwrap_err().to_string().contains("*: integer overflow"));
    }

    #[test]
    fn test_not_numeric_points_at_argument() {
        let (result, _) = run_script("print $(+ 1 two)");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("    print $(+ 1 two)\n                ^\n"));
        assert!(err.contains("+: two is not a valid int or float"));

        let (result, _) = run_script("set x 1\nprint $(- 10 3 $x nope 2)");
        assert_eq!(
            error_position(result),
            ("-: nope is not a valid int or float".to_string(), 2, 19)
        );
    }

    #[test]
    fn test_binary_ops_take_exactly_two() {
        let (result, _) = run_script("print $(% 7 2 9)");
        assert_eq!(error_position(result).0, "%: must have exactly 2 args");
        assert_eq!(eval("% 7 2"), "1");
    }

    #[test]
    fn test_trivial_bases_with_huge_exponents() {
        assert_eq!(eval("** 1 5000000000"), "1");
        assert_eq!(eval("** -1 5000000001"), "-1");
        assert_eq!(eval("% -9223372036854775808 -1"), "0");
    }

    #[test]
    fn test_argument_counts() {
        let (result, _) = run_script("print $(// 1)");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("// requires at least two arguments"));
        let (result, _) = run_script("print $(sqrt)");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("sqrt requires at least 1 argument"));
    }
}
