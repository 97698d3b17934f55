//! Datatype helpers for call handlers.
//!
//! Scrolls values are strings. Builtins that need numbers or booleans go
//! through this module so conversions and errors stay uniform:
//! - `"0"` is false, every other string is true
//! - integers stay integers until a float joins the calculation
//! - integer division and modulo round toward negative infinity

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;

pub const TRUE: &str = "1";
pub const FALSE: &str = "0";

pub fn str_to_bool(s: &str) -> bool {
    s != FALSE
}

pub fn bool_to_str(b: bool) -> &'static str {
    if b {
        TRUE
    } else {
        FALSE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericType {
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NumericError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("math domain error")]
    Domain,
    #[error("cannot convert {0} to integer")]
    NotFinite(String),
}

pub type NumResult = Result<Number, NumericError>;
pub type UnaryNumOp = fn(Number) -> NumResult;
pub type BinaryNumOp = fn(Number, Number) -> NumResult;

impl Number {
    pub fn numeric_type(&self) -> NumericType {
        match self {
            Number::Int(_) => NumericType::Int,
            Number::Float(_) => NumericType::Float,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn to_float(self) -> Number {
        Number::Float(self.as_f64())
    }

    /// Truncate toward zero.
    pub fn to_int(self) -> NumResult {
        match self {
            Number::Int(_) => Ok(self),
            Number::Float(f) => float_to_int(f.trunc()),
        }
    }

    /// Partial order across both representations. NaN compares with nothing.
    pub fn compare(&self, other: &Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => f.write_str(&format_float(*x)),
        }
    }
}

/// Floats always show a fractional part: `3.0`, not `3`.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        (if x > 0.0 { "inf" } else { "-inf" }).to_string()
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

fn float_to_int(f: f64) -> NumResult {
    if !f.is_finite() {
        return Err(NumericError::NotFinite(format_float(f)));
    }
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(NumericError::Overflow);
    }
    Ok(Number::Int(f as i64))
}

pub fn str_to_numeric(s: &str) -> Option<Number> {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Number::Int(i));
    }
    trimmed.parse::<f64>().ok().map(Number::Float)
}

// =============================================================================
// ARGUMENT CHECKS
// =============================================================================

fn call_name(context: &InterpreterContext) -> String {
    context.call_name().unwrap_or("<unknown>").to_string()
}

pub fn require_arg_length(context: &InterpreterContext, n: usize) -> Result<(), InterpreterError> {
    if context.args()?.len() < n {
        return Err(context.error(format!(
            "{} requires at least {} argument{}",
            call_name(context),
            n,
            if n == 1 { "" } else { "s" }
        )));
    }
    Ok(())
}

pub fn require_numeric(context: &InterpreterContext, s: &str) -> Result<Number, InterpreterError> {
    str_to_numeric(s).ok_or_else(|| context.error(not_numeric(context, s)))
}

/// Argument `index` of the current call as a number. Errors point at the
/// argument, not the call.
pub fn require_numeric_arg(context: &InterpreterContext, index: usize) -> Result<Number, InterpreterError> {
    require_arg_length(context, index + 1)?;
    let s = &context.args()?[index];
    str_to_numeric(s).ok_or_else(|| context.error_at_arg(index, not_numeric(context, s)))
}

fn not_numeric(context: &InterpreterContext, s: &str) -> String {
    format!("{}: {} is not a valid int or float", call_name(context), s)
}

/// Parse every string as a number. If any is a float, all come back as floats.
///
/// `strs[i]` is argument `first_arg + i` of the current call, which is where
/// a conversion error points.
pub fn require_all_numeric(
    context: &InterpreterContext,
    first_arg: usize,
    strs: &[String],
) -> Result<Vec<Number>, InterpreterError> {
    let nums = strs
        .iter()
        .enumerate()
        .map(|(i, s)| str_to_numeric(s).ok_or_else(|| context.error_at_arg(first_arg + i, not_numeric(context, s))))
        .collect::<Result<Vec<_>, _>>()?;
    if nums.iter().any(|n| n.numeric_type() == NumericType::Float) {
        Ok(nums.into_iter().map(Number::to_float).collect())
    } else {
        Ok(nums)
    }
}

/// Report a numeric failure against the current call.
pub fn numeric_error(context: &InterpreterContext, err: NumericError) -> InterpreterError {
    context.error(format!("{}: {}", call_name(context), err))
}

// =============================================================================
// NUMERIC OPERATORS
// =============================================================================

fn both_int(a: Number, b: Number) -> Option<(i64, i64)> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Some((x, y)),
        _ => None,
    }
}

pub fn add(a: Number, b: Number) -> NumResult {
    match both_int(a, b) {
        Some((x, y)) => x.checked_add(y).map(Number::Int).ok_or(NumericError::Overflow),
        None => Ok(Number::Float(a.as_f64() + b.as_f64())),
    }
}

pub fn sub(a: Number, b: Number) -> NumResult {
    match both_int(a, b) {
        Some((x, y)) => x.checked_sub(y).map(Number::Int).ok_or(NumericError::Overflow),
        None => Ok(Number::Float(a.as_f64() - b.as_f64())),
    }
}

pub fn mul(a: Number, b: Number) -> NumResult {
    match both_int(a, b) {
        Some((x, y)) => x.checked_mul(y).map(Number::Int).ok_or(NumericError::Overflow),
        None => Ok(Number::Float(a.as_f64() * b.as_f64())),
    }
}

/// `/` always produces a float.
pub fn true_div(a: Number, b: Number) -> NumResult {
    if b.as_f64() == 0.0 {
        return Err(NumericError::DivisionByZero);
    }
    Ok(Number::Float(a.as_f64() / b.as_f64()))
}

pub fn floor_div(a: Number, b: Number) -> NumResult {
    match both_int(a, b) {
        Some((_, 0)) => Err(NumericError::DivisionByZero),
        Some((x, y)) => {
            let q = x.checked_div(y).ok_or(NumericError::Overflow)?;
            if x % y != 0 && ((x < 0) != (y < 0)) {
                Ok(Number::Int(q - 1))
            } else {
                Ok(Number::Int(q))
            }
        }
        None => {
            let (x, y) = (a.as_f64(), b.as_f64());
            if y == 0.0 {
                return Err(NumericError::DivisionByZero);
            }
            Ok(Number::Float((x / y).floor()))
        }
    }
}

/// Remainder with the sign of the divisor.
pub fn modulo(a: Number, b: Number) -> NumResult {
    match both_int(a, b) {
        Some((_, 0)) => Err(NumericError::DivisionByZero),
        Some((_, -1)) => Ok(Number::Int(0)),
        Some((x, y)) => {
            let r = x.checked_rem(y).ok_or(NumericError::Overflow)?;
            if r != 0 && ((r < 0) != (y < 0)) {
                Ok(Number::Int(r + y))
            } else {
                Ok(Number::Int(r))
            }
        }
        None => {
            let (x, y) = (a.as_f64(), b.as_f64());
            if y == 0.0 {
                return Err(NumericError::DivisionByZero);
            }
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                Ok(Number::Float(r + y))
            } else {
                Ok(Number::Float(r))
            }
        }
    }
}

pub fn pow(a: Number, b: Number) -> NumResult {
    if let Some((x, y)) = both_int(a, b) {
        if y >= 0 {
            match x {
                1 => return Ok(Number::Int(1)),
                0 => return Ok(Number::Int(if y == 0 { 1 } else { 0 })),
                -1 => return Ok(Number::Int(if y % 2 == 0 { 1 } else { -1 })),
                _ => {}
            }
            let exp = u32::try_from(y).map_err(|_| NumericError::Overflow)?;
            return x.checked_pow(exp).map(Number::Int).ok_or(NumericError::Overflow);
        }
        if x == 0 {
            return Err(NumericError::DivisionByZero);
        }
    }
    let (x, y) = (a.as_f64(), b.as_f64());
    if x == 0.0 && y < 0.0 {
        return Err(NumericError::DivisionByZero);
    }
    let out = x.powf(y);
    if out.is_nan() && !x.is_nan() && !y.is_nan() {
        return Err(NumericError::Domain);
    }
    Ok(Number::Float(out))
}

pub fn neg(a: Number) -> NumResult {
    match a {
        Number::Int(x) => x.checked_neg().map(Number::Int).ok_or(NumericError::Overflow),
        Number::Float(x) => Ok(Number::Float(-x)),
    }
}

pub fn sqrt(a: Number) -> NumResult {
    let x = a.as_f64();
    if x < 0.0 {
        return Err(NumericError::Domain);
    }
    Ok(Number::Float(x.sqrt()))
}

pub fn floor(a: Number) -> NumResult {
    match a {
        Number::Int(_) => Ok(a),
        Number::Float(x) => float_to_int(x.floor()),
    }
}

pub fn ceil(a: Number) -> NumResult {
    match a {
        Number::Int(_) => Ok(a),
        Number::Float(x) => float_to_int(x.ceil()),
    }
}

pub fn to_int(a: Number) -> NumResult {
    a.to_int()
}

pub fn to_float(a: Number) -> NumResult {
    Ok(a.to_float())
}

/// Round half to even, to an integer.
pub fn round_to_int(a: Number) -> NumResult {
    match a {
        Number::Int(_) => Ok(a),
        Number::Float(x) => float_to_int(x.round_ties_even()),
    }
}

/// Round half to even at `digits` decimal places.
pub fn round_to_digits(a: Number, digits: i32) -> NumResult {
    if let Number::Int(_) = a {
        if digits >= 0 {
            return Ok(a.to_float());
        }
    }
    let factor = 10f64.powi(digits);
    Ok(Number::Float((a.as_f64() * factor).round_ties_even() / factor))
}

// =============================================================================
// APPLYING OPERATORS TO CALL ARGUMENTS
// =============================================================================

pub fn apply_unary_num_op(context: &InterpreterContext, op: UnaryNumOp) -> Result<Number, InterpreterError> {
    let n = require_numeric_arg(context, 0)?;
    op(n).map_err(|e| numeric_error(context, e))
}

/// Exactly two arguments.
pub fn apply_binary_num_op(context: &InterpreterContext, op: BinaryNumOp) -> Result<Number, InterpreterError> {
    let args = context.args()?;
    if args.len() != 2 {
        return Err(context.error(format!("{}: must have exactly 2 args", call_name(context))));
    }
    let nums = require_all_numeric(context, 0, args)?;
    op(nums[0], nums[1]).map_err(|e| numeric_error(context, e))
}

/// Left fold: `((a op b) op c) ...` over the arguments from `first_arg` on.
pub fn apply_reduce_binary_num_op(
    context: &InterpreterContext,
    op: BinaryNumOp,
    first_arg: usize,
) -> Result<Number, InterpreterError> {
    let args = context.args()?.get(first_arg..).unwrap_or_default();
    if args.is_empty() {
        return Err(context.error(format!("{} requires at least 1 argument", call_name(context))));
    }
    let nums = require_all_numeric(context, first_arg, args)?;
    let mut acc = nums[0];
    for n in &nums[1..] {
        acc = op(acc, *n).map_err(|e| numeric_error(context, e))?;
    }
    Ok(acc)
}

/// `a final (b reduce c reduce d ...)`, as in `$(- 10 4 2 5)` = `10 - (4 + 2 + 5)`.
pub fn apply_mass_binary_num_op(
    context: &InterpreterContext,
    reduce_op: BinaryNumOp,
    final_op: BinaryNumOp,
) -> Result<Number, InterpreterError> {
    let args = context.args()?;
    if args.len() < 2 {
        return Err(context.error(format!("{} requires at least two arguments", call_name(context))));
    }
    if args.len() == 2 {
        return apply_binary_num_op(context, final_op);
    }

    let mut n1 = require_numeric_arg(context, 0)?;
    let mut n2 = apply_reduce_binary_num_op(context, reduce_op, 1)?;
    if n1.numeric_type() != n2.numeric_type() {
        n1 = n1.to_float();
        n2 = n2.to_float();
    }
    final_op(n1, n2).map_err(|e| numeric_error(context, e))
}

// =============================================================================
// BOOLEAN OPERATORS
// =============================================================================

pub fn apply_unary_bool_op(context: &InterpreterContext, op: fn(bool) -> bool) -> Result<bool, InterpreterError> {
    require_arg_length(context, 1)?;
    Ok(op(str_to_bool(&context.args()?[0])))
}

pub fn apply_binary_bool_op(context: &InterpreterContext, op: fn(bool, bool) -> bool) -> Result<bool, InterpreterError> {
    require_arg_length(context, 2)?;
    let args = context.args()?;
    Ok(op(str_to_bool(&args[0]), str_to_bool(&args[1])))
}

pub fn apply_reduce_bool_op(context: &InterpreterContext, op: fn(bool, bool) -> bool) -> Result<bool, InterpreterError> {
    require_arg_length(context, 1)?;
    let mut values = context.args()?.iter().map(|s| str_to_bool(s));
    let first = values.next().unwrap_or(false);
    Ok(values.fold(first, op))
}
