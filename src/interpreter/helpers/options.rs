//! Typed call arguments.
//!
//! A `Signature` lists the options a call takes. `convert` turns the current
//! call's string arguments into typed values and reports a failure against
//! the argument that caused it.
//!
//! ```text
//! getc s i      -> [Str, Int]
//! tell who *msg -> [Str, Str(consume rest)]
//! ```

use thiserror::Error;

use crate::interpreter::context::InterpreterContext;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::execution_engine::Interpreter;
use crate::interpreter::helpers::datatypes::{str_to_bool, str_to_numeric, Number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Str,
    Int,
    Float,
    /// Int or float, whichever the argument is
    Number,
    Bool,
}

/// How many arguments an option takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionModifier {
    /// Exactly one.
    #[default]
    None,
    /// As many as convert, stopping at the first that does not.
    Greedy,
    /// All remaining arguments joined by spaces. Must be the last option and
    /// of type `Str`.
    ConsumeRest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<OptionValue>),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Int(i) => Some(*i as f64),
            OptionValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[OptionValue]> {
        match self {
            OptionValue::List(items) => Some(items),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptionError {
    #[error("{0}")]
    Conversion(String),
    #[error("{}", range_message(*.low, *.high))]
    RangeLimit { low: Option<f64>, value: f64, high: Option<f64> },
    #[error("has bad value '{bad}', must be one of {}", .choices.join(", "))]
    Choice { bad: String, choices: Vec<String> },
    #[error("is a required argument that is missing")]
    RequiredMissing,
}

fn range_message(low: Option<f64>, high: Option<f64>) -> String {
    match (low, high) {
        (Some(low), None) => format!("cannot go below {}", low),
        (None, Some(high)) => format!("cannot exceed {}", high),
        (Some(low), Some(high)) => format!("must be between {} and {}", low, high),
        (None, None) => "is out of range".to_string(),
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("option \"{0}\" follows a consume-rest option")]
    AfterConsumeRest(String),
    #[error("consume-rest option \"{0}\" must be a string")]
    ConsumeRestNotStr(String),
}

#[derive(Debug, Clone)]
pub struct ArgOption {
    pub name: String,
    pub option_type: OptionType,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// Used when the argument is absent. An option with a default is optional.
    pub default: Option<OptionValue>,
    pub modifier: OptionModifier,
    pub choices: Vec<String>,
}

impl ArgOption {
    pub fn new(name: &str, option_type: OptionType) -> Self {
        Self {
            name: name.to_string(),
            option_type,
            minimum: None,
            maximum: None,
            default: None,
            modifier: OptionModifier::None,
            choices: Vec::new(),
        }
    }

    pub fn min(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn max(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn default_value(mut self, value: OptionValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn greedy(mut self) -> Self {
        self.modifier = OptionModifier::Greedy;
        self
    }

    pub fn consume_rest(mut self) -> Self {
        self.modifier = OptionModifier::ConsumeRest;
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Convert one argument, then check range and choices.
    pub fn convert_arg(&self, arg: &str) -> Result<OptionValue, OptionError> {
        let value = match self.option_type {
            OptionType::Str => OptionValue::Str(arg.to_string()),
            OptionType::Bool => OptionValue::Bool(str_to_bool(arg)),
            OptionType::Int => match str_to_numeric(arg) {
                Some(Number::Int(i)) => OptionValue::Int(i),
                _ => return Err(OptionError::Conversion(format!("'{}' is not a valid integer", arg))),
            },
            OptionType::Float => match str_to_numeric(arg) {
                Some(n) => OptionValue::Float(n.as_f64()),
                None => return Err(OptionError::Conversion(format!("'{}' is not a valid number", arg))),
            },
            OptionType::Number => match str_to_numeric(arg) {
                Some(Number::Int(i)) => OptionValue::Int(i),
                Some(Number::Float(f)) => OptionValue::Float(f),
                None => return Err(OptionError::Conversion(format!("'{}' is not a valid int or float", arg))),
            },
        };

        if let Some(n) = value.as_f64() {
            let below = self.minimum.is_some_and(|low| n < low);
            let above = self.maximum.is_some_and(|high| n > high);
            if below || above {
                return Err(OptionError::RangeLimit {
                    low: self.minimum,
                    value: n,
                    high: self.maximum,
                });
            }
        }

        if !self.choices.is_empty() && !self.choices.iter().any(|c| c == arg) {
            return Err(OptionError::Choice {
                bad: arg.to_string(),
                choices: self.choices.clone(),
            });
        }

        Ok(value)
    }

    /// Take this option's arguments from the front of `args`. Returns the
    /// values and how many arguments were used, or the error with the offset
    /// of the argument that caused it.
    fn consume(&self, args: &[String]) -> Result<(Vec<OptionValue>, usize), (OptionError, usize)> {
        if args.is_empty() {
            return match &self.default {
                Some(default) => Ok((vec![default.clone()], 0)),
                None => Err((OptionError::RequiredMissing, 0)),
            };
        }

        let mut values = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            match self.convert_arg(arg) {
                Ok(value) if self.modifier == OptionModifier::None => return Ok((vec![value], 1)),
                Ok(value) => values.push(value),
                Err(e) if self.modifier == OptionModifier::None => return Err((e, i)),
                Err(_) => return Ok((values, i)),
            }
        }
        let used = values.len();
        Ok((values, used))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Signature {
    options: Vec<ArgOption>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option(mut self, option: ArgOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn options(&self) -> &[ArgOption] {
        &self.options
    }

    pub fn validate(&self) -> Result<(), SignatureError> {
        for (i, option) in self.options.iter().enumerate() {
            if option.modifier != OptionModifier::ConsumeRest {
                continue;
            }
            if option.option_type != OptionType::Str {
                return Err(SignatureError::ConsumeRestNotStr(option.name.clone()));
            }
            if let Some(next) = self.options.get(i + 1) {
                return Err(SignatureError::AfterConsumeRest(next.name.clone()));
            }
        }
        Ok(())
    }

    /// Ordinary options before a trailing consume-rest option, if there is one.
    pub fn consume_rest_count(&self) -> Option<usize> {
        match self.options.last() {
            Some(last) if last.modifier == OptionModifier::ConsumeRest => Some(self.options.len() - 1),
            _ => None,
        }
    }

    /// Register consume-rest triggers for `names` so their line tails reach
    /// the call as one argument.
    pub fn register_triggers(&self, interpreter: &mut Interpreter, names: &[&str]) {
        if let Some(count) = self.consume_rest_count() {
            for name in names {
                interpreter.add_consume_rest_trigger(name, count);
            }
        }
    }

    /// Convert the current call's arguments. Single-argument options give a
    /// plain value, greedy ones a `List`.
    pub fn convert(&self, context: &InterpreterContext) -> Result<Vec<OptionValue>, InterpreterError> {
        self.validate().map_err(|e| context.internal_error(e.to_string()))?;

        let args = context.args()?;
        let mut converted = Vec::with_capacity(self.options.len());
        let mut idx = 0;

        for option in &self.options {
            let rest = args.get(idx..).unwrap_or_default();

            if option.modifier == OptionModifier::ConsumeRest {
                if rest.is_empty() {
                    return Err(missing(context, option, idx));
                }
                converted.push(OptionValue::Str(rest.join(" ")));
                break;
            }

            let (mut values, used) = match option.consume(rest) {
                Ok(found) => found,
                Err((OptionError::RequiredMissing, _)) => return Err(missing(context, option, idx)),
                Err((e, offset)) => {
                    return Err(context.error_at_arg(idx + offset, format!("{}: {}", option.name, e)));
                }
            };
            tracing::trace!(option = %option.name, used, "converted option");

            let value = if option.modifier == OptionModifier::Greedy || values.len() != 1 {
                OptionValue::List(values)
            } else {
                values.remove(0)
            };
            converted.push(value);
            idx += used;
        }

        Ok(converted)
    }
}

fn missing(context: &InterpreterContext, option: &ArgOption, idx: usize) -> InterpreterError {
    context.error_at_arg(idx, format!("{} {}", option.name, OptionError::RequiredMissing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::types::ArgSourceMap;

    fn context_with_args(args: &[&str]) -> InterpreterContext {
        let mut ctx = InterpreterContext::new();
        ctx.set_base_call();
        ctx.push_call().unwrap();
        ctx.set_call(
            "f",
            args.iter().map(|a| a.to_string()).collect(),
            ArgSourceMap::new(),
            None,
        );
        ctx
    }

    #[test]
    fn test_convert_typed_options() {
        let signature = Signature::new()
            .option(ArgOption::new("name", OptionType::Str))
            .option(ArgOption::new("count", OptionType::Int).min(0.0))
            .option(ArgOption::new("scale", OptionType::Float).default_value(OptionValue::Float(1.0)));

        let values = signature.convert(&context_with_args(&["x", "3"])).unwrap();
        assert_eq!(
            values,
            vec![OptionValue::Str("x".into()), OptionValue::Int(3), OptionValue::Float(1.0)]
        );

        let values = signature.convert(&context_with_args(&["x", "3", "2"])).unwrap();
        assert_eq!(values[2], OptionValue::Float(2.0));
    }

    #[test]
    fn test_option_errors() {
        let signature = Signature::new().option(ArgOption::new("count", OptionType::Int).min(1.0).max(5.0));
        let err = signature.convert(&context_with_args(&["9"])).unwrap_err();
        assert_eq!(err.message(), "count: must be between 1 and 5");
        let err = signature.convert(&context_with_args(&["x"])).unwrap_err();
        assert_eq!(err.message(), "count: 'x' is not a valid integer");
        let err = signature.convert(&context_with_args(&[])).unwrap_err();
        assert_eq!(err.message(), "count is a required argument that is missing");

        let mode = Signature::new().option(ArgOption::new("mode", OptionType::Str).choices(&["r", "w"]));
        let err = mode.convert(&context_with_args(&["q"])).unwrap_err();
        assert_eq!(err.message(), "mode: has bad value 'q', must be one of r, w");
    }

    #[test]
    fn test_greedy_stops_at_first_failure() {
        let signature = Signature::new()
            .option(ArgOption::new("nums", OptionType::Number).greedy())
            .option(ArgOption::new("label", OptionType::Str));
        let values = signature.convert(&context_with_args(&["1", "2.5", "end"])).unwrap();
        assert_eq!(
            values,
            vec![
                OptionValue::List(vec![OptionValue::Int(1), OptionValue::Float(2.5)]),
                OptionValue::Str("end".into()),
            ]
        );
    }

    #[test]
    fn test_consume_rest() {
        let signature = Signature::new()
            .option(ArgOption::new("who", OptionType::Str))
            .option(ArgOption::new("message", OptionType::Str).consume_rest());
        assert_eq!(signature.consume_rest_count(), Some(1));

        let values = signature.convert(&context_with_args(&["bob", "hi", "there"])).unwrap();
        assert_eq!(values[1], OptionValue::Str("hi there".into()));

        let err = signature.convert(&context_with_args(&["bob"])).unwrap_err();
        assert_eq!(err.message(), "message is a required argument that is missing");

        let mut interpreter = Interpreter::default();
        signature.register_triggers(&mut interpreter, &["tell", "t"]);
        assert_eq!(interpreter.consume_rest_triggers().get("t"), Some(&1));
    }

    #[test]
    fn test_invalid_signatures() {
        let bad_type = Signature::new().option(ArgOption::new("n", OptionType::Int).consume_rest());
        assert_eq!(bad_type.validate(), Err(SignatureError::ConsumeRestNotStr("n".into())));

        let trailing = Signature::new()
            .option(ArgOption::new("a", OptionType::Str).consume_rest())
            .option(ArgOption::new("b", OptionType::Str));
        assert_eq!(trailing.validate(), Err(SignatureError::AfterConsumeRest("b".into())));
        assert_eq!(trailing.consume_rest_count(), None);
        assert!(trailing.convert(&context_with_args(&["x"])).is_err());
    }
}
