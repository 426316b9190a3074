//! The fixed set of functions and properties scripts can reach.
//!
//! Property lookups on a value go through [`get_property`] and
//! [`get_index`]. Methods are returned as bound [`Function::Method`] values
//! and dispatched by [`call_function`] on the receiver's type, so
//! `sel.trim` is a function value and `words.map(String)` works.

pub mod array;
pub mod global;
pub mod number;
pub mod regex;
pub mod string;

use super::{
    context::ExecutionContext,
    evaluator::{EvalError, EvalResult},
    value::{Function, Value},
};

pub fn get_property(target: &Value, name: &str) -> EvalResult<Value> {
    let method = |methods: &[&'static str]| {
        methods
            .iter()
            .find(|m| **m == name)
            .map(|m| {
                Value::Function(Function::Method {
                    receiver: Box::new(target.clone()),
                    name: *m,
                })
            })
            .unwrap_or_default()
    };

    Ok(match target {
        Value::Undefined | Value::Null => {
            return Err(EvalError::Type(format!(
                "Cannot read properties of {} (reading '{}')",
                target.to_js_string(),
                name
            )))
        }
        Value::String(s) if name == "length" => Value::from(s.chars().count()),
        Value::String(_) => method(string::METHODS),
        Value::Array(items) if name == "length" => Value::from(items.len()),
        Value::Array(_) => method(array::METHODS),
        Value::Number(_) => method(number::METHODS),
        Value::Boolean(_) => method(&["toString"]),
        Value::Regex(re) => match regex::get_property(re, name) {
            Some(value) => value,
            None => method(regex::METHODS),
        },
        Value::Namespace(namespace) => global::namespace_member(*namespace, name),
        Value::Inert | Value::Function(_) => Value::Undefined,
    })
}

/// `target[key]`
pub fn get_index(target: &Value, key: &Value) -> EvalResult<Value> {
    let index = match key {
        Value::Number(n) => Some(*n),
        Value::String(s) => canonical_index(s),
        _ => None,
    };

    match (target, index) {
        (Value::String(s), Some(i)) => Ok(as_index(i)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::from(c.to_string()))
            .unwrap_or_default()),
        (Value::Array(items), Some(i)) => Ok(as_index(i)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        _ => get_property(target, &key.to_js_string()),
    }
}

fn canonical_index(s: &str) -> Option<f64> {
    let n = s.parse::<u32>().ok()?;
    (n.to_string() == s).then_some(n as f64)
}

fn as_index(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0 && n < usize::MAX as f64).then_some(n as usize)
}

pub fn call_function(
    ctx: &mut ExecutionContext,
    function: &Function,
    args: Vec<Value>,
) -> EvalResult<Value> {
    match function {
        Function::Native(native) => global::call_native(ctx, *native, &args),
        Function::Method { receiver, name } => match receiver.as_ref() {
            Value::String(s) => string::call_method(ctx, s, name, &args),
            Value::Array(items) => array::call_method(ctx, items, name, &args),
            Value::Number(n) => number::call_method(*n, name, &args),
            Value::Boolean(b) if *name == "toString" => Ok(Value::from(b.to_string())),
            Value::Regex(re) => regex::call_method(ctx, re, name, &args),
            other => Err(EvalError::Type(format!(
                "{}.{} is not a function",
                other.type_of(),
                name
            ))),
        },
        Function::Lambda(lambda) => ctx.call_lambda(lambda, &args),
    }
}

/// Invokes a script-supplied callback such as the mapper of `map`.
pub fn call_callback(
    ctx: &mut ExecutionContext,
    callback: &Value,
    args: Vec<Value>,
) -> EvalResult<Value> {
    match callback {
        Value::Function(function) => call_function(ctx, function, args),
        other => Err(EvalError::Type(format!(
            "{} is not a function",
            other.to_js_string()
        ))),
    }
}

pub fn require_callback<'a>(args: &'a [Value], method: &str) -> EvalResult<&'a Value> {
    match args.first() {
        Some(callback @ Value::Function(_)) => Ok(callback),
        other => Err(EvalError::Type(format!(
            "{} is not a function (in {})",
            other.cloned().unwrap_or_default().to_js_string(),
            method
        ))),
    }
}

/// The `i`th argument, `undefined` when missing.
pub fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// `ToIntegerOrInfinity`
pub fn to_integer(value: &Value) -> f64 {
    let n = value.to_number();
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

/// Resolves a possibly negative position against a length, the way
/// `slice` does.
pub fn relative_index(value: &Value, len: usize) -> usize {
    let n = to_integer(value);
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

/// Like [`relative_index`] but `undefined` means `default`.
pub fn relative_index_or(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        default
    } else {
        relative_index(value, len)
    }
}

/// Clamps an absolute position into `0..=len`.
pub fn clamp_index(value: &Value, len: usize) -> usize {
    to_integer(value).clamp(0.0, len as f64) as usize
}
