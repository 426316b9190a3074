//! Global bindings: conversion functions, `Math`, `JSON`, and the inert
//! object standing in for every ambient capability.

use std::f64::consts;

use super::{
    arg,
    number::{power, round},
};
use crate::eval::{
    context::ExecutionContext,
    evaluator::{EvalError, EvalResult},
    value::{is_js_whitespace, number_to_string, Function, Namespace, Native, Value},
};

/// Names that would reach the host in a general purpose runtime. Scripts see
/// an inert empty object instead.
pub const SHADOWED_NAMES: &[&str] = &[
    "globalThis",
    "global",
    "window",
    "self",
    "document",
    "process",
    "require",
    "module",
    "exports",
    "eval",
    "Function",
    "setTimeout",
    "setInterval",
    "setImmediate",
    "queueMicrotask",
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "importScripts",
    "Deno",
    "Bun",
];

pub fn lookup(name: &str) -> Option<Value> {
    let native = |n: Native| Some(Value::Function(Function::Native(n)));
    match name {
        "NaN" => Some(Value::Number(f64::NAN)),
        "Infinity" => Some(Value::Number(f64::INFINITY)),
        "String" => native(Native::String),
        "Number" => native(Native::Number),
        "Boolean" => native(Native::Boolean),
        "parseInt" => native(Native::ParseInt),
        "parseFloat" => native(Native::ParseFloat),
        "isNaN" => native(Native::IsNaN),
        "encodeURIComponent" => native(Native::EncodeUriComponent),
        "decodeURIComponent" => native(Native::DecodeUriComponent),
        "Math" => Some(Value::Namespace(Namespace::Math)),
        "JSON" => Some(Value::Namespace(Namespace::Json)),
        _ if SHADOWED_NAMES.contains(&name) => Some(Value::Inert),
        _ => None,
    }
}

pub fn namespace_member(namespace: Namespace, name: &str) -> Value {
    let native = |n: Native| Value::Function(Function::Native(n));
    match (namespace, name) {
        (Namespace::Math, "PI") => Value::Number(consts::PI),
        (Namespace::Math, "E") => Value::Number(consts::E),
        (Namespace::Math, "abs") => native(Native::MathAbs),
        (Namespace::Math, "floor") => native(Native::MathFloor),
        (Namespace::Math, "ceil") => native(Native::MathCeil),
        (Namespace::Math, "round") => native(Native::MathRound),
        (Namespace::Math, "trunc") => native(Native::MathTrunc),
        (Namespace::Math, "sign") => native(Native::MathSign),
        (Namespace::Math, "min") => native(Native::MathMin),
        (Namespace::Math, "max") => native(Native::MathMax),
        (Namespace::Math, "pow") => native(Native::MathPow),
        (Namespace::Math, "sqrt") => native(Native::MathSqrt),
        (Namespace::Json, "stringify") => native(Native::JsonStringify),
        _ => Value::Undefined,
    }
}

pub fn call_native(ctx: &mut ExecutionContext, native: Native, args: &[Value]) -> EvalResult<Value> {
    let number = |i: usize| arg(args, i).to_number();
    let math = |f: fn(f64) -> f64| Value::Number(f(number(0)));

    Ok(match native {
        Native::String => match args.first() {
            Some(value) => Value::from(value.to_js_string()),
            None => Value::from(""),
        },
        Native::Number => Value::Number(args.first().map(Value::to_number).unwrap_or(0.0)),
        Native::Boolean => Value::Boolean(arg(args, 0).to_boolean()),
        Native::ParseInt => Value::Number(parse_int(&arg(args, 0).to_js_string(), &arg(args, 1))),
        Native::ParseFloat => Value::Number(parse_float(&arg(args, 0).to_js_string())),
        Native::IsNaN => Value::Boolean(number(0).is_nan()),
        Native::EncodeUriComponent => Value::from(encode_uri_component(&arg(args, 0).to_js_string())),
        Native::DecodeUriComponent => {
            Value::from(decode_uri_component(&arg(args, 0).to_js_string())?)
        }
        Native::MathAbs => math(f64::abs),
        Native::MathFloor => math(f64::floor),
        Native::MathCeil => math(f64::ceil),
        Native::MathRound => math(round),
        Native::MathTrunc => math(f64::trunc),
        Native::MathSign => math(|x| if x == 0.0 || x.is_nan() { x } else { x.signum() }),
        Native::MathSqrt => math(f64::sqrt),
        Native::MathPow => Value::Number(power(number(0), number(1))),
        Native::MathMin => Value::Number(fold_numbers(args, f64::INFINITY, f64::min)),
        Native::MathMax => Value::Number(fold_numbers(args, f64::NEG_INFINITY, f64::max)),
        Native::JsonStringify => {
            let indent = json_indent(&arg(args, 2));
            match json_stringify(ctx, &arg(args, 0), &indent)? {
                Some(json) => Value::from(json),
                None => Value::Undefined,
            }
        }
    })
}

fn fold_numbers(args: &[Value], init: f64, f: fn(f64, f64) -> f64) -> f64 {
    args.iter().map(Value::to_number).fold(init, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            f(acc, n)
        }
    })
}

/// `parseInt(string, radix)`
pub fn parse_int(s: &str, radix: &Value) -> f64 {
    let s = s.trim_start_matches(is_js_whitespace);
    let (sign, s) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };

    let mut radix = match radix {
        Value::Undefined => 0,
        other => {
            let n = other.to_number();
            if n.is_finite() {
                n.trunc() as i64
            } else {
                0
            }
        }
    };
    let has_hex_prefix = s.starts_with("0x") || s.starts_with("0X");
    let s = if (radix == 0 || radix == 16) && has_hex_prefix {
        radix = 16;
        &s[2..]
    } else {
        s
    };
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let radix = radix as u32;
    let digits: Vec<u32> = s.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    sign * digits
        .iter()
        .fold(0.0, |acc, d| acc * radix as f64 + *d as f64)
}

/// `parseFloat(string)`: the longest prefix that reads as a decimal literal.
pub fn parse_float(s: &str) -> f64 {
    let s = s.trim_start_matches(is_js_whitespace);
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };
    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

const URI_UNRESERVED: &[u8] = b"-_.!~*'()";

pub fn encode_uri_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || URI_UNRESERVED.contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

pub fn decode_uri_component(s: &str) -> EvalResult<String> {
    let malformed = || EvalError::Uri("URI malformed".to_string());
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    let hex_byte = |at: usize| -> Option<u8> {
        if bytes.get(at) != Some(&b'%') {
            return None;
        }
        let hex = s.get(at + 1..at + 3)?;
        u8::from_str_radix(hex, 16).ok()
    };

    while i < bytes.len() {
        if bytes[i] != b'%' {
            let run_end = s[i..].find('%').map(|p| i + p).unwrap_or(s.len());
            out.push_str(&s[i..run_end]);
            i = run_end;
            continue;
        }

        let lead = hex_byte(i).ok_or_else(malformed)?;
        let width = match lead {
            0x00..=0x7F => 1,
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Err(malformed()),
        };
        let mut sequence = vec![lead];
        for k in 1..width {
            sequence.push(hex_byte(i + 3 * k).ok_or_else(malformed)?);
        }
        let decoded = std::str::from_utf8(&sequence).map_err(|_| malformed())?;
        out.push_str(decoded);
        i += 3 * width;
    }
    Ok(out)
}

fn json_indent(space: &Value) -> String {
    match space {
        Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    }
}

/// `JSON.stringify`. `None` when the value has no JSON form.
pub fn json_stringify(
    ctx: &ExecutionContext,
    value: &Value,
    indent: &str,
) -> EvalResult<Option<String>> {
    let mut writer = JsonWriter {
        ctx,
        indent,
        out: String::new(),
        chars: 0,
    };
    Ok(writer.write(value, 0)?.then_some(writer.out))
}

/// Output is checked against the string limit as it grows, so a large
/// indent over a wide array fails early instead of after building it.
struct JsonWriter<'a> {
    ctx: &'a ExecutionContext,
    indent: &'a str,
    out: String,
    chars: usize,
}

impl JsonWriter<'_> {
    fn push(&mut self, text: &str) -> EvalResult<()> {
        self.chars += text.chars().count();
        self.out.push_str(text);
        self.ctx.check_string_len(self.chars)
    }

    fn newline(&mut self, level: usize) -> EvalResult<()> {
        let indent = self.indent;
        self.push("\n")?;
        for _ in 0..level {
            self.push(indent)?;
        }
        Ok(())
    }

    fn write(&mut self, value: &Value, level: usize) -> EvalResult<bool> {
        match value {
            Value::Undefined | Value::Function(_) => return Ok(false),
            Value::Null => self.push("null")?,
            Value::Boolean(b) => self.push(if *b { "true" } else { "false" })?,
            Value::Number(n) if n.is_finite() => self.push(&number_to_string(*n))?,
            Value::Number(_) => self.push("null")?,
            Value::String(s) => {
                let quoted = serde_json::to_string(s.as_ref())
                    .map_err(|e| EvalError::Type(e.to_string()))?;
                self.push(&quoted)?
            }
            Value::Regex(_) | Value::Inert | Value::Namespace(_) => self.push("{}")?,
            Value::Array(items) => {
                self.push("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(",")?;
                    }
                    if !self.indent.is_empty() {
                        self.newline(level + 1)?;
                    }
                    if !self.write(item, level + 1)? {
                        self.push("null")?;
                    }
                }
                if !self.indent.is_empty() && !items.is_empty() {
                    self.newline(level)?;
                }
                self.push("]")?;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::EvaluatorConfig,
        eval::{evaluate, Evaluator},
    };
    use pretty_assertions::assert_eq;

    fn run(source: &str, input: &str) -> String {
        evaluate(source, input).unwrap()
    }

    #[test]
    fn test_shadowed_names_are_inert() {
        for name in SHADOWED_NAMES {
            assert!(matches!(lookup(name), Some(Value::Inert)), "{}", name);
        }
        assert!(lookup("localStorage").is_none());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(run("String(12)", ""), "12");
        assert_eq!(run("String()", ""), "");
        assert_eq!(run("Number(sel) + 1", " 41 "), "42");
        assert_eq!(run("Number()", ""), "0");
        assert_eq!(run("Boolean(sel)", ""), "false");
        assert_eq!(run("isNaN('abc')", ""), "true");
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("  42px", &Value::Undefined), 42.0);
        assert_eq!(parse_int("-0x1A", &Value::Undefined), -26.0);
        assert_eq!(parse_int("101", &Value::Number(2.0)), 5.0);
        assert_eq!(parse_int("z", &Value::Number(36.0)), 35.0);
        assert!(parse_int("abc", &Value::Undefined).is_nan());
        assert!(parse_int("10", &Value::Number(1.0)).is_nan());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("3.14abc"), 3.14);
        assert_eq!(parse_float("  -.5"), -0.5);
        assert_eq!(parse_float("1e3x"), 1000.0);
        assert_eq!(parse_float("1e"), 1.0);
        assert_eq!(parse_float("5."), 5.0);
        assert_eq!(parse_float("-Infinityx"), f64::NEG_INFINITY);
        assert!(parse_float(".").is_nan());
        assert!(parse_float("x1").is_nan());
    }

    #[test]
    fn test_uri_components() {
        assert_eq!(encode_uri_component("a b&c/é"), "a%20b%26c%2F%C3%A9");
        assert_eq!(encode_uri_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(decode_uri_component("a%20b%26c%2F%C3%A9").unwrap(), "a b&c/é");
        assert_eq!(decode_uri_component("100%").unwrap_err().to_string(), "URIError: URI malformed");
        assert!(decode_uri_component("%C3").is_err());
        assert!(decode_uri_component("%FF").is_err());
    }

    #[test]
    fn test_math() {
        assert_eq!(run("Math.max(1, 3, 2)", ""), "3");
        assert_eq!(run("Math.min()", ""), "Infinity");
        assert_eq!(run("Math.max(1, NaN)", ""), "NaN");
        assert_eq!(run("Math.round(-2.5)", ""), "-2");
        assert_eq!(run("Math.sign(-3)", ""), "-1");
        assert_eq!(run("Math.pow(2, 8)", ""), "256");
        assert_eq!(run("Math.sqrt(16)", ""), "4");
        assert_eq!(run("Math.floor(Math.PI * 100) / 100", ""), "3.14");
        assert_eq!(run("Math.random", ""), "undefined");
    }

    #[test]
    fn test_json_stringify() {
        assert_eq!(run("JSON.stringify(sel)", "say \"hi\"\n"), r#""say \"hi\"\n""#);
        assert_eq!(
            run("JSON.stringify([1, 'a', null, undefined, NaN, true])", ""),
            r#"[1,"a",null,null,null,true]"#
        );
        assert_eq!(
            run("JSON.stringify(sel.split(','), null, 2)", "a,b"),
            "[\n  \"a\",\n  \"b\"\n]"
        );
        assert_eq!(run("JSON.stringify([[1], []], null, '-')", ""), "[\n-[\n--1\n-],\n-[]\n]");
        assert_eq!(run("JSON.stringify(undefined)", ""), "undefined");
        assert_eq!(run("JSON.stringify(window)", ""), "{}");
    }

    #[test]
    fn test_json_stringify_stops_at_string_limit() {
        let evaluator = Evaluator::new(EvaluatorConfig {
            max_string_length: 50,
            ..Default::default()
        });
        assert_eq!(
            evaluator.evaluate("JSON.stringify(sel.split(''))", "abc").unwrap(),
            r#"["a","b","c"]"#
        );
        assert!(matches!(
            evaluator.evaluate("JSON.stringify(sel.split(''), null, 10)", "abcdefgh"),
            Err(EvalError::LimitExceeded(_))
        ));
    }
}
