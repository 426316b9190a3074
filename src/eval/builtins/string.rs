//! `String.prototype` methods.
//!
//! Positions and lengths count Unicode scalar values.

use std::sync::Arc;

use super::{
    arg, call_callback, clamp_index,
    regex::{char_offset, expand_replacement, JsRegex},
    relative_index, relative_index_or, to_integer,
};
use crate::eval::{
    context::ExecutionContext,
    evaluator::{EvalError, EvalResult},
    value::{is_js_whitespace, Value},
};

pub const METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "trimStart",
    "trimEnd",
    "split",
    "replace",
    "replaceAll",
    "slice",
    "substring",
    "substr",
    "charAt",
    "charCodeAt",
    "codePointAt",
    "at",
    "indexOf",
    "lastIndexOf",
    "includes",
    "startsWith",
    "endsWith",
    "repeat",
    "padStart",
    "padEnd",
    "concat",
    "match",
    "search",
    "localeCompare",
    "toString",
    "valueOf",
];

pub fn call_method(
    ctx: &mut ExecutionContext,
    s: &Arc<str>,
    name: &str,
    args: &[Value],
) -> EvalResult<Value> {
    let len = || s.chars().count();

    let value = match name {
        "toUpperCase" => checked(ctx, s.to_uppercase())?,
        "toLowerCase" => checked(ctx, s.to_lowercase())?,
        "trim" => Value::from(s.trim_matches(is_js_whitespace)),
        "trimStart" => Value::from(s.trim_start_matches(is_js_whitespace)),
        "trimEnd" => Value::from(s.trim_end_matches(is_js_whitespace)),
        "split" => split(ctx, s, &arg(args, 0), &arg(args, 1))?,
        "replace" => replace(ctx, s, &arg(args, 0), &arg(args, 1), false)?,
        "replaceAll" => replace(ctx, s, &arg(args, 0), &arg(args, 1), true)?,
        "slice" => {
            let len = len();
            let start = relative_index(&arg(args, 0), len);
            let end = relative_index_or(&arg(args, 1), len, len);
            Value::from(char_range(s, start, end.max(start)))
        }
        "substring" => {
            let len = len();
            let start = clamp_index(&arg(args, 0), len);
            let end = match arg(args, 1) {
                Value::Undefined => len,
                other => clamp_index(&other, len),
            };
            Value::from(char_range(s, start.min(end), start.max(end)))
        }
        "substr" => {
            let len = len();
            let start = relative_index(&arg(args, 0), len);
            let count = match arg(args, 1) {
                Value::Undefined => len,
                other => to_integer(&other).clamp(0.0, len as f64) as usize,
            };
            Value::from(char_range(s, start, (start + count).min(len)))
        }
        "charAt" => Value::from(
            char_at(s, to_integer(&arg(args, 0)))
                .map(String::from)
                .unwrap_or_default(),
        ),
        "charCodeAt" | "codePointAt" => {
            let code = char_at(s, to_integer(&arg(args, 0))).map(|c| c as u32 as f64);
            match (code, name) {
                (Some(code), _) => Value::Number(code),
                (None, "charCodeAt") => Value::Number(f64::NAN),
                (None, _) => Value::Undefined,
            }
        }
        "at" => {
            let len = len() as f64;
            let n = to_integer(&arg(args, 0));
            let i = if n < 0.0 { len + n } else { n };
            char_at(s, i).map(|c| Value::from(c.to_string())).unwrap_or_default()
        }
        "indexOf" => {
            let needle = arg(args, 0).to_js_string();
            let from = clamp_index(&arg(args, 1), len());
            index_of(s, &needle, from)
                .map(Value::from)
                .unwrap_or(Value::Number(-1.0))
        }
        "lastIndexOf" => {
            let needle = arg(args, 0).to_js_string();
            let from = match arg(args, 1).to_number() {
                n if n.is_nan() => len(),
                _ => clamp_index(&arg(args, 1), len()),
            };
            last_index_of(s, &needle, from)
                .map(Value::from)
                .unwrap_or(Value::Number(-1.0))
        }
        "includes" | "startsWith" | "endsWith" => {
            let needle = match arg(args, 0) {
                Value::Regex(_) => {
                    return Err(EvalError::Type(format!(
                        "First argument to String.prototype.{} must not be a regular expression",
                        name
                    )))
                }
                other => other.to_js_string(),
            };
            let chars: Vec<char> = s.chars().collect();
            let needle: Vec<char> = needle.chars().collect();
            let found = match name {
                "includes" => {
                    let from = clamp_index(&arg(args, 1), chars.len());
                    find_chars(&chars, &needle, from).is_some()
                }
                "startsWith" => {
                    let from = clamp_index(&arg(args, 1), chars.len());
                    chars[from..].starts_with(&needle)
                }
                _ => {
                    let end = match arg(args, 1) {
                        Value::Undefined => chars.len(),
                        other => clamp_index(&other, chars.len()),
                    };
                    chars[..end].ends_with(&needle)
                }
            };
            Value::Boolean(found)
        }
        "repeat" => {
            let count = to_integer(&arg(args, 0));
            if count < 0.0 || count.is_infinite() {
                return Err(EvalError::Range(format!(
                    "Invalid count value: {}",
                    Value::Number(count)
                )));
            }
            let count = count as usize;
            if !s.is_empty() && count > 0 {
                ctx.check_string_len(len().saturating_mul(count))?;
            }
            Value::from(s.repeat(count))
        }
        "padStart" | "padEnd" => pad(ctx, s, &arg(args, 0), &arg(args, 1), name == "padStart")?,
        "concat" => {
            let mut out = s.to_string();
            for value in args {
                out.push_str(&value.to_js_string());
                ctx.check_string_length(&out)?;
            }
            Value::from(out)
        }
        "match" => match_regex(ctx, s, &arg(args, 0))?,
        "search" => {
            let re = to_regex(ctx, &arg(args, 0))?;
            re.regex()
                .find(s)
                .map(|m| Value::from(char_offset(s, m.start())))
                .unwrap_or(Value::Number(-1.0))
        }
        "localeCompare" => {
            let other = arg(args, 0).to_js_string();
            Value::Number(match (**s).cmp(other.as_str()) {
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 1.0,
            })
        }
        "toString" | "valueOf" => Value::String(s.clone()),
        _ => {
            return Err(EvalError::Type(format!(
                "string.{} is not a function",
                name
            )))
        }
    };
    Ok(value)
}

fn checked(ctx: &ExecutionContext, s: String) -> EvalResult<Value> {
    ctx.check_string_length(&s)?;
    Ok(Value::from(s))
}

fn char_range(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn char_at(s: &str, i: f64) -> Option<char> {
    if i < 0.0 || i.is_infinite() {
        return None;
    }
    s.chars().nth(i as usize)
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

fn index_of(s: &str, needle: &str, from: usize) -> Option<usize> {
    let haystack: Vec<char> = s.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    find_chars(&haystack, &needle, from)
}

fn last_index_of(s: &str, needle: &str, from: usize) -> Option<usize> {
    let haystack: Vec<char> = s.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    if needle.len() > haystack.len() {
        return None;
    }
    let start = from.min(haystack.len() - needle.len());
    (0..=start)
        .rev()
        .find(|&i| haystack[i..].starts_with(&needle))
}

fn pad(
    ctx: &ExecutionContext,
    s: &str,
    target: &Value,
    filler: &Value,
    at_start: bool,
) -> EvalResult<Value> {
    let len = s.chars().count();
    let target = to_integer(target);
    let filler = match filler {
        Value::Undefined => " ".to_string(),
        other => other.to_js_string(),
    };
    if target <= len as f64 || filler.is_empty() {
        return Ok(Value::from(s));
    }
    if target > ctx.max_string_length() as f64 {
        ctx.check_string_len(usize::MAX)?;
    }

    let padding: String = filler.chars().cycle().take(target as usize - len).collect();
    Ok(Value::from(if at_start {
        padding + s
    } else {
        format!("{}{}", s, padding)
    }))
}

/// Coerces a `match`/`search` argument into a regex.
fn to_regex(ctx: &mut ExecutionContext, value: &Value) -> EvalResult<Arc<JsRegex>> {
    match value {
        Value::Regex(re) => Ok(re.clone()),
        Value::Undefined => ctx.regex("", ""),
        other => ctx.regex(&other.to_js_string(), ""),
    }
}

fn match_regex(ctx: &mut ExecutionContext, s: &str, pattern: &Value) -> EvalResult<Value> {
    let re = to_regex(ctx, pattern)?;

    if re.global() {
        let matches: Vec<Value> = re
            .regex()
            .find_iter(s)
            .map(|m| Value::from(m.as_str()))
            .collect();
        ctx.check_array_length(matches.len())?;
        return Ok(if matches.is_empty() {
            Value::Null
        } else {
            ctx.array(matches)?
        });
    }

    Ok(match re.regex().captures(s) {
        Some(caps) => ctx.array(
            caps.iter()
                .map(|group| group.map(|m| Value::from(m.as_str())).unwrap_or_default())
                .collect(),
        )?,
        None => Value::Null,
    })
}

fn split(ctx: &mut ExecutionContext, s: &str, separator: &Value, limit: &Value) -> EvalResult<Value> {
    let limit = match limit {
        Value::Undefined => u32::MAX as usize,
        other => to_uint32(other.to_number()) as usize,
    };
    if limit == 0 {
        return ctx.array(vec![]);
    }

    let parts: Vec<Value> = match separator {
        Value::Undefined => vec![Value::from(s)],
        Value::Regex(re) => split_regex(ctx, s, re, limit)?,
        other => {
            let separator = other.to_js_string();
            if separator.is_empty() {
                ctx.check_array_length(s.chars().count().min(limit))?;
                s.chars().take(limit).map(|c| Value::from(c.to_string())).collect()
            } else {
                let parts: Vec<Value> = s.split(separator.as_str()).take(limit).map(Value::from).collect();
                ctx.check_array_length(parts.len())?;
                parts
            }
        }
    };
    ctx.array(parts)
}

fn split_regex(
    ctx: &mut ExecutionContext,
    s: &str,
    re: &JsRegex,
    limit: usize,
) -> EvalResult<Vec<Value>> {
    if s.is_empty() {
        return Ok(if re.is_match(s) {
            vec![]
        } else {
            vec![Value::from(s)]
        });
    }

    let mut parts = Vec::new();
    let mut last = 0;
    for caps in re.regex().captures_iter(s) {
        let Some(m) = caps.get(0) else { continue };
        // no match is attempted at the very end, and empty matches at the
        // previous split point do not split
        if m.start() >= s.len() || m.end() == last {
            continue;
        }
        parts.push(Value::from(&s[last..m.start()]));
        if parts.len() == limit {
            return Ok(parts);
        }
        for group in caps.iter().skip(1) {
            parts.push(group.map(|g| Value::from(g.as_str())).unwrap_or_default());
            if parts.len() == limit {
                return Ok(parts);
            }
        }
        ctx.check_array_length(parts.len())?;
        last = m.end();
    }
    parts.push(Value::from(&s[last..]));
    Ok(parts)
}

fn replace(
    ctx: &mut ExecutionContext,
    s: &str,
    pattern: &Value,
    replacement: &Value,
    all: bool,
) -> EvalResult<Value> {
    let callback = matches!(replacement, Value::Function(_)).then_some(replacement);
    let template = replacement.to_js_string();
    let mut out = String::with_capacity(s.len());
    let mut last = 0;

    match pattern {
        Value::Regex(re) => {
            if all && !re.global() {
                return Err(EvalError::Type(
                    "replaceAll must be called with a global RegExp".to_string(),
                ));
            }
            let named = re.has_named_groups();
            for caps in re.regex().captures_iter(s) {
                let Some(m) = caps.get(0) else { continue };
                out.push_str(&s[last..m.start()]);
                let replaced = match callback {
                    Some(callback) => {
                        let mut args: Vec<Value> = caps
                            .iter()
                            .map(|group| group.map(|g| Value::from(g.as_str())).unwrap_or_default())
                            .collect();
                        args.push(Value::from(char_offset(s, m.start())));
                        args.push(Value::from(s));
                        call_callback(ctx, callback, args)?.to_js_string()
                    }
                    None => expand_replacement(&template, s, m.start(), m.end(), Some(&caps), named),
                };
                out.push_str(&replaced);
                ctx.check_string_length(&out)?;
                last = m.end();
                if !re.global() {
                    break;
                }
            }
        }
        other => {
            let needle = other.to_js_string();
            let positions: Vec<usize> = if all {
                s.match_indices(needle.as_str()).map(|(i, _)| i).collect()
            } else {
                s.find(needle.as_str()).into_iter().collect()
            };
            for start in positions {
                let end = start + needle.len();
                out.push_str(&s[last..start]);
                let replaced = match callback {
                    Some(callback) => call_callback(
                        ctx,
                        callback,
                        vec![
                            Value::from(needle.as_str()),
                            Value::from(char_offset(s, start)),
                            Value::from(s),
                        ],
                    )?
                    .to_js_string(),
                    None => expand_replacement(&template, s, start, end, None, false),
                };
                out.push_str(&replaced);
                ctx.check_string_length(&out)?;
                last = end;
            }
        }
    }

    out.push_str(&s[last..]);
    ctx.check_string_length(&out)?;
    Ok(Value::from(out))
}

/// `ToUint32`
fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4294967296.0) as u32
}
