//! Regular expression literals on top of the `regex` crate.
//!
//! Scripts write patterns with JavaScript syntax. [`JsRegex::new`] validates
//! the flags and rewrites the few constructs whose meaning differs between
//! the two dialects before compiling. Features the `regex` crate does not
//! support at all (look-around, backreferences) are rejected as invalid
//! patterns.

use std::fmt;

use regex::{Captures, Regex, RegexBuilder};
use thiserror::Error;

use crate::eval::{
    context::ExecutionContext,
    evaluator::{EvalError, EvalResult},
    value::Value,
};

const SIZE_LIMIT: usize = 1 << 20;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegexError {
    #[error("Invalid regular expression flags '{0}'")]
    InvalidFlags(String),
    #[error("Invalid regular expression: /{pattern}/: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct JsRegex {
    source: String,
    flags: String,
    regex: Regex,
}

impl JsRegex {
    pub fn new(pattern: &str, flags: &str) -> Result<Self, RegexError> {
        let mut seen = String::new();
        for flag in flags.chars() {
            if !"gimsu".contains(flag) || seen.contains(flag) {
                return Err(RegexError::InvalidFlags(flags.to_string()));
            }
            seen.push(flag);
        }

        let regex = RegexBuilder::new(&translate(pattern))
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .size_limit(SIZE_LIMIT)
            .dfa_size_limit(SIZE_LIMIT)
            .build()
            .map_err(|e| RegexError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: first_line(&e.to_string()),
            })?;

        Ok(Self {
            source: pattern.to_string(),
            flags: flags.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    pub fn has_named_groups(&self) -> bool {
        self.regex.capture_names().any(|name| name.is_some())
    }
}

impl fmt::Display for JsRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = if self.source.is_empty() {
            "(?:)"
        } else {
            &self.source
        };
        write!(f, "/{}/{}", source, self.flags)
    }
}

impl From<RegexError> for EvalError {
    fn from(e: RegexError) -> Self {
        EvalError::Syntax(crate::analyzer::SyntaxError::Parse {
            message: e.to_string(),
            span: None,
        })
    }
}

fn first_line(message: &str) -> String {
    message
        .lines()
        .rev()
        .find(|line| line.starts_with("error:"))
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| message.lines().next().unwrap_or_default().to_string())
}

/// Rewrites JavaScript pattern syntax into the `regex` crate's dialect.
///
/// `\d` and `\w` are ASCII-only in JavaScript. Inside a class `[` is a plain
/// character, `&&`, `--` and `~~` are not set operations, and `[]` and `[^]`
/// match nothing and anything respectively.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(escaped) = chars.next() else {
                    out.push('\\');
                    break;
                };
                match (escaped, in_class) {
                    ('d', false) => out.push_str("[0-9]"),
                    ('D', false) => out.push_str("[^0-9]"),
                    ('w', false) => out.push_str("[0-9A-Za-z_]"),
                    ('W', false) => out.push_str("[^0-9A-Za-z_]"),
                    ('d', true) => out.push_str("0-9"),
                    ('w', true) => out.push_str("0-9A-Za-z_"),
                    ('/', _) => out.push('/'),
                    (other, _) => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '[' if !in_class => match chars.peek() {
                Some(']') => {
                    chars.next();
                    out.push_str(r"[^\s\S]");
                }
                Some('^') => {
                    chars.next();
                    if chars.peek() == Some(&']') {
                        chars.next();
                        out.push_str(r"[\s\S]");
                    } else {
                        in_class = true;
                        out.push_str("[^");
                    }
                }
                _ => {
                    in_class = true;
                    out.push('[');
                }
            },
            '[' | '&' | '~' if in_class => {
                out.push('\\');
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            other => out.push(other),
        }
    }

    out
}

/// Character offset of a byte offset.
pub fn char_offset(haystack: &str, byte: usize) -> usize {
    haystack[..byte].chars().count()
}

/// Expands `$$`, `$&`, `` $` ``, `$'`, `$n`, `$nn` and `$<name>` in a
/// replacement string. `captures` is `None` for plain string patterns, and
/// `$<name>` is only special when the pattern has named groups.
pub fn expand_replacement(
    replacement: &str,
    haystack: &str,
    start: usize,
    end: usize,
    captures: Option<&Captures>,
    named_groups: bool,
) -> String {
    let group_count = captures.map(|c| c.len()).unwrap_or(1);
    let mut out = String::with_capacity(replacement.len());
    let mut rest = replacement;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx + 1..];
        match tail.chars().next() {
            Some('$') => {
                out.push('$');
                rest = &tail[1..];
            }
            Some('&') => {
                out.push_str(&haystack[start..end]);
                rest = &tail[1..];
            }
            Some('`') => {
                out.push_str(&haystack[..start]);
                rest = &tail[1..];
            }
            Some('\'') => {
                out.push_str(&haystack[end..]);
                rest = &tail[1..];
            }
            Some(d) if d.is_ascii_digit() && captures.is_some() => {
                let digits: String = tail
                    .chars()
                    .take(2)
                    .take_while(char::is_ascii_digit)
                    .collect();
                let two = digits
                    .parse::<usize>()
                    .ok()
                    .filter(|n| digits.len() == 2 && *n > 0 && *n < group_count);
                let one = d
                    .to_digit(10)
                    .map(|n| n as usize)
                    .filter(|n| *n > 0 && *n < group_count);
                match (two, one) {
                    (Some(n), _) => {
                        push_group(&mut out, captures, n);
                        rest = &tail[2..];
                    }
                    (None, Some(n)) => {
                        push_group(&mut out, captures, n);
                        rest = &tail[1..];
                    }
                    (None, None) => {
                        out.push('$');
                        rest = tail;
                    }
                }
            }
            Some('<') if named_groups && captures.is_some() => match tail.find('>') {
                Some(close) => {
                    let name = &tail[1..close];
                    if let Some(m) = captures.and_then(|c| c.name(name)) {
                        out.push_str(m.as_str());
                    }
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push('$');
                    rest = tail;
                }
            },
            _ => {
                out.push('$');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

fn push_group(out: &mut String, captures: Option<&Captures>, n: usize) {
    if let Some(m) = captures.and_then(|c| c.get(n)) {
        out.push_str(m.as_str());
    }
}

/// `RegExp.prototype` properties.
pub fn get_property(re: &JsRegex, name: &str) -> Option<Value> {
    match name {
        "source" => Some(Value::string(re.source())),
        "flags" => Some(Value::string(re.flags())),
        "global" => Some(Value::Boolean(re.global())),
        "ignoreCase" => Some(Value::Boolean(re.flags.contains('i'))),
        "multiline" => Some(Value::Boolean(re.flags.contains('m'))),
        "lastIndex" => Some(Value::Number(0.0)),
        _ => None,
    }
}

pub const METHODS: &[&str] = &["test", "toString"];

pub fn call_method(
    _ctx: &mut ExecutionContext,
    re: &JsRegex,
    name: &str,
    args: &[Value],
) -> EvalResult<Value> {
    match name {
        "test" => {
            let input = args.first().cloned().unwrap_or_default().to_js_string();
            Ok(Value::Boolean(re.is_match(&input)))
        }
        "toString" => Ok(Value::string(re.to_string())),
        _ => Err(EvalError::Type(format!("regex.{} is not a function", name))),
    }
}
