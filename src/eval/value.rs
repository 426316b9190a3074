//! Runtime values and the JavaScript-style conversions between them.

use std::{cmp::Ordering, fmt, ops::Deref, sync::Arc};

use crate::ast;

use super::builtins::regex::JsRegex;

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Arc<str>),
    Array(Arc<Array>),
    Regex(Arc<JsRegex>),
    /// The empty object bound to every shadowed ambient name.
    Inert,
    Namespace(Namespace),
    Function(Function),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Namespace {
    Math,
    Json,
}

#[derive(Clone, Debug)]
pub enum Function {
    Native(Native),
    /// A builtin method together with the value it was read from.
    Method {
        receiver: Box<Value>,
        name: &'static str,
    },
    Lambda(Arc<Lambda>),
}

/// Global functions and the functions of the `Math` and `JSON` namespaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Native {
    String,
    Number,
    Boolean,
    ParseInt,
    ParseFloat,
    IsNaN,
    EncodeUriComponent,
    DecodeUriComponent,
    MathAbs,
    MathFloor,
    MathCeil,
    MathRound,
    MathTrunc,
    MathSign,
    MathMin,
    MathMax,
    MathPow,
    MathSqrt,
    JsonStringify,
}

impl Native {
    pub fn name(&self) -> &'static str {
        match self {
            Native::String => "String",
            Native::Number => "Number",
            Native::Boolean => "Boolean",
            Native::ParseInt => "parseInt",
            Native::ParseFloat => "parseFloat",
            Native::IsNaN => "isNaN",
            Native::EncodeUriComponent => "encodeURIComponent",
            Native::DecodeUriComponent => "decodeURIComponent",
            Native::MathAbs => "abs",
            Native::MathFloor => "floor",
            Native::MathCeil => "ceil",
            Native::MathRound => "round",
            Native::MathTrunc => "trunc",
            Native::MathSign => "sign",
            Native::MathMin => "min",
            Native::MathMax => "max",
            Native::MathPow => "pow",
            Native::MathSqrt => "sqrt",
            Native::JsonStringify => "stringify",
        }
    }
}

/// Array elements plus measurements of the whole nested structure, taken
/// once when the array is built so that limits can be checked without
/// walking it.
#[derive(Debug, Default)]
pub struct Array {
    items: Vec<Value>,
    depth: usize,
    elements: usize,
    text_len: usize,
}

impl Array {
    pub fn new(items: Vec<Value>) -> Self {
        let mut depth = 0;
        let mut elements = items.len();
        let mut text_len = items.len().saturating_sub(1);
        for item in &items {
            depth = depth.max(item.nesting());
            let len = match item {
                Value::Array(inner) => {
                    elements = elements.saturating_add(inner.elements);
                    inner.text_len
                }
                Value::String(s) => s.chars().count(),
                other if other.is_nullish() => 0,
                other => other.to_js_string().chars().count(),
            };
            text_len = text_len.saturating_add(len);
        }
        Self {
            items,
            depth: depth + 1,
            elements,
            text_len,
        }
    }

    /// Levels of arrays and closures, this one included.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Element count including the elements of nested arrays, counted once
    /// per occurrence.
    pub fn elements(&self) -> usize {
        self.elements
    }

    /// Length in characters of the comma joined string form.
    pub fn text_len(&self) -> usize {
        self.text_len
    }
}

impl Deref for Array {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.items
    }
}

/// An arrow function together with the parameters visible where it was
/// written.
#[derive(Debug)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Arc<ast::Expression>,
    pub captured: Option<Arc<super::context::Scope>>,
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Builds an array without checking it against any limit. Script-built
    /// arrays go through [`ExecutionContext::array`](super::context::ExecutionContext::array).
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(Array::new(items)))
    }

    /// How many levels of arrays and closures hang below this value.
    pub fn nesting(&self) -> usize {
        match self {
            Value::Array(array) => array.depth(),
            Value::Function(Function::Method { receiver, .. }) => receiver.nesting() + 1,
            Value::Function(Function::Lambda(lambda)) => {
                lambda.captured.as_ref().map_or(0, |scope| scope.depth()) + 1
            }
            _ => 0,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Null
            | Value::Array(_)
            | Value::Regex(_)
            | Value::Inert
            | Value::Namespace(_) => "object",
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::Null | Value::Boolean(_) | Value::Number(_) | Value::String(_)
        )
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !(*n == 0.0 || n.is_nan()),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// Objects become their string form; primitives are returned unchanged.
    pub fn to_primitive(&self) -> Value {
        if self.is_primitive() {
            self.clone()
        } else {
            Value::string(self.to_js_string())
        }
    }

    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Regex(re) => re.to_string(),
            Value::Inert => "[object Object]".to_string(),
            Value::Namespace(Namespace::Math) => "[object Math]".to_string(),
            Value::Namespace(Namespace::Json) => "[object JSON]".to_string(),
            Value::Function(Function::Native(native)) => {
                format!("function {}() {{ [native code] }}", native.name())
            }
            Value::Function(Function::Method { name, .. }) => {
                format!("function {}() {{ [native code] }}", name)
            }
            Value::Function(Function::Lambda(lambda)) => {
                format!("({}) => {{ [code] }}", lambda.params.join(", "))
            }
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Inert, Value::Inert) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Regex(a), Value::Regex(b)) => Arc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => match (a, b) {
                (Function::Native(x), Function::Native(y)) => x == y,
                (Function::Lambda(x), Function::Lambda(y)) => Arc::ptr_eq(x, y),
                _ => false,
            },
            _ => false,
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Boolean(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Boolean(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (a, b) if a.is_primitive() != b.is_primitive() => {
                a.to_primitive().loose_equals(&b.to_primitive())
            }
            (a, b) => a.strict_equals(b),
        }
    }

    /// Equality used by `includes`: like `===` but `NaN` equals itself.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// Relational comparison; `None` when either side is `NaN`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        let (left, right) = (self.to_primitive(), other.to_primitive());
        match (&left, &right) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => left.to_number().partial_cmp(&right.to_number()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_js_string())
    }
}

/// Whitespace as `String.prototype.trim` and number parsing see it.
pub fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// `Number("...")`
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }

    let radix_prefixed = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)];
    for (prefix, radix) in radix_prefixed {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return f64::NAN;
            }
            return digits
                .chars()
                .filter_map(|c| c.to_digit(radix))
                .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
        }
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    // Rust also accepts "inf", "nan" and friends, JavaScript does not
    let numeric = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !numeric {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// `String(number)`: shortest round-trip digits, laid out the way
/// JavaScript does (`1e+21`, `1e-7`, `0.000001`, `123`).
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let sign = if n < 0.0 { "-" } else { "" };
    let scientific = format!("{:e}", n.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    let body = if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let exp_sign = if point - 1 >= 0 { "+" } else { "-" };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, exp_sign, (point - 1).abs())
        } else {
            format!("{}.{}e{}{}", first, rest, exp_sign, (point - 1).abs())
        }
    };

    format!("{}{}", sign, body)
}
