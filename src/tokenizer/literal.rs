use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1, take_while_m_n},
    character::complete::{anychar, char, digit0, digit1, hex_digit1, one_of},
    combinator::{map, map_opt, map_res, not, opt, recognize, value},
    error::{context, ErrorKind, ParseError, VerboseError},
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use super::token::{ParserResult, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Literal(String),
    /// Raw source of a `${...}` placeholder, parsed later as an expression.
    Interpolation(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Template(Vec<StringPart>),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
    Regex { pattern: String, flags: String },
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Template(_) => write!(f, "template string"),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
            Literal::Undefined => write!(f, "undefined"),
            Literal::Regex { pattern, flags } => write!(f, "/{}/{}", pattern, flags),
        }
    }
}

enum Fragment<'a> {
    Text(&'a str),
    Escaped(char),
}

fn parse_unicode_escape(input: &str) -> ParserResult<char> {
    context(
        "unicode escape",
        map_opt(
            preceded(
                char('u'),
                alt((
                    delimited(
                        char('{'),
                        take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit()),
                        char('}'),
                    ),
                    take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()),
                )),
            ),
            |hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32),
        ),
    )(input)
}

fn parse_hex_escape(input: &str) -> ParserResult<char> {
    context(
        "hex escape",
        map_opt(
            preceded(
                char('x'),
                take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
            ),
            |hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32),
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_escaped_char(input: &str) -> ParserResult<char> {
    context(
        "escape sequence",
        preceded(
            char('\\'),
            alt((
                parse_unicode_escape,
                parse_hex_escape,
                value('\n', char('n')),
                value('\t', char('t')),
                value('\r', char('r')),
                value('\0', char('0')),
                value('\u{8}', char('b')),
                value('\u{c}', char('f')),
                value('\u{b}', char('v')),
                // \\ \' \" \` \$ and any other escaped character stand for themselves
                anychar,
            )),
        ),
    )(input)
}

fn parse_quoted_body(input: &str, quote: char) -> ParserResult<String> {
    fold_many0(
        alt((
            map(
                take_while1(|c: char| c != quote && c != '\\' && c != '\n' && c != '\r'),
                Fragment::Text,
            ),
            map(parse_escaped_char, Fragment::Escaped),
        )),
        String::new,
        |mut acc, fragment| {
            match fragment {
                Fragment::Text(text) => acc.push_str(text),
                Fragment::Escaped(c) => acc.push(c),
            }
            acc
        },
    )(input)
}

fn parse_double_quoted_body(input: &str) -> ParserResult<String> {
    parse_quoted_body(input, '"')
}

fn parse_single_quoted_body(input: &str) -> ParserResult<String> {
    parse_quoted_body(input, '\'')
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_double_quoted(input: &str) -> ParserResult<Literal> {
    context(
        "string literal",
        map(
            delimited(char('"'), parse_double_quoted_body, char('"')),
            Literal::String,
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_single_quoted(input: &str) -> ParserResult<Literal> {
    context(
        "string literal",
        map(
            delimited(char('\''), parse_single_quoted_body, char('\'')),
            Literal::String,
        ),
    )(input)
}

/// Scanner state while looking for the end of a placeholder.
enum Scope {
    Code { braces: usize },
    Quoted(char),
    Template,
}

/// Parses a `${...}` placeholder, keeping its source text.
///
/// Braces are balanced, quoted sections are skipped and nested template
/// strings are followed into their own placeholders, so `${ "}" }` and
/// `` ${ `${a}` } `` both find the right closing brace.
#[tracing::instrument(level = "debug", skip(input))]
fn parse_interpolation(input: &str) -> ParserResult<StringPart> {
    let (rest, _) = tag::<_, &str, VerboseError<&str>>("${")(input)?;
    let mut scopes = vec![Scope::Code { braces: 0 }];
    let mut escaped = false;
    let mut chars = rest.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let Some(scope) = scopes.last_mut() else {
            break;
        };
        match scope {
            Scope::Quoted(_) | Scope::Template if escaped => escaped = false,
            Scope::Quoted(_) | Scope::Template if c == '\\' => escaped = true,
            Scope::Quoted(q) => {
                if c == *q {
                    scopes.pop();
                }
            }
            Scope::Template => match c {
                '`' => {
                    scopes.pop();
                }
                '$' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    scopes.push(Scope::Code { braces: 0 });
                }
                _ => {}
            },
            Scope::Code { braces } => match c {
                '\'' | '"' => scopes.push(Scope::Quoted(c)),
                '`' => scopes.push(Scope::Template),
                '{' => *braces += 1,
                '}' if *braces > 0 => *braces -= 1,
                '}' => {
                    scopes.pop();
                    if scopes.is_empty() {
                        return Ok((
                            &rest[idx + 1..],
                            StringPart::Interpolation(rest[..idx].to_string()),
                        ));
                    }
                }
                _ => {}
            },
        }
    }

    Err(nom::Err::Error(VerboseError::from_error_kind(
        input,
        ErrorKind::TakeUntil,
    )))
}

fn parse_template_text(input: &str) -> ParserResult<StringPart> {
    context(
        "template text",
        alt((
            map(
                take_while1(|c: char| c != '`' && c != '\\' && c != '$'),
                |text: &str| StringPart::Literal(text.replace("\r\n", "\n")),
            ),
            map(parse_escaped_char, |c| StringPart::Literal(c.to_string())),
            // a `$` that does not open a placeholder
            map(terminated(tag("$"), not(char('{'))), |_| {
                StringPart::Literal("$".to_string())
            }),
        )),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_template(input: &str) -> ParserResult<Literal> {
    context(
        "template string",
        map(
            delimited(
                char('`'),
                many0(alt((parse_interpolation, parse_template_text))),
                char('`'),
            ),
            |parts| {
                // merge adjacent text so `a\nb` is one part
                let mut merged: Vec<StringPart> = Vec::with_capacity(parts.len());
                for part in parts {
                    if let StringPart::Literal(text) = &part {
                        if let Some(StringPart::Literal(prev)) = merged.last_mut() {
                            prev.push_str(text);
                            continue;
                        }
                    }
                    merged.push(part);
                }
                Literal::Template(merged)
            },
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_hex_literal(input: &str) -> ParserResult<Literal> {
    context(
        "hex literal",
        map_res(
            preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            |digits: &str| u64::from_str_radix(digits, 16).map(|n| Literal::Number(n as f64)),
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_decimal_literal(input: &str) -> ParserResult<Literal> {
    context(
        "number literal",
        map_res(
            recognize(tuple((
                alt((
                    recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                    recognize(pair(char('.'), digit1)),
                )),
                opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            ))),
            |s: &str| s.parse::<f64>().map(Literal::Number),
        ),
    )(input)
}

/// Parses a regex literal body and flags: `/pattern/flags`.
///
/// Only called where an operand is expected; elsewhere `/` is division.
/// A `/` inside a character class does not end the pattern.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_regex_literal(input: &str) -> ParserResult<Token> {
    let (rest, _) = char::<&str, VerboseError<&str>>('/')(input)?;
    let mut in_class = false;
    let mut escaped = false;

    for (idx, c) in rest.char_indices() {
        if c == '\n' || c == '\r' {
            break;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => {
                if idx == 0 {
                    break;
                }
                let (after, flags) =
                    take_while::<_, &str, VerboseError<&str>>(|c: char| c.is_ascii_alphanumeric())(
                        &rest[idx + 1..],
                    )?;
                return Ok((
                    after,
                    Token::Literal(Literal::Regex {
                        pattern: rest[..idx].to_string(),
                        flags: flags.to_string(),
                    }),
                ));
            }
            _ => {}
        }
    }

    Err(nom::Err::Error(VerboseError::from_error_kind(
        input,
        ErrorKind::Char,
    )))
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_literal(input: &str) -> ParserResult<Token> {
    context(
        "literal",
        map(
            alt((
                parse_double_quoted,
                parse_single_quoted,
                parse_template,
                parse_hex_literal,
                parse_decimal_literal,
            )),
            Token::Literal,
        ),
    )(input)
}
