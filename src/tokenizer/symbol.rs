//! # Symbol Token Handling
//!
//! Operators and delimiters recognized in expressions.
//!
//! Symbols are matched longest first so that `===` is not read as `==` followed
//! by `=`, and `?.` is not read as `?` followed by `.`.

use std::fmt;

use strum_macros::{AsRefStr, Display, EnumString};

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::satisfy,
    combinator::{map, not, peek, value},
    error::context,
    sequence::terminated,
};

use super::token::{ParserResult, Token};

/// Operators of the expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
pub enum Operator {
    /// Arrow function (`=>`)
    #[strum(serialize = "=>")]
    Arrow,

    /// Member access (`.`)
    #[strum(serialize = ".")]
    Dot,
    /// Optional member access (`?.`)
    #[strum(serialize = "?.")]
    OptionalDot,

    /// Strict equality (`===`)
    #[strum(serialize = "===")]
    StrictEqual,
    /// Strict inequality (`!==`)
    #[strum(serialize = "!==")]
    StrictNotEqual,
    /// Loose equality (`==`)
    #[strum(serialize = "==")]
    EqualEqual,
    /// Loose inequality (`!=`)
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,

    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "**")]
    Power,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,

    /// Logical AND (`&&`)
    #[strum(serialize = "&&")]
    And,
    /// Logical OR (`||`)
    #[strum(serialize = "||")]
    Or,
    /// Nullish coalescing (`??`)
    #[strum(serialize = "??")]
    Nullish,
    /// Logical NOT (`!`)
    #[strum(serialize = "!")]
    Not,
    /// Conditional (`?`)
    #[strum(serialize = "?")]
    Question,

    /// Assignment (`=`). Tokenized only so that it can be rejected with a clear error.
    #[strum(serialize = "=")]
    Assign,
}

/// Structural punctuation.
///
/// `Display` is written by hand because strum reads a lone `}` as a format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
pub enum Delimiter {
    #[strum(serialize = "(")]
    OpenParen,
    #[strum(serialize = ")")]
    CloseParen,
    #[strum(serialize = "[")]
    OpenBracket,
    #[strum(serialize = "]")]
    CloseBracket,
    #[strum(serialize = "{")]
    OpenBrace,
    #[strum(serialize = "}")]
    CloseBrace,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = ";")]
    Semicolon,
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_operator(input: &str) -> ParserResult<Token> {
    context(
        "operator",
        map(
            alt((
                alt((
                    value(Operator::StrictEqual, tag("===")),
                    value(Operator::StrictNotEqual, tag("!==")),
                    value(Operator::Arrow, tag("=>")),
                    value(Operator::EqualEqual, tag("==")),
                    value(Operator::NotEqual, tag("!=")),
                    value(Operator::GreaterEqual, tag(">=")),
                    value(Operator::LessEqual, tag("<=")),
                    value(Operator::And, tag("&&")),
                    value(Operator::Or, tag("||")),
                    value(Operator::Nullish, tag("??")),
                    value(Operator::Power, tag("**")),
                    // `a?.5:1` is a conditional, not an optional member access
                    value(
                        Operator::OptionalDot,
                        terminated(tag("?."), peek(not(satisfy(|c| c.is_ascii_digit())))),
                    ),
                )),
                alt((
                    value(Operator::Greater, tag(">")),
                    value(Operator::Less, tag("<")),
                    value(Operator::Plus, tag("+")),
                    value(Operator::Minus, tag("-")),
                    value(Operator::Multiply, tag("*")),
                    value(Operator::Divide, tag("/")),
                    value(Operator::Modulo, tag("%")),
                    value(Operator::Not, tag("!")),
                    value(Operator::Question, tag("?")),
                    value(Operator::Dot, tag(".")),
                    value(Operator::Assign, tag("=")),
                )),
            )),
            Token::Operator,
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_delimiter(input: &str) -> ParserResult<Token> {
    context(
        "delimiter",
        map(
            alt((
                value(Delimiter::OpenParen, tag("(")),
                value(Delimiter::CloseParen, tag(")")),
                value(Delimiter::OpenBracket, tag("[")),
                value(Delimiter::CloseBracket, tag("]")),
                value(Delimiter::OpenBrace, tag("{")),
                value(Delimiter::CloseBrace, tag("}")),
                value(Delimiter::Comma, tag(",")),
                value(Delimiter::Colon, tag(":")),
                value(Delimiter::Semicolon, tag(";")),
            )),
            Token::Delimiter,
        ),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_longest_match() {
        let (rest, token) = parse_operator("===b").unwrap();
        assert_eq!(token, Token::Operator(Operator::StrictEqual));
        assert_eq!(rest, "b");

        let (rest, token) = parse_operator("=>x").unwrap();
        assert_eq!(token, Token::Operator(Operator::Arrow));
        assert_eq!(rest, "x");

        let (rest, token) = parse_operator("**2").unwrap();
        assert_eq!(token, Token::Operator(Operator::Power));
        assert_eq!(rest, "2");
    }

    #[test]
    fn test_optional_dot_before_digit() {
        let (rest, token) = parse_operator("?.5:1").unwrap();
        assert_eq!(token, Token::Operator(Operator::Question));
        assert_eq!(rest, ".5:1");

        let (rest, token) = parse_operator("?.length").unwrap();
        assert_eq!(token, Token::Operator(Operator::OptionalDot));
        assert_eq!(rest, "length");
    }

    #[test]
    fn test_delimiters() {
        for text in ["(", ")", "[", "]", "{", "}", ",", ":", ";"] {
            let (rest, token) = parse_delimiter(text).unwrap();
            assert_eq!(rest, "");
            assert_eq!(token, Token::Delimiter(Delimiter::from_str(text).unwrap()));
        }
    }

    #[test]
    fn test_display_matches_source_text() {
        assert_eq!(Operator::Nullish.to_string(), "??");
        assert_eq!(Delimiter::Semicolon.to_string(), ";");
    }

    #[test]
    fn test_every_delimiter_displays_as_its_text() {
        for text in ["(", ")", "[", "]", "{", "}", ",", ":", ";"] {
            let delimiter = Delimiter::from_str(text).unwrap();
            assert_eq!(delimiter.to_string(), text);
            assert_eq!(Token::Delimiter(delimiter).to_string(), text);
        }
    }
}
