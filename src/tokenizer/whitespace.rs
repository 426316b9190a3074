//! # Whitespace Token Handling
//!
//! Whitespace is preserved as tokens so token spans map back onto the source
//! text exactly. The parser never sees these tokens.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    combinator::map,
    error::context,
};

use super::token::{ParserResult, Token};

/// Parses a run of horizontal whitespace.
///
/// Besides spaces and tabs this accepts the other characters JavaScript
/// treats as whitespace (no-break space, BOM, Unicode space separators), since
/// expressions are often pasted from rich-text sources.
///
/// # Examples
///
/// ```
/// # use selner::tokenizer::whitespace::parse_whitespace;
/// # use selner::tokenizer::token::Token;
/// let (rest, token) = parse_whitespace("   sel").unwrap();
/// assert_eq!(token, Token::Whitespace("   ".to_string()));
/// assert_eq!(rest, "sel");
/// ```
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_whitespace(input: &str) -> ParserResult<Token> {
    context(
        "whitespace expected",
        map(
            take_while1(|c: char| (c != '\n' && c != '\r' && c.is_whitespace()) || c == '\u{feff}'),
            |ws: &str| Token::Whitespace(ws.to_string()),
        ),
    )(input)
}

/// Parses `\n`, `\r\n` or a lone `\r`.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_newline(input: &str) -> ParserResult<Token> {
    context(
        "newline expected",
        map(alt((tag("\r\n"), tag("\n"), tag("\r"))), |_| Token::Newline),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace() {
        let (rest, token) = parse_whitespace("\t\t  sel").unwrap();
        assert_eq!(token, Token::Whitespace("\t\t  ".to_string()));
        assert_eq!(rest, "sel");

        let (rest, token) = parse_whitespace("\u{a0}x").unwrap();
        assert_eq!(token, Token::Whitespace("\u{a0}".to_string()));
        assert_eq!(rest, "x");
    }

    #[test]
    fn test_whitespace_stops_at_newline() {
        let (rest, token) = parse_whitespace("  \nsel").unwrap();
        assert_eq!(token, Token::Whitespace("  ".to_string()));
        assert_eq!(rest, "\nsel");
    }

    #[test]
    fn test_newline() {
        let (rest, token) = parse_newline("\r\nworld").unwrap();
        assert_eq!(token, Token::Newline);
        assert_eq!(rest, "world");

        let (rest, token) = parse_newline("\rworld").unwrap();
        assert_eq!(token, Token::Newline);
        assert_eq!(rest, "world");
    }

    #[test]
    fn test_error() {
        assert!(parse_whitespace("sel").is_err());
        assert!(parse_newline("sel").is_err());
    }
}
