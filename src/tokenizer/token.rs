use std::{fmt, str::FromStr};

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    combinator::recognize,
    error::{context, VerboseError},
    sequence::pair,
    IResult,
};
use thiserror::Error;

use super::{
    comment::parse_comment,
    keyword::Keyword,
    literal::{parse_literal, parse_regex_literal, Literal},
    symbol::{parse_delimiter, parse_operator, Delimiter, Operator},
    whitespace::{parse_newline, parse_whitespace},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Identifier(String),
    Operator(Operator),
    Delimiter(Delimiter),
    Literal(Literal),
    // Formatting
    Whitespace(String),
    Newline,
    Comment {
        content: String,
        comment_type: CommentType,
    },
}

impl Token {
    /// True for tokens the parser never sees.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::Whitespace(_) | Token::Newline | Token::Comment { .. }
        )
    }

    /// True when the token can end an operand, so a following `/` divides.
    fn ends_operand(&self) -> bool {
        match self {
            Token::Identifier(_) | Token::Literal(_) => true,
            Token::Keyword(Keyword::This) => true,
            Token::Delimiter(d) => matches!(
                d,
                Delimiter::CloseParen | Delimiter::CloseBracket | Delimiter::CloseBrace
            ),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "{}", k),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Operator(op) => write!(f, "{}", op),
            Token::Delimiter(d) => write!(f, "{}", d),
            Token::Literal(lit) => write!(f, "{}", lit),
            Token::Whitespace(_) => write!(f, "whitespace"),
            Token::Newline => write!(f, "newline"),
            Token::Comment { .. } => write!(f, "comment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentType {
    Line,  // //
    Block, // /* */
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    current_position: usize,
    current_line: usize,
    current_column: usize,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            current_position: 0,
            current_line: 1,   // 1-based
            current_column: 1, // 1-based
        }
    }

    #[tracing::instrument(level = "debug", skip(self, input))]
    pub fn tokenize(&mut self, input: &str) -> TokenizerResult<Vec<TokenSpan>> {
        let mut tokens: Vec<TokenSpan> = Vec::new();
        let mut remaining = input;
        let mut operand_expected = true;

        while !remaining.is_empty() {
            let start_position = self.current_position;
            let start_line = self.current_line;
            let start_column = self.current_column;

            let result = if operand_expected {
                alt((
                    parse_whitespace,
                    parse_newline,
                    parse_comment,
                    parse_regex_literal,
                    parse_literal,
                    parse_operator,
                    parse_delimiter,
                    parse_identifier,
                ))(remaining)
            } else {
                alt((
                    parse_whitespace,
                    parse_newline,
                    parse_comment,
                    parse_literal,
                    parse_operator,
                    parse_delimiter,
                    parse_identifier,
                ))(remaining)
            };

            match result {
                Ok((new_remaining, token)) => {
                    let consumed = &remaining[..(remaining.len() - new_remaining.len())];
                    self.update_position(consumed);

                    if !token.is_trivia() {
                        operand_expected = !token.ends_operand();
                    }

                    tokens.push(TokenSpan {
                        token,
                        start: start_position,
                        end: self.current_position,
                        line: start_line,
                        column: start_column,
                    });

                    remaining = new_remaining;
                }
                Err(e) => {
                    let found = remaining.chars().take(20).collect::<String>();
                    let span = Span {
                        start: self.current_position,
                        end: self.current_position + 1,
                        line: self.current_line,
                        column: self.current_column,
                    };
                    let error = match e {
                        nom::Err::Incomplete(e) => TokenizerError::ParseError {
                            message: format!("Incomplete input, {:?}", e),
                            found,
                            span,
                        },
                        nom::Err::Error(e) | nom::Err::Failure(e) => TokenizerError::ParseError {
                            message: describe_failure(remaining, &e),
                            found,
                            span,
                        },
                    };
                    tracing::debug!("{}", error);
                    return Err(error);
                }
            }
        }

        Ok(tokens)
    }

    fn update_position(&mut self, text: &str) {
        for c in text.chars() {
            self.current_position += c.len_utf8();
            if c == '\n' {
                self.current_line += 1;
                self.current_column = 1;
            } else {
                self.current_column += 1;
            }
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Short, single-line message for a failed token.
///
/// nom's `convert_error` renders a multi-line report with carets which is
/// too noisy for a one-line preview, so only the innermost context is kept.
fn describe_failure(input: &str, error: &VerboseError<&str>) -> String {
    let innermost = error.errors.iter().find_map(|(_, kind)| match kind {
        nom::error::VerboseErrorKind::Context(ctx) => Some(*ctx),
        _ => None,
    });
    let first = input.chars().next().map(|c| c.to_string()).unwrap_or_default();
    match (first.as_str(), innermost) {
        ("'" | "\"", _) => "Invalid or unexpected token: unterminated string".to_string(),
        ("`", _) => "Unterminated template literal".to_string(),
        ("/", _) => "Invalid regular expression: missing /".to_string(),
        (_, Some(ctx)) if !ctx.is_empty() => format!("Invalid or unexpected token in {}", ctx),
        _ => "Invalid or unexpected token".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub token: Token,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl TokenSpan {
    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Drops whitespace, newlines and comments.
pub fn significant_tokens(spans: Vec<TokenSpan>) -> Vec<TokenSpan> {
    spans.into_iter().filter(|s| !s.token.is_trivia()).collect()
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_identifier(input: &str) -> ParserResult<Token> {
    let (input, id) = context(
        "identifier",
        recognize(pair(
            take_while1(is_identifier_start),
            take_while(is_identifier_continue),
        )),
    )(input)?;

    let token = match id {
        "true" => Token::Literal(Literal::Boolean(true)),
        "false" => Token::Literal(Literal::Boolean(false)),
        "null" => Token::Literal(Literal::Null),
        "undefined" => Token::Literal(Literal::Undefined),
        _ => match Keyword::from_str(id) {
            Ok(kw) => Token::Keyword(kw),
            Err(_) => Token::Identifier(id.to_string()),
        },
    };

    Ok((input, token))
}

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

pub type TokenizerResult<T> = Result<T, TokenizerError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenizerError {
    #[error("{message} ({span})")]
    ParseError {
        message: String,
        found: String,
        span: Span,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn significant(input: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new();
        significant_tokens(tokenizer.tokenize(input).unwrap())
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_identifier_for_keyword() {
        let (rest, token) = parse_identifier("typeof sel").unwrap();
        assert_eq!(token, Token::Keyword(Keyword::Typeof));
        assert_eq!(rest, " sel");
    }

    #[test]
    fn test_identifier() {
        let (rest, token) = parse_identifier("$my_var123 other").unwrap();
        assert_eq!(token, Token::Identifier("$my_var123".to_string()));
        assert_eq!(rest, " other");
    }

    #[test]
    fn test_identifier_for_word_literals() {
        assert_eq!(
            parse_identifier("true").unwrap().1,
            Token::Literal(Literal::Boolean(true))
        );
        assert_eq!(
            parse_identifier("undefined").unwrap().1,
            Token::Literal(Literal::Undefined)
        );
        // prefix of a keyword stays an identifier
        assert_eq!(
            parse_identifier("newValue").unwrap().1,
            Token::Identifier("newValue".to_string())
        );
    }

    #[test]
    fn test_tokenizer_with_position() {
        let mut tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("sel\n  .trim()").unwrap();

        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].column, 1);
        assert_eq!(tokens[0].token, Token::Identifier("sel".to_string()));

        let dot = tokens
            .iter()
            .find(|t| t.token == Token::Operator(Operator::Dot))
            .unwrap();
        assert_eq!(dot.line, 2);
        assert_eq!(dot.column, 3);
        assert_eq!(dot.start, 6);
    }

    #[test]
    fn test_method_call() {
        assert_eq!(
            significant("sel.toUpperCase()"),
            vec![
                Token::Identifier("sel".to_string()),
                Token::Operator(Operator::Dot),
                Token::Identifier("toUpperCase".to_string()),
                Token::Delimiter(Delimiter::OpenParen),
                Token::Delimiter(Delimiter::CloseParen),
            ]
        );
    }

    #[test]
    fn test_slash_after_operand_divides() {
        let tokens = significant("sel.length / 2 / 1");
        assert_eq!(
            tokens
                .iter()
                .filter(|t| **t == Token::Operator(Operator::Divide))
                .count(),
            2
        );
    }

    #[test]
    fn test_slash_in_operand_position_is_regex() {
        let tokens = significant("sel.replace(/a\\/b/g, 'x')");
        assert!(tokens.contains(&Token::Literal(Literal::Regex {
            pattern: "a\\/b".to_string(),
            flags: "g".to_string(),
        })));

        let tokens = significant("(sel) / 2");
        assert!(tokens.contains(&Token::Operator(Operator::Divide)));
    }

    #[test]
    fn test_comments_are_trivia() {
        let tokens = significant("sel // the selection\n/* done */");
        assert_eq!(tokens, vec![Token::Identifier("sel".to_string())]);
    }

    #[test]
    fn test_error_position() {
        let mut tokenizer = Tokenizer::new();
        let err = tokenizer.tokenize("sel + 'abc").unwrap_err();
        match err {
            TokenizerError::ParseError { span, found, .. } => {
                assert_eq!(span.column, 7);
                assert_eq!(found, "'abc");
            }
        }
    }

    #[test]
    fn test_unknown_character() {
        let mut tokenizer = Tokenizer::new();
        assert!(tokenizer.tokenize("sel # 1").is_err());
    }
}
