//! # Analyzer
//!
//! Turns the token stream produced by [`crate::tokenizer`] into an
//! [`ast::Expression`] using parser combinators.
//!
//! ## Architecture
//!
//! 1. **Core Parser Interface**: the [`Parser`] trait works on a token slice and
//!    a position, so backtracking is free.
//! 2. **Combinators**: small generic building blocks in [`combinators`], with
//!    constructor functions in [`prelude`].
//! 3. **Grammar**: the expression grammar in [`parsers::expression`].
//!
//! ```text
//! Source → Tokenizer → Analyzer → Evaluator
//! ```
//!
//! Besides the grammar, [`parse_script`] enforces two structural limits so
//! that hostile input cannot exhaust the stack: the nesting of brackets,
//! prefix operators and template placeholders, and the depth of the
//! resulting tree.
//!
//! ## Usage Example
//!
//! ```rust
//! use selner::analyzer::parse_script;
//!
//! let expr = parse_script("sel.trim().toUpperCase();").unwrap();
//! assert_eq!(expr.depth(), 5);
//! assert!(parse_script("sel.").is_err());
//! ```

pub mod combinators;
pub mod core;
pub mod parsers;
pub mod prelude;

pub use core::ParseError;
pub use core::ParseResult;
pub use core::Parser;

use thiserror::Error;

pub use crate::ast;
use crate::tokenizer::{
    keyword::Keyword,
    literal::{Literal, StringPart},
    symbol::{Delimiter, Operator},
    token::{significant_tokens, Span, Token, TokenSpan, Tokenizer, TokenizerError},
};

/// Deepest allowed nesting of brackets, prefix operators, arrows,
/// conditionals and template placeholders.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Deepest allowed syntax tree.
pub const MAX_TREE_DEPTH: usize = 256;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
    #[error("{message}{}", format_span(.span))]
    Parse { message: String, span: Option<Span> },
    #[error("Expression is too deeply nested")]
    TooDeep,
}

fn format_span(span: &Option<Span>) -> String {
    span.as_ref()
        .map(|s| format!(" ({})", s))
        .unwrap_or_default()
}

/// Parses a complete script: one expression, optionally followed by `;`.
#[tracing::instrument(level = "debug", skip(source))]
pub fn parse_script(source: &str) -> Result<ast::Expression, SyntaxError> {
    let spans = significant_tokens(Tokenizer::new().tokenize(source)?);
    check_nesting(&spans, 0)?;
    let expr = parse_tokens(&spans, true)?;
    if expr.depth() > MAX_TREE_DEPTH {
        return Err(SyntaxError::TooDeep);
    }
    Ok(expr)
}

/// Parses the source of a template placeholder. Its nesting was already
/// checked as part of the enclosing script.
pub(crate) fn parse_fragment(source: &str) -> Result<ast::Expression, SyntaxError> {
    let spans = significant_tokens(Tokenizer::new().tokenize(source)?);
    parse_tokens(&spans, false)
}

fn parse_tokens(spans: &[TokenSpan], allow_semicolon: bool) -> Result<ast::Expression, SyntaxError> {
    let tokens: Vec<Token> = spans.iter().map(|s| s.token.clone()).collect();

    let (mut pos, expr) = parsers::parse_expression()
        .parse(&tokens, 0)
        .map_err(|e| syntax_error(spans, &e))?;

    if allow_semicolon {
        if let Ok((next, _)) = parsers::parse_semicolon().parse(&tokens, pos) {
            pos = next;
        }
    }

    if pos < tokens.len() {
        return Err(unexpected_token(spans, pos));
    }
    Ok(expr)
}

fn syntax_error(spans: &[TokenSpan], error: &ParseError) -> SyntaxError {
    match error {
        ParseError::Failure {
            message, position, ..
        } => SyntaxError::Parse {
            message: message.clone(),
            span: spans.get(*position).map(TokenSpan::span),
        },
        other => unexpected_token(spans, other.get_position()),
    }
}

fn unexpected_token(spans: &[TokenSpan], position: usize) -> SyntaxError {
    let Some(span) = spans.get(position) else {
        return SyntaxError::Parse {
            message: "Unexpected end of input".to_string(),
            span: None,
        };
    };
    let message = match &span.token {
        Token::Operator(Operator::Assign) => "Invalid left-hand side in assignment".to_string(),
        Token::Identifier(name) => format!("Unexpected identifier '{}'", name),
        Token::Literal(Literal::String(_)) => "Unexpected string".to_string(),
        Token::Literal(Literal::Number(_)) => "Unexpected number".to_string(),
        Token::Literal(Literal::Template(_)) => "Unexpected template string".to_string(),
        other => format!("Unexpected token '{}'", other),
    };
    SyntaxError::Parse {
        message,
        span: Some(span.span()),
    }
}

fn is_prefix_operator(token: &Token) -> bool {
    matches!(
        token,
        Token::Operator(Operator::Not | Operator::Minus | Operator::Plus)
            | Token::Keyword(Keyword::Typeof)
    )
}

/// Rejects input whose parse would recurse deeper than
/// [`MAX_NESTING_DEPTH`].
///
/// Brackets count while open. Every `?` and `=>` opens a right-nested
/// subexpression for the rest of the input, and so does every placeholder of
/// a template string, whose source is checked recursively.
fn check_nesting(spans: &[TokenSpan], level: usize) -> Result<(), SyntaxError> {
    if level > MAX_NESTING_DEPTH {
        return Err(SyntaxError::TooDeep);
    }

    let mut brackets = 0usize;
    let mut right_nested = 0usize;
    let mut prefix_run = 0usize;

    for span in spans {
        match &span.token {
            Token::Delimiter(
                Delimiter::OpenParen | Delimiter::OpenBracket | Delimiter::OpenBrace,
            ) => brackets += 1,
            Token::Delimiter(
                Delimiter::CloseParen | Delimiter::CloseBracket | Delimiter::CloseBrace,
            ) => brackets = brackets.saturating_sub(1),
            Token::Operator(Operator::Question | Operator::Arrow) => right_nested += 1,
            Token::Literal(Literal::Template(parts)) => {
                for part in parts {
                    if let StringPart::Interpolation(source) = part {
                        let inner = significant_tokens(Tokenizer::new().tokenize(source)?);
                        check_nesting(&inner, level + brackets + right_nested + 1)?;
                    }
                }
            }
            _ => {}
        }

        if is_prefix_operator(&span.token) {
            prefix_run += 1;
        } else {
            prefix_run = 0;
        }

        if level + brackets + right_nested + prefix_run > MAX_NESTING_DEPTH {
            return Err(SyntaxError::TooDeep);
        }
    }

    Ok(())
}
