//! # Core Parser Definitions
//!
//! The parser interface and error type the combinators in
//! [`combinators`](super::combinators) are built on.

use thiserror::Error;

/// Parser over a slice of tokens.
///
/// A parser receives the whole input and the position to start at. On success
/// it returns the position after the consumed input together with the parsed
/// value. Parsers never mutate shared state, so backtracking is just retrying
/// from an earlier position.
///
/// # Type Parameters
///
/// * `I` - The input token type
/// * `O` - The output value type
pub trait Parser<I, O> {
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O>;
}

/// `Ok((new_pos, output))` on success.
pub type ParseResult<O> = Result<(usize, O), ParseError>;

/// Why a parser failed, and where.
///
/// Every variant carries the token position at which the failure was detected.
/// When several alternatives fail, the one that got furthest is reported since
/// it is usually the most relevant to the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected end of input at position {position}")]
    UnexpectedEOF {
        position: usize,
        context: Option<String>,
    },
    #[error("Unexpected token '{found}' at position {position}, expected {expected}")]
    Unexpected {
        expected: String,
        found: String,
        position: usize,
        context: Option<String>,
    },
    #[error("No alternative matched at position {position}")]
    NoAlternative {
        position: usize,
        context: Option<String>,
    },
    #[error("{message} at position {position}")]
    Failure {
        message: String,
        position: usize,
        context: Option<String>,
    },
}

impl ParseError {
    /// Records the innermost grammar rule that failed. Outer rules keep the
    /// first recorded context.
    pub fn with_context(self, ctx: &str) -> Self {
        fn fill(context: Option<String>, ctx: &str) -> Option<String> {
            context.or_else(|| Some(ctx.to_string()))
        }
        match self {
            ParseError::UnexpectedEOF { position, context } => ParseError::UnexpectedEOF {
                position,
                context: fill(context, ctx),
            },
            ParseError::Unexpected {
                expected,
                found,
                position,
                context,
            } => ParseError::Unexpected {
                expected,
                found,
                position,
                context: fill(context, ctx),
            },
            ParseError::NoAlternative { position, context } => ParseError::NoAlternative {
                position,
                context: fill(context, ctx),
            },
            ParseError::Failure {
                message,
                position,
                context,
            } => ParseError::Failure {
                message,
                position,
                context: fill(context, ctx),
            },
        }
    }

    /// A failure is a committed error: the input matched the rule's shape but
    /// is invalid, so alternatives and repetitions must not swallow it.
    pub fn is_failure(&self) -> bool {
        matches!(self, ParseError::Failure { .. })
    }

    pub fn get_position(&self) -> usize {
        match self {
            ParseError::UnexpectedEOF { position, .. } => *position,
            ParseError::Unexpected { position, .. } => *position,
            ParseError::NoAlternative { position, .. } => *position,
            ParseError::Failure { position, .. } => *position,
        }
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            ParseError::UnexpectedEOF { context, .. }
            | ParseError::Unexpected { context, .. }
            | ParseError::NoAlternative { context, .. }
            | ParseError::Failure { context, .. } => context.as_deref(),
        }
    }
}
