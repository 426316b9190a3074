//! # Tokenizer Component
//!
//! Lexical analysis of script expressions: raw text in, a stream of
//! [`TokenSpan`](token::TokenSpan) values out.
//!
//! ## Design Principles
//!
//! * **Position Information**: every token carries its byte range plus a
//!   1-based line and column so syntax errors can point at the offending
//!   character.
//! * **Format Preservation**: whitespace, newlines and comments are kept as
//!   tokens; [`significant_tokens`](token::significant_tokens) drops them before
//!   parsing.
//! * **Regex Awareness**: a `/` starts a regex literal only where an operand
//!   is expected, otherwise it is the division operator.
//!
//! ## Component Structure
//!
//! * [`token`]: token types and the [`Tokenizer`](token::Tokenizer) driver
//! * [`keyword`]: reserved words
//! * [`symbol`]: operators and delimiters
//! * [`literal`]: numbers, strings, template strings and regex literals
//! * [`whitespace`]: whitespace and newlines
//! * [`comment`]: line and block comments
//!
//! ## Usage Example
//!
//! ```rust
//! use selner::tokenizer::token::Tokenizer;
//!
//! let mut tokenizer = Tokenizer::new();
//! let tokens = tokenizer.tokenize("sel.toUpperCase()").unwrap();
//! assert_eq!(tokens.len(), 5);
//! ```

pub mod comment;
pub mod keyword;
pub mod literal;
pub mod symbol;
pub mod token;
pub mod whitespace;
