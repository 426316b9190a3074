//! # selner: sandboxed text transformation scripts
//!
//! selner transforms selected text with small JavaScript-like expressions
//! such as `sel.toUpperCase()` or `sel.split(',').map(s => s.trim()).join('\n')`,
//! and keeps a store of named scripts ordered by recent use.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Script → Tokenizer → Analyzer → AST → Evaluator → String
//! ```
//!
//! ### Stage 1: Tokenization
//!
//! The [`tokenizer`] module turns script text into tokens with `nom`,
//! including regex literals and template strings.
//!
//! ### Stage 2: Analysis
//!
//! The [`analyzer`] module applies token-level parser combinators to build
//! the [`ast`], rejecting statements, declarations and anything that could
//! loop. Nesting depth is bounded.
//!
//! ### Stage 3: Evaluation
//!
//! The [`eval`] module walks the tree inside a closed execution context.
//! Scripts see the selection as `sel`, a fixed set of builtins, and inert
//! empty objects in place of every host capability. A step budget and size
//! limits bound the work a script can cause.
//!
//! ## Persistence
//!
//! The [`repository`] keeps named scripts and the recency list as one JSON
//! document in a [`storage`] backend. The [`selner`] coordinator drives the
//! preview, save, run and remove flows on top of both.

pub mod analyzer;
pub mod ast;
pub mod config;
pub mod error;
pub mod eval;
pub mod repository;
pub mod selner;
pub mod storage;
pub mod tokenizer;

// Re-exports
pub use config::SelnerConfig;
pub use error::*;
pub use eval::{evaluate, CompiledScript, EvalError, Evaluator, PreviewOutcome, Value};
pub use repository::{RepositoryError, Script, ScriptRepository};
pub use selner::{CoordinatorError, Selner};
