//! Script Evaluation
//!
//! Runs a parsed script against one selection and produces the replacement
//! text. Evaluation is synchronous and closed: a script can only reach its
//! input binding, the arrow-function parameters in scope, and the fixed set of
//! builtins. Every host capability name resolves to an inert empty object.
//!
//! # Core Components
//!
//! ## Evaluator
//! Compiles source into a [`CompiledScript`] and runs it against inputs. Also
//! produces the [`PreviewOutcome`] shown while a script is being edited.
//!
//! ## Expression Evaluator
//! Walks the expression tree, applying the coercion rules of [`Value`].
//!
//! ## Execution Context
//! Holds the input, the lexical scope chain of arrow functions, the step
//! budget and the compiled-regex cache for one run.
//!
//! ## Builtins
//! String, array, number and regex methods plus the global functions,
//! `Math` and `JSON`.
//!
//! # Evaluation Pipeline
//!
//! 1. The analyzer turns source into an AST, rejecting scripts over the
//!    configured length or nesting depth
//! 2. A fresh context is created per input
//! 3. The expression evaluator produces a value, ticking the step budget at
//!    every node and callback
//! 4. The value is converted to a string and checked against the size limit

pub mod builtins;
pub mod context;
pub mod evaluator;
pub mod expression;
pub mod value;

pub use evaluator::{
    evaluate, CompiledScript, EvalError, EvalResult, Evaluator, PreviewOutcome, SCRIPT_REQUIRED,
};
pub use value::Value;
