use thiserror::Error;
use tracing::debug;

use crate::{
    analyzer::{self, SyntaxError},
    ast::Expression,
    config::EvaluatorConfig,
};

use super::{context::ExecutionContext, expression::ExpressionEvaluator};

/// Everything a script can do wrong. Rendered the way JavaScript names its
/// exceptions so messages read familiar to script authors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("SyntaxError: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("RangeError: {0}")]
    Range(String),
    #[error("URIError: {0}")]
    Uri(String),
    #[error("LimitExceeded: {0}")]
    LimitExceeded(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// A parsed script, ready to run against any number of inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledScript {
    source: String,
    expression: Expression,
}

impl CompiledScript {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

/// Feedback shown while a script is being typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    Info(String),
    Error(String),
}

impl PreviewOutcome {
    pub fn message(&self) -> &str {
        match self {
            PreviewOutcome::Info(message) | PreviewOutcome::Error(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PreviewOutcome::Error(_))
    }
}

pub const SCRIPT_REQUIRED: &str = "Script is required. Remember the selected text is represented with the \"sel\" variable. Example: sel.toUpperCase()";

/// Top level entry point for script evaluation.
///
/// Each run gets a fresh [`ExecutionContext`], so nothing a script computes
/// survives the call.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    #[tracing::instrument(level = "debug", skip(self, source))]
    pub fn compile(&self, source: &str) -> EvalResult<CompiledScript> {
        if source.chars().count() > self.config.max_expression_length {
            return Err(EvalError::LimitExceeded(format!(
                "Script is longer than {} characters",
                self.config.max_expression_length
            )));
        }
        let expression = analyzer::parse_script(source)?;
        Ok(CompiledScript {
            source: source.to_string(),
            expression,
        })
    }

    #[tracing::instrument(level = "debug", skip(self, script, input), fields(script = script.source()))]
    pub fn run(&self, script: &CompiledScript, input: &str) -> EvalResult<String> {
        let mut context = ExecutionContext::new(&self.config, input);
        let value = ExpressionEvaluator::new().eval_expression(script.expression(), &mut context)?;
        let output = value.to_js_string();
        context.check_string_length(&output)?;
        debug!(steps = context.steps(), "script evaluated");
        Ok(output)
    }

    pub fn evaluate(&self, source: &str, input: &str) -> EvalResult<String> {
        let script = self.compile(source)?;
        self.run(&script, input)
    }

    /// Evaluates a possibly unfinished script against a sample selection.
    pub fn preview(&self, source: &str, sample: &str) -> PreviewOutcome {
        if source.is_empty() {
            return PreviewOutcome::Error(SCRIPT_REQUIRED.to_string());
        }
        match self.evaluate(source, sample) {
            Ok(result) => PreviewOutcome::Info(format!("\"{}\" -> \"{}\"", sample, result)),
            Err(e) => PreviewOutcome::Error(format!("Script throw an error: {}", e)),
        }
    }
}

/// Evaluates `source` against `input` with the default guardrails.
pub fn evaluate(source: &str, input: &str) -> EvalResult<String> {
    Evaluator::default().evaluate(source, input)
}
