use std::{collections::HashMap, sync::Arc};

use crate::config::EvaluatorConfig;

use super::{
    builtins::{global, regex::JsRegex},
    evaluator::{EvalError, EvalResult},
    expression::ExpressionEvaluator,
    value::{Array, Lambda, Value},
};

/// Parameters of one arrow function invocation, linked to the scope the
/// arrow function was written in.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: Vec<(String, Value)>,
    parent: Option<Arc<Scope>>,
    depth: usize,
}

impl Scope {
    pub fn new(bindings: Vec<(String, Value)>, parent: Option<Arc<Scope>>) -> Self {
        let depth = bindings
            .iter()
            .map(|(_, value)| value.nesting())
            .chain(parent.as_ref().map(|scope| scope.depth))
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            bindings,
            parent,
            depth,
        }
    }

    /// Levels of scopes, closures and arrays reachable from this scope.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .rev()
            .find(|(binding, _)| binding == name)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    max_steps: usize,
    max_string_length: usize,
    max_array_length: usize,
    max_nesting_depth: usize,
}

/// The closed world a script runs in.
///
/// Names resolve against arrow function parameters first, then the input
/// binding, then the fixed set of builtins. Nothing else is reachable: the
/// host's globals are never consulted, and the usual ambient names are bound
/// to an inert object.
pub struct ExecutionContext {
    input_binding: String,
    input: Value,
    limits: Limits,
    steps: usize,
    scope: Option<Arc<Scope>>,
    regex_cache: HashMap<(String, String), Arc<JsRegex>>,
}

impl ExecutionContext {
    pub fn new(config: &EvaluatorConfig, input: &str) -> Self {
        Self {
            input_binding: config.input_binding.clone(),
            input: Value::string(input),
            limits: Limits {
                max_steps: config.max_steps,
                max_string_length: config.max_string_length,
                max_array_length: config.max_array_length,
                max_nesting_depth: config.max_nesting_depth,
            },
            steps: 0,
            scope: None,
            regex_cache: HashMap::new(),
        }
    }

    /// Counts one unit of work against the step budget.
    pub fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(EvalError::LimitExceeded(format!(
                "Evaluation exceeded {} steps",
                self.limits.max_steps
            )));
        }
        Ok(())
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn lookup(&self, name: &str) -> EvalResult<Value> {
        self.resolve(name)
            .ok_or_else(|| EvalError::Reference(name.to_string()))
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    fn resolve(&self, name: &str) -> Option<Value> {
        let mut scope = self.scope.as_deref();
        while let Some(current) = scope {
            if let Some(value) = current.get(name) {
                return Some(value.clone());
            }
            scope = current.parent.as_deref();
        }
        if name == self.input_binding {
            return Some(self.input.clone());
        }
        global::lookup(name)
    }

    pub fn scope(&self) -> Option<Arc<Scope>> {
        self.scope.clone()
    }

    /// Runs an arrow function. Missing arguments are `undefined`, extra
    /// arguments are ignored.
    pub fn call_lambda(&mut self, lambda: &Lambda, args: &[Value]) -> EvalResult<Value> {
        self.tick()?;
        let bindings = lambda
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| (param.clone(), args.get(i).cloned().unwrap_or_default()))
            .collect();
        let scope = Scope::new(bindings, lambda.captured.clone());
        self.check_nesting(scope.depth())?;
        let scope = Arc::new(scope);

        let saved = std::mem::replace(&mut self.scope, Some(scope));
        let result = ExpressionEvaluator::new().eval_expression(&lambda.body, self);
        self.scope = saved;
        result
    }

    /// Compiled regex for a pattern, shared across one evaluation.
    pub fn regex(&mut self, pattern: &str, flags: &str) -> EvalResult<Arc<JsRegex>> {
        let key = (pattern.to_string(), flags.to_string());
        if let Some(re) = self.regex_cache.get(&key) {
            return Ok(re.clone());
        }
        let re = Arc::new(JsRegex::new(pattern, flags)?);
        self.regex_cache.insert(key, re.clone());
        Ok(re)
    }

    pub fn max_string_length(&self) -> usize {
        self.limits.max_string_length
    }

    /// Fails when a string of `chars` characters would be too long.
    pub fn check_string_len(&self, chars: usize) -> EvalResult<()> {
        if chars > self.limits.max_string_length {
            return Err(EvalError::LimitExceeded(format!(
                "String length exceeds {} characters",
                self.limits.max_string_length
            )));
        }
        Ok(())
    }

    pub fn check_string_length(&self, s: &str) -> EvalResult<()> {
        // byte length bounds the char count from above
        if s.len() <= self.limits.max_string_length {
            return Ok(());
        }
        self.check_string_len(s.chars().count())
    }

    /// Builds an array, failing when it or anything nested inside it is over
    /// a limit. Every array a script produces is built here, so walking or
    /// stringifying one never does more work than the limits allow.
    pub fn array(&self, items: Vec<Value>) -> EvalResult<Value> {
        let array = Array::new(items);
        self.check_array_length(array.elements())?;
        self.check_nesting(array.depth())?;
        if array.text_len() > self.limits.max_string_length {
            return Err(EvalError::LimitExceeded(format!(
                "Array string form exceeds {} characters",
                self.limits.max_string_length
            )));
        }
        Ok(Value::Array(Arc::new(array)))
    }

    pub fn check_nesting(&self, depth: usize) -> EvalResult<()> {
        if depth > self.limits.max_nesting_depth {
            return Err(EvalError::LimitExceeded(format!(
                "Values nest deeper than {} levels",
                self.limits.max_nesting_depth
            )));
        }
        Ok(())
    }

    pub fn check_array_length(&self, len: usize) -> EvalResult<()> {
        if len > self.limits.max_array_length {
            return Err(EvalError::LimitExceeded(format!(
                "Array length exceeds {} elements",
                self.limits.max_array_length
            )));
        }
        Ok(())
    }
}
