use std::{cmp::Ordering, sync::Arc};

use crate::ast::{
    BinaryOperator, Expression, Literal, LogicalOperator, TemplatePart, UnaryOperator,
};

use super::{
    builtins::{self, number::power},
    context::ExecutionContext,
    evaluator::{EvalError, EvalResult},
    value::{Function, Lambda, Value},
};

/// Tree-walking evaluator for script expressions.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn eval_expression(&self, expr: &Expression, ctx: &mut ExecutionContext) -> EvalResult<Value> {
        ctx.tick()?;

        match expr {
            Expression::Literal(lit) => self.eval_literal(lit, ctx),
            Expression::Template(parts) => self.eval_template(parts, ctx),
            Expression::Array(items) => self.eval_array(items, ctx),
            Expression::Identifier(name) => ctx.lookup(name),
            Expression::Unary { op, operand } => self.eval_unary(*op, operand, ctx),
            Expression::Binary { op, left, right } => {
                let left = self.eval_expression(left, ctx)?;
                let right = self.eval_expression(right, ctx)?;
                self.eval_binary_op(*op, left, right, ctx)
            }
            Expression::Logical { op, left, right } => self.eval_logical(*op, left, right, ctx),
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expression(test, ctx)?.to_boolean() {
                    self.eval_expression(consequent, ctx)
                } else {
                    self.eval_expression(alternate, ctx)
                }
            }
            Expression::Arrow { params, body } => Ok(Value::Function(Function::Lambda(Arc::new(
                Lambda {
                    params: params.clone(),
                    body: body.clone(),
                    captured: ctx.scope(),
                },
            )))),
            Expression::Member { .. } | Expression::Index { .. } | Expression::Call { .. } => {
                Ok(self.eval_chain(expr, ctx)?.unwrap_or_default())
            }
        }
    }

    /// Evaluates member access, indexing and calls. `None` means an optional
    /// link met `null` or `undefined` and the rest of the chain was skipped.
    fn eval_chain(&self, expr: &Expression, ctx: &mut ExecutionContext) -> EvalResult<Option<Value>> {
        match expr {
            Expression::Member {
                object,
                property,
                optional,
            } => {
                let Some(target) = self.eval_link(object, ctx)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                builtins::get_property(&target, property).map(Some)
            }
            Expression::Index {
                object,
                index,
                optional,
            } => {
                let Some(target) = self.eval_link(object, ctx)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                let key = self.eval_expression(index, ctx)?;
                builtins::get_index(&target, &key).map(Some)
            }
            Expression::Call {
                callee,
                arguments,
                optional,
            } => {
                let Some(function) = self.eval_link(callee, ctx)? else {
                    return Ok(None);
                };
                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                let args = arguments
                    .iter()
                    .map(|arg| self.eval_expression(arg, ctx))
                    .collect::<EvalResult<Vec<_>>>()?;

                match function {
                    // arrow functions only run as callbacks of builtins
                    Value::Function(f) if !matches!(f, Function::Lambda(_)) => {
                        builtins::call_function(ctx, &f, args).map(Some)
                    }
                    _ => Err(not_a_function(callee)),
                }
            }
            other => self.eval_expression(other, ctx).map(Some),
        }
    }

    /// The object or callee of a chain link.
    fn eval_link(&self, expr: &Expression, ctx: &mut ExecutionContext) -> EvalResult<Option<Value>> {
        if is_chain(expr) {
            ctx.tick()?;
            self.eval_chain(expr, ctx)
        } else {
            self.eval_expression(expr, ctx).map(Some)
        }
    }

    fn eval_literal(&self, lit: &Literal, ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(match lit {
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::string(s.as_str()),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Null => Value::Null,
            Literal::Undefined => Value::Undefined,
            Literal::Regex { pattern, flags } => Value::Regex(ctx.regex(pattern, flags)?),
        })
    }

    fn eval_template(&self, parts: &[TemplatePart], ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Text(text) => out.push_str(text),
                TemplatePart::Expression(expr) => {
                    let value = self.eval_expression(expr, ctx)?;
                    out.push_str(&value.to_js_string());
                }
            }
            ctx.check_string_length(&out)?;
        }
        Ok(Value::from(out))
    }

    fn eval_array(&self, items: &[Expression], ctx: &mut ExecutionContext) -> EvalResult<Value> {
        ctx.check_array_length(items.len())?;
        let values = items
            .iter()
            .map(|item| self.eval_expression(item, ctx))
            .collect::<EvalResult<Vec<_>>>()?;
        ctx.array(values)
    }

    fn eval_unary(
        &self,
        op: UnaryOperator,
        operand: &Expression,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        if op == UnaryOperator::Typeof {
            if let Expression::Identifier(name) = operand {
                if !ctx.is_declared(name) {
                    return Ok(Value::from("undefined"));
                }
            }
            let value = self.eval_expression(operand, ctx)?;
            return Ok(Value::from(value.type_of()));
        }

        let value = self.eval_expression(operand, ctx)?;
        Ok(match op {
            UnaryOperator::Not => Value::Boolean(!value.to_boolean()),
            UnaryOperator::Negate => Value::Number(-value.to_number()),
            UnaryOperator::Plus => Value::Number(value.to_number()),
            UnaryOperator::Typeof => Value::from(value.type_of()),
        })
    }

    pub fn eval_binary_op(
        &self,
        op: BinaryOperator,
        left: Value,
        right: Value,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        let number = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
        let ordering = || left.compare(&right);

        Ok(match op {
            BinaryOperator::Add => {
                let (l, r) = (left.to_primitive(), right.to_primitive());
                if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                    let (l, r) = (l.to_js_string(), r.to_js_string());
                    if l.len() + r.len() > ctx.max_string_length() {
                        ctx.check_string_len(l.chars().count() + r.chars().count())?;
                    }
                    Value::from(l + &r)
                } else {
                    Value::Number(l.to_number() + r.to_number())
                }
            }
            BinaryOperator::Subtract => number(|a, b| a - b),
            BinaryOperator::Multiply => number(|a, b| a * b),
            BinaryOperator::Divide => number(|a, b| a / b),
            BinaryOperator::Modulo => number(|a, b| a % b),
            BinaryOperator::Power => number(power),
            BinaryOperator::StrictEqual => Value::Boolean(left.strict_equals(&right)),
            BinaryOperator::StrictNotEqual => Value::Boolean(!left.strict_equals(&right)),
            BinaryOperator::Equal => Value::Boolean(left.loose_equals(&right)),
            BinaryOperator::NotEqual => Value::Boolean(!left.loose_equals(&right)),
            BinaryOperator::LessThan => Value::Boolean(ordering() == Some(Ordering::Less)),
            BinaryOperator::GreaterThan => Value::Boolean(ordering() == Some(Ordering::Greater)),
            BinaryOperator::LessThanEqual => Value::Boolean(matches!(
                ordering(),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOperator::GreaterThanEqual => Value::Boolean(matches!(
                ordering(),
                Some(Ordering::Greater | Ordering::Equal)
            )),
        })
    }

    fn eval_logical(
        &self,
        op: LogicalOperator,
        left: &Expression,
        right: &Expression,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        let left = self.eval_expression(left, ctx)?;
        let short_circuit = match op {
            LogicalOperator::And => !left.to_boolean(),
            LogicalOperator::Or => left.to_boolean(),
            LogicalOperator::Nullish => !left.is_nullish(),
        };
        if short_circuit {
            Ok(left)
        } else {
            self.eval_expression(right, ctx)
        }
    }
}

fn is_chain(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::Member { .. } | Expression::Index { .. } | Expression::Call { .. }
    )
}

fn not_a_function(callee: &Expression) -> EvalError {
    EvalError::Type(format!("{} is not a function", describe(callee)))
}

/// Source-like rendering of a callee for error messages.
fn describe(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(name) => name.clone(),
        Expression::Member {
            object,
            property,
            optional,
        } => format!(
            "{}{}{}",
            describe(object),
            if *optional { "?." } else { "." },
            property
        ),
        Expression::Index { object, .. } => format!("{}[...]", describe(object)),
        Expression::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "(intermediate value)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analyzer::parse_script, config::EvaluatorConfig};

    fn eval(source: &str, input: &str) -> EvalResult<Value> {
        let expr = parse_script(source).unwrap();
        let mut ctx = ExecutionContext::new(&EvaluatorConfig::default(), input);
        ExpressionEvaluator::new().eval_expression(&expr, &mut ctx)
    }

    fn eval_str(source: &str) -> String {
        eval(source, "").unwrap().to_js_string()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("1 + 2 * 3"), "7");
        assert_eq!(eval_str("2 ** 3 ** 2"), "512");
        assert_eq!(eval_str("-7 % 3"), "-1");
        assert_eq!(eval_str("1 / 0"), "Infinity");
        assert_eq!(eval_str("0.1 + 0.2"), "0.30000000000000004");
        assert_eq!(eval_str("'3' * '4'"), "12");
        assert_eq!(eval_str("1 ** Infinity"), "NaN");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval_str("'a' + 1 + 2"), "a12");
        assert_eq!(eval_str("1 + 2 + 'a'"), "3a");
        assert_eq!(eval_str("[1, 2] + ''"), "1,2");
        assert_eq!(eval_str("null + 'x'"), "nullx");
        assert_eq!(eval_str("true + 1"), "2");
    }

    #[test]
    fn test_comparison() {
        assert_eq!(eval_str("'10' < '9'"), "true");
        assert_eq!(eval_str("'10' < 9"), "false");
        assert_eq!(eval_str("NaN <= NaN"), "false");
        assert_eq!(eval_str("null == undefined"), "true");
        assert_eq!(eval_str("null === undefined"), "false");
        assert_eq!(eval_str("'1' == 1"), "true");
        assert_eq!(eval_str("'1' !== 1"), "true");
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        assert_eq!(eval_str("'' || 'fallback'"), "fallback");
        assert_eq!(eval_str("0 ?? 'fallback'"), "0");
        assert_eq!(eval_str("null ?? 'fallback'"), "fallback");
        assert_eq!(eval_str("false && nope()"), "false");
        assert_eq!(eval_str("1 ? 'yes' : nope"), "yes");
    }

    #[test]
    fn test_typeof() {
        assert_eq!(eval_str("typeof undeclared"), "undefined");
        assert_eq!(eval_str("typeof sel"), "string");
        assert_eq!(eval_str("typeof process"), "object");
        assert_eq!(eval_str("typeof sel.trim"), "function");
        assert_eq!(eval_str("typeof (x => x)"), "function");
        assert_eq!(eval_str("typeof null"), "object");
        assert_eq!(eval_str("typeof Math"), "object");
    }

    #[test]
    fn test_optional_chaining() {
        assert_eq!(eval_str("sel.match(/x/)?.length"), "undefined");
        assert_eq!(eval_str("sel.match(/x/)?.[0].length"), "undefined");
        assert_eq!(eval_str("null?.foo.bar.baz()"), "undefined");
        assert_eq!(eval_str("sel.nope?.()"), "undefined");
        let err = eval("sel.match(/x/).length", "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot read properties of null (reading 'length')"
        );
    }

    #[test]
    fn test_templates() {
        assert_eq!(eval("`<${sel}>`", "x").unwrap().to_js_string(), "<x>");
        assert_eq!(eval_str("`${1 + 1}${[1, [2, 3]]}`"), "21,2,3");
    }

    #[test]
    fn test_arrow_functions_are_only_callbacks() {
        let err = eval("(x => x)(1)", "").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: (intermediate value) is not a function");
        assert_eq!(
            eval("[1, 2].map(x => [3].map(y => x + y))", "")
                .unwrap()
                .to_js_string(),
            "4,5"
        );
    }

    #[test]
    fn test_parameters_shadow_input() {
        assert_eq!(
            eval("['a'].map(sel => sel + '!')", "input")
                .unwrap()
                .to_js_string(),
            "a!"
        );
    }

    #[test]
    fn test_step_budget_is_enforced() {
        let expr = parse_script("sel.split('').map(c => c + c).join('')").unwrap();
        let config = EvaluatorConfig {
            max_steps: 50,
            ..Default::default()
        };
        let mut ctx = ExecutionContext::new(&config, &"x".repeat(100));
        assert!(matches!(
            ExpressionEvaluator::new().eval_expression(&expr, &mut ctx),
            Err(EvalError::LimitExceeded(_))
        ));
    }
}
