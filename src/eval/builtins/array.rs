//! `Array.prototype` methods. Arrays are immutable values, so `reverse` and
//! `sort` return new arrays.

use std::{cmp::Ordering, sync::Arc};

use super::{arg, call_callback, relative_index, relative_index_or, require_callback, to_integer};
use crate::eval::{
    context::ExecutionContext,
    evaluator::{EvalError, EvalResult},
    value::{Array, Value},
};

pub const METHODS: &[&str] = &[
    "join",
    "map",
    "filter",
    "reverse",
    "slice",
    "includes",
    "indexOf",
    "lastIndexOf",
    "sort",
    "concat",
    "at",
    "some",
    "every",
    "find",
    "findIndex",
    "reduce",
    "flat",
    "toString",
];

pub fn call_method(
    ctx: &mut ExecutionContext,
    items: &Arc<Array>,
    name: &str,
    args: &[Value],
) -> EvalResult<Value> {
    let value = match name {
        "join" => {
            let separator = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.to_js_string(),
            };
            join(ctx, items, &separator)?
        }
        "toString" => join(ctx, items, ",")?,
        "map" => {
            let callback = require_callback(args, "map")?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(call_callback(ctx, callback, callback_args(items, item, i))?);
            }
            ctx.array(out)?
        }
        "filter" => {
            let callback = require_callback(args, "filter")?;
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if call_callback(ctx, callback, callback_args(items, item, i))?.to_boolean() {
                    out.push(item.clone());
                }
            }
            ctx.array(out)?
        }
        "some" | "every" | "find" | "findIndex" => {
            let callback = require_callback(args, name)?;
            let mut found = None;
            for (i, item) in items.iter().enumerate() {
                let hit = call_callback(ctx, callback, callback_args(items, item, i))?.to_boolean();
                if hit != (name == "every") {
                    found = Some(i);
                    break;
                }
            }
            match (name, found) {
                ("some", found) => Value::Boolean(found.is_some()),
                ("every", found) => Value::Boolean(found.is_none()),
                ("find", found) => found.map(|i| items[i].clone()).unwrap_or_default(),
                (_, found) => found.map(Value::from).unwrap_or(Value::Number(-1.0)),
            }
        }
        "reduce" => {
            let callback = require_callback(args, "reduce")?;
            let mut indexed = items.iter().enumerate();
            let mut acc = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match indexed.next() {
                    Some((_, first)) => first.clone(),
                    None => {
                        return Err(EvalError::Type(
                            "Reduce of empty array with no initial value".to_string(),
                        ))
                    }
                },
            };
            for (i, item) in indexed {
                acc = call_callback(
                    ctx,
                    callback,
                    vec![acc, item.clone(), Value::from(i), Value::Array(items.clone())],
                )?;
            }
            acc
        }
        "reverse" => ctx.array(items.iter().rev().cloned().collect())?,
        "slice" => {
            let start = relative_index(&arg(args, 0), items.len());
            let end = relative_index_or(&arg(args, 1), items.len(), items.len());
            ctx.array(items[start..end.max(start)].to_vec())?
        }
        "includes" => {
            let target = arg(args, 0);
            let from = relative_index(&arg(args, 1), items.len());
            Value::Boolean(items[from..].iter().any(|item| item.same_value_zero(&target)))
        }
        "indexOf" => {
            let target = arg(args, 0);
            let from = relative_index(&arg(args, 1), items.len());
            items[from..]
                .iter()
                .position(|item| item.strict_equals(&target))
                .map(|i| Value::from(i + from))
                .unwrap_or(Value::Number(-1.0))
        }
        "lastIndexOf" => {
            let target = arg(args, 0);
            items
                .iter()
                .rposition(|item| item.strict_equals(&target))
                .map(Value::from)
                .unwrap_or(Value::Number(-1.0))
        }
        "at" => {
            let n = to_integer(&arg(args, 0));
            let i = if n < 0.0 { items.len() as f64 + n } else { n };
            if i < 0.0 {
                Value::Undefined
            } else {
                items.get(i as usize).cloned().unwrap_or_default()
            }
        }
        "concat" => {
            let mut out = items.to_vec();
            for value in args {
                match value {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
                ctx.check_array_length(out.len())?;
            }
            ctx.array(out)?
        }
        "flat" => {
            let depth = match arg(args, 0) {
                Value::Undefined => 1.0,
                other => to_integer(&other),
            };
            let mut out = Vec::new();
            flatten(ctx, items, depth, &mut out)?;
            ctx.array(out)?
        }
        "sort" => {
            let comparator = match arg(args, 0) {
                Value::Undefined => None,
                callback @ Value::Function(_) => Some(callback),
                other => {
                    return Err(EvalError::Type(format!(
                        "The comparison function must be either a function or undefined: {}",
                        other
                    )))
                }
            };
            let sorted = sort(ctx, items, comparator.as_ref())?;
            ctx.array(sorted)?
        }
        _ => return Err(EvalError::Type(format!("array.{} is not a function", name))),
    };
    Ok(value)
}

fn callback_args(items: &Arc<Array>, item: &Value, index: usize) -> Vec<Value> {
    vec![item.clone(), Value::from(index), Value::Array(items.clone())]
}

fn join(ctx: &ExecutionContext, items: &[Value], separator: &str) -> EvalResult<Value> {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        if !item.is_nullish() {
            out.push_str(&item.to_js_string());
        }
        ctx.check_string_length(&out)?;
    }
    Ok(Value::from(out))
}

fn flatten(
    ctx: &ExecutionContext,
    items: &[Value],
    depth: f64,
    out: &mut Vec<Value>,
) -> EvalResult<()> {
    for item in items {
        match item {
            Value::Array(inner) if depth >= 1.0 => flatten(ctx, inner, depth - 1.0, out)?,
            other => out.push(other.clone()),
        }
        ctx.check_array_length(out.len())?;
    }
    Ok(())
}

/// Stable merge sort. The comparator is script code and may fail or be
/// inconsistent, which rules out the standard library sorts.
fn sort(
    ctx: &mut ExecutionContext,
    items: &[Value],
    comparator: Option<&Value>,
) -> EvalResult<Vec<Value>> {
    // undefined always sorts last and is never passed to the comparator
    let (mut defined, undefined): (Vec<Value>, Vec<Value>) = items
        .iter()
        .cloned()
        .partition(|item| !matches!(item, Value::Undefined));

    merge_sort(ctx, &mut defined, comparator)?;
    defined.extend(undefined);
    Ok(defined)
}

fn merge_sort(
    ctx: &mut ExecutionContext,
    items: &mut Vec<Value>,
    comparator: Option<&Value>,
) -> EvalResult<()> {
    if items.len() <= 1 {
        return Ok(());
    }
    let mut right = items.split_off(items.len() / 2);
    merge_sort(ctx, items, comparator)?;
    merge_sort(ctx, &mut right, comparator)?;

    let left = std::mem::take(items);
    items.reserve(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        let take_right = compare(ctx, l, r, comparator)? == Ordering::Greater;
        let next = if take_right { right.next() } else { left.next() };
        items.extend(next);
    }
    items.extend(left);
    items.extend(right);
    Ok(())
}

fn compare(
    ctx: &mut ExecutionContext,
    a: &Value,
    b: &Value,
    comparator: Option<&Value>,
) -> EvalResult<Ordering> {
    match comparator {
        Some(callback) => {
            let n = call_callback(ctx, callback, vec![a.clone(), b.clone()])?.to_number();
            Ok(if n > 0.0 {
                Ordering::Greater
            } else if n < 0.0 {
                Ordering::Less
            } else {
                Ordering::Equal
            })
        }
        None => {
            ctx.tick()?;
            Ok(a.to_js_string().cmp(&b.to_js_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::{evaluate, EvalError};
    use pretty_assertions::assert_eq;

    fn run(source: &str, input: &str) -> String {
        evaluate(source, input).unwrap()
    }

    #[test]
    fn test_map_filter_join() {
        assert_eq!(
            run("sel.split(' ').map(w => w[0].toUpperCase() + w.slice(1)).join(' ')", "hello big world"),
            "Hello Big World"
        );
        assert_eq!(run("sel.split(',').filter(x => x).join('|')", "a,,b,"), "a|b");
        assert_eq!(run("sel.split('').map((c, i) => i).join()", "abc"), "0,1,2");
        assert_eq!(run("[1, null, undefined, 2].join('-')", ""), "1---2");
        assert_eq!(run("['1', '2'].map(Number).map(n => n + 1)", ""), "2,3");
    }

    #[test]
    fn test_searching() {
        assert_eq!(run("[1, 2, 3].includes(2)", ""), "true");
        assert_eq!(run("[NaN].includes(NaN)", ""), "true");
        assert_eq!(run("[NaN].indexOf(NaN)", ""), "-1");
        assert_eq!(run("[1, 2, 1].indexOf(1, 1)", ""), "2");
        assert_eq!(run("[1, 2, 1].lastIndexOf(1)", ""), "2");
        assert_eq!(run("[1, 2, 3].find(x => x > 1)", ""), "2");
        assert_eq!(run("[1, 2, 3].find(x => x > 5)", ""), "undefined");
        assert_eq!(run("[1, 2, 3].findIndex(x => x > 1)", ""), "1");
        assert_eq!(run("[1, 2, 3].some(x => x > 2)", ""), "true");
        assert_eq!(run("[1, 2, 3].every(x => x > 2)", ""), "false");
        assert_eq!(run("[].every(x => false)", ""), "true");
    }

    #[test]
    fn test_reduce() {
        assert_eq!(run("[1, 2, 3].reduce((a, b) => a + b)", ""), "6");
        assert_eq!(run("[1, 2, 3].reduce((a, b) => a + b, '')", ""), "123");
        assert_eq!(
            evaluate("[].reduce((a, b) => a + b)", "").unwrap_err().to_string(),
            "TypeError: Reduce of empty array with no initial value"
        );
    }

    #[test]
    fn test_sort() {
        assert_eq!(run("[10, 9, 1].sort()", ""), "1,10,9");
        assert_eq!(run("[10, 9, 1].sort((a, b) => a - b)", ""), "1,9,10");
        assert_eq!(run("[undefined, 'b', 'a'].sort()", ""), "a,b,");
        assert_eq!(
            run("sel.split(' ').sort((a, b) => a.length - b.length).join(' ')", "ccc a bb aa"),
            "a bb aa ccc"
        );
        // inconsistent comparators must not panic
        assert!(evaluate("[3, 1, 2, 5, 4].sort(() => 1)", "").is_ok());
    }

    #[test]
    fn test_reshaping() {
        assert_eq!(run("[1, 2, 3].reverse()", ""), "3,2,1");
        assert_eq!(run("[1, 2, 3, 4].slice(1, -1)", ""), "2,3");
        assert_eq!(run("[1, 2, 3].at(-1)", ""), "3");
        assert_eq!(run("[1].concat(2, [3, [4]]).length", ""), "4");
        assert_eq!(run("[1, [2, [3, [4]]]].flat().length", ""), "3");
        assert_eq!(run("[1, [2, [3, [4]]]].flat(Infinity).length", ""), "4");
        assert_eq!(run("[1, 2].length", ""), "2");
    }

    #[test]
    fn test_callback_must_be_function() {
        assert!(matches!(
            evaluate("[1].map('x')", ""),
            Err(EvalError::Type(_))
        ));
    }
}
