use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use selner::{
    config::EvaluatorConfig,
    eval::{evaluate, EvalError, Evaluator, PreviewOutcome, SCRIPT_REQUIRED},
};

#[test]
fn test_common_transformations() {
    let cases = [
        ("sel.toUpperCase()", "lorem ipsum", "LOREM IPSUM"),
        ("sel.split('').reverse().join('')", "abc", "cba"),
        ("sel.length", "héllo", "5"),
        ("sel + '!'", "hi", "hi!"),
        (
            "sel.split(/\\s+/).map(w => w[0].toUpperCase() + w.slice(1).toLowerCase()).join(' ')",
            "hELLO   wORLD",
            "Hello World",
        ),
        ("sel.replace(/(\\d+)/g, n => n * 2)", "a1 b20", "a2 b40"),
        ("`<${sel}>`", "tag", "<tag>"),
        ("sel.split('\\n').sort().join('\\n')", "b\nc\na", "a\nb\nc"),
        ("JSON.stringify(sel)", "quote \"me\"", "\"quote \\\"me\\\"\""),
        ("encodeURIComponent(sel)", "a b", "a%20b"),
        ("sel.length > 3 ? 'long' : 'short'", "abcd", "long"),
        ("sel.match(/\\d+/)?.[0] ?? 'none'", "abc", "none"),
        ("Number(sel).toFixed(2)", "3.14159", "3.14"),
    ];

    for (source, input, expected) in cases {
        assert_eq!(evaluate(source, input).unwrap(), expected, "{}", source);
    }
}

#[test]
fn test_result_is_stringified() {
    assert_eq!(evaluate("undefined", "x").unwrap(), "undefined");
    assert_eq!(evaluate("null", "x").unwrap(), "null");
    assert_eq!(evaluate("[1, [2, 3]]", "x").unwrap(), "1,2,3");
    assert_eq!(evaluate("1 / 0", "x").unwrap(), "Infinity");
    assert_eq!(evaluate("0.1 + 0.2", "x").unwrap(), "0.30000000000000004");
    assert_eq!(evaluate("/a+/gi", "x").unwrap(), "/a+/gi");
    assert!(!evaluate("sel.trim", "x").unwrap().is_empty());
}

#[test]
fn test_ambient_names_are_inert() {
    assert_eq!(evaluate("typeof process", "").unwrap(), "object");
    assert_eq!(evaluate("typeof window", "").unwrap(), "object");
    assert_eq!(evaluate("globalThis.location", "").unwrap(), "undefined");
    assert_eq!(evaluate("JSON.stringify(document)", "").unwrap(), "{}");
    assert_eq!(evaluate("typeof localStorage", "").unwrap(), "undefined");

    for source in [
        "fetch('https://example.com')",
        "window.fetch('x')",
        "require('fs')",
        "process.exit(1)",
        "setTimeout(() => 1, 0)",
        "eval('1 + 1')",
        "Function('return 1')()",
        "sel.constructor.constructor('return process')()",
        "localStorage",
    ] {
        assert!(evaluate(source, "").is_err(), "{} must fail", source);
    }

    assert_eq!(
        evaluate("window.fetch('x')", "").unwrap_err().to_string(),
        "TypeError: window.fetch is not a function"
    );
    assert_eq!(
        evaluate("localStorage", "").unwrap_err(),
        EvalError::Reference("localStorage".to_string())
    );
}

#[test]
fn test_rejected_syntax() {
    for source in [
        "sel.",
        "sel.toUpperCase(",
        "x = 1",
        "sel = 'a'",
        "let x = 1",
        "while (true) {}",
        "for (;;) {}",
        "function f() {}",
        "new Function('x')",
        "sel++",
        "sel; sel",
        "'unterminated",
        "/unterminated",
    ] {
        assert!(
            matches!(evaluate(source, "x"), Err(EvalError::Syntax(_))),
            "{} must be a syntax error",
            source
        );
    }
    assert_eq!(evaluate("sel;", "x").unwrap(), "x");
}

#[test]
fn test_guardrails() {
    let evaluator = Evaluator::new(EvaluatorConfig {
        max_steps: 200,
        max_string_length: 100,
        max_array_length: 50,
        max_expression_length: 64,
        ..Default::default()
    });

    let long_input = "x".repeat(1000);
    assert!(matches!(
        evaluator.evaluate("sel.split('').map(c => c + c).join('')", &long_input),
        Err(EvalError::LimitExceeded(_))
    ));
    assert!(matches!(
        evaluator.evaluate("sel.repeat(50)", "abc"),
        Err(EvalError::LimitExceeded(_))
    ));
    assert!(matches!(
        evaluator.evaluate(&format!("'{}'", "a".repeat(100)), ""),
        Err(EvalError::LimitExceeded(_))
    ));
    assert_eq!(evaluator.evaluate("sel.repeat(10)", "abc").unwrap().len(), 30);

    let nested = format!("{}1{}", "(".repeat(500), ")".repeat(500));
    assert!(matches!(evaluate(&nested, ""), Err(EvalError::Syntax(_))));
}

fn limit_message(result: Result<String, EvalError>) -> String {
    match result {
        Err(EvalError::LimitExceeded(message)) => message,
        other => panic!("expected a limit error, got {:?}", other),
    }
}

#[test]
fn test_shared_arrays_cannot_grow_exponentially() {
    let evaluator = Evaluator::new(EvaluatorConfig {
        max_string_length: 1000,
        ..Default::default()
    });
    let started = Instant::now();
    for source in [
        "sel.split('').reduce(a => [a, a], 'x') + ''",
        "sel.split('').reduce(a => [a, a], 'x').join('-')",
        "sel.split('').reduce(a => [a, a], 'x').flat(Infinity).length",
        "JSON.stringify(sel.split('').reduce(a => [a, a], 'x'), null, 10)",
    ] {
        limit_message(evaluator.evaluate(source, &"x".repeat(40)));
    }
    assert!(started.elapsed() < Duration::from_secs(5));

    // the default limits stop the doubling by element count alone
    limit_message(evaluate("sel.split('').reduce(a => [a, a], 0).length", &"x".repeat(64)));
}

#[test]
fn test_repeated_large_elements_are_bounded() {
    let evaluator = Evaluator::new(EvaluatorConfig {
        max_string_length: 1000,
        ..Default::default()
    });
    let input = "x".repeat(500);
    assert_eq!(evaluator.evaluate("sel.split('').map(c => c).length", &input).unwrap(), "500");
    limit_message(evaluator.evaluate("sel.split('').map(c => sel).length", &input));
}

#[test]
fn test_deep_runtime_nesting_is_an_error() {
    let evaluator = Evaluator::new(EvaluatorConfig {
        max_steps: 10_000_000,
        ..Default::default()
    });
    let input = "x".repeat(30_000);
    for source in [
        "sel.split('').reduce(a => [a], 0) + ''",
        "JSON.stringify(sel.split('').reduce(a => [a], 0))",
        "sel.split('').reduce(a => [a], 0).flat(Infinity).length",
        "sel.split('').reduce(f => () => f, 0)",
        "sel.split('').reduce(a => [a.map], []).length",
    ] {
        let message = limit_message(evaluator.evaluate(source, &input));
        assert!(message.contains("nest"), "{}: {}", source, message);
    }

    assert_eq!(
        evaluate("sel.split('').reduce(a => [a], 0).flat(Infinity)", &"x".repeat(10)).unwrap(),
        "0"
    );
}

#[test]
fn test_custom_input_binding() {
    let evaluator = Evaluator::new(EvaluatorConfig {
        input_binding: "text".to_string(),
        ..Default::default()
    });
    assert_eq!(evaluator.evaluate("text.toUpperCase()", "ok").unwrap(), "OK");
    assert!(matches!(
        evaluator.evaluate("sel", "ok"),
        Err(EvalError::Reference(_))
    ));
}

#[test]
fn test_preview_messages() {
    let evaluator = Evaluator::default();
    assert_eq!(
        evaluator.preview("sel.toUpperCase()", "lorem"),
        PreviewOutcome::Info("\"lorem\" -> \"LOREM\"".to_string())
    );
    assert_eq!(
        evaluator.preview("", "lorem"),
        PreviewOutcome::Error(SCRIPT_REQUIRED.to_string())
    );
    assert_eq!(
        evaluator.preview("foo", "lorem"),
        PreviewOutcome::Error("Script throw an error: ReferenceError: foo is not defined".to_string())
    );
}

#[test]
fn test_compiled_script_is_reusable() {
    let evaluator = Evaluator::default();
    let script = evaluator.compile("sel.split(',').length").unwrap();
    assert_eq!(script.source(), "sel.split(',').length");
    assert_eq!(evaluator.run(&script, "a,b").unwrap(), "2");
    assert_eq!(evaluator.run(&script, "a,b,c").unwrap(), "3");
}

proptest! {
    #[test]
    fn test_evaluation_is_deterministic(input in ".{0,40}") {
        let scripts = [
            "sel.toUpperCase()",
            "sel.split('').reverse().join('')",
            "sel.replace(/[aeiou]/g, c => c.toUpperCase())",
            "JSON.stringify(sel.split(' '))",
            "sel.length * 2",
        ];
        for source in scripts {
            let first = evaluate(source, &input);
            let second = evaluate(source, &input);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn test_identity_returns_input(input in any::<String>()) {
        prop_assert_eq!(evaluate("sel", &input).unwrap(), input);
    }

    #[test]
    fn test_arbitrary_source_never_panics(source in ".{0,60}") {
        let _ = evaluate(&source, "input");
    }
}
