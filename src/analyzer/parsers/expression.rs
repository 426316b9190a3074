//! Expression grammar, lowest precedence first:
//!
//! ```text
//! expression     := arrow | conditional
//! arrow          := (identifier | "(" identifier,* ")") "=>" expression
//! conditional    := nullish ("?" expression ":" expression)?
//! nullish        := or ("??" or)*
//! or             := and ("||" and)*
//! and            := equality ("&&" equality)*
//! equality       := relational (("===" | "!==" | "==" | "!=") relational)*
//! relational     := additive (("<" | "<=" | ">" | ">=") additive)*
//! additive       := multiplicative (("+" | "-") multiplicative)*
//! multiplicative := exponent (("*" | "/" | "%") exponent)*
//! exponent       := unary ("**" unary)*          (right associative)
//! unary          := ("!" | "-" | "+" | "typeof") unary | postfix
//! postfix        := primary ("." name | "?." name | "[" expression "]"
//!                            | "?.[" expression "]" | "(" arguments ")" | "?.(" arguments ")")*
//! primary        := literal | template | array | "(" expression ")" | identifier
//! ```

use std::sync::Arc;

use super::{
    super::{core::*, prelude::*},
    common::*,
};
use crate::ast;
use crate::eval::builtins::regex::JsRegex;
use crate::tokenizer::{
    keyword::Keyword,
    literal::{Literal, StringPart},
    symbol::Operator,
    token::Token,
};

pub fn parse_expression() -> impl Parser<Token, ast::Expression> {
    with_context(lazy(parse_assignment_level), "expression")
}

fn parse_assignment_level() -> impl Parser<Token, ast::Expression> {
    choice(vec![Box::new(parse_arrow_function()), Box::new(parse_conditional())])
}

fn parse_arrow_function() -> impl Parser<Token, ast::Expression> {
    with_context(
        map_res(
            tuple2(
                parse_arrow_params(),
                preceded(as_unit(parse_arrow()), lazy(parse_expression)),
            ),
            |(params, body)| {
                for (i, param) in params.iter().enumerate() {
                    if params[..i].contains(param) {
                        return Err("Duplicate parameter name not allowed in this context"
                            .to_string());
                    }
                }
                Ok(ast::Expression::Arrow {
                    params,
                    body: Arc::new(body),
                })
            },
        ),
        "arrow function",
    )
}

fn parse_arrow_params() -> impl Parser<Token, Vec<String>> {
    choice(vec![
        Box::new(map(parse_identifier(), |name| vec![name])),
        Box::new(delimited(
            as_unit(parse_open_paren()),
            separated_list(parse_identifier(), as_unit(parse_comma())),
            as_unit(parse_close_paren()),
        )),
    ])
}

fn parse_conditional() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_nullish(),
                optional(tuple2(
                    preceded(
                        as_unit(parse_op(Operator::Question)),
                        lazy(parse_expression),
                    ),
                    preceded(as_unit(parse_colon()), lazy(parse_expression)),
                )),
            ),
            |(test, branches)| match branches {
                Some((consequent, alternate)) => ast::Expression::Conditional {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                },
                None => test,
            },
        ),
        "conditional",
    )
}

fn fold_logical(
    first: ast::Expression,
    rest: Vec<(ast::LogicalOperator, ast::Expression)>,
) -> ast::Expression {
    rest.into_iter()
        .fold(first, |left, (op, right)| ast::Expression::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
}

fn fold_binary(
    first: ast::Expression,
    rest: Vec<(ast::BinaryOperator, ast::Expression)>,
) -> ast::Expression {
    rest.into_iter()
        .fold(first, |left, (op, right)| ast::Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
}

fn parse_nullish() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_logical_or(),
                many(tuple2(
                    map(parse_op(Operator::Nullish), |_| {
                        ast::LogicalOperator::Nullish
                    }),
                    lazy(parse_logical_or),
                )),
            ),
            |(first, rest)| fold_logical(first, rest),
        ),
        "nullish coalescing",
    )
}

fn parse_logical_or() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_logical_and(),
                many(tuple2(
                    map(parse_op(Operator::Or), |_| ast::LogicalOperator::Or),
                    lazy(parse_logical_and),
                )),
            ),
            |(first, rest)| fold_logical(first, rest),
        ),
        "logical or",
    )
}

fn parse_logical_and() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_equality(),
                many(tuple2(
                    map(parse_op(Operator::And), |_| ast::LogicalOperator::And),
                    lazy(parse_equality),
                )),
            ),
            |(first, rest)| fold_logical(first, rest),
        ),
        "logical and",
    )
}

/// Matches any operator in `table`, yielding its binary counterpart.
fn parse_binary_operator(
    table: &'static [(Operator, ast::BinaryOperator)],
    expected: &'static str,
) -> impl Parser<Token, ast::BinaryOperator> {
    satisfy(
        move |token| match token {
            Token::Operator(op) => table
                .iter()
                .find(|(candidate, _)| candidate == op)
                .map(|(_, binary)| *binary),
            _ => None,
        },
        expected,
    )
}

const EQUALITY_OPERATORS: &[(Operator, ast::BinaryOperator)] = &[
    (Operator::StrictEqual, ast::BinaryOperator::StrictEqual),
    (Operator::StrictNotEqual, ast::BinaryOperator::StrictNotEqual),
    (Operator::EqualEqual, ast::BinaryOperator::Equal),
    (Operator::NotEqual, ast::BinaryOperator::NotEqual),
];

const RELATIONAL_OPERATORS: &[(Operator, ast::BinaryOperator)] = &[
    (Operator::Less, ast::BinaryOperator::LessThan),
    (Operator::LessEqual, ast::BinaryOperator::LessThanEqual),
    (Operator::Greater, ast::BinaryOperator::GreaterThan),
    (Operator::GreaterEqual, ast::BinaryOperator::GreaterThanEqual),
];

const ADDITIVE_OPERATORS: &[(Operator, ast::BinaryOperator)] = &[
    (Operator::Plus, ast::BinaryOperator::Add),
    (Operator::Minus, ast::BinaryOperator::Subtract),
];

const MULTIPLICATIVE_OPERATORS: &[(Operator, ast::BinaryOperator)] = &[
    (Operator::Multiply, ast::BinaryOperator::Multiply),
    (Operator::Divide, ast::BinaryOperator::Divide),
    (Operator::Modulo, ast::BinaryOperator::Modulo),
];

fn parse_equality() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_relational(),
                many(tuple2(
                    parse_binary_operator(EQUALITY_OPERATORS, "equality operator"),
                    lazy(parse_relational),
                )),
            ),
            |(first, rest)| fold_binary(first, rest),
        ),
        "equality",
    )
}

fn parse_relational() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_additive(),
                many(tuple2(
                    parse_binary_operator(RELATIONAL_OPERATORS, "comparison operator"),
                    lazy(parse_additive),
                )),
            ),
            |(first, rest)| fold_binary(first, rest),
        ),
        "comparison",
    )
}

fn parse_additive() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_multiplicative(),
                many(tuple2(
                    parse_binary_operator(ADDITIVE_OPERATORS, "additive operator"),
                    lazy(parse_multiplicative),
                )),
            ),
            |(first, rest)| fold_binary(first, rest),
        ),
        "additive",
    )
}

fn parse_multiplicative() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_exponent(),
                many(tuple2(
                    parse_binary_operator(MULTIPLICATIVE_OPERATORS, "multiplicative operator"),
                    lazy(parse_exponent),
                )),
            ),
            |(first, rest)| fold_binary(first, rest),
        ),
        "multiplicative",
    )
}

fn parse_exponent() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_unary(),
                many(preceded(
                    as_unit(parse_op(Operator::Power)),
                    lazy(parse_unary),
                )),
            ),
            |(first, rest)| {
                // 2 ** 3 ** 2 is 2 ** (3 ** 2)
                let mut operands = rest;
                operands.insert(0, first);
                let mut iter = operands.into_iter().rev();
                let last = iter.next();
                iter.fold(
                    last.unwrap_or(ast::Expression::Literal(ast::Literal::Undefined)),
                    |right, left| ast::Expression::Binary {
                        op: ast::BinaryOperator::Power,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                )
            },
        ),
        "exponent",
    )
}

fn parse_unary_operator() -> impl Parser<Token, ast::UnaryOperator> {
    satisfy(
        |token| match token {
            Token::Operator(Operator::Not) => Some(ast::UnaryOperator::Not),
            Token::Operator(Operator::Minus) => Some(ast::UnaryOperator::Negate),
            Token::Operator(Operator::Plus) => Some(ast::UnaryOperator::Plus),
            Token::Keyword(Keyword::Typeof) => Some(ast::UnaryOperator::Typeof),
            _ => None,
        },
        "unary operator",
    )
}

fn parse_unary() -> impl Parser<Token, ast::Expression> {
    with_context(
        choice(vec![
            Box::new(map(
                tuple2(parse_unary_operator(), lazy(parse_unary)),
                |(op, operand)| ast::Expression::Unary {
                    op,
                    operand: Box::new(operand),
                },
            )),
            Box::new(parse_postfix()),
        ]),
        "unary",
    )
}

enum Postfix {
    Member { property: String, optional: bool },
    Index { index: ast::Expression, optional: bool },
    Call { arguments: Vec<ast::Expression>, optional: bool },
}

fn parse_arguments() -> impl Parser<Token, Vec<ast::Expression>> {
    with_context(
        delimited(
            as_unit(parse_open_paren()),
            separated_list(lazy(parse_expression), as_unit(parse_comma())),
            as_unit(parse_close_paren()),
        ),
        "arguments",
    )
}

fn parse_bracket_index() -> impl Parser<Token, ast::Expression> {
    delimited(
        as_unit(parse_open_bracket()),
        lazy(parse_expression),
        as_unit(parse_close_bracket()),
    )
}

fn parse_postfix_operation() -> impl Parser<Token, Postfix> {
    choice(vec![
        Box::new(map(
            preceded(as_unit(parse_dot()), parse_property_name()),
            |property| Postfix::Member {
                property,
                optional: false,
            },
        )),
        Box::new(preceded(
            as_unit(parse_op(Operator::OptionalDot)),
            choice(vec![
                Box::new(map(parse_property_name(), |property| Postfix::Member {
                    property,
                    optional: true,
                })),
                Box::new(map(parse_bracket_index(), |index| Postfix::Index {
                    index,
                    optional: true,
                })),
                Box::new(map(parse_arguments(), |arguments| Postfix::Call {
                    arguments,
                    optional: true,
                })),
            ]),
        )),
        Box::new(map(parse_bracket_index(), |index| Postfix::Index {
            index,
            optional: false,
        })),
        Box::new(map(parse_arguments(), |arguments| Postfix::Call {
            arguments,
            optional: false,
        })),
    ])
}

fn parse_postfix() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(parse_primary(), many(parse_postfix_operation())),
            |(first, rest)| {
                rest.into_iter().fold(first, |object, op| match op {
                    Postfix::Member { property, optional } => ast::Expression::Member {
                        object: Box::new(object),
                        property,
                        optional,
                    },
                    Postfix::Index { index, optional } => ast::Expression::Index {
                        object: Box::new(object),
                        index: Box::new(index),
                        optional,
                    },
                    Postfix::Call {
                        arguments,
                        optional,
                    } => ast::Expression::Call {
                        callee: Box::new(object),
                        arguments,
                        optional,
                    },
                })
            },
        ),
        "postfix",
    )
}

fn parse_primary() -> impl Parser<Token, ast::Expression> {
    with_context(
        choice(vec![
            Box::new(map(parse_literal(), ast::Expression::Literal)),
            Box::new(parse_template()),
            Box::new(parse_array()),
            Box::new(parse_parenthesized()),
            Box::new(map(parse_identifier(), ast::Expression::Identifier)),
        ]),
        "primary",
    )
}

fn parse_literal() -> impl Parser<Token, ast::Literal> {
    with_context(
        map_res(
            satisfy(
                |token| match token {
                    Token::Literal(Literal::Template(_)) => None,
                    Token::Literal(lit) => Some(lit.clone()),
                    _ => None,
                },
                "literal",
            ),
            |lit| match lit {
                Literal::String(s) => Ok(ast::Literal::String(s)),
                Literal::Number(n) => Ok(ast::Literal::Number(n)),
                Literal::Boolean(b) => Ok(ast::Literal::Boolean(b)),
                Literal::Null => Ok(ast::Literal::Null),
                Literal::Undefined => Ok(ast::Literal::Undefined),
                Literal::Regex { pattern, flags } => {
                    // invalid patterns are rejected when the script is compiled
                    JsRegex::new(&pattern, &flags).map_err(|e| e.to_string())?;
                    Ok(ast::Literal::Regex { pattern, flags })
                }
                Literal::Template(_) => Err("Unexpected template string".to_string()),
            },
        ),
        "literal",
    )
}

fn parse_template() -> impl Parser<Token, ast::Expression> {
    with_context(
        map_res(
            satisfy(
                |token| match token {
                    Token::Literal(Literal::Template(parts)) => Some(parts.clone()),
                    _ => None,
                },
                "template string",
            ),
            |parts| {
                parts
                    .into_iter()
                    .map(|part| match part {
                        StringPart::Literal(text) => Ok(ast::TemplatePart::Text(text)),
                        StringPart::Interpolation(source) => {
                            crate::analyzer::parse_fragment(&source)
                                .map(ast::TemplatePart::Expression)
                                .map_err(|e| e.to_string())
                        }
                    })
                    .collect::<Result<Vec<_>, String>>()
                    .map(ast::Expression::Template)
            },
        ),
        "template string",
    )
}

fn parse_array() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            delimited(
                as_unit(parse_open_bracket()),
                separated_list(lazy(parse_expression), as_unit(parse_comma())),
                as_unit(parse_close_bracket()),
            ),
            ast::Expression::Array,
        ),
        "array",
    )
}

fn parse_parenthesized() -> impl Parser<Token, ast::Expression> {
    with_context(
        delimited(
            as_unit(parse_open_paren()),
            lazy(parse_expression),
            as_unit(parse_close_paren()),
        ),
        "parenthesized expression",
    )
}
