//! Syntax tree of a script expression.
//!
//! The tree is produced by [`crate::analyzer`] and walked by [`crate::eval`].
//! It is immutable once built; arrow function bodies are shared through
//! [`Arc`] so closures can hold on to them cheaply.

use std::{fmt, sync::Arc};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Undefined,
    Regex { pattern: String, flags: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Template(Vec<TemplatePart>),
    Array(Vec<Expression>),
    Identifier(String),
    /// `object.property` or `object?.property`
    Member {
        object: Box<Expression>,
        property: String,
        optional: bool,
    },
    /// `object[index]` or `object?.[index]`
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
        optional: bool,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        optional: bool,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `&&`, `||` and `??` evaluate their right side lazily.
    Logical {
        op: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    Arrow {
        params: Vec<String>,
        body: Arc<Expression>,
    },
}

impl Expression {
    /// Nesting depth of the tree. A leaf has depth 1.
    pub fn depth(&self) -> usize {
        let children = match self {
            Expression::Literal(_) | Expression::Identifier(_) => 0,
            Expression::Template(parts) => parts
                .iter()
                .map(|part| match part {
                    TemplatePart::Text(_) => 0,
                    TemplatePart::Expression(e) => e.depth(),
                })
                .max()
                .unwrap_or(0),
            Expression::Array(items) => items.iter().map(Expression::depth).max().unwrap_or(0),
            Expression::Member { object, .. } => object.depth(),
            Expression::Index { object, index, .. } => object.depth().max(index.depth()),
            Expression::Call {
                callee, arguments, ..
            } => arguments
                .iter()
                .map(Expression::depth)
                .max()
                .unwrap_or(0)
                .max(callee.depth()),
            Expression::Unary { operand, .. } => operand.depth(),
            Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
                left.depth().max(right.depth())
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => test
                .depth()
                .max(consequent.depth())
                .max(alternate.depth()),
            Expression::Arrow { body, .. } => body.depth(),
        };
        children + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    StrictEqual,
    StrictNotEqual,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Nullish,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "!"),
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Plus => write!(f, "+"),
            UnaryOperator::Typeof => write!(f, "typeof"),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Modulo => write!(f, "%"),
            BinaryOperator::Power => write!(f, "**"),
            BinaryOperator::StrictEqual => write!(f, "==="),
            BinaryOperator::StrictNotEqual => write!(f, "!=="),
            BinaryOperator::Equal => write!(f, "=="),
            BinaryOperator::NotEqual => write!(f, "!="),
            BinaryOperator::LessThan => write!(f, "<"),
            BinaryOperator::GreaterThan => write!(f, ">"),
            BinaryOperator::LessThanEqual => write!(f, "<="),
            BinaryOperator::GreaterThanEqual => write!(f, ">="),
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "&&"),
            LogicalOperator::Or => write!(f, "||"),
            LogicalOperator::Nullish => write!(f, "??"),
        }
    }
}
