pub mod common;
pub mod expression;

pub use common::*;
pub use expression::parse_expression;
