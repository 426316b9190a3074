use super::super::{core::*, prelude::*};
use crate::tokenizer::{
    keyword::Keyword,
    symbol::{Delimiter, Operator},
    token::Token,
};

pub fn parse_identifier() -> impl Parser<Token, String> {
    with_context(
        satisfy(
            |token| match token {
                Token::Identifier(s) => Some(s.clone()),
                _ => None,
            },
            "identifier",
        ),
        "identifier",
    )
}

/// Name after `.`; reserved words are allowed there (`obj.default`).
pub fn parse_property_name() -> impl Parser<Token, String> {
    with_context(
        satisfy(
            |token| match token {
                Token::Identifier(s) => Some(s.clone()),
                Token::Keyword(k) => Some(k.to_string()),
                _ => None,
            },
            "property name",
        ),
        "property name",
    )
}

pub fn parse_keyword(keyword: Keyword) -> impl Parser<Token, Token> {
    equal(Token::Keyword(keyword))
}

pub fn parse_op(op: Operator) -> impl Parser<Token, Token> {
    equal(Token::Operator(op))
}

pub fn parse_comma() -> impl Parser<Token, Token> {
    with_context(equal(Token::Delimiter(Delimiter::Comma)), "comma")
}

pub fn parse_colon() -> impl Parser<Token, Token> {
    equal(Token::Delimiter(Delimiter::Colon))
}

pub fn parse_semicolon() -> impl Parser<Token, Token> {
    equal(Token::Delimiter(Delimiter::Semicolon))
}

pub fn parse_open_paren() -> impl Parser<Token, Token> {
    equal(Token::Delimiter(Delimiter::OpenParen))
}

pub fn parse_close_paren() -> impl Parser<Token, Token> {
    with_context(equal(Token::Delimiter(Delimiter::CloseParen)), "close paren")
}

pub fn parse_open_bracket() -> impl Parser<Token, Token> {
    equal(Token::Delimiter(Delimiter::OpenBracket))
}

pub fn parse_close_bracket() -> impl Parser<Token, Token> {
    with_context(
        equal(Token::Delimiter(Delimiter::CloseBracket)),
        "close bracket",
    )
}

pub fn parse_dot() -> impl Parser<Token, Token> {
    with_context(parse_op(Operator::Dot), "dot")
}

pub fn parse_arrow() -> impl Parser<Token, Token> {
    with_context(parse_op(Operator::Arrow), "arrow")
}
