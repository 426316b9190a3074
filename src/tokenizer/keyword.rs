//! Reserved words.
//!
//! Only `typeof` has a meaning in the expression grammar. The other words are
//! reserved so that statements and declarations (`new`, `function`, `while`,
//! `import`, ...) are rejected as syntax errors instead of being resolved as
//! ordinary names.

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Typeof,
    Async,
    Await,
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Export,
    Extends,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    Let,
    New,
    Return,
    Super,
    Switch,
    This,
    Throw,
    Try,
    Var,
    Void,
    While,
    With,
    Yield,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_keyword_round_trip_through_text() {
        for keyword in Keyword::iter() {
            assert_eq!(Keyword::from_str(keyword.as_ref()).unwrap(), keyword);
        }
    }

    #[test]
    fn test_keyword_is_case_sensitive() {
        assert_eq!(Keyword::from_str("typeof").unwrap(), Keyword::Typeof);
        assert!(Keyword::from_str("Typeof").is_err());
        assert!(Keyword::from_str("instanceOf").is_err());
    }
}
