use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ExpressionError;
use crate::operator::{LogicInfixOperator, LogicPrefixOperator, Operator};

pub(crate) const BOOLEAN_PATTERN: &str = "true|false";
pub(crate) const NUMBER_PATTERN: &str = r"-?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)";
// escape aware forms first, the lazy ones still catch an unescaped inner quote for classification
pub(crate) const STRING_PATTERN: &str = r#"(?s:'(?:\\.|[^'\\])*'|'.*?'|"(?:\\.|[^"\\])*"|".*?")"#;
pub(crate) const VARIABLE_PATTERN: &str = "[a-zA-Z][a-zA-Z0-9_-]+";

static NUMBER: Lazy<Regex> = Lazy::new(|| anchored(NUMBER_PATTERN).unwrap());
static DEFAULT_VARIABLE: Lazy<Regex> = Lazy::new(|| anchored(VARIABLE_PATTERN).unwrap());

/// Compiles `pattern` so that it only matches a whole string.
pub(crate) fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// One classified unit of a boolean expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    ComparisonOperator(Operator),
    LogicInfixOperator(LogicInfixOperator),
    LogicPrefixOperator(LogicPrefixOperator),
    Bracket(Bracket),
    Operand(Operand),
}

impl Element {
    pub fn variable(name: impl Into<String>) -> Self {
        Element::Operand(Operand::Variable(name.into()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Element::Operand(Operand::String(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Element::Operand(Operand::Number(value))
    }

    pub fn boolean(value: bool) -> Self {
        Element::Operand(Operand::Boolean(value))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Element::ComparisonOperator(operator) => write!(f, "{}", operator),
            Element::LogicInfixOperator(operator) => write!(f, "{}", operator),
            Element::LogicPrefixOperator(operator) => write!(f, "{}", operator),
            Element::Bracket(bracket) => write!(f, "{}", bracket),
            Element::Operand(operand) => write!(f, "{}", operand),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString)]
pub enum Bracket {
    #[strum(serialize = "(")]
    Open,
    #[strum(serialize = ")")]
    Close,
}

/// A literal, or a reference to a variable resolved at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Variable(String),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Operand {
    /// Classifies a lexeme: quoted string, then number, then boolean, then variable name.
    ///
    /// `variable` is the whole-string variable name pattern, the default one when `None`.
    pub fn classify(lexeme: &str, variable: Option<&Regex>) -> Result<Operand, ExpressionError> {
        if let Some(body) = unquote(lexeme) {
            let quote = lexeme.chars().next().unwrap_or('\'');
            if contains_unescaped(body, quote) {
                return Err(ExpressionError::InvalidStringQuotation(lexeme.to_string()));
            }
            return Ok(Operand::String(body.to_string()));
        }
        if NUMBER.is_match(lexeme) {
            if let Ok(number) = lexeme.parse::<f64>() {
                return Ok(Operand::Number(number));
            }
        }
        if let Ok(boolean) = lexeme.parse::<bool>() {
            return Ok(Operand::Boolean(boolean));
        }
        if variable.unwrap_or(&DEFAULT_VARIABLE).is_match(lexeme) {
            return Ok(Operand::Variable(lexeme.to_string()));
        }
        Err(ExpressionError::InvalidVariableName(lexeme.to_string()))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Operand::Variable(name) => write!(f, "{}", name),
            Operand::String(value) if contains_unescaped(value, '\'') => write!(f, "\"{}\"", value),
            Operand::String(value) => write!(f, "'{}'", value),
            Operand::Number(number) => write!(f, "{}", number),
            Operand::Boolean(boolean) => write!(f, "{}", boolean),
        }
    }
}

/// Body of a lexeme wrapped in matching single or double quotes.
fn unquote(lexeme: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        lexeme
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
}

fn contains_unescaped(body: &str, quote: char) -> bool {
    let mut escaped = false;
    for c in body.chars() {
        if c == quote && !escaped {
            return true;
        }
        escaped = c == '\\' && !escaped;
    }
    false
}
