use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;

use crate::element::anchored;
use crate::error::ExpressionError;

/// An operand after coercion, as handed to a comparison rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Str(&'a str),
    Number(f64),
    Boolean(bool),
}

/// Rule of a comparison operator.
///
/// A rule that does not support the given pair returns
/// [`ExpressionError::WrongOperatorAndOperandsAssociation`].
pub type Evaluation = fn(&Value<'_>, &Value<'_>) -> Result<bool, ExpressionError>;

/// Keyword names are whole words, symbolic names are punctuation runs.
fn is_keyword_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_symbolic_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_punctuation() && !matches!(c, '(' | ')' | '\'' | '"' | '\\'))
}

fn validate_name(name: Cow<'static, str>) -> Result<Cow<'static, str>, ExpressionError> {
    if is_keyword_name(&name) || is_symbolic_name(&name) {
        Ok(name)
    } else {
        Err(ExpressionError::InvalidOperatorName(name.into_owned()))
    }
}

/// A binary comparison operator such as `==` or `isIn`.
///
/// Two operators are equal when they have the same name.
#[derive(Clone)]
pub struct Operator {
    name: Cow<'static, str>,
    evaluation: Evaluation,
}

impl Operator {
    pub fn new(name: impl Into<Cow<'static, str>>, evaluation: Evaluation) -> Result<Self, ExpressionError> {
        Ok(Operator { name: validate_name(name.into())?, evaluation })
    }

    const fn builtin(name: &'static str, evaluation: Evaluation) -> Self {
        Operator { name: Cow::Borrowed(name), evaluation }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_keyword(&self) -> bool {
        is_keyword_name(&self.name)
    }

    pub fn evaluate(&self, lhs: &Value<'_>, rhs: &Value<'_>) -> Result<bool, ExpressionError> {
        (self.evaluation)(lhs, rhs)
    }

    pub fn equal() -> Self {
        Self::builtin("==", |lhs, rhs| match (lhs, rhs) {
            (Value::Str(l), Value::Str(r)) => Ok(l == r),
            (Value::Number(l), Value::Number(r)) => Ok(l == r),
            (Value::Boolean(l), Value::Boolean(r)) => Ok(l == r),
            _ => Err(ExpressionError::WrongOperatorAndOperandsAssociation),
        })
    }

    pub fn not_equal() -> Self {
        Self::builtin("!=", |lhs, rhs| Self::equal().evaluate(lhs, rhs).map(|equal| !equal))
    }

    pub fn greater_than() -> Self {
        Self::builtin(">", |lhs, rhs| ordered(lhs, rhs, |o| o.is_gt()))
    }

    pub fn greater_than_or_equal() -> Self {
        Self::builtin(">=", |lhs, rhs| ordered(lhs, rhs, |o| o.is_ge()))
    }

    pub fn lesser_than() -> Self {
        Self::builtin("<", |lhs, rhs| ordered(lhs, rhs, |o| o.is_lt()))
    }

    pub fn lesser_than_or_equal() -> Self {
        Self::builtin("<=", |lhs, rhs| ordered(lhs, rhs, |o| o.is_le()))
    }

    /// `list <: item`: the comma-separated list on the left holds the item.
    pub fn list_contains() -> Self {
        Self::builtin("<:", |lhs, rhs| strings(lhs, rhs, |list, item| split_list(list).any(|i| i == item)))
    }

    /// `item isIn list`: mirror of `<:`.
    pub fn is_in() -> Self {
        Self::builtin("isIn", |lhs, rhs| strings(lhs, rhs, |item, list| split_list(list).any(|i| i == item)))
    }

    pub fn contains() -> Self {
        Self::builtin("contains", |lhs, rhs| strings(lhs, rhs, |l, r| l.contains(r)))
    }

    pub fn has_prefix() -> Self {
        Self::builtin("hasPrefix", |lhs, rhs| strings(lhs, rhs, |l, r| l.starts_with(r)))
    }

    pub fn has_suffix() -> Self {
        Self::builtin("hasSuffix", |lhs, rhs| strings(lhs, rhs, |l, r| l.ends_with(r)))
    }

    /// `value matches 'regex'`, the whole value has to match.
    pub fn matches() -> Self {
        Self::builtin("matches", |lhs, rhs| match (lhs, rhs) {
            (Value::Str(value), Value::Str(pattern)) => {
                let regex: Regex = anchored(pattern).map_err(|_| {
                    ExpressionError::InvalidOperand(format!("The regular expression '{}' is invalid", pattern))
                })?;
                Ok(regex.is_match(value))
            }
            _ => Err(ExpressionError::WrongOperatorAndOperandsAssociation),
        })
    }

    /// Comparison operators of the default grammar.
    pub fn defaults() -> Vec<Operator> {
        vec![
            Self::equal(),
            Self::not_equal(),
            Self::greater_than(),
            Self::greater_than_or_equal(),
            Self::lesser_than(),
            Self::lesser_than_or_equal(),
            Self::list_contains(),
            Self::is_in(),
            Self::contains(),
            Self::has_prefix(),
            Self::has_suffix(),
            Self::matches(),
        ]
    }
}

fn ordered(
    lhs: &Value<'_>,
    rhs: &Value<'_>,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<bool, ExpressionError> {
    match (lhs, rhs) {
        (Value::Str(l), Value::Str(r)) => Ok(accept(l.cmp(r))),
        // NaN is unordered with everything
        (Value::Number(l), Value::Number(r)) => Ok(l.partial_cmp(r).is_some_and(accept)),
        _ => Err(ExpressionError::WrongOperatorAndOperandsAssociation),
    }
}

fn strings(
    lhs: &Value<'_>,
    rhs: &Value<'_>,
    test: impl Fn(&str, &str) -> bool,
) -> Result<bool, ExpressionError> {
    match (lhs, rhs) {
        (Value::Str(l), Value::Str(r)) => Ok(test(l, r)),
        _ => Err(ExpressionError::WrongOperatorAndOperandsAssociation),
    }
}

/// Splits on commas that are not escaped with a backslash and trims each item.
/// Escapes are kept as written.
fn split_list(list: &str) -> impl Iterator<Item = &str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (idx, c) in list.char_indices() {
        if c == ',' && !escaped {
            items.push(list[start..idx].trim());
            start = idx + 1;
        }
        escaped = c == '\\' && !escaped;
    }
    items.push(list[start..].trim());
    items.into_iter()
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Operator {}

impl Hash for Operator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_tuple("Operator").field(&self.name).finish()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum InfixKind {
    And,
    Or,
}

impl InfixKind {
    pub fn evaluate(self, lhs: bool, rhs: bool) -> bool {
        match self {
            InfixKind::And => lhs && rhs,
            InfixKind::Or => lhs || rhs,
        }
    }
}

/// A name bound to AND or OR, e.g. `&&`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicInfixOperator {
    name: Cow<'static, str>,
    kind: InfixKind,
}

impl LogicInfixOperator {
    pub fn new(name: impl Into<Cow<'static, str>>, kind: InfixKind) -> Result<Self, ExpressionError> {
        Ok(LogicInfixOperator { name: validate_name(name.into())?, kind })
    }

    pub fn and() -> Self {
        LogicInfixOperator { name: Cow::Borrowed("&&"), kind: InfixKind::And }
    }

    pub fn or() -> Self {
        LogicInfixOperator { name: Cow::Borrowed("||"), kind: InfixKind::Or }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InfixKind {
        self.kind
    }

    pub fn is_keyword(&self) -> bool {
        is_keyword_name(&self.name)
    }

    pub fn evaluate(&self, lhs: bool, rhs: bool) -> bool {
        self.kind.evaluate(lhs, rhs)
    }
}

impl fmt::Display for LogicInfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name)
    }
}

/// A name for NOT, e.g. `!`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicPrefixOperator {
    name: Cow<'static, str>,
}

impl LogicPrefixOperator {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Result<Self, ExpressionError> {
        Ok(LogicPrefixOperator { name: validate_name(name.into())? })
    }

    pub fn not() -> Self {
        LogicPrefixOperator { name: Cow::Borrowed("!") }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_keyword(&self) -> bool {
        is_keyword_name(&self.name)
    }

    pub fn evaluate(&self, operand: bool) -> bool {
        !operand
    }
}

impl fmt::Display for LogicPrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Value::*;

    #[test]
    fn test_default_operators() {
        let cases = vec![
            (Operator::equal(), Str("a"), Str("a"), true),
            (Operator::equal(), Number(2.5), Number(2.5), true),
            (Operator::equal(), Boolean(true), Boolean(false), false),
            (Operator::not_equal(), Number(1.0), Number(2.0), true),
            (Operator::not_equal(), Boolean(true), Boolean(true), false),
            (Operator::greater_than(), Number(2.0), Number(1.0), true),
            (Operator::greater_than(), Str("b"), Str("a"), true),
            (Operator::greater_than_or_equal(), Number(1.0), Number(1.0), true),
            (Operator::lesser_than(), Str("Zebra"), Str("apple"), true),
            (Operator::lesser_than(), Number(f64::NAN), Number(1.0), false),
            (Operator::lesser_than_or_equal(), Number(3.0), Number(2.0), false),
            (Operator::list_contains(), Str("Riri, Fifi, Loulou"), Str("Fifi"), true),
            (Operator::is_in(), Str("Fifi"), Str("Riri, Fifi, Loulou"), true),
            (Operator::is_in(), Str("Fi"), Str("Riri, Fifi, Loulou"), false),
            (Operator::is_in(), Str(r"Riri\, Fifi"), Str(r"Riri\, Fifi, Loulou"), true),
            (Operator::is_in(), Str("Fifi"), Str(r"Riri, Fifi\, Loulou"), false),
            (Operator::contains(), Str("Loulou"), Str("oulo"), true),
            (Operator::has_prefix(), Str("Loulou"), Str("Lou"), true),
            (Operator::has_suffix(), Str("Loulou"), Str("lou"), true),
            (Operator::has_suffix(), Str("Loulou"), Str("Lou"), false),
            (Operator::matches(), Str("123"), Str("[0-9]{3}"), true),
            (Operator::matches(), Str("Loulou"), Str(".*ulou.*"), true),
            (Operator::matches(), Str("1234"), Str("[0-9]{3}"), false),
        ];

        for (operator, lhs, rhs, expected) in cases {
            let result = operator.evaluate(&lhs, &rhs);
            assert_eq!(result, Ok(expected), "{:?} {} {:?}", lhs, operator, rhs);
        }
    }

    #[test]
    fn test_operators_decline_unsupported_types() {
        let cases = vec![
            (Operator::equal(), Str("1"), Number(1.0)),
            (Operator::greater_than(), Boolean(true), Boolean(false)),
            (Operator::contains(), Number(12.0), Number(1.0)),
            (Operator::is_in(), Number(1.0), Str("1, 2")),
            (Operator::matches(), Boolean(true), Str("true")),
        ];

        for (operator, lhs, rhs) in cases {
            let result = operator.evaluate(&lhs, &rhs);
            assert_eq!(result, Err(ExpressionError::WrongOperatorAndOperandsAssociation));
        }
    }

    #[test]
    fn test_matches_invalid_regex() {
        let result = Operator::matches().evaluate(&Str("123"), &Str("[0-9{3}"));
        assert_eq!(
            result,
            Err(ExpressionError::InvalidOperand("The regular expression '[0-9{3}' is invalid".to_string()))
        );
    }

    #[test]
    fn test_operator_names() {
        assert!(Operator::is_in().is_keyword());
        assert!(!Operator::equal().is_keyword());
        assert!(Operator::new("===", |_, _| Ok(true)).is_ok());
        assert!(Operator::new("startsWith", |_, _| Ok(true)).is_ok());

        let invalid = vec!["", "is in", "(=", "=\"", "2x", "==a"];
        for name in invalid {
            assert_eq!(
                Operator::new(name, |_, _| Ok(true)),
                Err(ExpressionError::InvalidOperatorName(name.to_string())),
                "Expected {:?} to be rejected",
                name
            );
        }
        assert!(LogicInfixOperator::new("and", InfixKind::And).unwrap().is_keyword());
        assert!(LogicPrefixOperator::new("not").is_ok());
    }

    #[test]
    fn test_logic_operators() {
        assert!(!LogicInfixOperator::and().evaluate(true, false));
        assert!(LogicInfixOperator::or().evaluate(true, false));
        assert!(!LogicPrefixOperator::not().evaluate(true));
        assert_eq!(LogicInfixOperator::and().to_string(), "&&");
        assert_eq!(InfixKind::Or.to_string(), "Or");
    }
}
