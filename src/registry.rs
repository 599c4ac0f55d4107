use std::collections::BTreeMap;

use crate::operator::{LogicInfixOperator, LogicPrefixOperator, Operator};

/// The operators a [`Scanner`](crate::scanner::Scanner) recognizes.
///
/// A registry is a plain value: registering or removing an operator consumes it and
/// returns the changed registry, so expressions already parsed keep their operators.
///
/// ```
/// use bool_expr::{OperatorRegistry, Operator};
///
/// let registry = OperatorRegistry::default()
///     .remove_operator("matches")
///     .register_operator(Operator::new("startsWith", |lhs, rhs| Operator::has_prefix().evaluate(lhs, rhs)).unwrap());
/// assert!(registry.comparison_operator("matches").is_none());
/// assert!(registry.comparison_operator("startsWith").is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorRegistry {
    comparison: BTreeMap<String, Operator>,
    infix: BTreeMap<String, LogicInfixOperator>,
    prefix: BTreeMap<String, LogicPrefixOperator>,
}

impl OperatorRegistry {
    /// A registry without any operator.
    pub fn empty() -> Self {
        OperatorRegistry {
            comparison: BTreeMap::new(),
            infix: BTreeMap::new(),
            prefix: BTreeMap::new(),
        }
    }

    /// Adds `operator`, replacing any comparison operator with the same name.
    pub fn register_operator(mut self, operator: Operator) -> Self {
        self.comparison.insert(operator.name().to_string(), operator);
        self
    }

    pub fn remove_operator(mut self, name: &str) -> Self {
        self.comparison.remove(name);
        self
    }

    pub fn register_infix_operator(mut self, operator: LogicInfixOperator) -> Self {
        self.infix.insert(operator.name().to_string(), operator);
        self
    }

    pub fn remove_infix_operator(mut self, name: &str) -> Self {
        self.infix.remove(name);
        self
    }

    pub fn register_prefix_operator(mut self, operator: LogicPrefixOperator) -> Self {
        self.prefix.insert(operator.name().to_string(), operator);
        self
    }

    pub fn remove_prefix_operator(mut self, name: &str) -> Self {
        self.prefix.remove(name);
        self
    }

    pub fn comparison_operator(&self, name: &str) -> Option<&Operator> {
        self.comparison.get(name)
    }

    pub fn infix_operator(&self, name: &str) -> Option<&LogicInfixOperator> {
        self.infix.get(name)
    }

    pub fn prefix_operator(&self, name: &str) -> Option<&LogicPrefixOperator> {
        self.prefix.get(name)
    }

    pub fn comparison_operators(&self) -> impl Iterator<Item = &Operator> {
        self.comparison.values()
    }

    pub fn infix_operators(&self) -> impl Iterator<Item = &LogicInfixOperator> {
        self.infix.values()
    }

    pub fn prefix_operators(&self) -> impl Iterator<Item = &LogicPrefixOperator> {
        self.prefix.values()
    }

    /// Names of every registered operator, in all three sets.
    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.comparison
            .keys()
            .chain(self.infix.keys())
            .chain(self.prefix.keys())
            .map(String::as_str)
    }
}

impl Default for OperatorRegistry {
    /// The comparison operators of [`Operator::defaults`], `&&`, `||` and `!`.
    fn default() -> Self {
        let registry = OperatorRegistry::empty()
            .register_infix_operator(LogicInfixOperator::and())
            .register_infix_operator(LogicInfixOperator::or())
            .register_prefix_operator(LogicPrefixOperator::not());
        Operator::defaults()
            .into_iter()
            .fold(registry, OperatorRegistry::register_operator)
    }
}
