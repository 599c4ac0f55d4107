use std::collections::{BTreeSet, VecDeque};
use std::collections::vec_deque;
use std::fmt;
use std::ops::RangeBounds;
use std::str::FromStr;

use crate::element::{Bracket, Element, Operand};
use crate::error::ExpressionError;
use crate::evaluator::Evaluator;
use crate::parser::Parser;
use crate::variables::VariableLookup;

/// An ordered sequence of elements as produced by the scanner.
///
/// Evaluation only borrows the expression, so one expression can be evaluated any number of
/// times against different variables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    elements: VecDeque<Element>,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn first(&self) -> Option<&Element> {
        self.elements.front()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn range<R: RangeBounds<usize>>(&self, range: R) -> vec_deque::Iter<'_, Element> {
        self.elements.range(range)
    }

    pub fn push_back(&mut self, element: Element) {
        self.elements.push_back(element);
    }

    pub fn pop_front(&mut self) -> Option<Element> {
        self.elements.pop_front()
    }

    /// Names of the variables the expression refers to.
    pub fn variables(&self) -> BTreeSet<&str> {
        self.elements
            .iter()
            .filter_map(|element| match element {
                Element::Operand(Operand::Variable(name)) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn evaluate<V: VariableLookup + ?Sized>(&self, variables: &V) -> Result<bool, ExpressionError> {
        let result = Evaluator::evaluate(Parser::new(self, variables));
        tracing::debug!(expression = %self, ?result, "evaluated expression");
        result
    }
}

/// Whether `next` is written right after `previous`, without a space.
fn glued(previous: &Element, next: &Element) -> bool {
    let opening = |element: &Element| match element {
        Element::Bracket(Bracket::Open) => true,
        Element::LogicPrefixOperator(prefix) => !prefix.is_keyword(),
        _ => false,
    };

    match next {
        Element::Bracket(Bracket::Close) => {
            opening(previous) || matches!(previous, Element::Operand(_) | Element::Bracket(Bracket::Close))
        }
        Element::Operand(_) => opening(previous),
        other => opening(previous) && opening(other),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let mut previous: Option<&Element> = None;
        for element in &self.elements {
            match previous {
                Some(previous) if !glued(previous, element) => write!(f, " {}", element)?,
                _ => write!(f, "{}", element)?,
            }
            previous = Some(element);
        }
        Ok(())
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse(s, None)
    }
}

impl From<Vec<Element>> for Expression {
    fn from(elements: Vec<Element>) -> Self {
        Expression { elements: elements.into() }
    }
}

impl FromIterator<Element> for Expression {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Expression { elements: iter.into_iter().collect() }
    }
}

impl IntoIterator for Expression {
    type Item = Element;
    type IntoIter = vec_deque::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Expression {
    type Item = &'a Element;
    type IntoIter = vec_deque::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Expression {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Expression {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
