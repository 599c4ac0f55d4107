/// Folds an `Expression` into a stream of boolean `Token`s.
///
/// Valid chaining of elements, by kind of the last emitted token:
///
/// boolean, ")"           -> infix operator | ")"
/// start, infix, "("      -> "(" | prefix | operand comparison operand | variable
/// prefix                 -> "(" | variable
///
/// Comparisons and single boolean variables are evaluated as soon as they are reached, so
/// only booleans, brackets and logic operators come out.
/// Ex.: "(age >= 18 && country == 'FR') || isAdmin" -> "(true && false) || true"

use crate::element::{Bracket, Element, Operand};
use crate::error::ExpressionError;
use crate::expr::Expression;
use crate::operator::{InfixKind, Operator, Value};
use crate::variables::VariableLookup;

/// A folded token. Comparison operators and non-boolean operands never make it here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Boolean(bool),
    Infix(InfixKind),
    Not,
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Boolean,
    Infix,
    Prefix,
    OpeningBracket,
    ClosingBracket,
}

impl From<Token> for State {
    fn from(token: Token) -> Self {
        match token {
            Token::Boolean(_) => State::Boolean,
            Token::Infix(_) => State::Infix,
            Token::Not => State::Prefix,
            Token::Open => State::OpeningBracket,
            Token::Close => State::ClosingBracket,
        }
    }
}

pub struct Parser<'a, V: ?Sized> {
    expression: &'a Expression,
    current: usize,
    state: State,
    variables: &'a V,
}

impl<'a, V: VariableLookup + ?Sized> Parser<'a, V> {
    pub fn new(expression: &'a Expression, variables: &'a V) -> Self {
        Parser {
            expression,
            current: 0,
            state: State::Start,
            variables,
        }
    }

    /// Validates and returns the next token, `None` at the end of the expression.
    pub fn next_token(&mut self) -> Result<Option<Token>, ExpressionError> {
        let token = match self.state {
            State::Boolean | State::ClosingBracket => self.after_operand()?,
            State::Start | State::Infix | State::OpeningBracket => self.after_operator()?,
            State::Prefix => self.after_prefix()?,
        };

        match token {
            Some(token) => {
                tracing::trace!(?token, "folded token");
                self.state = State::from(token);
            }
            None if matches!(self.state, State::Infix | State::Prefix | State::OpeningBracket) => {
                let last = self.previous().map(ToString::to_string).unwrap_or_default();
                return Err(ExpressionError::InvalidGrammar(format!("the expression cannot end with '{}'", last)));
            }
            None => {}
        }
        Ok(token)
    }

    /// Current token is a boolean or a closing bracket.
    fn after_operand(&mut self) -> Result<Option<Token>, ExpressionError> {
        let previous = self.previous().map(ToString::to_string).unwrap_or_default();
        let Some(element) = self.advance() else { return Ok(None) };

        match element {
            Element::LogicInfixOperator(operator) => Ok(Some(Token::Infix(operator.kind()))),
            Element::Bracket(Bracket::Close) => Ok(Some(Token::Close)),
            other => Err(ExpressionError::InvalidGrammar(format!(
                "chaining '{}' with '{}' is invalid",
                previous, other
            ))),
        }
    }

    /// Current token is an infix operator, an opening bracket, or nothing yet.
    fn after_operator(&mut self) -> Result<Option<Token>, ExpressionError> {
        let start = self.current;
        let Some(element) = self.advance() else { return Ok(None) };

        match element {
            Element::Bracket(Bracket::Open) => return Ok(Some(Token::Open)),
            Element::LogicPrefixOperator(_) => return Ok(Some(Token::Not)),
            _ => {}
        }

        let boolean = if let Some(Element::ComparisonOperator(_)) = self.peek() {
            // operand, operator, and whatever comes next if anything
            let end = (start + 3).min(self.expression.len());
            self.current = end;
            let comparison: Vec<&Element> = self.expression.range(start..end).collect();
            self.evaluate_comparison(&comparison)?
        } else {
            self.evaluate_single(&[element])?
        };
        Ok(Some(Token::Boolean(boolean)))
    }

    /// Current token is a prefix operator. Its negation is applied here for a variable, or by
    /// the evaluator at the matching closing bracket.
    fn after_prefix(&mut self) -> Result<Option<Token>, ExpressionError> {
        let Some(element) = self.advance() else { return Ok(None) };

        match element {
            Element::Bracket(Bracket::Open) => Ok(Some(Token::Open)),
            Element::Operand(Operand::Variable(_)) => {
                let boolean = self.evaluate_single(&[element])?;
                Ok(Some(Token::Boolean(!boolean)))
            }
            other => Err(ExpressionError::InvalidGrammar(format!(
                "only a variable or an opening bracket can follow a prefix operator, found '{}'",
                other
            ))),
        }
    }

    /// Evaluates a comparison like `variable >= 2`. At least one operand has to be a variable.
    pub fn evaluate_comparison(&self, elements: &[&Element]) -> Result<bool, ExpressionError> {
        let [lhs, operator, rhs] = elements else {
            return Err(ExpressionError::InvalidExpression(format!(
                "a comparison needs exactly three elements, got {}",
                elements.len()
            )));
        };
        let Element::ComparisonOperator(operator) = operator else {
            return Err(ExpressionError::InvalidExpression(format!(
                "'{}' is not a comparison operator",
                operator
            )));
        };
        let (Element::Operand(lhs), Element::Operand(rhs)) = (lhs, rhs) else {
            return Err(ExpressionError::InvalidExpression(format!(
                "the comparison '{} {} {}' needs an operand on both sides",
                lhs, operator, rhs
            )));
        };

        let (name, literal, variable_on_left) = match (lhs, rhs) {
            (Operand::Variable(name), _) => (name, rhs, true),
            (_, Operand::Variable(name)) => (name, lhs, false),
            _ => {
                return Err(ExpressionError::InvalidExpression(format!(
                    "the comparison '{} {} {}' has no variable operand",
                    lhs, operator, rhs
                )));
            }
        };
        let value = self.resolve(name)?;

        let result = match literal {
            Operand::String(string) => apply(operator, Value::Str(value), Value::Str(string), variable_on_left),
            Operand::Number(number) => {
                let parsed = value.parse::<f64>().map_err(|_| ExpressionError::MismatchingType)?;
                apply(operator, Value::Number(parsed), Value::Number(*number), variable_on_left)
            }
            Operand::Boolean(boolean) => {
                let parsed = value.parse::<bool>().map_err(|_| ExpressionError::MismatchingType)?;
                apply(operator, Value::Boolean(parsed), Value::Boolean(*boolean), variable_on_left)
            }
            Operand::Variable(other) => {
                let other_value = self.resolve(other)?;
                compare_variables(operator, value, other_value)
            }
        }?;

        tracing::debug!(lhs = %lhs, operator = %operator, rhs = %rhs, result, "evaluated comparison");
        Ok(result)
    }

    /// Evaluates a lone variable holding `true` or `false`.
    pub fn evaluate_single(&self, elements: &[&Element]) -> Result<bool, ExpressionError> {
        let [element] = elements else {
            return Err(ExpressionError::InvalidGrammar(format!(
                "single boolean expression with {} elements",
                elements.len()
            )));
        };
        let Element::Operand(Operand::Variable(name)) = element else {
            return Err(ExpressionError::InvalidGrammar(format!(
                "'{}' cannot be evaluated as a boolean on its own",
                element
            )));
        };
        let value = self.resolve(name)?;
        value.parse::<bool>().map_err(|_| {
            ExpressionError::InvalidGrammar(format!(
                "the variable '{}' has no boolean value: '{}'",
                name, value
            ))
        })
    }

    fn resolve(&self, name: &str) -> Result<&'a str, ExpressionError> {
        self.variables
            .lookup(name)
            .ok_or_else(|| ExpressionError::UndefinedVariable(name.to_string()))
    }

    fn advance(&mut self) -> Option<&'a Element> {
        let element = self.expression.get(self.current)?;
        self.current += 1;
        Some(element)
    }

    fn peek(&self) -> Option<&'a Element> {
        self.expression.get(self.current)
    }

    fn previous(&self) -> Option<&'a Element> {
        self.current.checked_sub(1).and_then(|idx| self.expression.get(idx))
    }
}

impl<V: VariableLookup + ?Sized> Iterator for Parser<'_, V> {
    type Item = Result<Token, ExpressionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

fn apply(operator: &Operator, variable: Value<'_>, literal: Value<'_>, variable_on_left: bool) -> Result<bool, ExpressionError> {
    if variable_on_left {
        operator.evaluate(&variable, &literal)
    } else {
        operator.evaluate(&literal, &variable)
    }
}

/// Both sides are variables: try numbers, then booleans, then plain strings.
fn compare_variables(operator: &Operator, lhs: &str, rhs: &str) -> Result<bool, ExpressionError> {
    if let (Ok(lhs), Ok(rhs)) = (lhs.parse::<f64>(), rhs.parse::<f64>()) {
        operator.evaluate(&Value::Number(lhs), &Value::Number(rhs))
    } else if let (Ok(lhs), Ok(rhs)) = (lhs.parse::<bool>(), rhs.parse::<bool>()) {
        operator.evaluate(&Value::Boolean(lhs), &Value::Boolean(rhs))
    } else {
        operator.evaluate(&Value::Str(lhs), &Value::Str(rhs))
    }
}
