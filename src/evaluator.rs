use crate::error::ExpressionError;
use crate::operator::InfixKind;
use crate::parser::Token;

/// A boolean waiting to be combined with whatever follows, using `operator`.
/// Without an operator it is the last value of its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfBooleanExpression {
    pub boolean: bool,
    pub operator: Option<InfixKind>,
}

impl HalfBooleanExpression {
    pub fn new(boolean: bool, operator: Option<InfixKind>) -> Self {
        HalfBooleanExpression { boolean, operator }
    }

    pub fn terminal(boolean: bool) -> Self {
        HalfBooleanExpression { boolean, operator: None }
    }

    /// Combines `self` with the next half expression.
    ///
    /// Returns `None` when `self` is an OR and `next` an AND: the right side of the AND is not
    /// known yet so the OR has to wait.
    pub fn combine(self, next: HalfBooleanExpression) -> Result<Option<HalfBooleanExpression>, ExpressionError> {
        let Some(operator) = self.operator else {
            return Err(ExpressionError::InvalidExpression(format!(
                "'{}' is not followed by a logic operator",
                self.boolean
            )));
        };

        if operator == InfixKind::Or && next.operator == Some(InfixKind::And) {
            return Ok(None);
        }
        Ok(Some(HalfBooleanExpression::new(
            operator.evaluate(self.boolean, next.boolean),
            next.operator,
        )))
    }
}

/// Reduces a folded token stream to one boolean.
///
/// Each bracket depth gets its own list of half expressions; a list is reduced when its
/// bracket closes and the result goes to the parent list.
#[derive(Debug)]
pub struct Evaluator {
    results: Vec<Vec<HalfBooleanExpression>>,
    negated: Vec<usize>,
    prefix_pending: bool,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator {
            results: vec![Vec::new()],
            negated: Vec::new(),
            prefix_pending: false,
        }
    }
}

impl Evaluator {
    pub fn evaluate<I>(tokens: I) -> Result<bool, ExpressionError>
    where
        I: IntoIterator<Item = Result<Token, ExpressionError>>,
    {
        let mut evaluator = Evaluator::default();
        for token in tokens {
            evaluator.push(token?)?;
        }
        evaluator.finish()
    }

    fn depth(&self) -> usize {
        self.results.len() - 1
    }

    fn current(&mut self) -> &mut Vec<HalfBooleanExpression> {
        let depth = self.depth();
        &mut self.results[depth]
    }

    pub fn push(&mut self, token: Token) -> Result<(), ExpressionError> {
        let prefix_pending = std::mem::take(&mut self.prefix_pending);

        match token {
            Token::Infix(kind) => match self.current().last_mut() {
                Some(last) if last.operator.is_none() => last.operator = Some(kind),
                _ => {
                    return Err(ExpressionError::InvalidGrammar(format!(
                        "the logic operator '{}' has no left operand",
                        kind
                    )));
                }
            },
            Token::Not => self.prefix_pending = true,
            Token::Open => {
                self.results.push(Vec::new());
                if prefix_pending {
                    let depth = self.depth();
                    self.negated.push(depth);
                }
            }
            Token::Boolean(boolean) => self.append(HalfBooleanExpression::terminal(boolean))?,
            Token::Close => self.close()?,
        }
        Ok(())
    }

    fn append(&mut self, half: HalfBooleanExpression) -> Result<(), ExpressionError> {
        let current = self.current();
        if let Some(last) = current.last() {
            if last.operator.is_none() {
                return Err(ExpressionError::InvalidGrammar(format!(
                    "'{}' and '{}' are not separated by a logic operator",
                    last.boolean, half.boolean
                )));
            }
        }
        current.push(half);
        Ok(())
    }

    fn close(&mut self) -> Result<(), ExpressionError> {
        let depth = self.depth();
        if depth == 0 {
            return Err(ExpressionError::UnbalancedBrackets);
        }

        let list = self.results.pop().unwrap_or_default();
        let mut boolean = reduce(&list)?;
        if self.negated.last() == Some(&depth) {
            self.negated.pop();
            boolean = !boolean;
        }
        tracing::trace!(depth, boolean, "closed bracket");
        self.append(HalfBooleanExpression::terminal(boolean))
    }

    pub fn finish(self) -> Result<bool, ExpressionError> {
        if self.results.len() > 1 {
            return Err(ExpressionError::InvalidExpression(format!(
                "{} bracket(s) left open",
                self.depth()
            )));
        }
        match self.results.first() {
            Some(list) => reduce(list),
            None => Err(ExpressionError::InvalidExpression("nothing to evaluate".to_string())),
        }
    }
}

/// Reduces one list in a single pass, AND binding tighter than OR.
///
/// An OR followed by an AND is put aside as a debt and OR-ed back once the AND chain is done.
pub fn reduce(list: &[HalfBooleanExpression]) -> Result<bool, ExpressionError> {
    let Some((&first, rest)) = list.split_first() else {
        return Err(ExpressionError::InvalidExpression("nothing to evaluate".to_string()));
    };

    let mut result = first;
    let mut debt: Option<bool> = None;
    for &next in rest {
        match result.combine(next)? {
            Some(combined) => result = combined,
            None => {
                debt = Some(debt.map_or(result.boolean, |debt| debt || result.boolean));
                result = next;
            }
        }
    }

    if let Some(operator) = result.operator {
        return Err(ExpressionError::InvalidExpression(format!(
            "the expression ends with the logic operator '{}'",
            operator
        )));
    }
    Ok(debt.map_or(result.boolean, |debt| debt || result.boolean))
}
