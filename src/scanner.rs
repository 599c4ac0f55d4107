use std::collections::BTreeSet;

use regex::Regex;

use crate::element::{self, Bracket, Element, Operand};
use crate::error::ExpressionError;
use crate::expr::Expression;
use crate::registry::OperatorRegistry;

/// The `Scanner` splits an expression string into `Element`s.
///
/// Its matching pattern is derived from the registry it is built with:
/// - symbolic operator names of all three operator sets, merged into one punctuation-run class
/// - keyword operator names as whole words
/// - operands, optionally glued to opening brackets and symbolic prefix operators before them
///   and closing brackets after them (`!(isAdmin`, `flag)`, `((`)
///
/// Every match has to be followed by whitespace or the end of the input.
pub struct Scanner<'r> {
    registry: &'r OperatorRegistry,
    pattern: Regex,
    variable: Option<Regex>, // whole-string custom variable name pattern
    prefixes: Vec<&'r str>, // symbolic prefix names, longest first
}

impl<'r> Scanner<'r> {
    pub fn new(registry: &'r OperatorRegistry, variable_pattern: Option<&Regex>) -> Result<Self, ExpressionError> {
        let variable = variable_pattern
            .map(|pattern| element::anchored(pattern.as_str()))
            .transpose()
            .map_err(|e| ExpressionError::InvalidPattern(e.to_string()))?;

        let mut prefixes: Vec<&str> = registry
            .prefix_operators()
            .filter(|operator| !operator.is_keyword())
            .map(|operator| operator.name())
            .collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));

        let variable_pattern = variable_pattern.map_or(element::VARIABLE_PATTERN, |pattern| pattern.as_str());
        let pattern = Regex::new(&Self::build_pattern(registry, &prefixes, variable_pattern))
            .map_err(|e| ExpressionError::InvalidPattern(e.to_string()))?;

        Ok(Scanner { registry, pattern, variable, prefixes })
    }

    fn build_pattern(registry: &OperatorRegistry, prefixes: &[&str], variable_pattern: &str) -> String {
        let mut symbols = BTreeSet::new();
        let mut keywords = Vec::new();
        for name in registry.names() {
            if name.starts_with(|c: char| c.is_ascii_alphabetic()) {
                keywords.push(name);
            } else {
                symbols.extend(name.chars());
            }
        }
        keywords.sort_by(|a, b| b.len().cmp(&a.len()));

        let mut operators = Vec::new();
        if !symbols.is_empty() {
            let class: String = symbols.iter().map(|c| regex::escape(&c.to_string())).collect();
            operators.push(format!("[{}]+", class));
        }
        operators.extend(keywords.iter().map(|keyword| regex::escape(keyword)));

        let lead: Vec<String> = std::iter::once(r"\(".to_string())
            .chain(prefixes.iter().map(|prefix| regex::escape(prefix)))
            .collect();
        let body = [
            element::STRING_PATTERN,
            element::NUMBER_PATTERN,
            element::BOOLEAN_PATTERN,
            variable_pattern,
        ]
        .map(|alternative| format!("(?:{})", alternative))
        .join("|");
        let glued = format!(r"(?P<lead>(?:{})*)(?P<body>{})?(?P<close>\)*)", lead.join("|"), body);

        if operators.is_empty() {
            format!(r"^(?:{})(?:\s|$)", glued)
        } else {
            format!(r"^(?:(?P<operator>{})|{})(?:\s|$)", operators.join("|"), glued)
        }
    }

    /// Scans `source` from left to right and returns its elements in order.
    pub fn scan(&self, source: &str) -> Result<Expression, ExpressionError> {
        let mut elements = Vec::new();
        let mut current = 0;

        while let Some(start) = Self::skip_whitespace(source, current) {
            let rest = &source[start..];
            let Some(captures) = self.pattern.captures(rest) else {
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                return Err(ExpressionError::IncorrectElement(rest[..end].to_string()));
            };

            let before = elements.len();
            if let Some(operator) = captures.name("operator") {
                elements.push(self.operator(operator.as_str())?);
            } else {
                let lead = captures.name("lead").map_or("", |m| m.as_str());
                self.lead(lead, &mut elements)?;
                if let Some(body) = captures.name("body") {
                    let operand = Operand::classify(body.as_str(), self.variable.as_ref())?;
                    elements.push(Element::Operand(operand));
                }
                let close = captures.name("close").map_or(0, |m| m.len());
                elements.extend(std::iter::repeat_n(Element::Bracket(Bracket::Close), close));
            }
            for element in &elements[before..] {
                tracing::trace!(element = %element, "scanned element");
            }

            // the whole match may include the whitespace after it
            current = start + captures.get(0).map_or(rest.len(), |m| m.end());
        }

        if elements.is_empty() {
            return Err(ExpressionError::EmptyExpression);
        }
        Ok(Expression::from(elements))
    }

    /// Byte index of the next non-whitespace char at or after `from`.
    fn skip_whitespace(source: &str, from: usize) -> Option<usize> {
        source[from..]
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(idx, _)| from + idx)
    }

    /// Looks `lexeme` up as comparison, infix then prefix operator. A punctuation run naming
    /// no operator is handed to operand classification, which rejects it.
    fn operator(&self, lexeme: &str) -> Result<Element, ExpressionError> {
        if let Some(operator) = self.registry.comparison_operator(lexeme) {
            Ok(Element::ComparisonOperator(operator.clone()))
        } else if let Some(operator) = self.registry.infix_operator(lexeme) {
            Ok(Element::LogicInfixOperator(operator.clone()))
        } else if let Some(operator) = self.registry.prefix_operator(lexeme) {
            Ok(Element::LogicPrefixOperator(operator.clone()))
        } else {
            Operand::classify(lexeme, self.variable.as_ref()).map(Element::Operand)
        }
    }

    /// Splits a run of opening brackets and glued prefix operators.
    fn lead(&self, lead: &str, elements: &mut Vec<Element>) -> Result<(), ExpressionError> {
        let mut rest = lead;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('(') {
                elements.push(Element::Bracket(Bracket::Open));
                rest = after;
                continue;
            }
            let operator = self
                .prefixes
                .iter()
                .find(|prefix| rest.starts_with(**prefix))
                .and_then(|prefix| self.registry.prefix_operator(prefix))
                .ok_or_else(|| ExpressionError::IncorrectElement(lead.to_string()))?;
            elements.push(Element::LogicPrefixOperator(operator.clone()));
            rest = &rest[operator.name().len()..];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{InfixKind, LogicInfixOperator, LogicPrefixOperator, Operator};

    fn scan(source: &str) -> Result<Vec<Element>, ExpressionError> {
        let registry = OperatorRegistry::default();
        let scanner = Scanner::new(&registry, None)?;
        scanner.scan(source).map(|expression| expression.iter().cloned().collect())
    }

    fn var(name: &str) -> Element {
        Element::variable(name)
    }

    fn op(operator: Operator) -> Element {
        Element::ComparisonOperator(operator)
    }

    const OPEN: Element = Element::Bracket(Bracket::Open);
    const CLOSE: Element = Element::Bracket(Bracket::Close);

    fn and() -> Element {
        Element::LogicInfixOperator(LogicInfixOperator::and())
    }

    fn or() -> Element {
        Element::LogicInfixOperator(LogicInfixOperator::or())
    }

    fn not() -> Element {
        Element::LogicPrefixOperator(LogicPrefixOperator::not())
    }

    #[test]
    fn test_valid_input() {
        let cases = vec![
            ("variable == 2", vec![var("variable"), op(Operator::equal()), Element::number(2.0)]),
            ("variable  == 2", vec![var("variable"), op(Operator::equal()), Element::number(2.0)]),
            (
                "( variable == 2)",
                vec![OPEN, var("variable"), op(Operator::equal()), Element::number(2.0), CLOSE],
            ),
            (
                r#"variable >= 1.5 && input == "Test""#,
                vec![
                    var("variable"), op(Operator::greater_than_or_equal()), Element::number(1.5),
                    and(),
                    var("input"), op(Operator::equal()), Element::string("Test"),
                ],
            ),
            (
                r#"(variable >= 1.5 && isCheck == true) || input == "Test""#,
                vec![
                    OPEN,
                    var("variable"), op(Operator::greater_than_or_equal()), Element::number(1.5),
                    and(),
                    var("isCheck"), op(Operator::equal()), Element::boolean(true),
                    CLOSE,
                    or(),
                    var("input"), op(Operator::equal()), Element::string("Test"),
                ],
            ),
            (
                r#"variable == " String with space ""#,
                vec![var("variable"), op(Operator::equal()), Element::string(" String with space ")],
            ),
            (
                "name == 'Benjamin Daniel or Benzaïe' && isCheck",
                vec![
                    var("name"), op(Operator::equal()), Element::string("Benjamin Daniel or Benzaïe"),
                    and(), var("isCheck"),
                ],
            ),
            ("'Fifi' isIn Ducks", vec![Element::string("Fifi"), op(Operator::is_in()), var("Ducks")]),
            ("isInside", vec![var("isInside")]),
            ("!bool", vec![not(), var("bool")]),
            ("! bool", vec![not(), var("bool")]),
            ("!!bool", vec![not(), not(), var("bool")]),
            (
                "!(variable != 10)",
                vec![not(), OPEN, var("variable"), op(Operator::not_equal()), Element::number(10.0), CLOSE],
            ),
            ("((flag))", vec![OPEN, OPEN, var("flag"), CLOSE, CLOSE]),
            ("( ( flag ) )", vec![OPEN, OPEN, var("flag"), CLOSE, CLOSE]),
            ("(!flag)", vec![OPEN, not(), var("flag"), CLOSE]),
            ("count < -2", vec![var("count"), op(Operator::lesser_than()), Element::number(-2.0)]),
            ("a1 == 'x' || b1 == 'y'", vec![
                var("a1"), op(Operator::equal()), Element::string("x"),
                or(),
                var("b1"), op(Operator::equal()), Element::string("y"),
            ]),
        ];

        for (source, expected) in cases {
            let result = scan(source);
            assert_eq!(result, Ok(expected), "Failed to scan valid input {:?}", source);
        }
    }

    #[test]
    fn test_invalid_input() {
        let cases = vec![
            ("", ExpressionError::EmptyExpression),
            ("   \t ", ExpressionError::EmptyExpression),
            ("variable == 1 && var2 == 1*", ExpressionError::IncorrectElement("1*".to_string())),
            ("variable -= 2", ExpressionError::IncorrectElement("-=".to_string())),
            ("variable == 'unterminated", ExpressionError::IncorrectElement("'unterminated".to_string())),
            ("variable = 2", ExpressionError::InvalidVariableName("=".to_string())),
            ("variable === 2", ExpressionError::InvalidVariableName("===".to_string())),
            ("x == 2", ExpressionError::IncorrectElement("x".to_string())),
            ("variable == 'it's'", ExpressionError::InvalidStringQuotation("'it's'".to_string())),
        ];

        for (source, expected) in cases {
            let result = scan(source);
            assert_eq!(result, Err(expected), "Expected scan to fail. Input: {:?}", source);
        }
    }

    #[test]
    fn test_escaped_quotes() {
        let cases = vec![
            (r"name == 'it\' s'", r"it\' s"),
            (r#"name == "it\' s""#, r"it\' s"),
            (r#"name == "say \" hi""#, r#"say \" hi"#),
            (r"name == 'a\\'", r"a\\"),
            // a lone trailing backslash does not escape the closing quote
            (r"name == 'a\'", r"a\"),
        ];

        for (source, expected) in cases {
            let result = scan(source);
            assert_eq!(
                result,
                Ok(vec![var("name"), op(Operator::equal()), Element::string(expected)]),
                "Failed to scan {:?}",
                source
            );
        }

        let result = scan(r"name == 'a\' && flag");
        assert_eq!(
            result,
            Ok(vec![var("name"), op(Operator::equal()), Element::string(r"a\"), and(), var("flag")])
        );
    }

    #[test]
    fn test_custom_variable_pattern() {
        let registry = OperatorRegistry::default();
        let pattern = Regex::new("[a-zA-Z#]{1}[a-zA-Z0-9#]+").unwrap();
        let scanner = Scanner::new(&registry, Some(&pattern)).unwrap();

        let expression = scanner.scan("#variable >= 2").unwrap();
        let expected = vec![var("#variable"), op(Operator::greater_than_or_equal()), Element::number(2.0)];
        assert_eq!(expression.iter().cloned().collect::<Vec<_>>(), expected);

        let result = scanner.scan("#variable -= 2");
        assert_eq!(result, Err(ExpressionError::IncorrectElement("-=".to_string())));
    }

    #[test]
    fn test_invalid_custom_variable_pattern() {
        let registry = OperatorRegistry::default();
        let pattern = Regex::new("(?P<body>[a-z]+)").unwrap();
        let result = Scanner::new(&registry, Some(&pattern));
        assert!(matches!(result, Err(ExpressionError::InvalidPattern(_))));
    }

    #[test]
    fn test_registry_drives_lexing() {
        let registry = OperatorRegistry::default()
            .remove_operator("isIn")
            .register_infix_operator(LogicInfixOperator::new("and", InfixKind::And).unwrap())
            .register_prefix_operator(LogicPrefixOperator::new("not").unwrap())
            .register_operator(Operator::new("~=", |lhs, rhs| Operator::has_prefix().evaluate(lhs, rhs)).unwrap());
        let scanner = Scanner::new(&registry, None).unwrap();

        let expression = scanner.scan("name ~= 'Lou' and not isIn").unwrap();
        let elements: Vec<Element> = expression.iter().cloned().collect();
        assert_eq!(elements.len(), 6);
        assert_eq!(elements[1].to_string(), "~=");
        assert!(matches!(&elements[3], Element::LogicInfixOperator(o) if o.kind() == InfixKind::And));
        assert!(matches!(&elements[4], Element::LogicPrefixOperator(o) if o.name() == "not"));
        // no longer an operator, so a plain variable
        assert_eq!(elements[5], var("isIn"));
    }
}
