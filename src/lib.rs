//! Boolean expressions over string variables, as used for feature flags.
//!
//! ```
//! use std::collections::HashMap;
//!
//! let expression = bool_expr::parse("(variable >= 1.5 && isCheck == true) || 'Fifi' isIn Ducks", None).unwrap();
//! let variables = HashMap::from([("variable", "1"), ("isCheck", "false"), ("Ducks", "Riri, Fifi, Loulou")]);
//! assert_eq!(expression.evaluate(&variables), Ok(true));
//! ```

pub mod element;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod operator;
pub mod parser;
pub mod registry;
pub mod scanner;
pub mod variables;

use once_cell::sync::Lazy;
use regex::Regex;

pub use element::{Bracket, Element, Operand};
pub use error::ExpressionError;
pub use expr::Expression;
pub use operator::{InfixKind, LogicInfixOperator, LogicPrefixOperator, Operator, Value};
pub use registry::OperatorRegistry;
pub use scanner::Scanner;
pub use variables::VariableLookup;

static DEFAULT_REGISTRY: Lazy<OperatorRegistry> = Lazy::new(OperatorRegistry::default);
static DEFAULT_SCANNER: Lazy<Scanner<'static>> = Lazy::new(|| Scanner::new(&DEFAULT_REGISTRY, None).unwrap());

/// Parses `text` with the default operators.
///
/// `variable_pattern` replaces the default variable name pattern
/// (`[a-zA-Z][a-zA-Z0-9_-]+`) when given.
pub fn parse(text: &str, variable_pattern: Option<&Regex>) -> Result<Expression, ExpressionError> {
    match variable_pattern {
        None => DEFAULT_SCANNER.scan(text),
        Some(_) => parse_with(text, variable_pattern, &DEFAULT_REGISTRY),
    }
}

/// Parses `text` with the operators of `registry`.
pub fn parse_with(
    text: &str,
    variable_pattern: Option<&Regex>,
    registry: &OperatorRegistry,
) -> Result<Expression, ExpressionError> {
    Scanner::new(registry, variable_pattern)?.scan(text)
}
