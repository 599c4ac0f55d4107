use ariadne::{self, Config, Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;
use thiserror::Error;

const SOURCE_NAME: &str = "expression";

/// Everything that can go wrong while lexing, folding or reducing an expression.
///
/// No variant is recoverable: the first error aborts the whole evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("the expression should not be empty")]
    EmptyExpression,
    #[error("incorrect element in the expression: \"{0}\"")]
    IncorrectElement(String),
    #[error("invalid variable name or element: \"{0}\"")]
    InvalidVariableName(String),
    #[error("invalid string quotation: {0}")]
    InvalidStringQuotation(String),
    #[error("invalid elements chaining: {0}")]
    InvalidGrammar(String),
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("the expression contains unbalanced brackets")]
    UnbalancedBrackets,
    #[error("the types of the two operands mismatch")]
    MismatchingType,
    #[error("the operator cannot be applied to operands of these types")]
    WrongOperatorAndOperandsAssociation,
    #[error("invalid operand: {0}")]
    InvalidOperand(String),
    #[error("invalid operator name: \"{0}\"")]
    InvalidOperatorName(String),
    #[error("invalid variable pattern: {0}")]
    InvalidPattern(String),
}

impl ExpressionError {
    /// The piece of source text this error is about, if it names one.
    pub fn offending_text(&self) -> Option<&str> {
        match self {
            ExpressionError::IncorrectElement(text)
            | ExpressionError::InvalidVariableName(text)
            | ExpressionError::InvalidStringQuotation(text)
            | ExpressionError::UndefinedVariable(text) => Some(text),
            _ => None,
        }
    }

    /// Char range of the offending text in `source`, falling back to the whole source.
    fn span_in(&self, source: &str) -> Range<usize> {
        let whole = 0..source.chars().count();
        let Some(text) = self.offending_text().filter(|text| !text.is_empty()) else {
            return whole;
        };
        let found = source.match_indices(text).find(|(start, _)| {
            let before = source[..*start].chars().next_back();
            let after = source[start + text.len()..].chars().next();
            before.is_none_or(separates_tokens) && after.is_none_or(separates_tokens)
        });
        match found {
            // ariadne counts chars, not bytes
            Some((start, _)) => {
                let start = source[..start].chars().count();
                start..start + text.chars().count()
            }
            None => whole,
        }
    }
}

/// Chars a lexeme can sit next to without being part of a longer one.
fn separates_tokens(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '!')
}

/// Builds an ariadne report pointing at the part of `source` the error is about.
pub fn report<'a>(source: &str, error: &ExpressionError, color: bool) -> Report<'a, (&'a str, Range<usize>)> {
    let span = error.span_in(source);
    Report::build(ReportKind::Error, (SOURCE_NAME, span.clone()))
        .with_config(Config::default().with_color(color))
        .with_message("Evaluation error")
        .with_label(Label::new((SOURCE_NAME, span)).with_message(error.to_string()))
        .finish()
}

pub fn print_error(source: &str, error: &ExpressionError) -> io::Result<()> {
    report(source, error, true).eprint((SOURCE_NAME, Source::from(source)))
}

/// Renders the report without colors, as `print_error` would write it.
pub fn render_error(source: &str, error: &ExpressionError) -> io::Result<String> {
    let mut buffer = Vec::new();
    report(source, error, false).write((SOURCE_NAME, Source::from(source)), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
