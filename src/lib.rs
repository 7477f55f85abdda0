//! FEEL - Friendly Enough Expression Language
//!
//! An evaluator for FEEL expressions and unary tests as used by decision
//! models. Evaluation never fails on semantic mistakes: unresolved names,
//! type mismatches and failed invocations evaluate to `null` and are
//! reported as [`Warning`]s. Only malformed input is an error.
//!
//! ```
//! use feel::{evaluate, Value};
//!
//! let result = evaluate("sum([1, 2, 3]) * 2", &feel::Context::new()).unwrap();
//! assert_eq!(result.value, Value::Number(12.0));
//! assert!(result.warnings.is_empty());
//! ```

pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod range;
pub mod temporal;
pub mod token_parser;
pub mod types;
pub mod value;

// CLI-only modules
#[cfg(feature = "cli")]
pub mod repl;

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

// Re-export commonly used types
pub use diagnostics::{Diagnostics, Position, Warning, WarningType};
pub use error::{format_syntax_error, SyntaxError, SyntaxErrorKind};
pub use evaluator::Evaluator;
pub use range::Range;
pub use value::{Context, Function, Value};

/// FEEL version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Built-in function set to evaluate with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// The standard DMN function library
    #[default]
    Standard,
    /// Standard functions plus the Camunda extensions
    Camunda,
}

impl FromStr for Dialect {
    type Err = Infallible;

    /// `"camunda"` (any case) selects the Camunda dialect; anything else is standard
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("camunda") {
            Ok(Dialect::Camunda)
        } else {
            Ok(Dialect::Standard)
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Standard => write!(f, "standard"),
            Dialect::Camunda => write!(f, "camunda"),
        }
    }
}

/// Options accepted by [`evaluate_with`] and [`unary_test_with`]
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    pub dialect: Dialect,
}

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: Value,
    pub warnings: Vec<Warning>,
}

/// Result of a unary test; `None` when the outcome is unknown
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryTestResult {
    pub value: Option<bool>,
    pub warnings: Vec<Warning>,
}

/// Evaluate an expression against a context with the standard dialect
pub fn evaluate(expression: &str, context: &Context) -> Result<Evaluation, SyntaxError> {
    evaluate_with(expression, context, &EvaluateOptions::default())
}

/// Evaluate an expression against a context
pub fn evaluate_with(
    expression: &str,
    context: &Context,
    options: &EvaluateOptions,
) -> Result<Evaluation, SyntaxError> {
    let tree = token_parser::parse_expression(expression, known_names(context, options.dialect))?;

    let mut diagnostics = Diagnostics::new();
    let value = Evaluator::new(options.dialect).evaluate(&tree, context.clone(), &mut diagnostics);

    debug!(
        expression,
        dialect = %options.dialect,
        warnings = diagnostics.len(),
        "evaluated expression"
    );

    Ok(Evaluation {
        value,
        warnings: diagnostics.into_warnings(),
    })
}

/// Match the input `context["?"]` against a list of unary tests with the
/// standard dialect
pub fn unary_test(expression: &str, context: &Context) -> Result<UnaryTestResult, SyntaxError> {
    unary_test_with(expression, context, &EvaluateOptions::default())
}

/// Match the input `context["?"]` against a list of unary tests
///
/// The result is true if any test matches; a surrounding `not(...)`
/// negates it. A missing input is `null`.
pub fn unary_test_with(
    expression: &str,
    context: &Context,
    options: &EvaluateOptions,
) -> Result<UnaryTestResult, SyntaxError> {
    let tree = token_parser::parse_unary_tests(expression, known_names(context, options.dialect))?;

    let mut diagnostics = Diagnostics::new();
    let value = Evaluator::new(options.dialect).evaluate(&tree, context.clone(), &mut diagnostics);

    debug!(
        expression,
        dialect = %options.dialect,
        warnings = diagnostics.len(),
        "evaluated unary tests"
    );

    Ok(UnaryTestResult {
        value: value.as_bool(),
        warnings: diagnostics.into_warnings(),
    })
}

/// Names the parser recognizes as a whole even when they contain spaces or
/// punctuation: built-ins, type names and every key of the context
fn known_names(context: &Context, dialect: Dialect) -> Vec<String> {
    let mut names: Vec<String> = functions::builtin_names(dialect)
        .into_iter()
        .chain(types::TypeRef::known_names().iter().copied())
        .map(String::from)
        .collect();
    collect_keys(context, &mut names);
    names
}

fn collect_keys(context: &Context, names: &mut Vec<String>) {
    for (key, value) in context {
        names.push(key.clone());
        collect_value_keys(value, names);
    }
}

fn collect_value_keys(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::Context(inner) => collect_keys(inner, names),
        Value::List(items) => items.iter().for_each(|item| collect_value_keys(item, names)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_parsing() {
        assert_eq!("camunda".parse::<Dialect>(), Ok(Dialect::Camunda));
        assert_eq!("CAMUNDA".parse::<Dialect>(), Ok(Dialect::Camunda));
        assert_eq!("other".parse::<Dialect>(), Ok(Dialect::Standard));
        assert_eq!(Dialect::default(), Dialect::Standard);
    }

    #[test]
    fn test_known_names_include_nested_keys() {
        let mut inner = Context::new();
        inner.insert("Monthly Salary".into(), Value::Number(10.0));
        let mut context = Context::new();
        context.insert("Employees".into(), Value::List(vec![Value::Context(inner)]));

        let names = known_names(&context, Dialect::Standard);
        assert!(names.contains(&"Employees".to_string()));
        assert!(names.contains(&"Monthly Salary".to_string()));
        assert!(names.contains(&"string length".to_string()));
    }

    #[test]
    fn test_evaluate_reports_syntax_error() {
        let err = evaluate("1 +", &Context::new()).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::Incomplete);
    }

    #[test]
    fn test_unary_test_reads_input() {
        let mut context = Context::new();
        context.insert("?".into(), Value::Number(5.0));
        let result = unary_test("< 10", &context).unwrap();
        assert_eq!(result.value, Some(true));
    }
}
