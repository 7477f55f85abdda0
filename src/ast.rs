//! Abstract Syntax Tree definitions for FEEL
//!
//! The token parser produces an `Expression` tree whose nodes carry byte
//! spans into the source text. The evaluator compiles this tree into
//! closures; warnings report the span of the node that produced them.

use serde::{Deserialize, Serialize};

use crate::types::TypeRef;

/// Byte range of a node in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    pub from: usize,
    pub to: usize,
}

impl SourceSpan {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(self, other: SourceSpan) -> Self {
        Self {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }
}

/// Context literal entry: `key: value`
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub key: String,
    pub value: Expression,
}

/// One `name in source` clause of a `for`, `some` or `every` expression
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub name: String,
    pub source: IterationSource,
}

/// What an iteration clause walks over
#[derive(Debug, Clone, PartialEq)]
pub enum IterationSource {
    /// `i in expr`: a list or an enumerable range value
    Expression(Expression),
    /// `i in 1..n`: an inclusive iteration range
    Range { start: Expression, end: Expression },
}

/// Invocation arguments; FEEL does not allow mixing the two styles
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    Positional(Vec<Expression>),
    Named(Vec<(String, Expression)>),
}

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Numeric literal
    Number { value: f64, span: SourceSpan },

    /// String literal, escapes already decoded
    String { value: String, span: SourceSpan },

    /// `true` / `false`
    Boolean { value: bool, span: SourceSpan },

    /// `null`
    Null { span: SourceSpan },

    /// Temporal literal: `@"2012-12-25"`, `@"P1D"`
    Temporal { text: String, span: SourceSpan },

    /// Name reference; may contain spaces (`date and time`, `Full Name`)
    Name { name: String, span: SourceSpan },

    /// Implicit input value of a unary test: `?`
    InputValue { span: SourceSpan },

    /// List literal: `[1, 2, 3]`
    List {
        elements: Vec<Expression>,
        span: SourceSpan,
    },

    /// Context literal: `{a: 1, "b": a + 1}`
    Context {
        entries: Vec<ContextEntry>,
        span: SourceSpan,
    },

    /// Interval literal: `[1..10)`, `]a..b]`
    Interval {
        start: Box<Expression>,
        end: Box<Expression>,
        start_included: bool,
        end_included: bool,
        span: SourceSpan,
    },

    /// Comparison unary test: `< 10`, `>= x`, `= 5`, `!= "a"`
    UnaryComparison {
        op: ComparisonOperator,
        operand: Box<Expression>,
        span: SourceSpan,
    },

    /// Arithmetic negation: `-x`
    Negation {
        operand: Box<Expression>,
        span: SourceSpan,
    },

    /// Arithmetic operation: `a + b`, `a ** b`, ...
    Arithmetic {
        op: ArithmeticOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: SourceSpan,
    },

    /// Comparison: `a = b`, `a < b`, ...
    Comparison {
        op: ComparisonOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: SourceSpan,
    },

    /// Three-valued connective: `a and b`, `a or b`
    Logical {
        op: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: SourceSpan,
    },

    /// `value between low and high`
    Between {
        value: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        span: SourceSpan,
    },

    /// `value in test` or `value in (test, test, ...)`
    In {
        value: Box<Expression>,
        tests: Vec<Expression>,
        span: SourceSpan,
    },

    /// `value instance of type`
    InstanceOf {
        value: Box<Expression>,
        type_ref: TypeRef,
        span: SourceSpan,
    },

    /// `if c then a else b`
    If {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Option<Box<Expression>>,
        span: SourceSpan,
    },

    /// `for i in xs, j in ys return body`
    For {
        iterations: Vec<Iteration>,
        body: Box<Expression>,
        span: SourceSpan,
    },

    /// `some x in xs satisfies c` / `every x in xs satisfies c`
    Quantified {
        quantifier: Quantifier,
        iterations: Vec<Iteration>,
        condition: Box<Expression>,
        span: SourceSpan,
    },

    /// `function(a, b) body`
    FunctionDefinition {
        params: Vec<String>,
        body: Box<Expression>,
        span: SourceSpan,
    },

    /// Path access: `a.b`
    Path {
        object: Box<Expression>,
        property: String,
        span: SourceSpan,
    },

    /// Filter or index: `list[expr]`
    Filter {
        object: Box<Expression>,
        selector: Box<Expression>,
        span: SourceSpan,
    },

    /// Invocation: `f(1, 2)` or `f(a: 1, b: 2)`
    Invocation {
        callee: Box<Expression>,
        args: Arguments,
        span: SourceSpan,
    },

    /// Unary test `-`, matching any input
    AnyInput { span: SourceSpan },

    /// Top-level unary tests: `test, test, ...` or `not(test, ...)`
    UnaryTests {
        tests: Vec<Expression>,
        negated: bool,
        span: SourceSpan,
    },
}

impl Expression {
    /// Get the span of this expression
    pub fn span(&self) -> SourceSpan {
        match self {
            Expression::Number { span, .. }
            | Expression::String { span, .. }
            | Expression::Boolean { span, .. }
            | Expression::Null { span }
            | Expression::Temporal { span, .. }
            | Expression::Name { span, .. }
            | Expression::InputValue { span }
            | Expression::List { span, .. }
            | Expression::Context { span, .. }
            | Expression::Interval { span, .. }
            | Expression::UnaryComparison { span, .. }
            | Expression::Negation { span, .. }
            | Expression::Arithmetic { span, .. }
            | Expression::Comparison { span, .. }
            | Expression::Logical { span, .. }
            | Expression::Between { span, .. }
            | Expression::In { span, .. }
            | Expression::InstanceOf { span, .. }
            | Expression::If { span, .. }
            | Expression::For { span, .. }
            | Expression::Quantified { span, .. }
            | Expression::FunctionDefinition { span, .. }
            | Expression::Path { span, .. }
            | Expression::Filter { span, .. }
            | Expression::Invocation { span, .. }
            | Expression::AnyInput { span }
            | Expression::UnaryTests { span, .. } => *span,
        }
    }

    /// Whether the implicit input `?` occurs anywhere below this node
    ///
    /// Function bodies are not searched: a `?` there belongs to the
    /// function's own invocation.
    pub fn references_input(&self) -> bool {
        match self {
            Expression::InputValue { .. } => true,
            Expression::Number { .. }
            | Expression::String { .. }
            | Expression::Boolean { .. }
            | Expression::Null { .. }
            | Expression::Temporal { .. }
            | Expression::Name { .. }
            | Expression::AnyInput { .. }
            | Expression::FunctionDefinition { .. } => false,
            Expression::List { elements, .. } => elements.iter().any(Expression::references_input),
            Expression::Context { entries, .. } => {
                entries.iter().any(|e| e.value.references_input())
            }
            Expression::Interval { start, end, .. } => {
                start.references_input() || end.references_input()
            }
            Expression::UnaryComparison { operand, .. } | Expression::Negation { operand, .. } => {
                operand.references_input()
            }
            Expression::Arithmetic { left, right, .. }
            | Expression::Comparison { left, right, .. }
            | Expression::Logical { left, right, .. } => {
                left.references_input() || right.references_input()
            }
            Expression::Between {
                value, low, high, ..
            } => value.references_input() || low.references_input() || high.references_input(),
            Expression::In { value, tests, .. } => {
                value.references_input() || tests.iter().any(Expression::references_input)
            }
            Expression::InstanceOf { value, .. } => value.references_input(),
            Expression::If {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                condition.references_input()
                    || then_expr.references_input()
                    || else_expr.as_ref().is_some_and(|e| e.references_input())
            }
            Expression::For {
                iterations, body, ..
            } => iterations.iter().any(Iteration::references_input) || body.references_input(),
            Expression::Quantified {
                iterations,
                condition,
                ..
            } => {
                iterations.iter().any(Iteration::references_input) || condition.references_input()
            }
            Expression::Path { object, .. } => object.references_input(),
            Expression::Filter {
                object, selector, ..
            } => object.references_input() || selector.references_input(),
            Expression::Invocation { callee, args, .. } => {
                callee.references_input()
                    || match args {
                        Arguments::Positional(args) => {
                            args.iter().any(Expression::references_input)
                        }
                        Arguments::Named(args) => args.iter().any(|(_, a)| a.references_input()),
                    }
            }
            Expression::UnaryTests { tests, .. } => tests.iter().any(Expression::references_input),
        }
    }
}

impl Iteration {
    fn references_input(&self) -> bool {
        match &self.source {
            IterationSource::Expression(expr) => expr.references_input(),
            IterationSource::Range { start, end } => {
                start.references_input() || end.references_input()
            }
        }
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOperator {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Power,    // **
}

impl std::fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Power => "**",
        };
        write!(f, "{}", symbol)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Equal,              // =
    NotEqual,           // !=
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
}

/// Logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Quantifier of a quantified expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantifier {
    Some,
    Every,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Expression> {
        Box::new(Expression::Name {
            name: n.to_string(),
            span: SourceSpan::default(),
        })
    }

    #[test]
    fn test_span_merge() {
        let merged = SourceSpan::new(4, 6).merge(SourceSpan::new(1, 5));
        assert_eq!(merged, SourceSpan::new(1, 6));
    }

    #[test]
    fn test_references_input() {
        let with_input = Expression::Comparison {
            op: ComparisonOperator::GreaterThan,
            left: Box::new(Expression::InputValue {
                span: SourceSpan::default(),
            }),
            right: name("x"),
            span: SourceSpan::default(),
        };
        assert!(with_input.references_input());

        let nested_in_function = Expression::FunctionDefinition {
            params: vec![],
            body: Box::new(with_input),
            span: SourceSpan::default(),
        };
        assert!(!nested_in_function.references_input());
        assert!(!name("x").references_input());
    }
}
