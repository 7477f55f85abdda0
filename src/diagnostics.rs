//! Non-fatal diagnostics collected during one evaluation
//!
//! Semantic problems (unknown names, type mismatches, failed invocations)
//! never abort evaluation. They resolve to `null` locally and leave a
//! `Warning` behind in the `Diagnostics` accumulator that is threaded
//! through every evaluation step.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::SourceSpan;

/// Warning categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningType {
    NoVariableFound,
    NoContextEntryFound,
    NoPropertyFound,
    NoFunctionFound,
    FunctionInvocationFailure,
    InvalidType,
}

impl fmt::Display for WarningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarningType::NoVariableFound => "NO_VARIABLE_FOUND",
            WarningType::NoContextEntryFound => "NO_CONTEXT_ENTRY_FOUND",
            WarningType::NoPropertyFound => "NO_PROPERTY_FOUND",
            WarningType::NoFunctionFound => "NO_FUNCTION_FOUND",
            WarningType::FunctionInvocationFailure => "FUNCTION_INVOCATION_FAILURE",
            WarningType::InvalidType => "INVALID_TYPE",
        };
        write!(f, "{}", name)
    }
}

/// Source range a warning refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub from: usize,
    pub to: usize,
}

impl From<SourceSpan> for Position {
    fn from(span: SourceSpan) -> Self {
        Position {
            from: span.from,
            to: span.to,
        }
    }
}

/// Message template with its positional values (`{0}`, `{1}`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningDetails {
    pub template: String,
    pub values: Vec<String>,
}

/// A structured, non-fatal diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    pub message: String,
    pub position: Position,
    pub details: WarningDetails,
}

impl Warning {
    /// Build a warning, rendering `template` with `values`
    pub fn new(
        warning_type: WarningType,
        template: &str,
        values: Vec<String>,
        span: SourceSpan,
    ) -> Self {
        let mut message = template.to_string();
        for (i, value) in values.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), value);
        }
        Self {
            warning_type,
            message,
            position: span.into(),
            details: WarningDetails {
                template: template.to_string(),
                values,
            },
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.warning_type, self.position.from, self.position.to, self.message
        )
    }
}

/// Accumulates warnings for a single `evaluate` / `unary_test` call
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        tracing::trace!(warning = %warning, "recorded warning");
        self.warnings.push(warning);
    }

    pub fn no_variable_found(&mut self, name: &str, span: SourceSpan) {
        self.push(Warning::new(
            WarningType::NoVariableFound,
            "Variable <{0}> not found",
            vec![name.to_string()],
            span,
        ));
    }

    pub fn no_context_entry_found(&mut self, key: &str, span: SourceSpan) {
        self.push(Warning::new(
            WarningType::NoContextEntryFound,
            "Context entry <{0}> not found",
            vec![key.to_string()],
            span,
        ));
    }

    pub fn no_property_found(&mut self, property: &str, type_name: &str, span: SourceSpan) {
        self.push(Warning::new(
            WarningType::NoPropertyFound,
            "Property <{0}> not found on <{1}>",
            vec![property.to_string(), type_name.to_string()],
            span,
        ));
    }

    pub fn no_function_found(&mut self, callee: &str, span: SourceSpan) {
        self.push(Warning::new(
            WarningType::NoFunctionFound,
            "Function <{0}> not found",
            vec![callee.to_string()],
            span,
        ));
    }

    pub fn invocation_failure(&mut self, callee: &str, reason: &str, span: SourceSpan) {
        self.push(Warning::new(
            WarningType::FunctionInvocationFailure,
            "Failed to invoke function <{0}>: {1}",
            vec![callee.to_string(), reason.to_string()],
            span,
        ));
    }

    pub fn invalid_type(&mut self, operation: &str, left: &str, right: &str, span: SourceSpan) {
        self.push(Warning::new(
            WarningType::InvalidType,
            "Cannot apply <{0}> to <{1}> and <{2}>",
            vec![operation.to_string(), left.to_string(), right.to_string()],
            span,
        ));
    }

    /// Move all warnings of `other` into this collector
    pub fn append(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_renders_template() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.no_variable_found("foo", SourceSpan::new(0, 3));

        let warnings = diagnostics.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].warning_type, WarningType::NoVariableFound);
        assert_eq!(warnings[0].message, "Variable <foo> not found");
        assert_eq!(warnings[0].details.template, "Variable <{0}> not found");
        assert_eq!(warnings[0].position, Position { from: 0, to: 3 });
    }

    #[test]
    fn test_warning_serializes_type_name() {
        let warning = Warning::new(
            WarningType::FunctionInvocationFailure,
            "x",
            vec![],
            SourceSpan::new(1, 2),
        );
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["type"], "FUNCTION_INVOCATION_FAILURE");
        assert_eq!(json["position"]["from"], 1);
    }
}
