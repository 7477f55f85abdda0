//! Syntax errors and their formatting
//!
//! Malformed input is the only failure that escapes `evaluate` and
//! `unary_test`; everything else is recovered as a warning.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::Position;

/// Why the input could not be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyntaxErrorKind {
    /// A run of characters that is not a FEEL token
    UnrecognizedToken,
    /// A token that does not fit where it appears
    UnexpectedToken,
    /// Input ended before a construct was complete
    Incomplete,
}

/// A syntax error with the minimal offending input and its span
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// The offending substring
    pub input: String,
    pub position: Position,
}

impl SyntaxError {
    pub fn unrecognized(input: &str, from: usize, to: usize) -> Self {
        Self {
            kind: SyntaxErrorKind::UnrecognizedToken,
            message: format!("Unrecognized token <{}>", input),
            input: input.to_string(),
            position: Position { from, to },
        }
    }

    pub fn unexpected(input: &str, parent: &str, from: usize, to: usize) -> Self {
        Self {
            kind: SyntaxErrorKind::UnexpectedToken,
            message: format!("Unexpected <{}> in {}", input, parent),
            input: input.to_string(),
            position: Position { from, to },
        }
    }

    pub fn incomplete(node: &str, input: &str, from: usize, to: usize) -> Self {
        Self {
            kind: SyntaxErrorKind::Incomplete,
            message: format!("Incomplete {}", node),
            input: input.to_string(),
            position: Position { from, to },
        }
    }
}

/// Format a syntax error with a colored source snippet and a caret marker
pub fn format_syntax_error(error: &SyntaxError, source: &str) -> String {
    let mut output = String::new();

    let (line, col) = line_col(source, error.position.from);

    output.push_str(&format!(
        "{} {}\n",
        "Syntax error:".red().bold(),
        error.message
    ));
    output.push_str(&format!(
        "  {} {}\n",
        "-->".blue().bold(),
        format!("{}:{}", line, col).cyan()
    ));

    let lines: Vec<&str> = source.lines().collect();
    if line > 0 && line <= lines.len() {
        let text = lines[line - 1];
        output.push_str(&format!("   {}\n", "|".blue()));
        output.push_str(&format!(" {} | {}\n", format!("{:3}", line).blue().bold(), text));

        let width = error
            .input
            .chars()
            .take_while(|c| *c != '\n')
            .count()
            .max(1);
        let indicator = format!("{}{}", " ".repeat(col - 1), "^".repeat(width));
        output.push_str(&format!("   {}   {}\n", "|".blue(), indicator.red().bold()));
    }

    output.push_str(&hint(error));
    output
}

fn hint(error: &SyntaxError) -> String {
    match error.kind {
        SyntaxErrorKind::Incomplete if error.message.contains("if expression") => format!(
            "\n  {} if expressions read: if condition then value else other\n",
            "Hint:".yellow().bold()
        ),
        SyntaxErrorKind::Incomplete if error.message.contains("for expression") => format!(
            "\n  {} for expressions read: for x in list return value\n",
            "Hint:".yellow().bold()
        ),
        SyntaxErrorKind::UnrecognizedToken if error.input.starts_with('"') => format!(
            "\n  {} Missing closing quote '\"' for string\n",
            "Hint:".yellow().bold()
        ),
        _ => String::new(),
    }
}

/// 1-based line and column of a byte offset
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let col = before
        .rsplit('\n')
        .next()
        .map_or(0, |l| l.chars().count())
        + 1;
    (line, col)
}
