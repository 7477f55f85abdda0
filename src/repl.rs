//! REPL (Read-Eval-Print Loop) for FEEL
//!
//! Provides an interactive shell for evaluating FEEL expressions and unary
//! tests against a context that grows with `:set`.

use crate::{format_syntax_error, Context, Dialect, EvaluateOptions, Value, Warning};
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::{history::FileHistory, CompletionType, Config, Editor};
use std::env;
use std::path::PathBuf;

/// Run the interactive REPL
pub fn run_repl(dialect: Dialect) -> Result<()> {
    println!("{}", format!("FEEL REPL v{}", crate::VERSION).cyan().bold());
    println!("{}", "Type :help for help, :quit to exit".dimmed());
    println!();

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .auto_add_history(true)
        .build();

    let mut rl: Editor<(), FileHistory> = Editor::with_config(config)?;

    let history_path = get_history_path();
    if let Some(path) = &history_path {
        let _ = rl.load_history(path); // Ignore errors if history doesn't exist yet
    }

    let mut options = EvaluateOptions { dialect };
    let mut context = Context::new();
    let mut line_number = 1;
    let mut multiline_buffer = String::new();

    loop {
        let prompt = if multiline_buffer.is_empty() {
            format!("feel:{} ", line_number).green().bold().to_string()
        } else {
            "   ... ".yellow().bold().to_string()
        };

        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                println!("{}", "Use :quit to exit".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red().bold(), err);
                break;
            }
        };

        // Lines ending with \ continue on the next line
        let trimmed = line.trim();
        if let Some(continued) = trimmed.strip_suffix('\\') {
            multiline_buffer.push_str(continued);
            multiline_buffer.push(' ');
            continue;
        }
        multiline_buffer.push_str(trimmed);
        let input = std::mem::take(&mut multiline_buffer);
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix(':') {
            let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
            let rest = rest.trim();
            match name {
                "quit" | "q" | "exit" => {
                    println!("{}", "Goodbye!".cyan());
                    break;
                }
                "help" | "h" => print_help(),
                "clear" | "c" => {
                    context.clear();
                    println!("{}", "✓ Context cleared".green());
                }
                "vars" | "v" => print_variables(&context),
                "dialect" => {
                    options.dialect = rest.parse().unwrap_or_default();
                    println!("{} {}", "✓ Dialect:".green(), options.dialect);
                }
                "set" => match rest.split_once('=') {
                    Some((variable, expression)) => {
                        if let Some(value) = evaluate_line(expression.trim(), &context, &options) {
                            println!("{} = {}", variable.trim().green(), format_value(&value));
                            context.insert(variable.trim().to_string(), value);
                        }
                    }
                    None => eprintln!("{}", "Usage: :set <name> = <expression>".red()),
                },
                "input" => {
                    if let Some(value) = evaluate_line(rest, &context, &options) {
                        println!("{} = {}", "?".green(), format_value(&value));
                        context.insert("?".to_string(), value);
                    }
                }
                "test" => match crate::unary_test_with(rest, &context, &options) {
                    Ok(result) => {
                        println!("{}", format_test_result(result.value));
                        print_warnings(&result.warnings);
                    }
                    Err(e) => eprint!("{}", format_syntax_error(&e, rest)),
                },
                _ => {
                    eprintln!("{} {}", "Unknown command:".red(), input);
                    println!("{}", "Type :help for available commands".dimmed());
                }
            }
            continue;
        }

        if let Some(value) = evaluate_line(input, &context, &options) {
            println!("{}", format_value(&value));
            line_number += 1;
        }
    }

    // Save history before exiting
    if let Some(path) = history_path {
        let _ = rl.save_history(&path); // Ignore errors on save
    }

    Ok(())
}

/// Evaluate one expression, printing syntax errors and warnings
fn evaluate_line(expression: &str, context: &Context, options: &EvaluateOptions) -> Option<Value> {
    match crate::evaluate_with(expression, context, options) {
        Ok(result) => {
            print_warnings(&result.warnings);
            Some(result.value)
        }
        Err(e) => {
            eprint!("{}", format_syntax_error(&e, expression));
            None
        }
    }
}

/// Get the history file path
fn get_history_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| {
        let mut path = PathBuf::from(home);
        path.push(".feel_history");
        path
    })
}

fn print_help() {
    println!("{}", "FEEL REPL Commands:".cyan().bold());
    println!("  {}  - Show this help message", ":help, :h".green());
    println!("  {}  - Exit the REPL", ":quit, :q, :exit".green());
    println!("  {}  - Clear all variables", ":clear, :c".green());
    println!("  {}  - Show all variables", ":vars, :v".green());
    println!("  {}  - Bind a variable", ":set <name> = <expr>".green());
    println!("  {}  - Set the unary test input ?", ":input <expr>".green());
    println!("  {}  - Match the input against unary tests", ":test <tests>".green());
    println!("  {}  - Switch dialect (standard, camunda)", ":dialect <name>".green());
    println!();
    println!("{}", "Examples:".cyan().bold());
    println!("  {}", "sum([1, 2, 3])".dimmed());
    println!("  {}", "date(\"2023-10-06\") + duration(\"P1M\")".dimmed());
    println!("  {}", ":set rate = 0.25".dimmed());
    println!("  {}", ":input 7".dimmed());
    println!("  {}", ":test < 5, [6..10]".dimmed());
}

fn print_variables(context: &Context) {
    if context.is_empty() {
        println!("{}", "No variables defined".dimmed());
        return;
    }

    println!("{}", "Variables:".cyan().bold());
    for (name, value) in context {
        println!("  {} = {}", name.green(), format_value(value));
    }
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

/// Format a unary test outcome for display
pub fn format_test_result(value: Option<bool>) -> String {
    match value {
        Some(true) => "true".green().bold().to_string(),
        Some(false) => "false".red().bold().to_string(),
        None => "null".dimmed().to_string(),
    }
}

/// Format a value for display
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s).yellow().to_string(),
        Value::Number(_) => value.to_string().cyan().to_string(),
        Value::Boolean(b) => b.to_string().magenta().to_string(),
        Value::Null => "null".dimmed().to_string(),
        Value::List(items) => {
            let formatted: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", formatted.join(", "))
        }
        Value::Context(entries) => {
            let formatted: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", formatted.join(", "))
        }
        Value::Function(_) => value.to_string().blue().to_string(),
        Value::Range(_)
        | Value::Date(_)
        | Value::Time(_)
        | Value::DateTime(_)
        | Value::Duration(_) => value.to_string().bright_green().to_string(),
    }
}
