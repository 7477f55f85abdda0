//! FEEL CLI - evaluate expressions and unary tests from the command line

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use feel::{Context, Dialect, EvaluateOptions, Value, Warning};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feel")]
#[command(about = "FEEL - Friendly Enough Expression Language evaluator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Built-in function dialect (standard, camunda)
    #[arg(short, long, global = true, default_value = "standard")]
    dialect: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression
    Eval {
        /// FEEL expression
        expression: String,

        #[command(flatten)]
        input: ContextArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Match an input value against unary tests
    Test {
        /// Unary tests, e.g. "< 10, [20..30]"
        tests: String,

        /// Input value as JSON
        #[arg(short, long, default_value = "null")]
        input: String,

        #[command(flatten)]
        context: ContextArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Start interactive REPL (Read-Eval-Print Loop)
    Repl,
}

#[derive(clap::Args)]
struct ContextArgs {
    /// Evaluation context as a JSON object
    #[arg(short, long)]
    context: Option<String>,

    /// Read the evaluation context from a JSON file
    #[arg(long, conflicts_with = "context")]
    context_file: Option<PathBuf>,
}

impl ContextArgs {
    fn load(&self) -> Result<Context> {
        let json = match (&self.context, &self.context_file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read context file: {}", path.display()))?,
            (None, None) => return Ok(Context::new()),
        };
        parse_context(&json)
    }
}

fn parse_context(json: &str) -> Result<Context> {
    let parsed: serde_json::Value =
        serde_json::from_str(json).context("Context is not valid JSON")?;
    match Value::from_json(parsed) {
        Value::Context(context) => Ok(context),
        other => bail!("Context must be a JSON object, got {}", other.type_name()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = EvaluateOptions {
        dialect: cli.dialect.parse::<Dialect>().unwrap_or_default(),
    };

    match cli.command {
        Commands::Eval {
            expression,
            input,
            format,
        } => {
            let context = input.load()?;
            let result = match feel::evaluate_with(&expression, &context, &options) {
                Ok(result) => result,
                Err(e) => {
                    eprint!("{}", feel::format_syntax_error(&e, &expression));
                    std::process::exit(1);
                }
            };

            if format == "json" {
                let output = serde_json::json!({
                    "value": result.value.to_json(),
                    "warnings": result.warnings,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", feel::repl::format_value(&result.value));
                print_warnings(&result.warnings);
            }
        }

        Commands::Test {
            tests,
            input,
            context,
            format,
        } => {
            let mut context = context.load()?;
            let input: serde_json::Value =
                serde_json::from_str(&input).context("Input is not valid JSON")?;
            context.insert("?".to_string(), Value::from_json(input));

            let result = match feel::unary_test_with(&tests, &context, &options) {
                Ok(result) => result,
                Err(e) => {
                    eprint!("{}", feel::format_syntax_error(&e, &tests));
                    std::process::exit(1);
                }
            };

            if format == "json" {
                let output = serde_json::json!({
                    "value": result.value,
                    "warnings": result.warnings,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", feel::repl::format_test_result(result.value));
                print_warnings(&result.warnings);
            }
        }

        Commands::Repl => {
            feel::repl::run_repl(options.dialect)?;
        }
    }

    Ok(())
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}
