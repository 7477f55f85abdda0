//! Integration tests for the feel CLI

use std::io::Write;
use std::process::{Command, Output};

/// Run the compiled `feel` binary with colors disabled
fn run_feel(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_feel"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute feel")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn test_feel_eval_basic() {
    let output = run_feel(&["eval", "1 + 2 * 3"]);

    assert!(output.status.success(), "feel eval should succeed");
    assert_eq!(stdout(&output), "7");
}

#[test]
fn test_feel_eval_with_context() {
    let output = run_feel(&[
        "eval",
        "Monthly Salary * 12",
        "--context",
        r#"{"Monthly Salary": 1000}"#,
    ]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "12000");
}

#[test]
fn test_feel_eval_json_output() {
    let output = run_feel(&["eval", "[1, x]", "--format", "json"]);

    assert!(output.status.success(), "feel eval --format json should succeed");
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("output should be valid JSON");
    assert_eq!(json["value"], serde_json::json!([1, null]));
    assert_eq!(json["warnings"][0]["type"], "NO_VARIABLE_FOUND");
}

#[test]
fn test_feel_eval_warnings_go_to_stderr() {
    let output = run_feel(&["eval", "missing"]);

    assert!(output.status.success(), "warnings should not fail evaluation");
    assert_eq!(stdout(&output), "null");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("NO_VARIABLE_FOUND"), "stderr: {}", stderr);
}

#[test]
fn test_feel_eval_syntax_error() {
    let output = run_feel(&["eval", "if 1 then"]);

    assert!(!output.status.success(), "syntax errors should exit non-zero");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Syntax error"), "stderr: {}", stderr);
}

#[test]
fn test_feel_eval_context_file() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    write!(file, r#"{{"items": [{{"price": 2}}, {{"price": 3}}]}}"#).unwrap();
    let path = file.path().to_str().unwrap();

    let output = run_feel(&["eval", "sum(items.price)", "--context-file", path]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "5");
}

#[test]
fn test_feel_eval_rejects_non_object_context() {
    let output = run_feel(&["eval", "1", "--context", "[1, 2]"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Context must be a JSON object"), "stderr: {}", stderr);
}

#[test]
fn test_feel_test_command() {
    let output = run_feel(&["test", "< 10, [20..30]", "--input", "25"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "true");

    let output = run_feel(&["test", "< 10, [20..30]", "--input", "15"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "false");
}

#[test]
fn test_feel_test_json_output() {
    let output = run_feel(&[
        "test",
        "< limit",
        "--input",
        "5",
        "--context",
        r#"{"limit": 3}"#,
        "--format",
        "json",
    ]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["value"], false);
    assert_eq!(json["warnings"], serde_json::json!([]));
}

#[test]
fn test_feel_camunda_dialect() {
    let output = run_feel(&["--dialect", "camunda", "eval", "trim(\" x \")"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "\"x\"");
}

#[test]
fn test_feel_help() {
    let output = run_feel(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("eval"));
}
