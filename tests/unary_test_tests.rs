use feel::{unary_test, Context, SyntaxErrorKind, Value, WarningType};
use pretty_assertions::assert_eq;
use serde_json::json;

fn test_with(tests: &str, input: serde_json::Value) -> Option<bool> {
    test_in(tests, input, json!({}))
}

fn test_in(tests: &str, input: serde_json::Value, variables: serde_json::Value) -> Option<bool> {
    let mut context = match Value::from_json(variables) {
        Value::Context(context) => context,
        other => panic!("not a context: {:?}", other),
    };
    context.insert("?".to_string(), Value::from_json(input));
    unary_test(tests, &context)
        .unwrap_or_else(|e| panic!("{}: {}", tests, e.message))
        .value
}

#[test]
fn test_comparison_tests() {
    assert_eq!(test_with("< 10", json!(5)), Some(true));
    assert_eq!(test_with("< 10", json!(10)), Some(false));
    assert_eq!(test_with("<= 10", json!(10)), Some(true));
    assert_eq!(test_with("> \"b\"", json!("c")), Some(true));
    assert_eq!(test_with("!= 3", json!(4)), Some(true));
    assert_eq!(test_with("= 3", json!(3)), Some(true));
}

#[test]
fn test_plain_value_equals_input() {
    assert_eq!(test_with("5", json!(5)), Some(true));
    assert_eq!(test_with("\"approved\"", json!("approved")), Some(true));
    assert_eq!(test_with("\"approved\"", json!("declined")), Some(false));
}

#[test]
fn test_interval_tests() {
    assert_eq!(test_with("[1..10]", json!(10)), Some(true));
    assert_eq!(test_with("[1..10)", json!(10)), Some(false));
    assert_eq!(test_with("]1..10]", json!(1)), Some(false));
    assert_eq!(test_with("(1..10)", json!(5)), Some(true));
    assert_eq!(test_with("]5..10[", json!(7)), Some(true));
    assert_eq!(test_with("]5..10[", json!(10)), Some(false));
    assert_eq!(test_with("[1..5[", json!(5)), Some(false));
}

#[test]
fn test_any_input() {
    assert_eq!(test_with("-", json!(42)), Some(true));
    assert_eq!(test_with("-", json!(null)), Some(true));
    assert_eq!(test_with("", json!("anything")), Some(true));
}

#[test]
fn test_disjunction_of_tests() {
    assert_eq!(test_with("< 3, > 7", json!(8)), Some(true));
    assert_eq!(test_with("< 3, > 7", json!(5)), Some(false));
    assert_eq!(test_with("\"a\", \"b\", \"c\"", json!("b")), Some(true));
}

#[test]
fn test_negated_tests() {
    assert_eq!(test_with("not(< 3, > 7)", json!(5)), Some(true));
    assert_eq!(test_with("not(\"a\")", json!("a")), Some(false));
    assert_eq!(test_with("not([1..3])", json!(2)), Some(false));
}

#[test]
fn test_expressions_using_input() {
    assert_eq!(test_with("? > 5 and ? < 10", json!(7)), Some(true));
    assert_eq!(test_with("odd(?)", json!(3)), Some(true));
    assert_eq!(test_with("list contains(?, \"x\")", json!(["x", "y"])), Some(true));
    assert_eq!(test_with("count(?) > 2", json!([1])), Some(false));
}

#[test]
fn test_boolean_expression_without_input_compares() {
    assert_eq!(test_with("true", json!(true)), Some(true));
    assert_eq!(test_with("true", json!(false)), Some(false));
}

#[test]
fn test_input_in_list_value() {
    assert_eq!(test_with("[1, 2, 3]", json!(2)), Some(true));
    assert_eq!(test_with("[1, 2, 3]", json!(4)), Some(false));
}

#[test]
fn test_tests_with_variables() {
    assert_eq!(
        test_in("< limit", json!(5), json!({"limit": 10})),
        Some(true)
    );
    assert_eq!(
        test_in("[low..high]", json!(12), json!({"low": 1, "high": 10})),
        Some(false)
    );
}

#[test]
fn test_null_input() {
    assert_eq!(test_with("< 10", json!(null)), None);
    assert_eq!(test_with("null", json!(null)), Some(true));
    assert_eq!(test_with("5", json!(null)), Some(false));
}

#[test]
fn test_missing_input() {
    let result = unary_test("< 10", &Context::new()).unwrap();
    assert_eq!(result.value, None);
}

#[test]
fn test_unknown_variable_warns() {
    let mut context = Context::new();
    context.insert("?".into(), Value::Number(1.0));
    let result = unary_test("< limit", &context).unwrap();
    assert_eq!(result.value, None);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].warning_type, WarningType::NoVariableFound);
}

#[test]
fn test_syntax_errors() {
    let err = unary_test("< ", &Context::new()).unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::Incomplete);

    let err = unary_test("[1..", &Context::new()).unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::Incomplete);
}
