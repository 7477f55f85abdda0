use feel::{evaluate, Context, Value, WarningType};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn context(json: serde_json::Value) -> Context {
    match Value::from_json(json) {
        Value::Context(context) => context,
        other => panic!("not a context: {:?}", other),
    }
}

fn eval(expression: &str) -> Value {
    eval_in(expression, json!({}))
}

fn eval_in(expression: &str, input: serde_json::Value) -> Value {
    evaluate(expression, &context(input))
        .unwrap_or_else(|e| panic!("{}: {}", expression, e.message))
        .value
}

fn warning_types(expression: &str, input: serde_json::Value) -> Vec<WarningType> {
    evaluate(expression, &context(input))
        .unwrap_or_else(|e| panic!("{}: {}", expression, e.message))
        .warnings
        .iter()
        .map(|w| w.warning_type)
        .collect()
}

fn numbers(values: &[f64]) -> Value {
    Value::List(values.iter().copied().map(Value::Number).collect())
}

// ---------------------------------------------------------------------------
// Literals and arithmetic
// ---------------------------------------------------------------------------

#[test]
fn test_literals() {
    assert_eq!(eval("1.5"), Value::Number(1.5));
    assert_eq!(eval(".5"), Value::Number(0.5));
    assert_eq!(eval("\"a\\\"b\""), Value::String("a\"b".into()));
    assert_eq!(eval("null"), Value::Null);
    assert_eq!(eval("[1, 2]"), numbers(&[1.0, 2.0]));
    assert_eq!(eval("{a: 1, \"b c\": 2}").to_string(), "{a: 1, b c: 2}");
}

#[test]
fn test_operator_precedence() {
    assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
    assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
    assert_eq!(eval("2 ** 3 ** 2"), Value::Number(64.0));
    assert_eq!(eval("10 - 4 - 3"), Value::Number(3.0));
    assert_eq!(eval("1 + 2 = 3"), Value::Boolean(true));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval("\"foo\" + \"bar\""), Value::String("foobar".into()));
}

#[test]
fn test_invalid_arithmetic_warns() {
    assert_eq!(eval("\"foo\" + 10"), Value::Null);
    assert_eq!(
        warning_types("\"foo\" + 10", json!({})),
        vec![WarningType::InvalidType]
    );
}

#[test]
fn test_null_arithmetic_is_silent() {
    assert_eq!(eval("10 ** null"), Value::Null);
    assert!(warning_types("10 ** null", json!({})).is_empty());
    assert_eq!(eval("null - 1"), Value::Null);
}

#[test]
fn test_non_finite_results_are_null() {
    assert_eq!(eval("0.0 / 0.0"), Value::Null);
    assert_eq!(eval("1 / 0"), Value::Null);
}

#[test]
fn test_negation() {
    assert_eq!(eval("-(1 + 2)"), Value::Number(-3.0));
    assert_eq!(eval("-duration(\"P1D\")").to_string(), "-P1D");
}

// ---------------------------------------------------------------------------
// Equality and logic
// ---------------------------------------------------------------------------

#[test]
fn test_equality_across_types_is_null() {
    assert_eq!(eval("false = 0"), Value::Null);
    assert_eq!(eval("{} = []"), Value::Null);
    assert_eq!(eval("1 != \"1\""), Value::Null);
}

#[test]
fn test_null_equality() {
    assert_eq!(eval("null = null"), Value::Boolean(true));
    assert_eq!(eval("1 = null"), Value::Boolean(false));
    assert_eq!(eval("null != 1"), Value::Boolean(true));
}

#[test]
fn test_singleton_list_equality() {
    assert_eq!(eval("1 = [1]"), Value::Boolean(true));
    assert_eq!(eval("[1] = 1"), Value::Boolean(true));
}

#[test]
fn test_deep_equality() {
    assert_eq!(
        eval("[1, 2, {foo: \"x\"}] = [1, 2, {foo: \"x\"}]"),
        Value::Boolean(true)
    );
    assert_eq!(eval("{a: 1, b: 2} = {b: 2, a: 1}"), Value::Boolean(true));
    assert_eq!(eval("[1, 2] = [2, 1]"), Value::Boolean(false));
}

#[test]
fn test_three_valued_and() {
    assert_eq!(eval("true and true"), Value::Boolean(true));
    assert_eq!(eval("true and false"), Value::Boolean(false));
    assert_eq!(eval("false and null"), Value::Boolean(false));
    assert_eq!(eval("null and false"), Value::Boolean(false));
    assert_eq!(eval("true and null"), Value::Null);
    assert_eq!(eval("true and 1"), Value::Null);
    assert_eq!(eval("null and null"), Value::Null);
}

#[test]
fn test_three_valued_or() {
    assert_eq!(eval("false or false"), Value::Boolean(false));
    assert_eq!(eval("true or null"), Value::Boolean(true));
    assert_eq!(eval("\"x\" or true"), Value::Boolean(true));
    assert_eq!(eval("false or null"), Value::Null);
    assert_eq!(eval("false or 0"), Value::Null);
}

#[test]
fn test_ordering_comparisons() {
    assert_eq!(eval("1 < 2"), Value::Boolean(true));
    assert_eq!(eval("\"b\" >= \"a\""), Value::Boolean(true));
    assert_eq!(eval("1 < \"a\""), Value::Null);
    assert_eq!(eval("date(\"2020-01-01\") < date(\"2020-01-02\")"), Value::Boolean(true));
}

// ---------------------------------------------------------------------------
// Temporal arithmetic
// ---------------------------------------------------------------------------

#[test]
fn test_date_plus_months() {
    assert_eq!(
        eval("date(\"2019-01-31\") + duration(\"P1M\")").to_string(),
        "2019-02-28"
    );
    assert_eq!(eval("@\"2020-03-01\" - @\"P1D\"").to_string(), "2020-02-29");
}

#[test]
fn test_date_difference() {
    assert_eq!(
        eval("date(\"2020-01-02\") - date(\"2020-01-01\") = duration(\"P1D\")"),
        Value::Boolean(true)
    );
}

#[test]
fn test_time_wraps_around_midnight() {
    assert_eq!(
        eval("time(\"23:00:00\") + duration(\"PT2H\")").to_string(),
        "01:00:00"
    );
}

#[test]
fn test_duration_arithmetic() {
    assert_eq!(eval("duration(\"P1D\") * 2").to_string(), "P2D");
    assert_eq!(eval("duration(\"P2D\") / duration(\"P1D\")"), Value::Number(2.0));
}

#[test]
fn test_temporal_properties() {
    assert_eq!(eval("date(\"2020-03-15\").month"), Value::Number(3.0));
    assert_eq!(eval("@\"2020-03-15T10:30:00\".hour"), Value::Number(10.0));
    assert_eq!(eval("duration(\"P1Y2M\").months"), Value::Number(2.0));
}

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

#[test]
fn test_string_range_membership() {
    assert_eq!(eval("\"d\" in [\"b\"..\"d\"]"), Value::Boolean(true));
    assert_eq!(eval("\"d\" in [\"b\"..\"d\")"), Value::Boolean(false));
    assert_eq!(eval("\"a\" in [\"b\"..\"d\"]"), Value::Boolean(false));
}

#[test]
fn test_open_interval_notation() {
    assert_eq!(eval("5 in ]1..5["), Value::Boolean(false));
    assert_eq!(eval("2 in (1..5)"), Value::Boolean(true));
    assert_eq!(eval("[1..5]").to_string(), "[1..5]");
    assert_eq!(eval("7 in ]5..10["), Value::Boolean(true));
    assert_eq!(eval("2 in [1..5["), Value::Boolean(true));
    assert_eq!(eval("5 in [1..5["), Value::Boolean(false));
    assert_eq!(eval("(5..10) = ]5..10["), Value::Boolean(true));
    assert_eq!(
        eval_in("3 in [1..xs[1][", json!({"xs": [4, 9]})),
        Value::Boolean(true)
    );
}

#[test]
fn test_extreme_inputs_are_null() {
    assert_eq!(eval("duration(\"P999999999999999D\")"), Value::Null);
    assert_eq!(eval("duration(\"P999999999999999999Y\")"), Value::Null);
    assert_eq!(
        eval("duration(\"P5000000000000000000M\") + duration(\"P5000000000000000000M\")"),
        Value::Null
    );
    assert_eq!(eval("duration(\"P5000000000000000000M\") * 4"), Value::Null);
    assert_eq!(
        eval("for i in 9007199254740992..9007199254740994 return 0"),
        Value::Null
    );
}

#[test]
fn test_in_list_of_tests() {
    assert_eq!(eval("5 in (< 3, > 4)"), Value::Boolean(true));
    assert_eq!(eval("5 in [1, 2, 3]"), Value::Boolean(false));
    assert_eq!(eval("2 in [1, 2, 3]"), Value::Boolean(true));
}

#[test]
fn test_between() {
    assert_eq!(eval("5 between 1 and 10"), Value::Boolean(true));
    assert_eq!(eval("10 between 1 and 10"), Value::Boolean(true));
    assert_eq!(eval("11 between 1 and 10"), Value::Boolean(false));
    assert_eq!(eval("5 between null and 10"), Value::Null);
}

// ---------------------------------------------------------------------------
// Names, contexts and paths
// ---------------------------------------------------------------------------

#[test]
fn test_variable_lookup() {
    assert_eq!(eval_in("a + b", json!({"a": 1, "b": 2})), Value::Number(3.0));
}

#[test]
fn test_unknown_variable_warns() {
    assert_eq!(eval("foo"), Value::Null);
    let result = evaluate("foo", &Context::new()).unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].warning_type, WarningType::NoVariableFound);
    assert_eq!(result.warnings[0].message, "Variable <foo> not found");

    let json = serde_json::to_value(&result.warnings[0]).unwrap();
    assert_eq!(json["type"], "NO_VARIABLE_FOUND");
}

#[test]
fn test_multi_word_names() {
    assert_eq!(
        eval_in("Monthly Salary * 12", json!({"Monthly Salary": 1000})),
        Value::Number(12000.0)
    );
    assert_eq!(
        eval_in("Tax-Rate + 1", json!({"Tax-Rate": 1})),
        Value::Number(2.0)
    );
}

#[test]
fn test_context_entries_see_earlier_entries() {
    assert_eq!(eval("{a: 1, b: a + 1}.b"), Value::Number(2.0));
    assert_eq!(eval("{a: 1, b: {c: a + 1}}.b.c"), Value::Number(2.0));
}

#[test]
fn test_path_warnings() {
    assert_eq!(eval("{a: 1}.b"), Value::Null);
    assert_eq!(
        warning_types("{a: 1}.b", json!({})),
        vec![WarningType::NoContextEntryFound]
    );
    assert_eq!(
        warning_types("date(\"2020-01-01\").foo", json!({})),
        vec![WarningType::NoPropertyFound]
    );
    assert!(warning_types("null.foo", json!({})).is_empty());
}

#[test]
fn test_path_over_list() {
    assert_eq!(
        eval_in("items.price", json!({"items": [{"price": 1}, {"price": 2}]})),
        numbers(&[1.0, 2.0])
    );
}

// ---------------------------------------------------------------------------
// Control flow and iteration
// ---------------------------------------------------------------------------

#[test]
fn test_if_expression() {
    assert_eq!(eval("if 1 < 2 then \"yes\" else \"no\""), Value::String("yes".into()));
    assert_eq!(eval("if null then 1 else 2"), Value::Number(2.0));
    assert_eq!(eval("if \"x\" then 1 else 2"), Value::Number(2.0));
}

#[test]
fn test_for_expression() {
    assert_eq!(eval("for x in [1, 2, 3] return x * 2"), numbers(&[2.0, 4.0, 6.0]));
    assert_eq!(eval("for x in 1..3 return x"), numbers(&[1.0, 2.0, 3.0]));
    assert_eq!(eval("for x in 3..1 return x"), numbers(&[3.0, 2.0, 1.0]));
}

#[test]
fn test_for_partial_results() {
    assert_eq!(
        eval("for i in 0..4 return if i = 0 then 1 else i * partial[-1]"),
        numbers(&[1.0, 1.0, 2.0, 6.0, 24.0])
    );
}

#[test]
fn test_for_cartesian_product() {
    assert_eq!(
        eval("for x in [1, 2], y in [10, 20] return x + y"),
        numbers(&[11.0, 21.0, 12.0, 22.0])
    );
}

#[test]
fn test_quantified_expressions() {
    assert_eq!(eval("some x in [1, 2, 3] satisfies x > 2"), Value::Boolean(true));
    assert_eq!(eval("every x in [1, 2, 3] satisfies x > 2"), Value::Boolean(false));
    assert_eq!(eval("every x in [] satisfies x > 2"), Value::Boolean(true));
    assert_eq!(eval("some x in [] satisfies x > 2"), Value::Boolean(false));
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[test]
fn test_filter_by_index() {
    assert_eq!(eval("[1, 2, 3][-1]"), Value::Number(3.0));
    assert_eq!(eval("[1, 2, 3][1]"), Value::Number(1.0));
    assert_eq!(eval("[1, 2, 3][0]"), Value::Null);
    assert_eq!(eval("[1, 2, 3][4]"), Value::Null);
}

#[test]
fn test_filter_by_boolean() {
    assert_eq!(eval("[1, 2, 3][true]"), numbers(&[1.0, 2.0, 3.0]));
    assert_eq!(eval("[1, 2, 3][false]"), Value::List(vec![]));
}

#[test]
fn test_filter_by_predicate() {
    assert_eq!(
        eval("[{a: 1}, {a: 2}, {a: 3}][a >= 2]").to_string(),
        "[{a: 2}, {a: 3}]"
    );
    assert_eq!(eval("[1, 2, 3, 4][item > 2]"), numbers(&[3.0, 4.0]));
}

#[test]
fn test_filter_on_scalar() {
    assert_eq!(eval("5[item > 2]"), numbers(&[5.0]));
    assert_eq!(eval("null[1]"), Value::Null);
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

#[test]
fn test_invocation_failure_warns_once() {
    assert_eq!(eval("not(1, 2)"), Value::Null);
    assert_eq!(
        warning_types("not(1, 2)", json!({})),
        vec![WarningType::FunctionInvocationFailure]
    );
}

#[test]
fn test_invoking_non_function_warns_once() {
    assert_eq!(eval_in("x()", json!({"x": 5})), Value::Null);
    assert_eq!(
        warning_types("x()", json!({"x": 5})),
        vec![WarningType::NoFunctionFound]
    );
    assert_eq!(
        warning_types("unknown(1)", json!({})),
        vec![WarningType::NoFunctionFound]
    );
}

#[test]
fn test_user_defined_functions() {
    assert_eq!(eval("(function(a, b) a - b)(5, 3)"), Value::Number(2.0));
    assert_eq!(eval("{f: function(x) x * 2, r: f(21)}.r"), Value::Number(42.0));
    assert_eq!(eval("(function(a, b) a - b)(b: 5, a: 3)"), Value::Number(-2.0));
}

#[test]
fn test_closures_capture_scope() {
    assert_eq!(
        eval("{y: 10, add: function(x) x + y}.add(1)"),
        Value::Number(11.0)
    );
}

#[test]
fn test_named_builtin_arguments() {
    assert_eq!(
        eval("substring(string: \"foobar\", start position: 4)"),
        Value::String("bar".into())
    );
}

#[test]
fn test_instance_of() {
    assert_eq!(eval("1 instance of number"), Value::Boolean(true));
    assert_eq!(eval("\"a\" instance of number"), Value::Boolean(false));
    assert_eq!(eval("[1, 2] instance of list<number>"), Value::Boolean(true));
    assert_eq!(eval("null instance of Null"), Value::Boolean(true));
    assert_eq!(eval("1 instance of Any"), Value::Boolean(true));
    assert_eq!(
        eval("date(\"2020-01-01\") instance of date"),
        Value::Boolean(true)
    );
}

// ---------------------------------------------------------------------------
// Syntax errors
// ---------------------------------------------------------------------------

#[test]
fn test_syntax_errors() {
    let err = evaluate("if 1 then", &Context::new()).unwrap_err();
    assert_eq!(err.kind, feel::SyntaxErrorKind::Incomplete);

    let err = evaluate("1 + #", &Context::new()).unwrap_err();
    assert_eq!(err.kind, feel::SyntaxErrorKind::UnrecognizedToken);

    let err = evaluate("[1 2]", &Context::new()).unwrap_err();
    assert_eq!(err.kind, feel::SyntaxErrorKind::UnexpectedToken);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_equality_is_symmetric(a in -1000i64..1000, b in -1000i64..1000) {
        let forward = eval(&format!("{} = {}", a, b));
        let backward = eval(&format!("{} = {}", b, a));
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn prop_less_than_matches_integers(a in -1000i64..1000, b in -1000i64..1000) {
        prop_assert_eq!(eval(&format!("{} < {}", a, b)), Value::Boolean(a < b));
        prop_assert_eq!(eval(&format!("{} >= {}", a, b)), Value::Boolean(a >= b));
    }

    #[test]
    fn prop_closed_interval_membership(x in -100i64..100, lo in -100i64..100, len in 0i64..50) {
        let hi = lo + len;
        let expected = lo <= x && x <= hi;
        prop_assert_eq!(
            eval(&format!("{} in [{}..{}]", x, lo, hi)),
            Value::Boolean(expected)
        );
    }
}
