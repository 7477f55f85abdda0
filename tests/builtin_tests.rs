use feel::{evaluate, evaluate_with, Context, Dialect, EvaluateOptions, Value, WarningType};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn eval(expression: &str) -> Value {
    evaluate(expression, &Context::new())
        .unwrap_or_else(|e| panic!("{}: {}", expression, e.message))
        .value
}

fn eval_camunda(expression: &str) -> Value {
    let options = EvaluateOptions {
        dialect: Dialect::Camunda,
    };
    evaluate_with(expression, &Context::new(), &options)
        .unwrap_or_else(|e| panic!("{}: {}", expression, e.message))
        .value
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

#[test]
fn test_conversion_functions() {
    assert_eq!(eval("number(\"12\")"), Value::Number(12.0));
    assert_eq!(eval("number(\"1 000,5\", \" \", \",\")"), Value::Number(1000.5));
    assert_eq!(eval("number(\"abc\")"), Value::Null);
    assert_eq!(eval("string(1.5)"), text("1.5"));
    assert_eq!(eval("string(date(\"2020-01-01\"))"), text("2020-01-01"));
    assert_eq!(eval("string(null)"), Value::Null);
}

#[test]
fn test_temporal_constructors() {
    assert_eq!(eval("date(2020, 2, 29)").to_string(), "2020-02-29");
    assert_eq!(eval("date(2019, 2, 29)"), Value::Null);
    assert_eq!(
        eval("date(date and time(\"2020-01-01T10:00:00\"))").to_string(),
        "2020-01-01"
    );
    assert_eq!(
        eval("date and time(date(\"2020-01-01\"), time(\"10:30:00\"))").to_string(),
        "2020-01-01T10:30:00"
    );
    assert_eq!(eval("time(10, 30, 0)").to_string(), "10:30:00");
    assert_eq!(
        eval("years and months duration(date(\"2011-12-22\"), date(\"2013-08-24\"))").to_string(),
        "P1Y8M"
    );
}

#[test]
fn test_date_functions() {
    assert_eq!(eval("day of week(date(\"2019-09-17\"))"), text("Tuesday"));
    assert_eq!(eval("month of year(date(\"2019-09-17\"))"), text("September"));
    assert_eq!(eval("day of year(date(\"2019-09-17\"))"), Value::Number(260.0));
    assert_eq!(eval("week of year(date(\"2019-09-17\"))"), Value::Number(38.0));
}

#[test]
fn test_string_functions() {
    assert_eq!(eval("substring(\"foobar\", 3)"), text("obar"));
    assert_eq!(eval("substring(\"foobar\", -2, 1)"), text("a"));
    assert_eq!(eval("string length(\"abc\")"), Value::Number(3.0));
    assert_eq!(eval("upper case(\"abc\")"), text("ABC"));
    assert_eq!(eval("substring before(\"foobar\", \"bar\")"), text("foo"));
    assert_eq!(eval("substring after(\"foobar\", \"ob\")"), text("ar"));
    assert_eq!(eval("starts with(\"foobar\", \"fo\")"), Value::Boolean(true));
    assert_eq!(eval("ends with(\"foobar\", \"r\")"), Value::Boolean(true));
    assert_eq!(eval("contains(\"foobar\", \"of\")"), Value::Boolean(false));
    assert_eq!(eval("matches(\"foobar\", \"^fo*b\")"), Value::Boolean(true));
    assert_eq!(
        eval("replace(\"abcd\", \"(ab)|(a)\", \"[1=$1][2=$2]\")"),
        text("[1=ab][2=]cd")
    );
    assert_eq!(eval("string join([\"a\", \"b\"], \"-\")"), text("a-b"));
    assert_eq!(eval("split(\"a,b,c\", \",\")").to_string(), "[\"a\", \"b\", \"c\"]");
}

#[test]
fn test_argument_coercion() {
    assert_eq!(eval("upper case([\"a\"])"), text("A"));
    assert_eq!(eval("count(5)"), Value::Number(1.0));

    let result = evaluate("upper case(1)", &Context::new()).unwrap();
    assert_eq!(result.value, Value::Null);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_list_functions() {
    assert_eq!(eval("list contains([1, 2, 3], 2)"), Value::Boolean(true));
    assert_eq!(eval("count([1, 2])"), Value::Number(2.0));
    assert_eq!(eval("min(3, 1, 2)"), Value::Number(1.0));
    assert_eq!(eval("max([3, 1, 2])"), Value::Number(3.0));
    assert_eq!(eval("sum([1, 2, 3])"), Value::Number(6.0));
    assert_eq!(eval("mean(1, 2, 3)"), Value::Number(2.0));
    assert_eq!(eval("product(2, 3)"), Value::Number(6.0));
    assert_eq!(eval("median(8, 2, 5, 3, 4)"), Value::Number(4.0));
    assert_eq!(eval("mode(6, 3, 9, 6, 6)").to_string(), "[6]");
    assert_eq!(eval("sublist([1, 2, 3], 2)").to_string(), "[2, 3]");
    assert_eq!(eval("append([1], 2, 3)").to_string(), "[1, 2, 3]");
    assert_eq!(eval("concatenate([1], [2])").to_string(), "[1, 2]");
    assert_eq!(eval("remove([1, 2, 3], 2)").to_string(), "[1, 3]");
    assert_eq!(eval("reverse([1, 2, 3])").to_string(), "[3, 2, 1]");
    assert_eq!(eval("index of([1, 2, 1], 1)").to_string(), "[1, 3]");
    assert_eq!(eval("union([1, 2], [2, 3])").to_string(), "[1, 2, 3]");
    assert_eq!(eval("distinct values([1, 2, 1])").to_string(), "[1, 2]");
    assert_eq!(eval("flatten([[1, 2], [[3]], 4])").to_string(), "[1, 2, 3, 4]");
}

#[test]
fn test_sort_with_precedes_function() {
    assert_eq!(
        eval("sort([3, 1, 2], function(x, y) x < y)").to_string(),
        "[1, 2, 3]"
    );
    assert_eq!(
        eval("sort(list: [3, 1, 2], precedes: function(x, y) x > y)").to_string(),
        "[3, 2, 1]"
    );
}

#[test]
fn test_boolean_functions() {
    assert_eq!(eval("not(true)"), Value::Boolean(false));
    assert_eq!(eval("not(null)"), Value::Null);
    assert_eq!(eval("all([true, true])"), Value::Boolean(true));
    assert_eq!(eval("any(false, true)"), Value::Boolean(true));
    assert_eq!(eval("is(1, 1)"), Value::Boolean(true));
    assert_eq!(eval("is(date(\"2012-12-25\"), time(\"23:00:50\"))"), Value::Boolean(false));
}

#[test]
fn test_rounding_functions() {
    assert_eq!(eval("decimal(1/3, 2)"), Value::Number(0.33));
    assert_eq!(eval("decimal(2.5, 0)"), Value::Number(2.0));
    assert_eq!(eval("decimal(3.5, 0)"), Value::Number(4.0));
    assert_eq!(eval("floor(-1.5)"), Value::Number(-2.0));
    assert_eq!(eval("ceiling(1.5)"), Value::Number(2.0));
    assert_eq!(eval("round up(-5.5)"), Value::Number(-6.0));
    assert_eq!(eval("round down(-5.5)"), Value::Number(-5.0));
    assert_eq!(eval("round half up(2.5, 0)"), Value::Number(3.0));
    assert_eq!(eval("round half down(2.5, 0)"), Value::Number(2.0));
    assert_eq!(eval("decimal(1, 400)"), Value::Number(1.0));
    assert_eq!(eval("round half up(2.5, 6176)"), Value::Number(2.5));
}

#[test]
fn test_numeric_functions() {
    assert_eq!(eval("abs(-10)"), Value::Number(10.0));
    assert_eq!(eval("abs(duration(\"-P1D\"))").to_string(), "P1D");
    assert_eq!(eval("modulo(-12, 5)"), Value::Number(3.0));
    assert_eq!(eval("modulo(12, -5)"), Value::Number(-3.0));
    assert_eq!(eval("modulo(10, 0)"), Value::Null);
    assert_eq!(eval("sqrt(16)"), Value::Number(4.0));
    assert_eq!(eval("sqrt(-1)"), Value::Null);
    assert_eq!(eval("odd(5)"), Value::Boolean(true));
    assert_eq!(eval("even(5)"), Value::Boolean(false));
}

#[test]
fn test_context_functions() {
    assert_eq!(eval("get value({a: 1}, \"a\")"), Value::Number(1.0));
    assert_eq!(
        eval("get entries({a: 1})").to_string(),
        "[{key: \"a\", value: 1}]"
    );
    assert_eq!(eval("context([{key: \"a\", value: 1}])").to_string(), "{a: 1}");
    assert_eq!(eval("context put({a: 1}, \"b\", 2)").to_string(), "{a: 1, b: 2}");
    assert_eq!(
        eval("context merge([{a: 1}, {b: 2}])").to_string(),
        "{a: 1, b: 2}"
    );
}

#[test]
fn test_range_relations() {
    assert_eq!(eval("before(1, 10)"), Value::Boolean(true));
    assert_eq!(eval("overlaps([1..5], [3..8])"), Value::Boolean(true));
    assert_eq!(eval("meets([1..5], [5..8])"), Value::Boolean(true));
    assert_eq!(eval("includes([1..10], 5)"), Value::Boolean(true));
    assert_eq!(eval("during(5, [1..10])"), Value::Boolean(true));
    assert_eq!(eval("starts(1, [1..10])"), Value::Boolean(true));
    assert_eq!(eval("finishes(10, [1..10])"), Value::Boolean(true));
    assert_eq!(eval("coincides([1..5], [1..5])"), Value::Boolean(true));
}

#[test]
fn test_camunda_extensions() {
    assert_eq!(eval_camunda("is defined(1)"), Value::Boolean(true));
    assert_eq!(eval_camunda("get or else(null, 5)"), Value::Number(5.0));
    assert_eq!(eval_camunda("is empty([])"), Value::Boolean(true));
    assert_eq!(eval_camunda("trim(\"  a \")"), text("a"));
    assert_eq!(eval_camunda("partition([1, 2, 3], 2)").to_string(), "[[1, 2], [3]]");
    assert_eq!(eval_camunda("duplicate values([1, 2, 2])").to_string(), "[2]");
    assert_eq!(eval_camunda("from json(\"[1, 2]\")").to_string(), "[1, 2]");
    assert_eq!(eval_camunda("to json([1, true])"), text("[1,true]"));
}

#[test]
fn test_camunda_extensions_absent_in_standard() {
    let result = evaluate("trim(\"  a \")", &Context::new()).unwrap();
    assert_eq!(result.value, Value::Null);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].warning_type, WarningType::NoFunctionFound);
}

proptest! {
    #[test]
    fn prop_modulo_follows_divisor_sign(a in -1000i64..1000, b in 1i64..100) {
        let positive = eval(&format!("modulo({}, {})", a, b));
        prop_assert_eq!(positive, Value::Number(a.rem_euclid(b) as f64));

        match eval(&format!("modulo({}, -{})", a, b)) {
            Value::Number(n) => {
                prop_assert!(n <= 0.0);
                prop_assert!(n > -(b as f64));
            }
            other => prop_assert!(false, "expected a number, got {:?}", other),
        }
    }
}
