//! FEEL runtime values
//!
//! `Value` is a true discriminated union: dates, times, date-times and
//! durations are separate variants, and callables carry their parameter
//! names in a dedicated `Function` wrapper.

use chrono::NaiveDate;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::diagnostics::Diagnostics;
use crate::functions::Builtin;
use crate::range::Range;
use crate::temporal::{self, DateTime, Duration, DurationKind, Time};

/// Ordered string-keyed record
pub type Context = IndexMap<String, Value>;

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Context(Context),
    Range(Box<Range>),
    Date(NaiveDate),
    Time(Time),
    DateTime(DateTime),
    Duration(Duration),
    Function(Function),
}

/// Value kinds, used for type checks and argument coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    List,
    Context,
    Range,
    Date,
    Time,
    DateTime,
    Duration,
    Function,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Context => "context",
            ValueKind::Range => "range",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::DateTime => "date time",
            ValueKind::Duration => "duration",
            ValueKind::Function => "function",
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Context(_) => ValueKind::Context,
            Value::Range(_) => ValueKind::Range,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Duration(_) => ValueKind::Duration,
            Value::Function(_) => ValueKind::Function,
        }
    }

    /// Human readable type name, as used in warnings
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Duration(d) => match d.kind() {
                DurationKind::YearsAndMonths => "years and months duration",
                DurationKind::DaysAndTime => "days and time duration",
                DurationKind::Mixed => "duration",
            },
            other => other.kind().name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Time(_) | Value::DateTime(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_context(&self) -> Option<&Context> {
        match self {
            Value::Context(c) => Some(c),
            _ => None,
        }
    }

    /// Three-valued equality
    ///
    /// `None` means the operands are incomparable. A singleton list is
    /// unwrapped before it is compared with a non-list value.
    pub fn equals(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(true),
            (Value::Null, _) | (_, Value::Null) => Some(false),

            (Value::List(items), other) if items.len() == 1 && !matches!(other, Value::List(_)) => {
                items[0].equals(other)
            }
            (this, Value::List(items)) if items.len() == 1 && !matches!(this, Value::List(_)) => {
                this.equals(&items[0])
            }

            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Some(false);
                }
                let mut result = Some(true);
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.equals(y) {
                        Some(true) => {}
                        Some(false) => return Some(false),
                        None => result = None,
                    }
                }
                result
            }

            (Value::Context(a), Value::Context(b)) => {
                if a.len() != b.len() || a.keys().any(|k| !b.contains_key(k)) {
                    return Some(false);
                }
                let mut result = Some(true);
                for (key, x) in a {
                    match b.get(key).and_then(|y| x.equals(y)) {
                        Some(true) => {}
                        Some(false) => return Some(false),
                        None => result = None,
                    }
                }
                result
            }

            (Value::Boolean(a), Value::Boolean(b)) => Some(a == b),
            (Value::Number(a), Value::Number(b)) => Some(numbers_equal(*a, *b)),
            (Value::String(a), Value::String(b)) => Some(a == b),

            (Value::Date(_) | Value::DateTime(_), Value::Date(_) | Value::DateTime(_))
            | (Value::Time(_), Value::Time(_))
            | (Value::Duration(_), Value::Duration(_)) => {
                self.compare(other).map(|o| o == Ordering::Equal)
            }

            (Value::Range(a), Value::Range(b)) => {
                let same_flags =
                    a.start_included == b.start_included && a.end_included == b.end_included;
                let start = a.start.equals(&b.start)?;
                let end = a.end.equals(&b.end)?;
                Some(same_flags && start && end)
            }

            (Value::Function(a), Value::Function(b)) => Some(a == b),

            _ => None,
        }
    }

    /// Ordering for comparable values; `None` when the values do not share
    /// an ordered domain
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if numbers_equal(*a, *b) {
                    Some(Ordering::Equal)
                } else {
                    a.partial_cmp(b)
                }
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::DateTime(b)) => Some(DateTime::from_date(*a).instant().cmp(&b.instant())),
            (Value::DateTime(a), Value::Date(b)) => Some(a.instant().cmp(&DateTime::from_date(*b).instant())),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.instant().cmp(&b.instant())),
            (Value::Time(a), Value::Time(b)) => a.utc_seconds().partial_cmp(&b.utc_seconds()),
            (Value::Duration(a), Value::Duration(b)) => a.compare(b),
            _ => None,
        }
    }

    /// Narrow a value to `target`: a date-time becomes a time (calendar date
    /// stripped) or a date (truncated to the UTC day)
    pub fn type_cast(&self, target: ValueKind) -> Option<Value> {
        match (self, target) {
            (value, target) if value.kind() == target => Some(value.clone()),
            (Value::DateTime(dt), ValueKind::Time) => Some(Value::Time(dt.time())),
            (Value::DateTime(dt), ValueKind::Date) => Some(Value::Date(dt.utc_date())),
            (Value::Date(d), ValueKind::DateTime) => Some(Value::DateTime(DateTime::from_date(*d))),
            _ => None,
        }
    }

    /// Property access for temporal values, durations and ranges
    pub fn property(&self, name: &str) -> Option<Value> {
        let number = |n: f64| Some(Value::Number(n));
        match self {
            Value::Date(d) => date_property(d, name),
            Value::DateTime(dt) => date_property(&dt.date(), name)
                .or_else(|| time_property(&dt.time(), name)),
            Value::Time(t) => time_property(t, name),
            Value::Duration(d) => match name {
                "years" => number(d.years() as f64),
                "months" => number(d.months_part() as f64),
                "days" => number(d.days() as f64),
                "hours" => number(d.hours() as f64),
                "minutes" => number(d.minutes() as f64),
                "seconds" => number(d.seconds()),
                _ => None,
            },
            Value::Range(r) => match name {
                "start" => Some(r.start.clone()),
                "end" => Some(r.end.clone()),
                "start included" => Some(Value::Boolean(r.start_included)),
                "end included" => Some(Value::Boolean(r.end_included)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Convert from JSON input
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Context(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON output; temporal values and ranges render as text
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map_or(serde_json::Value::Null, serde_json::Value::Number)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Context(c) => serde_json::Value::Object(
                c.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Range(_)
            | Value::Date(_)
            | Value::Time(_)
            | Value::DateTime(_)
            | Value::Duration(_) => serde_json::Value::String(self.to_string()),
        }
    }
}

/// Number equality, tolerant of binary floating point drift
pub fn numbers_equal(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
}

fn date_property(date: &NaiveDate, name: &str) -> Option<Value> {
    use chrono::Datelike;
    let n = match name {
        "year" => date.year() as f64,
        "month" => f64::from(date.month()),
        "day" => f64::from(date.day()),
        "weekday" => f64::from(temporal::weekday_number(date)),
        _ => return None,
    };
    Some(Value::Number(n))
}

fn time_property(time: &Time, name: &str) -> Option<Value> {
    use chrono::Timelike;
    match name {
        "hour" => Some(Value::Number(f64::from(time.time.hour()))),
        "minute" => Some(Value::Number(f64::from(time.time.minute()))),
        "second" => Some(Value::Number(
            f64::from(time.time.second()) + f64::from(time.time.nanosecond()) / 1e9,
        )),
        "time offset" => Some(
            temporal::offset_duration(time.offset).map_or(Value::Null, Value::Duration),
        ),
        "timezone" => Some(temporal::zone_name(time.offset).map_or(Value::Null, Value::String)),
        _ => None,
    }
}

/// Format a number the way FEEL prints it: integers without a fraction
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(nested_repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Context(c) => {
                let parts: Vec<String> = c
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, nested_repr(v)))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Range(r) => write!(f, "{}", r),
            Value::Date(d) => write!(f, "{}", temporal::format_date(d)),
            Value::Time(t) => write!(f, "{}", t),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Duration(d) => write!(f, "{}", d),
            Value::Function(func) => write!(f, "function({})", func.params().join(", ")),
        }
    }
}

/// Strings nested in collections are quoted
pub(crate) fn nested_repr(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

// =============================================================================
// FUNCTIONS
// =============================================================================

/// Native callable body of a user-defined function
pub type NativeFn = Rc<dyn Fn(Vec<Value>, &mut Diagnostics) -> Value>;

/// Arguments of an invocation after evaluation
#[derive(Debug, Clone)]
pub enum CallArgs {
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

/// Call-site mismatch: wrong arity or unknown parameter name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvocationError(pub String);

#[derive(Clone)]
enum FunctionBody {
    Builtin(&'static Builtin),
    Closure(NativeFn),
}

/// Callable value with its declared parameter names
#[derive(Clone)]
pub struct Function {
    params: Vec<String>,
    body: FunctionBody,
}

impl Function {
    pub fn builtin(builtin: &'static Builtin) -> Self {
        Self {
            params: builtin.param_names(),
            body: FunctionBody::Builtin(builtin),
        }
    }

    pub fn closure(params: Vec<String>, body: NativeFn) -> Self {
        Self {
            params,
            body: FunctionBody::Closure(body),
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Invoke with positional or named arguments
    ///
    /// Missing trailing arguments are padded with `null`; extra positional
    /// arguments and unknown parameter names are invocation failures.
    pub fn invoke(&self, args: CallArgs, diagnostics: &mut Diagnostics) -> Result<Value, InvocationError> {
        match &self.body {
            FunctionBody::Builtin(builtin) => builtin.invoke(args, diagnostics),
            FunctionBody::Closure(body) => {
                let args = bind_arguments(&self.params, args)?;
                Ok(body(args, diagnostics))
            }
        }
    }

    /// Positional call that maps invocation failures to `null`
    pub fn call(&self, args: Vec<Value>, diagnostics: &mut Diagnostics) -> Value {
        self.invoke(CallArgs::Positional(args), diagnostics)
            .unwrap_or(Value::Null)
    }
}

/// Bind call arguments to declared parameter names, in declaration order
pub(crate) fn bind_arguments(params: &[String], args: CallArgs) -> Result<Vec<Value>, InvocationError> {
    match args {
        CallArgs::Positional(mut values) => {
            if values.len() > params.len() {
                return Err(InvocationError(format!(
                    "expected {} argument(s), got {}",
                    params.len(),
                    values.len()
                )));
            }
            values.resize(params.len(), Value::Null);
            Ok(values)
        }
        CallArgs::Named(named) => {
            let mut values = vec![Value::Null; params.len()];
            for (name, value) in named {
                match params.iter().position(|p| *p == name) {
                    Some(index) => values[index] = value,
                    None => {
                        return Err(InvocationError(format!("unknown parameter <{}>", name)));
                    }
                }
            }
            Ok(values)
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            FunctionBody::Builtin(b) => write!(f, "Builtin({})", b.name),
            FunctionBody::Closure(_) => write!(f, "Function({})", self.params.join(", ")),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (&self.body, &other.body) {
            (FunctionBody::Builtin(a), FunctionBody::Builtin(b)) => std::ptr::eq(*a, *b),
            (FunctionBody::Closure(a), FunctionBody::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list(items: Vec<Value>) -> Value {
        Value::List(items)
    }

    fn ctx(entries: &[(&str, Value)]) -> Value {
        Value::Context(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_cross_type_equality_is_null() {
        assert_eq!(Value::Boolean(false).equals(&Value::Number(0.0)), None);
        assert_eq!(ctx(&[]).equals(&list(vec![])), None);
    }

    #[test]
    fn test_null_only_equals_null() {
        assert_eq!(Value::Null.equals(&Value::Null), Some(true));
        assert_eq!(Value::Null.equals(&Value::Number(1.0)), Some(false));
    }

    #[test]
    fn test_singleton_list_equality() {
        let one = Value::Number(1.0);
        assert_eq!(one.equals(&list(vec![one.clone()])), Some(true));
        assert_eq!(list(vec![one.clone()]).equals(&one), Some(true));
    }

    #[test]
    fn test_deep_equality() {
        let a = list(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            ctx(&[("foo", Value::String("x".into()))]),
        ]);
        assert_eq!(a.equals(&a.clone()), Some(true));
        assert_eq!(
            a.equals(&list(vec![Value::Number(1.0)])),
            Some(false)
        );
    }

    #[test]
    fn test_context_equality_ignores_order() {
        let a = ctx(&[("a", Value::Number(1.0)), ("b", Value::Number(2.0))]);
        let b = ctx(&[("b", Value::Number(2.0)), ("a", Value::Number(1.0))]);
        assert_eq!(a.equals(&b), Some(true));
    }

    #[test]
    fn test_number_equality_tolerates_drift() {
        assert_eq!(
            Value::Number(0.1 + 0.2).equals(&Value::Number(0.3)),
            Some(true)
        );
    }

    #[test]
    fn test_type_cast_date_time() {
        let dt = temporal::parse_date_time("2012-12-24T23:59:00").unwrap();
        let value = Value::DateTime(dt);
        assert_eq!(
            value.type_cast(ValueKind::Date),
            Some(Value::Date(temporal::parse_date("2012-12-24").unwrap()))
        );
        assert_eq!(
            value.type_cast(ValueKind::Time).map(|v| v.to_string()),
            Some("23:59:00".to_string())
        );
        assert_eq!(Value::Number(1.0).type_cast(ValueKind::Date), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(
            list(vec![Value::Number(1.0), Value::String("a".into())]).to_string(),
            "[1, \"a\"]"
        );
        assert_eq!(ctx(&[("a", Value::Null)]).to_string(), "{a: null}");
    }

    #[test]
    fn test_json_round_trip_shape() {
        let json = serde_json::json!({"a": [1, 2.5, "x"], "b": null});
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_bind_named_arguments() {
        let params = vec!["a".to_string(), "b".to_string()];
        let bound = bind_arguments(
            &params,
            CallArgs::Named(vec![("b".to_string(), Value::Number(2.0))]),
        )
        .unwrap();
        assert_eq!(bound, vec![Value::Null, Value::Number(2.0)]);
        assert!(bind_arguments(&params, CallArgs::Named(vec![("c".into(), Value::Null)])).is_err());
        assert!(bind_arguments(
            &params,
            CallArgs::Positional(vec![Value::Null, Value::Null, Value::Null])
        )
        .is_err());
    }
}
