//! FEEL type references
//!
//! Used by `instance of` checks and by built-in argument declarations.

use std::fmt;

use crate::temporal::DurationKind;
use crate::value::{Value, ValueKind};

/// A parsed FEEL type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Any,
    Null,
    Boolean,
    Number,
    String,
    Date,
    Time,
    DateTime,
    /// Any duration
    Duration,
    DaysAndTimeDuration,
    YearsAndMonthsDuration,
    List(Box<TypeRef>),
    Range(Box<TypeRef>),
    Context(Vec<(String, TypeRef)>),
    Function(Vec<TypeRef>, Box<TypeRef>),
    /// A name no known type matches; never matches a value
    Unknown(String),
}

impl TypeRef {
    /// Resolve a simple (non-parameterized) type name
    pub fn from_name(name: &str) -> TypeRef {
        match name {
            "Any" | "any" => TypeRef::Any,
            "Null" | "null" => TypeRef::Null,
            "boolean" => TypeRef::Boolean,
            "number" => TypeRef::Number,
            "string" => TypeRef::String,
            "date" => TypeRef::Date,
            "time" => TypeRef::Time,
            "date and time" | "dateTime" => TypeRef::DateTime,
            "duration" => TypeRef::Duration,
            "days and time duration" | "dayTimeDuration" => TypeRef::DaysAndTimeDuration,
            "years and months duration" | "yearMonthDuration" => TypeRef::YearsAndMonthsDuration,
            "list" => TypeRef::List(Box::new(TypeRef::Any)),
            "range" => TypeRef::Range(Box::new(TypeRef::Any)),
            "context" => TypeRef::Context(Vec::new()),
            "function" => TypeRef::Function(Vec::new(), Box::new(TypeRef::Any)),
            other => TypeRef::Unknown(other.to_string()),
        }
    }

    /// Type names that may start a type reference; used to recognize multi-word names
    pub fn known_names() -> &'static [&'static str] {
        &[
            "Any",
            "Null",
            "boolean",
            "number",
            "string",
            "date",
            "time",
            "date and time",
            "duration",
            "days and time duration",
            "years and months duration",
            "list",
            "range",
            "context",
            "function",
        ]
    }

    /// Whether `value` is an instance of this type
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeRef::Any, _) => true,
            (TypeRef::Null, Value::Null) => true,
            (TypeRef::Boolean, Value::Boolean(_)) => true,
            (TypeRef::Number, Value::Number(_)) => true,
            (TypeRef::String, Value::String(_)) => true,
            (TypeRef::Date, Value::Date(_)) => true,
            (TypeRef::Time, Value::Time(_)) => true,
            (TypeRef::DateTime, Value::DateTime(_)) => true,
            (TypeRef::Duration, Value::Duration(_)) => true,
            (TypeRef::DaysAndTimeDuration, Value::Duration(d)) => {
                d.kind() == DurationKind::DaysAndTime
            }
            (TypeRef::YearsAndMonthsDuration, Value::Duration(d)) => {
                d.kind() == DurationKind::YearsAndMonths
            }
            (TypeRef::List(element), Value::List(items)) => items.iter().all(|v| element.matches(v)),
            (TypeRef::Range(element), Value::Range(r)) => {
                [&r.start, &r.end]
                    .iter()
                    .all(|bound| bound.is_null() || element.matches(bound))
            }
            (TypeRef::Context(entries), Value::Context(context)) => {
                entries.iter().all(|(key, entry_type)| {
                    context.get(key).map_or(false, |v| entry_type.matches(v))
                })
            }
            (TypeRef::Function(params, _), Value::Function(function)) => {
                params.is_empty() || params.len() == function.params().len()
            }
            _ => false,
        }
    }

    /// The value kind built-in argument coercion targets, if any
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            TypeRef::Any | TypeRef::Unknown(_) => None,
            TypeRef::Null => Some(ValueKind::Null),
            TypeRef::Boolean => Some(ValueKind::Boolean),
            TypeRef::Number => Some(ValueKind::Number),
            TypeRef::String => Some(ValueKind::String),
            TypeRef::Date => Some(ValueKind::Date),
            TypeRef::Time => Some(ValueKind::Time),
            TypeRef::DateTime => Some(ValueKind::DateTime),
            TypeRef::Duration | TypeRef::DaysAndTimeDuration | TypeRef::YearsAndMonthsDuration => {
                Some(ValueKind::Duration)
            }
            TypeRef::List(_) => Some(ValueKind::List),
            TypeRef::Range(_) => Some(ValueKind::Range),
            TypeRef::Context(_) => Some(ValueKind::Context),
            TypeRef::Function(_, _) => Some(ValueKind::Function),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Any => write!(f, "Any"),
            TypeRef::Null => write!(f, "Null"),
            TypeRef::Boolean => write!(f, "boolean"),
            TypeRef::Number => write!(f, "number"),
            TypeRef::String => write!(f, "string"),
            TypeRef::Date => write!(f, "date"),
            TypeRef::Time => write!(f, "time"),
            TypeRef::DateTime => write!(f, "date and time"),
            TypeRef::Duration => write!(f, "duration"),
            TypeRef::DaysAndTimeDuration => write!(f, "days and time duration"),
            TypeRef::YearsAndMonthsDuration => write!(f, "years and months duration"),
            TypeRef::List(t) => write!(f, "list<{}>", t),
            TypeRef::Range(t) => write!(f, "range<{}>", t),
            TypeRef::Context(entries) => {
                let parts: Vec<String> = entries.iter().map(|(k, t)| format!("{}: {}", k, t)).collect();
                write!(f, "context<{}>", parts.join(", "))
            }
            TypeRef::Function(params, ret) => {
                let parts: Vec<String> = params.iter().map(|t| t.to_string()).collect();
                write!(f, "function<{}> -> {}", parts.join(", "), ret)
            }
            TypeRef::Unknown(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::Duration;

    #[test]
    fn test_simple_types() {
        assert!(TypeRef::Number.matches(&Value::Number(1.0)));
        assert!(!TypeRef::Number.matches(&Value::String("1".into())));
        assert!(TypeRef::Any.matches(&Value::Null));
        assert!(TypeRef::Null.matches(&Value::Null));
        assert!(!TypeRef::Unknown("foo".into()).matches(&Value::Null));
    }

    #[test]
    fn test_duration_kinds() {
        let ym = Value::Duration(Duration::from_months(3));
        let dt = Value::Duration(Duration::from_millis(1000));
        assert!(TypeRef::YearsAndMonthsDuration.matches(&ym));
        assert!(!TypeRef::YearsAndMonthsDuration.matches(&dt));
        assert!(TypeRef::DaysAndTimeDuration.matches(&dt));
        assert!(TypeRef::Duration.matches(&ym));
    }

    #[test]
    fn test_parameterized_types() {
        let numbers = TypeRef::List(Box::new(TypeRef::Number));
        assert!(numbers.matches(&Value::List(vec![Value::Number(1.0)])));
        assert!(!numbers.matches(&Value::List(vec![Value::String("a".into())])));

        let person = TypeRef::Context(vec![("name".into(), TypeRef::String)]);
        let mut context = crate::value::Context::new();
        context.insert("name".into(), Value::String("Ann".into()));
        context.insert("age".into(), Value::Number(3.0));
        assert!(person.matches(&Value::Context(context)));
        assert_eq!(person.to_string(), "context<name: string>");
    }

    #[test]
    fn test_from_name() {
        assert_eq!(TypeRef::from_name("date and time"), TypeRef::DateTime);
        assert_eq!(TypeRef::from_name("list"), TypeRef::List(Box::new(TypeRef::Any)));
    }
}
