//! Built-in functions for FEEL
//!
//! Every built-in declares one or more argument shapes. Arguments are
//! coerced to the declared shape before the implementation runs: a scalar
//! is promoted to a singleton list where a list is expected, a singleton
//! list is unwrapped where a scalar is expected, and date-times are narrowed
//! to dates or times. A failed coercion makes the call return `null` without
//! a warning; only call-site mismatches (arity, unknown parameter names) are
//! reported as invocation errors.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::diagnostics::Diagnostics;
use crate::range;
use crate::temporal::{self, DateTime, Duration};
use crate::types::TypeRef;
use crate::value::{bind_arguments, numbers_equal, CallArgs, Context, InvocationError, Value, ValueKind};
use crate::Dialect;

/// Implementation signature; `None` means the call evaluates to `null`
pub type BuiltinImpl = fn(&[Value], &mut Diagnostics) -> Option<Value>;

/// A declared parameter: name, expected kind (`None` = any) and nilability
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    kind: Option<ValueKind>,
    nilable: bool,
}

impl Param {
    /// Parse a `"name: type"` declaration; a trailing `?` marks the type nilable
    fn parse(decl: &str) -> Self {
        let (name, type_name) = decl.split_once(':').unwrap_or((decl, "any"));
        let type_name = type_name.trim();
        let (type_name, nilable) = match type_name.strip_suffix('?') {
            Some(stripped) => (stripped, true),
            None => (type_name, false),
        };
        Self {
            name: name.trim().to_string(),
            kind: TypeRef::from_name(type_name).kind(),
            nilable,
        }
    }

    /// Coerce a positional argument to this parameter
    fn coerce(&self, value: Value) -> Option<Value> {
        match (value, self.kind) {
            (Value::Null, _) => self.nilable.then_some(Value::Null),
            (value, None) => Some(value),
            (Value::List(mut items), Some(kind)) if kind != ValueKind::List && items.len() == 1 => {
                self.coerce(items.remove(0))
            }
            (value, Some(ValueKind::List)) if !matches!(value, Value::List(_)) => {
                Some(Value::List(vec![value]))
            }
            (value, Some(kind)) => value.type_cast(kind),
        }
    }

    /// Coerce one element of a variadic argument list
    fn coerce_element(&self, value: Value) -> Option<Value> {
        match (value, self.kind) {
            (Value::Null, _) => self.nilable.then_some(Value::Null),
            (value, None) => Some(value),
            (value, Some(kind)) => value.type_cast(kind),
        }
    }
}

/// Argument shape of one overload
#[derive(Debug, Clone)]
pub enum Shape {
    /// Positional parameters; missing trailing arguments are `null`
    Fixed(Vec<Param>),
    /// Either N scalar arguments or a single list, flattened into one list
    Variadic(Param),
    /// Leading fixed parameters followed by any number of trailing arguments
    Rest(Vec<Param>, Param),
}

impl Shape {
    fn param_names(&self) -> Vec<String> {
        match self {
            Shape::Fixed(params) => params.iter().map(|p| p.name.clone()).collect(),
            Shape::Variadic(param) => vec![param.name.clone()],
            Shape::Rest(leading, rest) => leading
                .iter()
                .chain(std::iter::once(rest))
                .map(|p| p.name.clone())
                .collect(),
        }
    }

    fn accepts_exactly(&self, count: usize) -> bool {
        match self {
            Shape::Fixed(params) => count == params.len(),
            Shape::Variadic(_) => true,
            Shape::Rest(leading, _) => count >= leading.len(),
        }
    }

    fn accepts_padded(&self, count: usize) -> bool {
        match self {
            Shape::Fixed(params) => count < params.len(),
            Shape::Variadic(_) => false,
            Shape::Rest(leading, _) => count < leading.len(),
        }
    }

    fn binds(&self, names: &[&str]) -> bool {
        let params = self.param_names();
        let mut seen: Vec<&str> = Vec::new();
        names.iter().all(|name| {
            let fresh = !seen.contains(name);
            seen.push(name);
            fresh && params.iter().any(|p| p == name)
        })
    }

    fn coerce(&self, mut values: Vec<Value>) -> Option<Vec<Value>> {
        match self {
            Shape::Fixed(params) => {
                values.resize(params.len(), Value::Null);
                params
                    .iter()
                    .zip(values)
                    .map(|(param, value)| param.coerce(value))
                    .collect()
            }
            Shape::Variadic(param) => {
                if values.is_empty() {
                    return None;
                }
                let elements = if values.len() == 1 {
                    match values.remove(0) {
                        Value::List(items) => items,
                        single => vec![single],
                    }
                } else {
                    values
                };
                let coerced = elements
                    .into_iter()
                    .map(|v| param.coerce_element(v))
                    .collect::<Option<Vec<_>>>()?;
                Some(vec![Value::List(coerced)])
            }
            Shape::Rest(leading, rest) => {
                if values.len() < leading.len() {
                    values.resize(leading.len(), Value::Null);
                }
                let trailing = values.split_off(leading.len());
                let mut coerced: Vec<Value> = leading
                    .iter()
                    .zip(values)
                    .map(|(param, value)| param.coerce(value))
                    .collect::<Option<_>>()?;
                for value in trailing {
                    coerced.push(rest.coerce(value)?);
                }
                Some(coerced)
            }
        }
    }
}

#[derive(Debug)]
struct Overload {
    shape: Shape,
    imp: BuiltinImpl,
}

/// A named built-in with its overloads
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    overloads: Vec<Overload>,
}

impl Builtin {
    /// Parameter names of the primary overload
    pub fn param_names(&self) -> Vec<String> {
        self.overloads
            .first()
            .map(|o| o.shape.param_names())
            .unwrap_or_default()
    }

    /// Select an overload for the call site, coerce and run it
    pub fn invoke(&self, args: CallArgs, diagnostics: &mut Diagnostics) -> Result<Value, InvocationError> {
        let (overload, values) = self.select(args)?;
        match overload.shape.coerce(values) {
            Some(values) => Ok((overload.imp)(&values, diagnostics).unwrap_or(Value::Null)),
            None => {
                tracing::trace!(function = self.name, "argument coercion failed");
                Ok(Value::Null)
            }
        }
    }

    fn select(&self, args: CallArgs) -> Result<(&Overload, Vec<Value>), InvocationError> {
        match args {
            CallArgs::Positional(values) => {
                let count = values.len();
                let overload = self
                    .overloads
                    .iter()
                    .find(|o| o.shape.accepts_exactly(count))
                    .or_else(|| self.overloads.iter().find(|o| o.shape.accepts_padded(count)))
                    .ok_or_else(|| {
                        InvocationError(format!(
                            "no overload of <{}> accepts {} argument(s)",
                            self.name, count
                        ))
                    })?;
                Ok((overload, values))
            }
            CallArgs::Named(named) => {
                let names: Vec<&str> = named.iter().map(|(n, _)| n.as_str()).collect();
                let overload = self
                    .overloads
                    .iter()
                    .find(|o| o.shape.binds(&names) && o.shape.param_names().len() == names.len())
                    .or_else(|| self.overloads.iter().find(|o| o.shape.binds(&names)))
                    .ok_or_else(|| {
                        InvocationError(format!(
                            "no overload of <{}> accepts parameters {}",
                            self.name,
                            names.join(", ")
                        ))
                    })?;
                let values = bind_arguments(&overload.shape.param_names(), CallArgs::Named(named))?;
                Ok((overload, values))
            }
        }
    }
}

/// Function registry
pub struct FunctionRegistry {
    standard: HashMap<&'static str, Builtin>,
    extensions: HashMap<&'static str, Builtin>,
}

fn fixed(decls: &[&str]) -> Shape {
    Shape::Fixed(decls.iter().map(|d| Param::parse(d)).collect())
}

fn variadic(decl: &str) -> Shape {
    Shape::Variadic(Param::parse(decl))
}

fn rest(leading: &[&str], decl: &str) -> Shape {
    Shape::Rest(leading.iter().map(|d| Param::parse(d)).collect(), Param::parse(decl))
}

impl FunctionRegistry {
    /// Create a registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            standard: HashMap::new(),
            extensions: HashMap::new(),
        };

        // Conversion functions
        registry.register("date", fixed(&["from: any"]), fn_date);
        registry.register("date", fixed(&["year: number", "month: number", "day: number"]), fn_date_from_parts);
        registry.register("date and time", fixed(&["from: any"]), fn_date_and_time);
        registry.register("date and time", fixed(&["date: any", "time: time"]), fn_date_and_time_combine);
        registry.register("time", fixed(&["from: any"]), fn_time);
        registry.register(
            "time",
            fixed(&["hour: number", "minute: number", "second: number", "offset: duration?"]),
            fn_time_from_parts,
        );
        registry.register("duration", fixed(&["from: string"]), fn_duration);
        registry.register("years and months duration", fixed(&["from: any", "to: any"]), fn_years_and_months_duration);
        registry.register(
            "number",
            fixed(&["from: string", "grouping separator: string?", "decimal separator: string?"]),
            fn_number,
        );
        registry.register("string", fixed(&["from: any?"]), fn_string);

        // Boolean functions
        registry.register("not", fixed(&["negand: any?"]), fn_not);
        registry.register("is", fixed(&["value1: any?", "value2: any?"]), fn_is);

        // String functions
        registry.register(
            "substring",
            fixed(&["string: string", "start position: number", "length: number?"]),
            fn_substring,
        );
        registry.register("string length", fixed(&["string: string"]), fn_string_length);
        registry.register("upper case", fixed(&["string: string"]), fn_upper_case);
        registry.register("lower case", fixed(&["string: string"]), fn_lower_case);
        registry.register("substring before", fixed(&["string: string", "match: string"]), fn_substring_before);
        registry.register("substring after", fixed(&["string: string", "match: string"]), fn_substring_after);
        registry.register(
            "replace",
            fixed(&["input: string", "pattern: string", "replacement: string", "flags: string?"]),
            fn_replace,
        );
        registry.register("contains", fixed(&["string: string", "match: string"]), fn_contains);
        registry.register("starts with", fixed(&["string: string", "match: string"]), fn_starts_with);
        registry.register("ends with", fixed(&["string: string", "match: string"]), fn_ends_with);
        registry.register("matches", fixed(&["input: string", "pattern: string", "flags: string?"]), fn_matches);
        registry.register("split", fixed(&["string: string", "delimiter: string"]), fn_split);
        registry.register("string join", fixed(&["list: list", "delimiter: string?"]), fn_string_join);

        // List functions
        registry.register("list contains", fixed(&["list: list", "element: any?"]), fn_list_contains);
        registry.register("count", fixed(&["list: list"]), fn_count);
        registry.register("min", variadic("list: any"), fn_min);
        registry.register("max", variadic("list: any"), fn_max);
        registry.register("sum", variadic("list: number"), fn_sum);
        registry.register("mean", variadic("list: number"), fn_mean);
        registry.register("all", variadic("list: boolean?"), fn_all);
        registry.register("any", variadic("list: boolean?"), fn_any);
        registry.register("and", variadic("list: boolean?"), fn_all);
        registry.register("or", variadic("list: boolean?"), fn_any);
        registry.register(
            "sublist",
            fixed(&["list: list", "start position: number", "length: number?"]),
            fn_sublist,
        );
        registry.register("append", rest(&["list: list"], "item: any?"), fn_append);
        registry.register("concatenate", rest(&[], "list: list"), fn_concatenate);
        registry.register(
            "insert before",
            fixed(&["list: list", "position: number", "newItem: any?"]),
            fn_insert_before,
        );
        registry.register("remove", fixed(&["list: list", "position: number"]), fn_remove);
        registry.register("reverse", fixed(&["list: list"]), fn_reverse);
        registry.register("index of", fixed(&["list: list", "match: any?"]), fn_index_of);
        registry.register("union", rest(&[], "list: list"), fn_union);
        registry.register("distinct values", fixed(&["list: list"]), fn_distinct_values);
        registry.register("flatten", fixed(&["list: list"]), fn_flatten);
        registry.register("product", variadic("list: number"), fn_product);
        registry.register("median", variadic("list: number"), fn_median);
        registry.register("stddev", variadic("list: number"), fn_stddev);
        registry.register("mode", variadic("list: number"), fn_mode);
        registry.register("sort", fixed(&["list: list", "precedes: function?"]), fn_sort);

        // Numeric functions
        registry.register("decimal", fixed(&["n: number", "scale: number"]), fn_decimal);
        registry.register("floor", fixed(&["n: number", "scale: number?"]), fn_floor);
        registry.register("ceiling", fixed(&["n: number", "scale: number?"]), fn_ceiling);
        registry.register("round up", fixed(&["n: number", "scale: number?"]), fn_round_up);
        registry.register("round down", fixed(&["n: number", "scale: number?"]), fn_round_down);
        registry.register("round half up", fixed(&["n: number", "scale: number?"]), fn_round_half_up);
        registry.register("round half down", fixed(&["n: number", "scale: number?"]), fn_round_half_down);
        registry.register("abs", fixed(&["n: any"]), fn_abs);
        registry.register("modulo", fixed(&["dividend: number", "divisor: number"]), fn_modulo);
        registry.register("sqrt", fixed(&["number: number"]), fn_sqrt);
        registry.register("log", fixed(&["number: number"]), fn_log);
        registry.register("exp", fixed(&["number: number"]), fn_exp);
        registry.register("odd", fixed(&["number: number"]), fn_odd);
        registry.register("even", fixed(&["number: number"]), fn_even);

        // Date/time functions
        registry.register("day of year", fixed(&["date: date"]), fn_day_of_year);
        registry.register("day of week", fixed(&["date: date"]), fn_day_of_week);
        registry.register("month of year", fixed(&["date: date"]), fn_month_of_year);
        registry.register("week of year", fixed(&["date: date"]), fn_week_of_year);
        registry.register("now", fixed(&[]), fn_now);
        registry.register("today", fixed(&[]), fn_today);

        // Context functions
        registry.register("get value", fixed(&["m: context", "key: any"]), fn_get_value);
        registry.register("get entries", fixed(&["m: context"]), fn_get_entries);
        registry.register("context", fixed(&["entries: list"]), fn_context);
        registry.register("context put", fixed(&["context: context", "key: any", "value: any?"]), fn_context_put);
        registry.register("context merge", fixed(&["contexts: list"]), fn_context_merge);

        // Range relations, each with point/range overloads
        let relations: [(&'static str, BuiltinImpl); 14] = [
            ("before", fn_before),
            ("after", fn_after),
            ("meets", fn_meets),
            ("met by", fn_met_by),
            ("overlaps", fn_overlaps),
            ("overlaps before", fn_overlaps_before),
            ("overlaps after", fn_overlaps_after),
            ("finishes", fn_finishes),
            ("finished by", fn_finished_by),
            ("includes", fn_includes),
            ("during", fn_during),
            ("starts", fn_starts),
            ("started by", fn_started_by),
            ("coincides", fn_coincides),
        ];
        for (name, imp) in relations {
            for params in [
                ["point1: any?", "point2: any?"],
                ["point: any?", "range: any?"],
                ["range: any?", "point: any?"],
                ["range1: any?", "range2: any?"],
            ] {
                registry.register(name, fixed(&params), imp);
            }
        }

        // Camunda extensions
        registry.register_extension("is defined", fixed(&["value: any?"]), fn_is_defined);
        registry.register_extension("get or else", fixed(&["value: any?", "default: any?"]), fn_get_or_else);
        registry.register_extension("is empty", fixed(&["list: list"]), fn_is_empty);
        registry.register_extension("partition", fixed(&["list: list", "size: number"]), fn_partition);
        registry.register_extension("trim", fixed(&["string: string"]), fn_trim);
        registry.register_extension("to json", fixed(&["value: any?"]), fn_to_json);
        registry.register_extension("from json", fixed(&["value: string"]), fn_from_json);
        registry.register_extension("duplicate values", fixed(&["list: list"]), fn_duplicate_values);

        registry
    }

    /// Register a standard function overload
    pub fn register(&mut self, name: &'static str, shape: Shape, imp: BuiltinImpl) {
        Self::add(&mut self.standard, name, shape, imp);
    }

    /// Register an overload that only the Camunda dialect sees
    pub fn register_extension(&mut self, name: &'static str, shape: Shape, imp: BuiltinImpl) {
        Self::add(&mut self.extensions, name, shape, imp);
    }

    fn add(table: &mut HashMap<&'static str, Builtin>, name: &'static str, shape: Shape, imp: BuiltinImpl) {
        table
            .entry(name)
            .or_insert_with(|| Builtin {
                name,
                overloads: Vec::new(),
            })
            .overloads
            .push(Overload { shape, imp });
    }

    /// Look up a built-in visible in `dialect`
    pub fn get(&self, name: &str, dialect: Dialect) -> Option<&Builtin> {
        let extension = match dialect {
            Dialect::Camunda => self.extensions.get(name),
            Dialect::Standard => None,
        };
        extension.or_else(|| self.standard.get(name))
    }

    /// Names of all built-ins visible in `dialect`
    pub fn list_functions(&self, dialect: Dialect) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.standard.keys().copied().collect();
        if dialect == Dialect::Camunda {
            names.extend(self.extensions.keys().copied());
        }
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref GLOBAL_REGISTRY: FunctionRegistry = FunctionRegistry::new();
    static ref NUMBER_RE: Regex = Regex::new(r"^-?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").unwrap();
    static ref GROUP_REF_RE: Regex = Regex::new(r"\$(\d+)").unwrap();
}

/// Look up a built-in in the global registry
pub fn lookup(name: &str, dialect: Dialect) -> Option<&'static Builtin> {
    GLOBAL_REGISTRY.get(name, dialect)
}

/// Names of all built-ins visible in `dialect`
pub fn builtin_names(dialect: Dialect) -> Vec<&'static str> {
    GLOBAL_REGISTRY.list_functions(dialect)
}

/// Call a standard built-in by name with positional arguments
pub fn call_builtin(name: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
    let builtin = lookup(name, Dialect::Standard)
        .ok_or_else(|| InvocationError(format!("unknown function <{}>", name)))?;
    builtin.invoke(CallArgs::Positional(args), &mut Diagnostics::new())
}

// =============================================================================
// ARGUMENT ACCESS
// =============================================================================

fn number(args: &[Value], i: usize) -> Option<f64> {
    args.get(i)?.as_number()
}

fn string(args: &[Value], i: usize) -> Option<&str> {
    args.get(i)?.as_str()
}

fn list(args: &[Value], i: usize) -> Option<&[Value]> {
    args.get(i)?.as_list()
}

fn context_arg(args: &[Value], i: usize) -> Option<&Context> {
    args.get(i)?.as_context()
}

/// A nilable optional number; `null` means absent
fn optional_number(args: &[Value], i: usize) -> Option<Option<f64>> {
    match args.get(i) {
        None | Some(Value::Null) => Some(None),
        Some(Value::Number(n)) => Some(Some(*n)),
        Some(_) => None,
    }
}

fn integer(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.is_finite()).then_some(n as i64)
}

fn boolean(b: bool) -> Option<Value> {
    Some(Value::Boolean(b))
}

fn num(n: f64) -> Option<Value> {
    n.is_finite().then_some(Value::Number(n))
}

fn text(s: impl Into<String>) -> Option<Value> {
    Some(Value::String(s.into()))
}

// =============================================================================
// CONVERSION
// =============================================================================

fn fn_date(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    match args.first()? {
        Value::String(s) => temporal::parse_date(s).map(Value::Date),
        value @ (Value::Date(_) | Value::DateTime(_)) => value.type_cast(ValueKind::Date),
        _ => None,
    }
}

fn fn_date_from_parts(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    temporal::date_from_parts(number(args, 0)?, number(args, 1)?, number(args, 2)?).map(Value::Date)
}

fn fn_date_and_time(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    match args.first()? {
        Value::String(s) => temporal::parse_date_time(s).map(Value::DateTime),
        Value::Date(d) => Some(Value::DateTime(DateTime::from_date(*d))),
        Value::DateTime(dt) => Some(Value::DateTime(*dt)),
        _ => None,
    }
}

fn fn_date_and_time_combine(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let date = match args.first()? {
        Value::Date(d) => *d,
        Value::DateTime(dt) => dt.date(),
        _ => return None,
    };
    match args.get(1)? {
        Value::Time(time) => Some(Value::DateTime(DateTime::from_date_and_time(date, time))),
        _ => None,
    }
}

fn fn_time(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    match args.first()? {
        Value::String(s) => temporal::parse_time(s)
            .or_else(|| {
                s.contains('T')
                    .then(|| temporal::parse_date_time(s).map(|dt| dt.time()))
                    .flatten()
            })
            .map(Value::Time),
        Value::Time(t) => Some(Value::Time(*t)),
        Value::DateTime(dt) => Some(Value::Time(dt.time())),
        Value::Date(_) => temporal::parse_time("00:00:00Z").map(Value::Time),
        _ => None,
    }
}

fn fn_time_from_parts(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let offset = match args.get(3) {
        Some(Value::Duration(d)) => Some(d),
        _ => None,
    };
    temporal::time_from_parts(number(args, 0)?, number(args, 1)?, number(args, 2)?, offset)
        .map(Value::Time)
}

fn fn_duration(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    temporal::parse_duration(string(args, 0)?).map(Value::Duration)
}

fn calendar_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        _ => None,
    }
}

fn fn_years_and_months_duration(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let from = calendar_date(args.first()?)?;
    let to = calendar_date(args.get(1)?)?;
    Some(Value::Duration(temporal::months_between(from, to)))
}

fn fn_number(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let from = string(args, 0)?;
    let grouping = string(args, 1);
    let decimal = string(args, 2);

    if let Some(g) = grouping {
        if ![" ", ",", "."].contains(&g) {
            return None;
        }
    }
    if let Some(d) = decimal {
        if ![",", "."].contains(&d) {
            return None;
        }
    }
    if grouping.is_some() && grouping == decimal {
        return None;
    }

    let mut normalized = from.to_string();
    if let Some(g) = grouping {
        normalized = normalized.replace(g, "");
    }
    if let Some(d) = decimal {
        normalized = normalized.replace(d, ".");
    }
    if !NUMBER_RE.is_match(&normalized) {
        return None;
    }
    num(normalized.parse().ok()?)
}

fn fn_string(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    match args.first()? {
        Value::Null => None,
        Value::String(s) => text(s.clone()),
        other => text(other.to_string()),
    }
}

// =============================================================================
// BOOLEAN
// =============================================================================

fn fn_not(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    boolean(!args.first()?.as_bool()?)
}

fn fn_is(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let (a, b) = (args.first()?, args.get(1)?);
    if a.kind() != b.kind() {
        return boolean(false);
    }
    let same = if a.is_temporal() {
        a == b
    } else {
        a.equals(b) == Some(true)
    };
    boolean(same)
}

// =============================================================================
// STRINGS
// =============================================================================

/// Resolve a 1-based (negative = from the end) start position to an index
fn start_index(position: f64, len: usize) -> Option<usize> {
    let position = integer(position)?;
    let len = len as i64;
    let index = if position > 0 {
        position - 1
    } else if position < 0 {
        len + position
    } else {
        return None;
    };
    (0..len).contains(&index).then_some(index as usize)
}

fn fn_substring(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let chars: Vec<char> = string(args, 0)?.chars().collect();
    let start = start_index(number(args, 1)?, chars.len())?;
    let end = match optional_number(args, 2)? {
        Some(length) => start.saturating_add(integer(length)?.max(0) as usize).min(chars.len()),
        None => chars.len(),
    };
    text(chars[start..end].iter().collect::<String>())
}

fn fn_string_length(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    num(string(args, 0)?.chars().count() as f64)
}

fn fn_upper_case(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    text(string(args, 0)?.to_uppercase())
}

fn fn_lower_case(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    text(string(args, 0)?.to_lowercase())
}

fn fn_substring_before(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let (s, m) = (string(args, 0)?, string(args, 1)?);
    text(s.find(m).map_or("", |i| &s[..i]))
}

fn fn_substring_after(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let (s, m) = (string(args, 0)?, string(args, 1)?);
    text(s.find(m).map_or("", |i| &s[i + m.len()..]))
}

/// Compile a pattern with XPath-style flags (`s`, `m`, `i`, `x`)
fn compile_pattern(pattern: &str, flags: Option<&str>) -> Option<Regex> {
    let flags = flags.unwrap_or("");
    if !flags.chars().all(|c| "smix".contains(c)) {
        return None;
    }
    let source = if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", flags, pattern)
    };
    Regex::new(&source).ok()
}

fn fn_replace(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let input = string(args, 0)?;
    let pattern = compile_pattern(string(args, 1)?, string(args, 3))?;
    let replacement = GROUP_REF_RE.replace_all(string(args, 2)?, "$${${1}}");
    text(pattern.replace_all(input, replacement.as_ref()).into_owned())
}

fn fn_contains(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    boolean(string(args, 0)?.contains(string(args, 1)?))
}

fn fn_starts_with(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    boolean(string(args, 0)?.starts_with(string(args, 1)?))
}

fn fn_ends_with(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    boolean(string(args, 0)?.ends_with(string(args, 1)?))
}

fn fn_matches(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let pattern = compile_pattern(string(args, 1)?, string(args, 2))?;
    boolean(pattern.is_match(string(args, 0)?))
}

fn fn_split(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let pattern = compile_pattern(string(args, 1)?, None)?;
    Some(Value::List(
        pattern
            .split(string(args, 0)?)
            .map(|part| Value::String(part.to_string()))
            .collect(),
    ))
}

fn fn_string_join(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let delimiter = string(args, 1).unwrap_or("");
    let mut parts = Vec::new();
    for item in list(args, 0)? {
        match item {
            Value::String(s) => parts.push(s.as_str()),
            Value::Null => {}
            _ => return None,
        }
    }
    text(parts.join(delimiter))
}

// =============================================================================
// LISTS
// =============================================================================

fn contains_value(items: &[Value], value: &Value) -> bool {
    items.iter().any(|item| item.equals(value) == Some(true))
}

fn fn_list_contains(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    boolean(contains_value(list(args, 0)?, args.get(1)?))
}

fn fn_count(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    num(list(args, 0)?.len() as f64)
}

fn extreme(items: &[Value], wanted: Ordering) -> Option<Value> {
    let mut best = items.first()?;
    for item in &items[1..] {
        if item.compare(best)? == wanted {
            best = item;
        }
    }
    Some(best.clone())
}

fn fn_min(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    extreme(list(args, 0)?, Ordering::Less)
}

fn fn_max(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    extreme(list(args, 0)?, Ordering::Greater)
}

fn numbers(args: &[Value]) -> Option<Vec<f64>> {
    list(args, 0)?.iter().map(Value::as_number).collect()
}

fn fn_sum(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let values = numbers(args)?;
    if values.is_empty() {
        return None;
    }
    num(values.iter().sum())
}

fn fn_mean(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let values = numbers(args)?;
    if values.is_empty() {
        return None;
    }
    num(values.iter().sum::<f64>() / values.len() as f64)
}

fn fn_all(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut unknown = false;
    for item in list(args, 0)? {
        match item {
            Value::Boolean(false) => return boolean(false),
            Value::Boolean(true) => {}
            _ => unknown = true,
        }
    }
    (!unknown).then_some(Value::Boolean(true))
}

fn fn_any(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut unknown = false;
    for item in list(args, 0)? {
        match item {
            Value::Boolean(true) => return boolean(true),
            Value::Boolean(false) => {}
            _ => unknown = true,
        }
    }
    (!unknown).then_some(Value::Boolean(false))
}

fn fn_sublist(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let items = list(args, 0)?;
    let start = start_index(number(args, 1)?, items.len())?;
    let end = match optional_number(args, 2)? {
        Some(length) => {
            let end = start.checked_add(usize::try_from(integer(length)?).ok()?)?;
            if end > items.len() {
                return None;
            }
            end
        }
        None => items.len(),
    };
    Some(Value::List(items[start..end].to_vec()))
}

fn fn_append(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut items = list(args, 0)?.to_vec();
    items.extend_from_slice(&args[1..]);
    Some(Value::List(items))
}

fn fn_concatenate(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut items = Vec::new();
    for arg in args {
        items.extend_from_slice(arg.as_list()?);
    }
    Some(Value::List(items))
}

fn fn_insert_before(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut items = list(args, 0)?.to_vec();
    let index = start_index(number(args, 1)?, items.len())?;
    items.insert(index, args.get(2)?.clone());
    Some(Value::List(items))
}

fn fn_remove(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut items = list(args, 0)?.to_vec();
    let index = start_index(number(args, 1)?, items.len())?;
    items.remove(index);
    Some(Value::List(items))
}

fn fn_reverse(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    Some(Value::List(list(args, 0)?.iter().rev().cloned().collect()))
}

fn fn_index_of(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let needle = args.get(1)?;
    Some(Value::List(
        list(args, 0)?
            .iter()
            .enumerate()
            .filter(|(_, item)| item.equals(needle) == Some(true))
            .map(|(i, _)| Value::Number((i + 1) as f64))
            .collect(),
    ))
}

fn distinct(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut result: Vec<Value> = Vec::new();
    for item in items {
        if !contains_value(&result, &item) {
            result.push(item);
        }
    }
    result
}

fn fn_union(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut items = Vec::new();
    for arg in args {
        items.extend_from_slice(arg.as_list()?);
    }
    Some(Value::List(distinct(items)))
}

fn fn_distinct_values(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    Some(Value::List(distinct(list(args, 0)?.iter().cloned())))
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::List(nested) => flatten_into(nested, out),
            other => out.push(other.clone()),
        }
    }
}

fn fn_flatten(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut out = Vec::new();
    flatten_into(list(args, 0)?, &mut out);
    Some(Value::List(out))
}

fn fn_product(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let values = numbers(args)?;
    if values.is_empty() {
        return None;
    }
    num(values.iter().product())
}

fn sorted_numbers(args: &[Value]) -> Option<Vec<f64>> {
    let mut values = numbers(args)?;
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values)
}

fn fn_median(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let values = sorted_numbers(args)?;
    let n = values.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        num(values[n / 2])
    } else {
        num((values[n / 2 - 1] + values[n / 2]) / 2.0)
    }
}

fn fn_stddev(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let values = numbers(args)?;
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    num(variance.sqrt())
}

fn fn_mode(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let values = sorted_numbers(args)?;
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for value in values {
        match counts.last_mut() {
            Some((last, count)) if numbers_equal(*last, value) => *count += 1,
            _ => counts.push((value, 1)),
        }
    }
    let highest = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
    Some(Value::List(
        counts
            .into_iter()
            .filter(|(_, c)| *c == highest)
            .map(|(v, _)| Value::Number(v))
            .collect(),
    ))
}

/// Stable merge sort; `precedes(a, b)` answers "must `a` come before `b`"
fn stable_sort<F>(mut items: Vec<Value>, precedes: &mut F) -> Vec<Value>
where
    F: FnMut(&Value, &Value) -> bool,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = stable_sort(items, precedes);
    let right = stable_sort(right, precedes);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => precedes(r, l),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    merged
}

fn fn_sort(args: &[Value], diagnostics: &mut Diagnostics) -> Option<Value> {
    let items = list(args, 0)?.to_vec();
    match args.get(1) {
        Some(Value::Function(precedes)) => {
            let mut before = |a: &Value, b: &Value| {
                precedes.call(vec![a.clone(), b.clone()], diagnostics) == Value::Boolean(true)
            };
            Some(Value::List(stable_sort(items, &mut before)))
        }
        _ => {
            if let Some(first) = items.first() {
                if items.iter().any(|item| item.compare(first).is_none()) {
                    return None;
                }
            }
            let mut before = |a: &Value, b: &Value| a.compare(b) == Some(Ordering::Less);
            Some(Value::List(stable_sort(items, &mut before)))
        }
    }
}

// =============================================================================
// NUMBERS
// =============================================================================

/// Apply `round` to `n` scaled by `10^scale`
fn scaled(n: f64, scale: Option<f64>, round: impl Fn(f64) -> f64) -> Option<Value> {
    let scale = integer(scale.unwrap_or(0.0))?;
    if !(-6176..=6176).contains(&scale) {
        return None;
    }
    let factor = 10f64.powi(scale as i32);
    let shifted = n * factor;
    // Past f64 precision every digit is already kept
    if !shifted.is_finite() {
        return num(n);
    }
    num(round(shifted) / factor)
}

/// Whether `x` sits exactly half way between two integers
fn is_half(x: f64) -> bool {
    (x.abs().fract() - 0.5).abs() < 1e-9
}

fn round_half_even(x: f64) -> f64 {
    if is_half(x) {
        let floor = x.floor();
        if floor % 2.0 == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        x.round()
    }
}

fn fn_decimal(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    scaled(number(args, 0)?, Some(number(args, 1)?), round_half_even)
}

fn fn_floor(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    scaled(number(args, 0)?, optional_number(args, 1)?, f64::floor)
}

fn fn_ceiling(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    scaled(number(args, 0)?, optional_number(args, 1)?, f64::ceil)
}

fn fn_round_up(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    scaled(number(args, 0)?, optional_number(args, 1)?, |x| x.signum() * x.abs().ceil())
}

fn fn_round_down(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    scaled(number(args, 0)?, optional_number(args, 1)?, f64::trunc)
}

fn fn_round_half_up(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    scaled(number(args, 0)?, optional_number(args, 1)?, |x| {
        if is_half(x) {
            x.signum() * x.abs().ceil()
        } else {
            x.round()
        }
    })
}

fn fn_round_half_down(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    scaled(number(args, 0)?, optional_number(args, 1)?, |x| {
        if is_half(x) {
            x.trunc()
        } else {
            x.round()
        }
    })
}

fn fn_abs(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    match args.first()? {
        Value::Number(n) => num(n.abs()),
        Value::Duration(d) => Some(Value::Duration(if is_negative(d) { d.negate() } else { *d })),
        _ => None,
    }
}

fn is_negative(d: &Duration) -> bool {
    d.months < 0 || (d.months == 0 && d.millis < 0)
}

/// Divisor-signed remainder, computed on a 1e-9 grid to absorb float drift
pub fn modulo(dividend: f64, divisor: f64) -> Option<f64> {
    if divisor == 0.0 {
        return None;
    }
    const GRID: f64 = 1e9;
    let a = (dividend * GRID).round();
    let b = (divisor * GRID).round();
    if b == 0.0 {
        return None;
    }
    let remainder = ((a % b) + b) % b;
    Some(remainder / GRID)
}

fn fn_modulo(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    num(modulo(number(args, 0)?, number(args, 1)?)?)
}

fn fn_sqrt(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let n = number(args, 0)?;
    if n < 0.0 {
        return None;
    }
    num(n.sqrt())
}

fn fn_log(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let n = number(args, 0)?;
    if n <= 0.0 {
        return None;
    }
    num(n.ln())
}

fn fn_exp(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    num(number(args, 0)?.exp())
}

fn fn_odd(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    boolean(integer(number(args, 0)?).map_or(false, |n| n % 2 != 0))
}

fn fn_even(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    boolean(integer(number(args, 0)?).map_or(false, |n| n % 2 == 0))
}

// =============================================================================
// DATES
// =============================================================================

fn date_arg(args: &[Value]) -> Option<NaiveDate> {
    match args.first()? {
        Value::Date(d) => Some(*d),
        _ => None,
    }
}

fn fn_day_of_year(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    num(f64::from(temporal::day_of_year(&date_arg(args)?)))
}

fn fn_day_of_week(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    text(temporal::day_of_week(&date_arg(args)?))
}

fn fn_month_of_year(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    text(temporal::month_of_year(&date_arg(args)?))
}

fn fn_week_of_year(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    num(f64::from(temporal::week_of_year(&date_arg(args)?)))
}

fn fn_now(_: &[Value], _: &mut Diagnostics) -> Option<Value> {
    Some(Value::DateTime(temporal::now()))
}

fn fn_today(_: &[Value], _: &mut Diagnostics) -> Option<Value> {
    Some(Value::Date(temporal::today()))
}

// =============================================================================
// CONTEXTS
// =============================================================================

/// A context key path: a single string or a list of strings
fn key_path(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::List(items) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn fn_get_value(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut current = args.first()?;
    for key in key_path(args.get(1)?)? {
        current = current.as_context()?.get(&key)?;
    }
    Some(current.clone())
}

fn fn_get_entries(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    Some(Value::List(
        context_arg(args, 0)?
            .iter()
            .map(|(key, value)| {
                let mut entry = Context::new();
                entry.insert("key".to_string(), Value::String(key.clone()));
                entry.insert("value".to_string(), value.clone());
                Value::Context(entry)
            })
            .collect(),
    ))
}

fn fn_context(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut context = Context::new();
    for entry in list(args, 0)? {
        let entry = entry.as_context()?;
        let key = entry.get("key")?.as_str()?;
        let value = entry.get("value")?;
        if context.insert(key.to_string(), value.clone()).is_some() {
            return None;
        }
    }
    Some(Value::Context(context))
}

fn put_path(context: &Context, path: &[String], value: Value) -> Option<Context> {
    let (first, rest) = path.split_first()?;
    let mut result = context.clone();
    if rest.is_empty() {
        result.insert(first.clone(), value);
    } else {
        let nested = match context.get(first) {
            Some(Value::Context(nested)) => nested.clone(),
            None => Context::new(),
            Some(_) => return None,
        };
        result.insert(first.clone(), Value::Context(put_path(&nested, rest, value)?));
    }
    Some(result)
}

fn fn_context_put(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let path = key_path(args.get(1)?)?;
    put_path(context_arg(args, 0)?, &path, args.get(2)?.clone()).map(Value::Context)
}

fn fn_context_merge(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let mut merged = Context::new();
    for item in list(args, 0)? {
        for (key, value) in item.as_context()? {
            merged.insert(key.clone(), value.clone());
        }
    }
    Some(Value::Context(merged))
}

// =============================================================================
// RANGE RELATIONS
// =============================================================================

fn relation(args: &[Value], test: fn(&Value, &Value) -> Option<bool>) -> Option<Value> {
    test(args.first()?, args.get(1)?).map(Value::Boolean)
}

fn fn_before(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::before)
}

fn fn_after(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::after)
}

fn fn_meets(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::meets)
}

fn fn_met_by(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::met_by)
}

fn fn_overlaps(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::overlaps)
}

fn fn_overlaps_before(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::overlaps_before)
}

fn fn_overlaps_after(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::overlaps_after)
}

fn fn_finishes(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::finishes)
}

fn fn_finished_by(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::finished_by)
}

fn fn_includes(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::includes)
}

fn fn_during(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::during)
}

fn fn_starts(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::starts)
}

fn fn_started_by(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::started_by)
}

fn fn_coincides(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    relation(args, range::coincides)
}

// =============================================================================
// CAMUNDA EXTENSIONS
// =============================================================================

fn fn_is_defined(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    boolean(!args.first()?.is_null())
}

fn fn_get_or_else(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    match args.first()? {
        Value::Null => args.get(1).cloned(),
        value => Some(value.clone()),
    }
}

fn fn_is_empty(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    boolean(list(args, 0)?.is_empty())
}

fn fn_partition(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let size = usize::try_from(integer(number(args, 1)?)?).ok().filter(|s| *s > 0)?;
    Some(Value::List(
        list(args, 0)?
            .chunks(size)
            .map(|chunk| Value::List(chunk.to_vec()))
            .collect(),
    ))
}

fn fn_trim(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    text(string(args, 0)?.trim())
}

fn fn_to_json(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    text(serde_json::to_string(&args.first()?.to_json()).ok()?)
}

fn fn_from_json(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    serde_json::from_str(string(args, 0)?).ok().map(Value::from_json)
}

fn fn_duplicate_values(args: &[Value], _: &mut Diagnostics) -> Option<Value> {
    let items = list(args, 0)?;
    let duplicates = items.iter().enumerate().filter_map(|(i, item)| {
        contains_value(&items[i + 1..], item).then(|| item.clone())
    });
    Some(Value::List(distinct(duplicates)))
}
