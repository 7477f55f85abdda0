//! Evaluator for FEEL - compiles the syntax tree into closures and runs them
//!
//! Every node becomes a `Compiled` closure built from its children's
//! closures. Closures read an immutable `Scope` and report semantic problems
//! into the `Diagnostics` passed down the call; they never fail.

use std::rc::Rc;

use crate::ast::{
    ArithmeticOperator, Arguments, ComparisonOperator, Expression, Iteration, IterationSource,
    LogicalOperator, Quantifier, SourceSpan,
};
use crate::diagnostics::Diagnostics;
use crate::functions;
use crate::range::Range;
use crate::temporal::{self, DateTime};
use crate::value::{CallArgs, Context, Function, Value};
use crate::Dialect;

/// A compiled expression
pub type Compiled = Rc<dyn Fn(&Scope, &mut Diagnostics) -> Value>;

/// A compiled unary test: matches an input value
type CompiledTest = Rc<dyn Fn(&Value, &Scope, &mut Diagnostics) -> Option<bool>>;

/// Name bindings visible to an expression
///
/// Scopes are never mutated; `extend` creates a child frame that shadows
/// its parent.
#[derive(Clone)]
pub struct Scope {
    frame: Rc<Frame>,
}

struct Frame {
    bindings: Context,
    parent: Option<Scope>,
}

impl Scope {
    pub fn new(bindings: Context) -> Self {
        Self {
            frame: Rc::new(Frame {
                bindings,
                parent: None,
            }),
        }
    }

    /// Child scope with additional bindings
    pub fn extend(&self, bindings: Context) -> Self {
        Self {
            frame: Rc::new(Frame {
                bindings,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Child scope with a single additional binding
    pub fn with(&self, name: &str, value: Value) -> Self {
        let mut bindings = Context::new();
        bindings.insert(name.to_string(), value);
        self.extend(bindings)
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut scope = self;
        loop {
            if let Some(value) = scope.frame.bindings.get(name) {
                return Some(value);
            }
            scope = scope.frame.parent.as_ref()?;
        }
    }
}

/// Compiles expressions for one dialect
pub struct Evaluator {
    dialect: Dialect,
}

enum CompiledSource {
    Expression(Compiled),
    Range(Compiled, Compiled),
}

impl Evaluator {
    /// Create a new evaluator
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Compile and run an expression against a context
    pub fn evaluate(
        &self,
        expr: &Expression,
        context: Context,
        diagnostics: &mut Diagnostics,
    ) -> Value {
        let program = self.compile(expr);
        program(&Scope::new(context), diagnostics)
    }

    /// Compile an expression into a closure
    pub fn compile(&self, expr: &Expression) -> Compiled {
        let span = expr.span();
        match expr {
            Expression::Number { value, .. } => constant(Value::Number(*value)),
            Expression::String { value, .. } => constant(Value::String(value.clone())),
            Expression::Boolean { value, .. } => constant(Value::Boolean(*value)),
            Expression::Null { .. } => constant(Value::Null),
            Expression::Temporal { text, .. } => constant(parse_temporal_literal(text)),

            Expression::Name { name, .. } => {
                let name = name.clone();
                let dialect = self.dialect;
                Rc::new(move |scope, diagnostics| {
                    if let Some(value) = scope.lookup(&name) {
                        return value.clone();
                    }
                    match functions::lookup(&name, dialect) {
                        Some(builtin) => Value::Function(Function::builtin(builtin)),
                        None => {
                            diagnostics.no_variable_found(&name, span);
                            Value::Null
                        }
                    }
                })
            }

            Expression::InputValue { .. } => Rc::new(|scope, _| {
                scope.lookup("?").cloned().unwrap_or(Value::Null)
            }),

            Expression::AnyInput { .. } => constant(Value::Boolean(true)),

            Expression::List { elements, .. } => {
                let elements: Vec<Compiled> = elements.iter().map(|e| self.compile(e)).collect();
                Rc::new(move |scope, diagnostics| {
                    Value::List(elements.iter().map(|e| e(scope, diagnostics)).collect())
                })
            }

            Expression::Context { entries, .. } => {
                let entries: Vec<(String, Compiled)> = entries
                    .iter()
                    .map(|entry| (entry.key.clone(), self.compile(&entry.value)))
                    .collect();
                Rc::new(move |scope, diagnostics| {
                    let mut context = Context::new();
                    let mut inner = scope.clone();
                    for (key, value) in &entries {
                        let value = value(&inner, diagnostics);
                        inner = inner.with(key, value.clone());
                        context.insert(key.clone(), value);
                    }
                    Value::Context(context)
                })
            }

            Expression::Interval {
                start,
                end,
                start_included,
                end_included,
                ..
            } => {
                let start = self.compile(start);
                let end = self.compile(end);
                let (start_included, end_included) = (*start_included, *end_included);
                Rc::new(move |scope, diagnostics| {
                    let start = start(scope, diagnostics);
                    let end = end(scope, diagnostics);
                    Value::Range(Box::new(Range::new(start, end, start_included, end_included)))
                })
            }

            Expression::UnaryComparison { op, operand, .. } => {
                let op = *op;
                let operand = self.compile(operand);
                Rc::new(move |scope, diagnostics| {
                    let operand = operand(scope, diagnostics);
                    match comparison_range(op, operand.clone()) {
                        Some(range) => Value::Range(Box::new(range)),
                        None => operand,
                    }
                })
            }

            Expression::Negation { operand, .. } => {
                let operand = self.compile(operand);
                Rc::new(move |scope, diagnostics| match operand(scope, diagnostics) {
                    Value::Null => Value::Null,
                    Value::Number(n) => Value::Number(-n),
                    Value::Duration(d) => Value::Duration(d.negate()),
                    other => {
                        diagnostics.invalid_type("-", "number", other.type_name(), span);
                        Value::Null
                    }
                })
            }

            Expression::Arithmetic {
                op, left, right, ..
            } => {
                let op = *op;
                let left = self.compile(left);
                let right = self.compile(right);
                Rc::new(move |scope, diagnostics| {
                    let l = left(scope, diagnostics);
                    let r = right(scope, diagnostics);
                    match arithmetic(op, &l, &r) {
                        Ok(value) => value,
                        Err(()) => {
                            diagnostics.invalid_type(
                                &op.to_string(),
                                l.type_name(),
                                r.type_name(),
                                span,
                            );
                            Value::Null
                        }
                    }
                })
            }

            Expression::Comparison {
                op, left, right, ..
            } => {
                let op = *op;
                let left = self.compile(left);
                let right = self.compile(right);
                Rc::new(move |scope, diagnostics| {
                    let l = left(scope, diagnostics);
                    let r = right(scope, diagnostics);
                    let result = match op {
                        ComparisonOperator::Equal => l.equals(&r),
                        ComparisonOperator::NotEqual => l.equals(&r).map(|b| !b),
                        _ => comparison_range(op, r).and_then(|range| range.includes(&l)),
                    };
                    tri(result)
                })
            }

            Expression::Logical {
                op, left, right, ..
            } => {
                let op = *op;
                let left = self.compile(left);
                let right = self.compile(right);
                Rc::new(move |scope, diagnostics| {
                    let l = left(scope, diagnostics).as_bool();
                    let r = right(scope, diagnostics).as_bool();
                    match op {
                        LogicalOperator::And => tri(three_valued_and(l, r)),
                        LogicalOperator::Or => tri(three_valued_or(l, r)),
                    }
                })
            }

            Expression::Between {
                value, low, high, ..
            } => {
                let value = self.compile(value);
                let low = self.compile(low);
                let high = self.compile(high);
                Rc::new(move |scope, diagnostics| {
                    let value = value(scope, diagnostics);
                    let low = low(scope, diagnostics);
                    let high = high(scope, diagnostics);
                    if low.is_null() || high.is_null() {
                        return Value::Null;
                    }
                    let above = Range::greater_than(low, true).includes(&value);
                    let below = Range::less_than(high, true).includes(&value);
                    tri(three_valued_and(above, below))
                })
            }

            Expression::In { value, tests, .. } => {
                let value = self.compile(value);
                let tests: Vec<CompiledTest> = tests.iter().map(|t| self.compile_test(t)).collect();
                Rc::new(move |scope, diagnostics| {
                    let input = value(scope, diagnostics);
                    tri(match_any(&tests, &input, scope, diagnostics))
                })
            }

            Expression::InstanceOf {
                value, type_ref, ..
            } => {
                let value = self.compile(value);
                let type_ref = type_ref.clone();
                Rc::new(move |scope, diagnostics| {
                    Value::Boolean(type_ref.matches(&value(scope, diagnostics)))
                })
            }

            Expression::If {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                let condition = self.compile(condition);
                let then_expr = self.compile(then_expr);
                let else_expr = else_expr.as_ref().map(|e| self.compile(e));
                Rc::new(move |scope, diagnostics| {
                    if condition(scope, diagnostics).as_bool() == Some(true) {
                        then_expr(scope, diagnostics)
                    } else {
                        match &else_expr {
                            Some(else_expr) => else_expr(scope, diagnostics),
                            None => Value::Null,
                        }
                    }
                })
            }

            Expression::For {
                iterations, body, ..
            } => {
                let iterations = self.compile_iterations(iterations);
                let body = self.compile(body);
                Rc::new(move |scope, diagnostics| {
                    let mut results = Vec::new();
                    let complete = for_each_binding(&iterations, scope, diagnostics, &mut |scope: &Scope, diagnostics: &mut Diagnostics| {
                        let scope = scope.with("partial", Value::List(results.clone()));
                        let value = body(&scope, diagnostics);
                        results.push(value);
                    });
                    if complete {
                        Value::List(results)
                    } else {
                        Value::Null
                    }
                })
            }

            Expression::Quantified {
                quantifier,
                iterations,
                condition,
                ..
            } => {
                let quantifier = *quantifier;
                let iterations = self.compile_iterations(iterations);
                let condition = self.compile(condition);
                Rc::new(move |scope, diagnostics| {
                    let mut results = Vec::new();
                    let complete = for_each_binding(&iterations, scope, diagnostics, &mut |scope: &Scope, diagnostics: &mut Diagnostics| {
                        results.push(condition(scope, diagnostics).as_bool());
                    });
                    if !complete {
                        return Value::Null;
                    }
                    let combined = match quantifier {
                        Quantifier::Some => results
                            .into_iter()
                            .fold(Some(false), three_valued_or),
                        Quantifier::Every => results
                            .into_iter()
                            .fold(Some(true), three_valued_and),
                    };
                    tri(combined)
                })
            }

            Expression::FunctionDefinition { params, body, .. } => {
                let params = params.clone();
                let body = self.compile(body);
                Rc::new(move |scope, _| {
                    let defining = scope.clone();
                    let names = params.clone();
                    let body = body.clone();
                    Value::Function(Function::closure(
                        params.clone(),
                        Rc::new(move |args, diagnostics| {
                            let bindings: Context = names.iter().cloned().zip(args).collect();
                            body(&defining.extend(bindings), diagnostics)
                        }),
                    ))
                })
            }

            Expression::Path {
                object, property, ..
            } => {
                let object = self.compile(object);
                let property = property.clone();
                Rc::new(move |scope, diagnostics| {
                    let target = object(scope, diagnostics);
                    resolve_path(&target, &property, span, diagnostics)
                })
            }

            Expression::Filter {
                object, selector, ..
            } => {
                let object = self.compile(object);
                let selector = self.compile(selector);
                Rc::new(move |scope, diagnostics| {
                    let items = match object(scope, diagnostics) {
                        Value::Null => return Value::Null,
                        Value::List(items) => items,
                        other => vec![other],
                    };
                    filter(items, &selector, scope, diagnostics)
                })
            }

            Expression::Invocation { callee, args, .. } => self.compile_invocation(callee, args, span),

            Expression::UnaryTests { tests, negated, .. } => {
                let negated = *negated;
                let tests: Vec<CompiledTest> = tests.iter().map(|t| self.compile_test(t)).collect();
                Rc::new(move |scope, diagnostics| {
                    let input = scope.lookup("?").cloned().unwrap_or(Value::Null);
                    let matched = match_any(&tests, &input, scope, diagnostics);
                    tri(if negated { matched.map(|b| !b) } else { matched })
                })
            }
        }
    }

    /// Compile a unary test matched against an input value
    fn compile_test(&self, test: &Expression) -> CompiledTest {
        match test {
            Expression::AnyInput { .. } => Rc::new(|_, _, _| Some(true)),

            Expression::UnaryComparison { op, operand, .. } => {
                let op = *op;
                let operand = self.compile(operand);
                Rc::new(move |input, scope, diagnostics| {
                    let scope = scope.with("?", input.clone());
                    let operand = operand(&scope, diagnostics);
                    match op {
                        ComparisonOperator::Equal => input.equals(&operand),
                        ComparisonOperator::NotEqual => input.equals(&operand).map(|b| !b),
                        _ => comparison_range(op, operand).and_then(|range| range.includes(input)),
                    }
                })
            }

            expr => {
                let uses_input = expr.references_input();
                let compiled = self.compile(expr);
                Rc::new(move |input, scope, diagnostics| {
                    let scope = scope.with("?", input.clone());
                    let result = compiled(&scope, diagnostics);
                    test_result_matches(&result, input, uses_input, diagnostics)
                })
            }
        }
    }

    fn compile_iterations(
        &self,
        iterations: &[Iteration],
    ) -> Rc<Vec<(String, CompiledSource)>> {
        Rc::new(
            iterations
                .iter()
                .map(|iteration| {
                    let source = match &iteration.source {
                        IterationSource::Expression(expr) => {
                            CompiledSource::Expression(self.compile(expr))
                        }
                        IterationSource::Range { start, end } => {
                            CompiledSource::Range(self.compile(start), self.compile(end))
                        }
                    };
                    (iteration.name.clone(), source)
                })
                .collect(),
        )
    }

    fn compile_callee_name(&self, name: &str) -> Compiled {
        let name = name.to_string();
        let dialect = self.dialect;
        Rc::new(move |scope, _| {
            scope.lookup(&name).cloned().unwrap_or_else(|| {
                functions::lookup(&name, dialect)
                    .map_or(Value::Null, |b| Value::Function(Function::builtin(b)))
            })
        })
    }

    fn compile_invocation(&self, callee: &Expression, args: &Arguments, span: SourceSpan) -> Compiled {
        // A bare name is resolved here so an unknown function reports
        // NO_FUNCTION_FOUND rather than NO_VARIABLE_FOUND
        let (label, callee): (String, Compiled) = match callee {
            Expression::Name { name, .. } => (name.clone(), self.compile_callee_name(name)),
            other => ("anonymous function".to_string(), self.compile(other)),
        };

        enum CompiledArgs {
            Positional(Vec<Compiled>),
            Named(Vec<(String, Compiled)>),
        }
        let args = match args {
            Arguments::Positional(args) => {
                CompiledArgs::Positional(args.iter().map(|a| self.compile(a)).collect())
            }
            Arguments::Named(args) => CompiledArgs::Named(
                args.iter()
                    .map(|(name, a)| (name.clone(), self.compile(a)))
                    .collect(),
            ),
        };

        Rc::new(move |scope, diagnostics| {
            let function = match callee(scope, diagnostics) {
                Value::Function(function) => function,
                _ => {
                    diagnostics.no_function_found(&label, span);
                    return Value::Null;
                }
            };

            let call_args = match &args {
                CompiledArgs::Positional(args) => {
                    CallArgs::Positional(args.iter().map(|a| a(scope, diagnostics)).collect())
                }
                CompiledArgs::Named(args) => CallArgs::Named(
                    args.iter()
                        .map(|(name, a)| (name.clone(), a(scope, diagnostics)))
                        .collect(),
                ),
            };

            match function.invoke(call_args, diagnostics) {
                Ok(value) => value,
                Err(error) => {
                    diagnostics.invocation_failure(&label, &error.0, span);
                    Value::Null
                }
            }
        })
    }
}

fn constant(value: Value) -> Compiled {
    Rc::new(move |_, _| value.clone())
}

fn tri(value: Option<bool>) -> Value {
    value.map_or(Value::Null, Value::Boolean)
}

fn three_valued_and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn three_valued_or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// `< x`, `<= x`, `> x`, `>= x` as unbounded ranges
fn comparison_range(op: ComparisonOperator, operand: Value) -> Option<Range> {
    match op {
        ComparisonOperator::LessThan => Some(Range::less_than(operand, false)),
        ComparisonOperator::LessThanOrEqual => Some(Range::less_than(operand, true)),
        ComparisonOperator::GreaterThan => Some(Range::greater_than(operand, false)),
        ComparisonOperator::GreaterThanOrEqual => Some(Range::greater_than(operand, true)),
        ComparisonOperator::Equal | ComparisonOperator::NotEqual => None,
    }
}

/// Any test true ⇒ true; else any unknown ⇒ null; else false
fn match_any(
    tests: &[CompiledTest],
    input: &Value,
    scope: &Scope,
    diagnostics: &mut Diagnostics,
) -> Option<bool> {
    tests
        .iter()
        .map(|test| test(input, scope, diagnostics))
        .fold(Some(false), three_valued_or)
}

/// Interpret the value of a test expression against the input
fn test_result_matches(
    result: &Value,
    input: &Value,
    uses_input: bool,
    diagnostics: &mut Diagnostics,
) -> Option<bool> {
    match result {
        Value::Range(range) => range.includes(input),
        Value::Function(function) => function.call(vec![input.clone()], diagnostics).as_bool(),
        Value::List(items) => {
            if input.equals(result) == Some(true) {
                return Some(true);
            }
            items
                .iter()
                .map(|item| match item {
                    Value::Range(range) => range.includes(input),
                    other => input.equals(other),
                })
                .fold(Some(false), three_valued_or)
        }
        Value::Boolean(b) if uses_input => Some(*b),
        other => input.equals(other),
    }
}

/// Arithmetic on two operands; `Err` when their types cannot be combined
fn arithmetic(op: ArithmeticOperator, left: &Value, right: &Value) -> Result<Value, ()> {
    use ArithmeticOperator::*;

    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    let finite = |n: f64| {
        if n.is_finite() {
            Value::Number(n)
        } else {
            Value::Null
        }
    };
    let date_time = |v: &Value| match v {
        Value::Date(d) => Some(DateTime::from_date(*d)),
        Value::DateTime(dt) => Some(*dt),
        _ => None,
    };

    let value = match (op, left, right) {
        (_, Value::Number(a), Value::Number(b)) => match op {
            Add => finite(a + b),
            Subtract => finite(a - b),
            Multiply => finite(a * b),
            Divide if *b == 0.0 => Value::Null,
            Divide => finite(a / b),
            Power => finite(a.powf(*b)),
        },

        (Add, Value::String(a), Value::String(b)) => Value::String(format!("{}{}", a, b)),
        (_, Value::String(_), Value::String(_)) => Value::Null,

        (Add, Value::Duration(a), Value::Duration(b)) => a.plus(b).map_or(Value::Null, Value::Duration),
        (Subtract, Value::Duration(a), Value::Duration(b)) => a.minus(b).map_or(Value::Null, Value::Duration),
        (Divide, Value::Duration(a), Value::Duration(b)) => a.ratio(b).map_or(Value::Null, finite),
        (_, Value::Duration(_), Value::Duration(_)) => Value::Null,

        (Multiply, Value::Duration(d), Value::Number(n))
        | (Multiply, Value::Number(n), Value::Duration(d)) => {
            d.scale(*n).map_or(Value::Null, Value::Duration)
        }
        (Divide, Value::Duration(d), Value::Number(n)) => {
            if *n == 0.0 {
                Value::Null
            } else {
                d.scale(1.0 / n).map_or(Value::Null, Value::Duration)
            }
        }

        (Add, Value::Date(date), Value::Duration(d)) | (Add, Value::Duration(d), Value::Date(date)) => {
            temporal::add_to_date(*date, d).map_or(Value::Null, Value::Date)
        }
        (Subtract, Value::Date(date), Value::Duration(d)) => {
            temporal::add_to_date(*date, &d.negate()).map_or(Value::Null, Value::Date)
        }

        (Add, Value::DateTime(dt), Value::Duration(d)) | (Add, Value::Duration(d), Value::DateTime(dt)) => {
            dt.add(d).map_or(Value::Null, Value::DateTime)
        }
        (Subtract, Value::DateTime(dt), Value::Duration(d)) => {
            dt.add(&d.negate()).map_or(Value::Null, Value::DateTime)
        }

        (Add, Value::Time(t), Value::Duration(d)) | (Add, Value::Duration(d), Value::Time(t)) => {
            Value::Time(t.add(d))
        }
        (Subtract, Value::Time(t), Value::Duration(d)) => Value::Time(t.add(&d.negate())),
        (Subtract, Value::Time(a), Value::Time(b)) => Value::Duration(a.since(b)),
        (_, Value::Time(_), Value::Time(_)) => Value::Null,

        (_, Value::Date(_) | Value::DateTime(_), Value::Date(_) | Value::DateTime(_)) => {
            match (op, date_time(left), date_time(right)) {
                (Subtract, Some(a), Some(b)) => Value::Duration(a.since(&b)),
                _ => Value::Null,
            }
        }

        (_, Value::Date(_) | Value::DateTime(_) | Value::Time(_), Value::Duration(_))
        | (_, Value::Duration(_), Value::Date(_) | Value::DateTime(_) | Value::Time(_)) => {
            Value::Null
        }

        _ => return Err(()),
    };

    Ok(value)
}

/// Property access; distributes over lists
fn resolve_path(target: &Value, property: &str, span: SourceSpan, diagnostics: &mut Diagnostics) -> Value {
    match target {
        Value::Null => Value::Null,
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| resolve_path(item, property, span, diagnostics))
                .collect(),
        ),
        Value::Context(context) => match context.get(property) {
            Some(value) => value.clone(),
            None => {
                diagnostics.no_context_entry_found(property, span);
                Value::Null
            }
        },
        other => match other.property(property) {
            Some(value) => value,
            None => {
                diagnostics.no_property_found(property, other.type_name(), span);
                Value::Null
            }
        },
    }
}

/// Scope for evaluating a filter selector against one element
fn element_scope(scope: &Scope, item: &Value) -> Scope {
    let mut bindings = match item {
        Value::Context(fields) => fields.clone(),
        _ => Context::new(),
    };
    bindings.insert("item".to_string(), item.clone());
    scope.extend(bindings)
}

/// Apply a filter selector to a list
///
/// The selector is first evaluated once to decide how it applies: a number
/// indexes and a string keeps equal elements. Anything else, booleans
/// included, is a per-element predicate, so a constant `true` keeps the
/// whole list and `false` none of it.
fn filter(
    items: Vec<Value>,
    selector: &Compiled,
    scope: &Scope,
    diagnostics: &mut Diagnostics,
) -> Value {
    let mut probe_diagnostics = Diagnostics::new();
    let probe = match items.first() {
        Some(first) => selector(&element_scope(scope, first), &mut probe_diagnostics),
        None => selector(scope, &mut probe_diagnostics),
    };

    match probe {
        Value::Number(n) => {
            diagnostics.append(probe_diagnostics);
            if n.fract() != 0.0 {
                return Value::Null;
            }
            let len = items.len() as i64;
            let index = n as i64;
            let position = match index {
                i if i > 0 => i - 1,
                i if i < 0 => len + i,
                _ => return Value::Null,
            };
            if (0..len).contains(&position) {
                items[position as usize].clone()
            } else {
                Value::Null
            }
        }
        Value::String(s) => {
            diagnostics.append(probe_diagnostics);
            let wanted = Value::String(s);
            Value::List(
                items
                    .into_iter()
                    .filter(|item| item.equals(&wanted) == Some(true))
                    .collect(),
            )
        }
        _ => Value::List(
            items
                .into_iter()
                .filter(|item| {
                    match selector(&element_scope(scope, item), diagnostics) {
                        Value::Boolean(keep) => keep,
                        Value::Range(range) => range.includes(item) == Some(true),
                        _ => false,
                    }
                })
                .collect(),
        ),
    }
}

/// Run `body` once per binding of the cartesian product of `iterations`
///
/// Returns false, without finishing, when a source is not iterable.
fn for_each_binding(
    iterations: &[(String, CompiledSource)],
    scope: &Scope,
    diagnostics: &mut Diagnostics,
    body: &mut dyn FnMut(&Scope, &mut Diagnostics),
) -> bool {
    let Some(((name, source), rest)) = iterations.split_first() else {
        body(scope, diagnostics);
        return true;
    };

    let items = match source {
        CompiledSource::Expression(expr) => match expr(scope, diagnostics) {
            Value::Null => None,
            Value::List(items) => Some(items),
            Value::Range(range) => range.enumerate(),
            other => Some(vec![other]),
        },
        CompiledSource::Range(start, end) => {
            let start = start(scope, diagnostics);
            let end = end(scope, diagnostics);
            match (&start, &end) {
                (Value::Number(_), Value::Number(_)) => {
                    Range::new(start, end, true, true).enumerate()
                }
                _ => None,
            }
        }
    };

    let Some(items) = items else {
        return false;
    };

    for item in items {
        let inner = scope.with(name, item);
        if !for_each_binding(rest, &inner, diagnostics, body) {
            return false;
        }
    }
    true
}

/// Value of an `@"..."` literal: date-time, date, time or duration
fn parse_temporal_literal(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.starts_with('P') || trimmed.starts_with("-P") {
        return temporal::parse_duration(trimmed).map_or(Value::Null, Value::Duration);
    }
    if trimmed.contains('T') {
        return temporal::parse_date_time(trimmed).map_or(Value::Null, Value::DateTime);
    }
    if let Some(date) = temporal::parse_date(trimmed) {
        return Value::Date(date);
    }
    temporal::parse_time(trimmed).map_or(Value::Null, Value::Time)
}
