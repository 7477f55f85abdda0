//! Range values and interval algebra
//!
//! A range has independently open or closed endpoints; a `null` endpoint
//! is unbounded on that side. Number ranges and single-letter string
//! ranges are enumerable and may be descending (`5..1`); duration and
//! temporal ranges only support membership.

use std::cmp::Ordering;
use std::fmt;

use crate::value::{format_number, nested_repr, Value};

/// Letters of an enumerable string range, in range order
const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// An interval over an ordered domain
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub start: Value,
    pub end: Value,
    pub start_included: bool,
    pub end_included: bool,
}

/// What a range ranges over, derived from its bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Letters,
    Strings,
    Numbers,
    Durations,
    Temporal,
    Unknown,
}

impl Range {
    /// Create a range; the domain is derived from the shared type of the bounds
    pub fn new(start: Value, end: Value, start_included: bool, end_included: bool) -> Self {
        Self {
            start,
            end,
            start_included,
            end_included,
        }
    }

    /// `< x`, `<= x`, `> x`, `>= x` as half-bounded ranges
    pub fn less_than(end: Value, inclusive: bool) -> Self {
        Self::new(Value::Null, end, false, inclusive)
    }

    pub fn greater_than(start: Value, inclusive: bool) -> Self {
        Self::new(start, Value::Null, inclusive, false)
    }

    fn domain(&self) -> Domain {
        let bound_domain = |v: &Value| match v {
            Value::String(s) if letter_index(s).is_some() => Some(Domain::Letters),
            Value::String(_) => Some(Domain::Strings),
            Value::Number(_) => Some(Domain::Numbers),
            Value::Duration(_) => Some(Domain::Durations),
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) => Some(Domain::Temporal),
            Value::Null => None,
            _ => Some(Domain::Unknown),
        };
        match (bound_domain(&self.start), bound_domain(&self.end)) {
            (Some(a), Some(b)) if a == b => a,
            (Some(Domain::Letters), Some(Domain::Strings))
            | (Some(Domain::Strings), Some(Domain::Letters)) => Domain::Strings,
            (Some(a), None) | (None, Some(a)) => match a {
                Domain::Letters => Domain::Strings,
                other => other,
            },
            (Some(_), Some(_)) | (None, None) => Domain::Unknown,
        }
    }

    /// Whether the bounds run downwards (`5..1`, `"d".."a"`)
    fn is_descending(&self) -> bool {
        match self.domain() {
            Domain::Numbers | Domain::Letters => {
                compare_points(&self.start, &self.end) == Some(Ordering::Greater)
            }
            _ => false,
        }
    }

    /// Membership test
    ///
    /// `None` when the range is fully unknown (both bounds `null`), when the
    /// value is `null`, or when the value is not comparable with the bounds.
    pub fn includes(&self, value: &Value) -> Option<bool> {
        if self.start.is_null() && self.end.is_null() {
            return None;
        }
        if value.is_null() {
            return None;
        }
        if let Value::Range(other) = value {
            return range_includes_range(self, other);
        }

        let (low, low_included, high, high_included) = if self.is_descending() {
            (&self.end, self.end_included, &self.start, self.start_included)
        } else {
            (&self.start, self.start_included, &self.end, self.end_included)
        };

        let above_low = if low.is_null() {
            true
        } else {
            match compare_points(value, low)? {
                Ordering::Greater => true,
                Ordering::Equal => low_included,
                Ordering::Less => false,
            }
        };
        let below_high = if high.is_null() {
            true
        } else {
            match compare_points(value, high)? {
                Ordering::Less => true,
                Ordering::Equal => high_included,
                Ordering::Greater => false,
            }
        };

        Some(above_low && below_high)
    }

    /// Enumerate a bounded number or single-letter range, honoring direction
    /// and endpoint inclusivity
    pub fn enumerate(&self) -> Option<Vec<Value>> {
        match self.domain() {
            Domain::Numbers => {
                let start = self.start.as_number()?;
                let end = self.end.as_number()?;
                let step = if start > end { -1.0 } else { 1.0 };
                let mut current = if self.start_included { start } else { start + step };
                let mut items = Vec::new();
                loop {
                    let past_end = if step > 0.0 { current > end } else { current < end };
                    let at_end = current == end;
                    if past_end || (at_end && !self.end_included) {
                        break;
                    }
                    items.push(Value::Number(current));
                    let next = current + step;
                    // Past 2^53 a unit step is lost to rounding
                    if next == current {
                        return None;
                    }
                    current = next;
                }
                Some(items)
            }
            Domain::Letters => {
                let start = letter_index(self.start.as_str()?)? as i64;
                let end = letter_index(self.end.as_str()?)? as i64;
                let step: i64 = if start > end { -1 } else { 1 };
                let mut current = if self.start_included { start } else { start + step };
                let mut items = Vec::new();
                loop {
                    let past_end = if step > 0 { current > end } else { current < end };
                    if past_end || (current == end && !self.end_included) {
                        break;
                    }
                    let letter = LETTERS.chars().nth(current as usize)?;
                    items.push(Value::String(letter.to_string()));
                    current += step;
                }
                Some(items)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |v: &Value| match v {
            Value::Null => "null".to_string(),
            Value::Number(n) => format_number(*n),
            other => nested_repr(other),
        };
        match (self.start.is_null(), self.end.is_null()) {
            (true, false) => {
                let op = if self.end_included { "<=" } else { "<" };
                write!(f, "{} {}", op, bound(&self.end))
            }
            (false, true) => {
                let op = if self.start_included { ">=" } else { ">" };
                write!(f, "{} {}", op, bound(&self.start))
            }
            _ => write!(
                f,
                "{}{}..{}{}",
                if self.start_included { '[' } else { '(' },
                bound(&self.start),
                bound(&self.end),
                if self.end_included { ']' } else { ')' }
            ),
        }
    }
}

fn letter_index(s: &str) -> Option<usize> {
    let mut chars = s.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    LETTERS.find(c)
}

/// Point ordering used by range algebra; single letters follow the range alphabet
fn compare_points(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        if let (Some(i), Some(j)) = (letter_index(x), letter_index(y)) {
            return Some(i.cmp(&j));
        }
    }
    a.compare(b)
}

// =============================================================================
// INTERVAL RELATIONS
// =============================================================================

/// Range endpoint with unbounded sides mapped to infinities
#[derive(Debug, Clone, Copy)]
enum Bound<'a> {
    NegInf,
    At(&'a Value),
    PosInf,
}

fn lower(r: &Range) -> Bound<'_> {
    if r.start.is_null() {
        Bound::NegInf
    } else {
        Bound::At(&r.start)
    }
}

fn upper(r: &Range) -> Bound<'_> {
    if r.end.is_null() {
        Bound::PosInf
    } else {
        Bound::At(&r.end)
    }
}

fn cmp(a: Bound<'_>, b: Bound<'_>) -> Option<Ordering> {
    match (a, b) {
        (Bound::NegInf, Bound::NegInf) | (Bound::PosInf, Bound::PosInf) => Some(Ordering::Equal),
        (Bound::NegInf, _) | (_, Bound::PosInf) => Some(Ordering::Less),
        (_, Bound::NegInf) | (Bound::PosInf, _) => Some(Ordering::Greater),
        (Bound::At(x), Bound::At(y)) => compare_points(x, y),
    }
}

fn lt(a: Bound<'_>, b: Bound<'_>) -> Option<bool> {
    cmp(a, b).map(|o| o == Ordering::Less)
}

fn gt(a: Bound<'_>, b: Bound<'_>) -> Option<bool> {
    cmp(a, b).map(|o| o == Ordering::Greater)
}

fn eq(a: Bound<'_>, b: Bound<'_>) -> Option<bool> {
    cmp(a, b).map(|o| o == Ordering::Equal)
}

/// Operands of a relation: points or ranges
enum Operand<'a> {
    Point(&'a Value),
    Range(&'a Range),
}

fn operand(value: &Value) -> Option<Operand<'_>> {
    match value {
        Value::Null => None,
        Value::Range(r) => Some(Operand::Range(r)),
        other => Some(Operand::Point(other)),
    }
}

fn range_includes_range(r1: &Range, r2: &Range) -> Option<bool> {
    let starts_ok = lt(lower(r1), lower(r2))?
        || (eq(lower(r1), lower(r2))? && (r1.start_included || !r2.start_included));
    let ends_ok = gt(upper(r1), upper(r2))?
        || (eq(upper(r1), upper(r2))? && (r1.end_included || !r2.end_included));
    Some(starts_ok && ends_ok)
}

/// `before(a, b)`: `a` lies entirely before `b`
pub fn before(a: &Value, b: &Value) -> Option<bool> {
    match (operand(a)?, operand(b)?) {
        (Operand::Point(p1), Operand::Point(p2)) => lt(Bound::At(p1), Bound::At(p2)),
        (Operand::Point(p), Operand::Range(r)) => {
            if r.start_included {
                lt(Bound::At(p), lower(r))
            } else {
                Some(!gt(Bound::At(p), lower(r))?)
            }
        }
        (Operand::Range(r), Operand::Point(p)) => {
            if r.end_included {
                lt(upper(r), Bound::At(p))
            } else {
                Some(!gt(upper(r), Bound::At(p))?)
            }
        }
        (Operand::Range(r1), Operand::Range(r2)) => Some(
            lt(upper(r1), lower(r2))?
                || ((!r1.end_included || !r2.start_included) && eq(upper(r1), lower(r2))?),
        ),
    }
}

/// `after(a, b)`: `a` lies entirely after `b`
pub fn after(a: &Value, b: &Value) -> Option<bool> {
    before(b, a)
}

/// `meets(r1, r2)`: `r1` ends exactly where `r2` starts, both closed there
pub fn meets(a: &Value, b: &Value) -> Option<bool> {
    let (r1, r2) = (a.as_range()?, b.as_range()?);
    Some(r1.end_included && r2.start_included && eq(upper(r1), lower(r2))?)
}

pub fn met_by(a: &Value, b: &Value) -> Option<bool> {
    meets(b, a)
}

/// `overlaps(r1, r2)`: the ranges share at least one point
pub fn overlaps(a: &Value, b: &Value) -> Option<bool> {
    let (r1, r2) = (a.as_range()?, b.as_range()?);
    let end_after_start = gt(upper(r1), lower(r2))?
        || (eq(upper(r1), lower(r2))? && r1.end_included && r2.start_included);
    let start_before_end = lt(lower(r1), upper(r2))?
        || (eq(lower(r1), upper(r2))? && r1.start_included && r2.end_included);
    Some(end_after_start && start_before_end)
}

/// `overlaps before(r1, r2)`: `r1` starts first and ends inside `r2`
pub fn overlaps_before(a: &Value, b: &Value) -> Option<bool> {
    let (r1, r2) = (a.as_range()?, b.as_range()?);
    let starts_first = lt(lower(r1), lower(r2))?
        || (eq(lower(r1), lower(r2))? && r1.start_included && !r2.start_included);
    let reaches_r2 = gt(upper(r1), lower(r2))?
        || (eq(upper(r1), lower(r2))? && r1.end_included && r2.start_included);
    let ends_inside = lt(upper(r1), upper(r2))?
        || (eq(upper(r1), upper(r2))? && (!r1.end_included || r2.end_included));
    Some(starts_first && reaches_r2 && ends_inside)
}

pub fn overlaps_after(a: &Value, b: &Value) -> Option<bool> {
    overlaps_before(b, a)
}

/// `finishes(a, r)`: `a` (point or range) ends exactly where `r` ends
pub fn finishes(a: &Value, b: &Value) -> Option<bool> {
    let r2 = b.as_range()?;
    match operand(a)? {
        Operand::Point(p) => Some(r2.end_included && eq(Bound::At(p), upper(r2))?),
        Operand::Range(r1) => Some(
            r1.end_included == r2.end_included
                && eq(upper(r1), upper(r2))?
                && (gt(lower(r1), lower(r2))?
                    || (eq(lower(r1), lower(r2))? && (!r1.start_included || r2.start_included))),
        ),
    }
}

pub fn finished_by(a: &Value, b: &Value) -> Option<bool> {
    finishes(b, a)
}

/// `includes(r, a)`: `a` (point or range) lies within `r`
pub fn includes(a: &Value, b: &Value) -> Option<bool> {
    let r1 = a.as_range()?;
    match operand(b)? {
        Operand::Point(p) => r1.includes(p),
        Operand::Range(r2) => range_includes_range(r1, r2),
    }
}

pub fn during(a: &Value, b: &Value) -> Option<bool> {
    includes(b, a)
}

/// `starts(a, r)`: `a` (point or range) starts exactly where `r` starts
pub fn starts(a: &Value, b: &Value) -> Option<bool> {
    let r2 = b.as_range()?;
    match operand(a)? {
        Operand::Point(p) => Some(r2.start_included && eq(Bound::At(p), lower(r2))?),
        Operand::Range(r1) => Some(
            r1.start_included == r2.start_included
                && eq(lower(r1), lower(r2))?
                && (lt(upper(r1), upper(r2))?
                    || (eq(upper(r1), upper(r2))? && (!r1.end_included || r2.end_included))),
        ),
    }
}

pub fn started_by(a: &Value, b: &Value) -> Option<bool> {
    starts(b, a)
}

/// `coincides(a, b)`: same point, or same range with the same inclusivity
pub fn coincides(a: &Value, b: &Value) -> Option<bool> {
    match (operand(a)?, operand(b)?) {
        (Operand::Point(p1), Operand::Point(p2)) => eq(Bound::At(p1), Bound::At(p2)),
        (Operand::Range(r1), Operand::Range(r2)) => Some(
            r1.start_included == r2.start_included
                && r1.end_included == r2.end_included
                && eq(lower(r1), lower(r2))?
                && eq(upper(r1), upper(r2))?,
        ),
        _ => None,
    }
}

impl Value {
    pub fn as_range(&self) -> Option<&Range> {
        match self {
            Value::Range(r) => Some(r),
            _ => None,
        }
    }
}
