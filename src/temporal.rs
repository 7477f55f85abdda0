//! Temporal helpers for FEEL - construction, classification, arithmetic
//!
//! Dates are plain `chrono::NaiveDate`s. Times and date-times carry an
//! optional UTC offset; values without one are "local" and are compared as
//! if they were UTC. Durations keep a calendar part (months) and an exact
//! part (milliseconds) side by side.

use chrono::{
    DateTime as ChronoDateTime, Datelike, Duration as ChronoDuration, FixedOffset, Months,
    NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike, Utc,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Seconds in a "casual" month, used when durations of both kinds are compared
const SECONDS_PER_MONTH: f64 = 30.0 * 86_400.0;

lazy_static! {
    static ref DATE_RE: Regex = Regex::new(r"^(-?\d{4,9})-(\d{2})-(\d{2})$").unwrap();
    static ref TIME_RE: Regex =
        Regex::new(r"^(\d{2}):(\d{2})(?::(\d{2})(\.\d+)?)?(Z|[+-]\d{2}:\d{2}|@[A-Za-z0-9_/+\-]+)?$")
            .unwrap();
    static ref DURATION_RE: Regex = Regex::new(
        r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$"
    )
    .unwrap();
}

/// Time of day with an optional UTC offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Time {
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

/// Date and time of day with an optional UTC offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateTime {
    pub datetime: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

/// FEEL duration
///
/// `months` holds the years-and-months part, `millis` the days-and-time part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    pub months: i64,
    pub millis: i64,
}

/// The two FEEL duration types, plus durations that mix both parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationKind {
    YearsAndMonths,
    DaysAndTime,
    Mixed,
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(s.trim())?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse `hh:mm:ss[.fff][zone]`
pub fn parse_time(s: &str) -> Option<Time> {
    let caps = TIME_RE.captures(s.trim())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let nanos = caps.get(4).map_or(Some(0), |m| fraction_to_nanos(m.as_str()))?;

    // 24:00:00 is midnight of the following day; on a time it wraps to 00:00:00
    let time = if hour == 24 && minute == 0 && second == 0 && nanos == 0 {
        NaiveTime::MIN
    } else {
        NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?
    };

    let offset = match caps.get(5) {
        Some(zone) => Some(parse_zone(zone.as_str())?),
        None => None,
    };

    Some(Time { time, offset })
}

/// Parse `YYYY-MM-DDThh:mm:ss[.fff][zone]`; a bare date means midnight
pub fn parse_date_time(s: &str) -> Option<DateTime> {
    let s = s.trim();
    match s.split_once('T') {
        Some((date, time)) => {
            let date = parse_date(date)?;
            let end_of_day = time.starts_with("24:00:00");
            let time = parse_time(time)?;
            let date = if end_of_day { date.succ_opt()? } else { date };
            Some(DateTime {
                datetime: date.and_time(time.time),
                offset: time.offset,
            })
        }
        None => Some(DateTime {
            datetime: parse_date(s)?.and_time(NaiveTime::MIN),
            offset: None,
        }),
    }
}

/// Parse an ISO 8601 duration: `P1Y2M`, `P3DT4H5M6.5S`, `-PT1H`, `P2W`
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let caps = DURATION_RE.captures(s)?;

    // "P" and "PT" alone are not durations
    if (2..=8).all(|i| caps.get(i).is_none()) || s.ends_with('T') {
        return None;
    }

    let int = |i: usize| -> Option<i64> { caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok()) };
    let years = int(2)?;
    let months = int(3)?;
    let weeks = int(4)?;
    let days = int(5)?;
    let hours = int(6)?;
    let minutes = int(7)?;
    let seconds: f64 = caps.get(8).map_or(Some(0.0), |m| m.as_str().parse().ok())?;

    let second_millis = (seconds * 1000.0).round();
    if second_millis >= i64::MAX as f64 {
        return None;
    }

    let millis = weeks
        .checked_mul(7)?
        .checked_add(days)?
        .checked_mul(MILLIS_PER_DAY)?
        .checked_add(hours.checked_mul(MILLIS_PER_HOUR)?)?
        .checked_add(minutes.checked_mul(MILLIS_PER_MINUTE)?)?
        .checked_add(second_millis as i64)?;
    let months = years.checked_mul(12)?.checked_add(months)?;

    // Components are non-negative here, so negation cannot overflow
    let sign = if caps.get(1).is_some() { -1 } else { 1 };
    Some(Duration {
        months: sign * months,
        millis: sign * millis,
    })
}

/// Parse a zone suffix: `Z`, `+01:00`, `-05:30`, `@UTC`, `@Etc/UTC`
///
/// Only fixed offsets and the UTC aliases are understood; other IANA zone
/// ids are rejected.
pub fn parse_zone(zone: &str) -> Option<FixedOffset> {
    match zone {
        "Z" | "@Z" | "@UTC" | "@Etc/UTC" | "@GMT" | "@Etc/GMT" | "@Zulu" => FixedOffset::east_opt(0),
        _ => {
            let sign = match zone.chars().next()? {
                '+' => 1,
                '-' => -1,
                _ => return None,
            };
            let (hours, minutes) = zone[1..].split_once(':')?;
            let hours: i32 = hours.parse().ok()?;
            let minutes: i32 = minutes.parse().ok()?;
            if hours > 18 || minutes > 59 {
                return None;
            }
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        }
    }
}

fn fraction_to_nanos(fraction: &str) -> Option<u32> {
    let digits = fraction.trim_start_matches('.');
    let padded: String = digits.chars().chain(std::iter::repeat('0')).take(9).collect();
    padded.parse().ok()
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

/// Build a date from year, month and day numbers
pub fn date_from_parts(year: f64, month: f64, day: f64) -> Option<NaiveDate> {
    if year.fract() != 0.0 || month.fract() != 0.0 || day.fract() != 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
}

/// Build a time from hour, minute, second (may be fractional) and an offset duration
pub fn time_from_parts(hour: f64, minute: f64, second: f64, offset: Option<&Duration>) -> Option<Time> {
    if hour.fract() != 0.0 || minute.fract() != 0.0 || second < 0.0 {
        return None;
    }
    let nanos = (second.fract() * 1e9).round() as u32;
    let time = NaiveTime::from_hms_nano_opt(hour as u32, minute as u32, second.trunc() as u32, nanos)?;
    let offset = match offset {
        Some(duration) if duration.months == 0 => {
            Some(FixedOffset::east_opt((duration.millis / MILLIS_PER_SECOND) as i32)?)
        }
        Some(_) => return None,
        None => None,
    };
    Some(Time { time, offset })
}

impl Time {
    /// Seconds since midnight UTC, on the epoch day (may fall outside 0..86400)
    pub fn utc_seconds(&self) -> f64 {
        let local = f64::from(self.time.num_seconds_from_midnight())
            + f64::from(self.time.nanosecond()) / 1e9;
        let offset = self.offset.map_or(0, |o| o.local_minus_utc());
        local - f64::from(offset)
    }

    /// Add a duration, wrapping around midnight; the calendar part is ignored
    pub fn add(&self, duration: &Duration) -> Time {
        let (time, _) = self
            .time
            .overflowing_add_signed(ChronoDuration::milliseconds(duration.millis % MILLIS_PER_DAY));
        Time {
            time,
            offset: self.offset,
        }
    }

    /// Exact difference `self - other`
    pub fn since(&self, other: &Time) -> Duration {
        Duration::from_millis(((self.utc_seconds() - other.utc_seconds()) * 1000.0).round() as i64)
    }
}

impl DateTime {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            datetime: date.and_time(NaiveTime::MIN),
            offset: None,
        }
    }

    pub fn from_date_and_time(date: NaiveDate, time: &Time) -> Self {
        Self {
            datetime: date.and_time(time.time),
            offset: time.offset,
        }
    }

    /// Absolute instant; local date-times are taken to be UTC
    pub fn instant(&self) -> ChronoDateTime<Utc> {
        let offset = self.offset.unwrap_or_else(|| Utc.fix());
        match offset.from_local_datetime(&self.datetime).single() {
            Some(dt) => dt.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&self.datetime),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    pub fn time(&self) -> Time {
        Time {
            time: self.datetime.time(),
            offset: self.offset,
        }
    }

    /// Calendar day of the instant in UTC
    pub fn utc_date(&self) -> NaiveDate {
        self.instant().date_naive()
    }

    /// Add (or subtract, for a negated duration) calendar months then exact time
    pub fn add(&self, duration: &Duration) -> Option<DateTime> {
        let shifted = add_months(self.datetime.date(), duration.months)?.and_time(self.datetime.time());
        let datetime = shifted.checked_add_signed(ChronoDuration::try_milliseconds(duration.millis)?)?;
        Some(DateTime {
            datetime,
            offset: self.offset,
        })
    }

    /// Exact difference `self - other`
    pub fn since(&self, other: &DateTime) -> Duration {
        Duration::from_millis((self.instant() - other.instant()).num_milliseconds())
    }
}

/// Add a duration to a date; the time part is applied and the day truncated
pub fn add_to_date(date: NaiveDate, duration: &Duration) -> Option<NaiveDate> {
    DateTime::from_date(date).add(duration).map(|dt| dt.date())
}

fn add_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

/// Whole months between two dates (`years and months duration`)
pub fn months_between(from: NaiveDate, to: NaiveDate) -> Duration {
    let mut months = i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month());
    if months > 0 && to.day() < from.day() {
        months -= 1;
    } else if months < 0 && to.day() > from.day() {
        months += 1;
    }
    Duration { months, millis: 0 }
}

// =============================================================================
// DURATIONS
// =============================================================================

impl Duration {
    pub fn from_millis(millis: i64) -> Self {
        Self { months: 0, millis }
    }

    pub fn from_months(months: i64) -> Self {
        Self { months, millis: 0 }
    }

    pub fn kind(&self) -> DurationKind {
        match (self.months != 0, self.millis != 0) {
            (true, false) => DurationKind::YearsAndMonths,
            (true, true) => DurationKind::Mixed,
            (false, _) => DurationKind::DaysAndTime,
        }
    }

    /// Components are kept above `i64::MIN` so that `negate` never overflows
    fn checked(months: i64, millis: i64) -> Option<Self> {
        if months == i64::MIN || millis == i64::MIN {
            return None;
        }
        Some(Self { months, millis })
    }

    pub fn negate(&self) -> Self {
        Self {
            months: -self.months,
            millis: -self.millis,
        }
    }

    /// Component-wise sum; `None` when a component leaves the representable range
    pub fn plus(&self, other: &Duration) -> Option<Self> {
        Self::checked(
            self.months.checked_add(other.months)?,
            self.millis.checked_add(other.millis)?,
        )
    }

    /// `self - other`
    pub fn minus(&self, other: &Duration) -> Option<Self> {
        self.plus(&other.negate())
    }

    pub fn scale(&self, factor: f64) -> Option<Self> {
        let months = self.months as f64 * factor;
        let millis = self.millis as f64 * factor;
        if !months.is_finite() || !millis.is_finite() {
            return None;
        }
        // Casting saturates, so anything at or past 2^63 is rejected here
        if months.abs() >= i64::MAX as f64 || millis.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self {
            months: months.round() as i64,
            millis: millis.round() as i64,
        })
    }

    /// Length in seconds, counting a month as 30 days
    pub fn approx_seconds(&self) -> f64 {
        self.months as f64 * SECONDS_PER_MONTH + self.millis as f64 / 1000.0
    }

    /// Ratio of two durations; years-and-months durations divide by months
    pub fn ratio(&self, other: &Duration) -> Option<f64> {
        if self.kind() == DurationKind::YearsAndMonths && other.kind() == DurationKind::YearsAndMonths {
            return Some(self.months as f64 / other.months as f64);
        }
        let divisor = other.approx_seconds();
        if divisor == 0.0 {
            None
        } else {
            Some(self.approx_seconds() / divisor)
        }
    }

    /// FEEL duration equality
    ///
    /// Differences larger than 180 days are compared in whole months,
    /// smaller ones in whole seconds.
    pub fn feel_eq(&self, other: &Duration) -> bool {
        let diff = self.approx_seconds() - other.approx_seconds();
        if diff.abs() > 180.0 * 86_400.0 {
            (diff / SECONDS_PER_MONTH).trunc() == 0.0
        } else {
            diff.trunc() == 0.0
        }
    }

    pub fn compare(&self, other: &Duration) -> Option<Ordering> {
        if self.feel_eq(other) {
            return Some(Ordering::Equal);
        }
        self.approx_seconds().partial_cmp(&other.approx_seconds())
    }

    pub fn years(&self) -> i64 {
        self.months / 12
    }

    pub fn months_part(&self) -> i64 {
        self.months % 12
    }

    pub fn days(&self) -> i64 {
        self.millis / MILLIS_PER_DAY
    }

    pub fn hours(&self) -> i64 {
        (self.millis % MILLIS_PER_DAY) / MILLIS_PER_HOUR
    }

    pub fn minutes(&self) -> i64 {
        (self.millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE
    }

    pub fn seconds(&self) -> f64 {
        (self.millis % MILLIS_PER_MINUTE) as f64 / 1000.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.months == 0 && self.millis == 0 {
            return write!(f, "PT0S");
        }

        let negative = self.months < 0 || (self.months == 0 && self.millis < 0);
        let abs = if negative { self.negate() } else { *self };

        let mut out = String::from(if negative { "-P" } else { "P" });
        if abs.years() != 0 {
            out.push_str(&format!("{}Y", abs.years()));
        }
        if abs.months_part() != 0 {
            out.push_str(&format!("{}M", abs.months_part()));
        }
        if abs.days() != 0 {
            out.push_str(&format!("{}D", abs.days()));
        }
        if abs.millis % MILLIS_PER_DAY != 0 {
            out.push('T');
            if abs.hours() != 0 {
                out.push_str(&format!("{}H", abs.hours()));
            }
            if abs.minutes() != 0 {
                out.push_str(&format!("{}M", abs.minutes()));
            }
            let millis = abs.millis % MILLIS_PER_MINUTE;
            if millis != 0 {
                if millis % 1000 == 0 {
                    out.push_str(&format!("{}S", millis / 1000));
                } else {
                    out.push_str(&format!("{}S", millis as f64 / 1000.0));
                }
            }
        }
        write!(f, "{}", out)
    }
}

// =============================================================================
// FORMATTING
// =============================================================================

fn format_offset(offset: Option<FixedOffset>) -> String {
    match offset {
        None => String::new(),
        Some(o) if o.local_minus_utc() == 0 => "Z".to_string(),
        Some(o) => {
            let secs = o.local_minus_utc();
            let sign = if secs < 0 { '-' } else { '+' };
            let secs = secs.abs();
            format!("{}{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60)
        }
    }
}

fn format_time_of_day(time: &NaiveTime) -> String {
    if time.nanosecond() == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        time.format("%H:%M:%S%.3f").to_string()
    }
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_time_of_day(&self.time), format_offset(self.offset))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}T{}{}",
            format_date(&self.datetime.date()),
            format_time_of_day(&self.datetime.time()),
            format_offset(self.offset)
        )
    }
}

// =============================================================================
// CALENDAR PROPERTIES
// =============================================================================

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// ISO weekday number, Monday = 1
pub fn weekday_number(date: &NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

pub fn day_of_week(date: &NaiveDate) -> &'static str {
    WEEKDAYS[date.weekday().num_days_from_monday() as usize]
}

pub fn month_of_year(date: &NaiveDate) -> &'static str {
    MONTHS[date.month0() as usize]
}

pub fn day_of_year(date: &NaiveDate) -> u32 {
    date.ordinal()
}

/// ISO 8601 week number
pub fn week_of_year(date: &NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Offset as a days-and-time duration
pub fn offset_duration(offset: Option<FixedOffset>) -> Option<Duration> {
    offset.map(|o| Duration::from_millis(i64::from(o.local_minus_utc()) * MILLIS_PER_SECOND))
}

/// Zone name for the `timezone` property; only UTC has a known name
pub fn zone_name(offset: Option<FixedOffset>) -> Option<String> {
    match offset {
        Some(o) if o.local_minus_utc() == 0 => Some("UTC".to_string()),
        _ => None,
    }
}

pub fn now() -> DateTime {
    let now = Utc::now();
    DateTime {
        datetime: now.naive_utc(),
        offset: Some(Utc.fix()),
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2012-12-25"), NaiveDate::from_ymd_opt(2012, 12, 25));
        assert_eq!(parse_date("2012-13-25"), None);
        assert_eq!(parse_date("2012-12"), None);
    }

    #[test]
    fn test_parse_time_with_offset() {
        let time = parse_time("10:30:00+01:00").unwrap();
        assert_eq!(time.time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(time.offset, FixedOffset::east_opt(3600));
        assert_eq!(time.to_string(), "10:30:00+01:00");
        assert_eq!(parse_time("10:30:00@Europe/Paris"), None);
        assert_eq!(parse_time("10:30:00Z").unwrap().to_string(), "10:30:00Z");
    }

    #[test]
    fn test_parse_date_time() {
        let dt = parse_date_time("2012-12-24T23:59:00").unwrap();
        assert_eq!(dt.to_string(), "2012-12-24T23:59:00");
        let midnight = parse_date_time("2012-12-24").unwrap();
        assert_eq!(midnight.to_string(), "2012-12-24T00:00:00");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("P1Y2M"), Some(Duration::from_months(14)));
        assert_eq!(
            parse_duration("P1DT2H"),
            Some(Duration::from_millis(MILLIS_PER_DAY + 2 * MILLIS_PER_HOUR))
        );
        assert_eq!(parse_duration("-PT0.5S"), Some(Duration::from_millis(-500)));
        assert_eq!(parse_duration("P"), None);
        assert_eq!(parse_duration("PT"), None);
        assert_eq!(parse_duration("P1DT"), None);
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        assert_eq!(parse_duration("P999999999999999D"), None);
        assert_eq!(parse_duration("P999999999999999999Y"), None);
        assert_eq!(parse_duration("PT99999999999999999999S"), None);
        assert_eq!(parse_duration("-P99999999999999999999M"), None);
        assert!(parse_duration("P106751991167D").is_some());
    }

    #[test]
    fn test_duration_sum_overflow() {
        let huge = parse_duration("P5000000000000000000M").unwrap();
        assert_eq!(huge.plus(&huge), None);
        assert_eq!(huge.negate().minus(&huge), None);
        assert_eq!(huge.scale(4.0), None);
        assert_eq!(
            Duration::from_months(1).plus(&Duration::from_months(2)),
            Some(Duration::from_months(3))
        );
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(Duration::from_months(14).to_string(), "P1Y2M");
        assert_eq!(parse_duration("P2DT3H4M5S").unwrap().to_string(), "P2DT3H4M5S");
        assert_eq!(Duration::default().to_string(), "PT0S");
        assert_eq!(Duration::from_millis(-MILLIS_PER_DAY).to_string(), "-P1D");
    }

    #[test]
    fn test_duration_equality() {
        assert!(Duration::from_months(12).feel_eq(&parse_duration("P1Y").unwrap()));
        assert!(parse_duration("P1D").unwrap().feel_eq(&parse_duration("PT24H").unwrap()));
        assert!(!parse_duration("P1D").unwrap().feel_eq(&parse_duration("PT23H").unwrap()));
    }

    #[test]
    fn test_date_arithmetic() {
        let date = parse_date("2023-10-06").unwrap();
        assert_eq!(
            add_to_date(date, &Duration::from_months(1)),
            parse_date("2023-11-06")
        );
        let end_of_jan = parse_date("2023-01-31").unwrap();
        assert_eq!(
            add_to_date(end_of_jan, &Duration::from_months(1)),
            parse_date("2023-02-28")
        );
        assert_eq!(
            add_to_date(date, &Duration::from_millis(-MILLIS_PER_HOUR)),
            parse_date("2023-10-05")
        );
    }

    #[test]
    fn test_time_wraps() {
        let time = parse_time("23:00:00").unwrap();
        let later = time.add(&Duration::from_millis(2 * MILLIS_PER_HOUR));
        assert_eq!(later.to_string(), "01:00:00");
    }

    #[test]
    fn test_months_between() {
        let from = parse_date("2011-12-22").unwrap();
        let to = parse_date("2013-08-24").unwrap();
        assert_eq!(months_between(from, to), Duration::from_months(20));
        assert_eq!(months_between(to, from), Duration::from_months(-20));
    }

    #[test]
    fn test_calendar_names() {
        let date = parse_date("2019-09-17").unwrap();
        assert_eq!(day_of_week(&date), "Tuesday");
        assert_eq!(month_of_year(&date), "September");
        assert_eq!(day_of_year(&date), 260);
        assert_eq!(week_of_year(&date), 38);
    }
}
