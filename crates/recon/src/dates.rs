//! Lenient date parsing for spreadsheet date columns.
//!
//! Calendar forms are tried first; slash dates (`M/D/Y`, or `Y/M/D` when the
//! first token has four digits) are the fallback, with an optional trailing
//! time of day. Numeric cells are spreadsheet serial dates.

use chrono::{DateTime, Datelike, Duration, Month, NaiveDate, NaiveDateTime, NaiveTime};

use crate::model::Cell;

const NATIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y"];

const NATIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Time-of-day suffixes allowed after a slash date, as spreadsheet exports write them.
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p", "%H:%M:%S%.f"];

/// Largest serial spreadsheets accept (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => from_serial(*n),
        Cell::Text(s) => parse_date_str(s),
    }
}

pub fn parse_date_str(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    parse_native(s).or_else(|| parse_slash(s))
}

fn parse_native(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in NATIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NATIVE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// `M/D/Y` with two-digit years mapped to 1950-2049, or `Y/M/D` when the
/// first token is a four-digit year. A time of day may follow the date.
fn parse_slash(s: &str) -> Option<NaiveDate> {
    let (date, time) = match s.split_once(char::is_whitespace) {
        Some((date, time)) => (date, Some(time.trim())),
        None => (s, None),
    };
    if let Some(time) = time {
        if !TIME_FORMATS
            .iter()
            .any(|fmt| NaiveTime::parse_from_str(time, fmt).is_ok())
        {
            return None;
        }
    }

    let parts: Vec<&str> = date.split('/').collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };
    if first.len() == 4 {
        return NaiveDate::from_ymd_opt(first.parse().ok()?, second.parse().ok()?, third.parse().ok()?);
    }

    let month: u32 = first.parse().ok()?;
    let day: u32 = second.parse().ok()?;
    let mut year: i32 = third.parse().ok()?;
    match third.len() {
        1 | 2 => year += if year < 50 { 2000 } else { 1900 },
        4 => {}
        _ => return None,
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Spreadsheet serial day number (1900 date system, epoch 1899-12-30).
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Month name to 1-based month number. Accepts full or three-letter names,
/// any case.
pub fn month_number(name: &str) -> Option<u32> {
    name.trim().parse::<Month>().ok().map(|m| m.number_from_month())
}

pub fn month_name(number: u32) -> Option<&'static str> {
    let month = Month::try_from(u8::try_from(number).ok()?).ok()?;
    Some(month.name())
}

/// True when `date` falls in the given year and 1-based month.
pub fn in_period(date: NaiveDate, year: i32, month: u32) -> bool {
    date.year() == year && date.month() == month
}
