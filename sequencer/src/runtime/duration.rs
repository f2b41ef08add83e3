//! Time and duration encodings used by the two data-model revisions.
//!
//! Revision 1.2 writes timespans as `HHHH:MM:SS.SS`; revision 2004 writes
//! ISO-8601 durations (`P[n]Y[n]M[n]DT[n]H[n]M[n]S`). Both are converted
//! through seconds, with a year of 365 days and a month of 30 days.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 365 * DAY;

/// Largest value a four-digit-hour timespan can hold, in hundredths of a second.
const MAX_SCORM12_CENTIS: u64 = (9999 * HOUR + 59 * MINUTE + 59) * 100 + 99;

static SCORM12_TIMESPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2,4}):([0-5]\d):([0-5]\d)(\.\d{1,2})?$").unwrap());

static SCORM12_TIME_OF_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d):([0-5]\d)(\.\d{1,2})?$").unwrap());

static ISO8601_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(\d+(?:\.\d+)?)Y)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .unwrap()
});

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})(?:-(\d{2})(?:-(\d{2})(?:T([01]\d|2[0-3])(?::([0-5]\d)(?::([0-5]\d)(?:\.\d{1,2})?)?)?)?)?)?(?:Z|[+-](?:[01]\d|2[0-3])(?::?[0-5]\d)?)?$",
    )
    .unwrap()
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid HHHH:MM:SS.SS timespan '{0}'")]
    InvalidScorm12(String),
    #[error("invalid ISO-8601 duration '{0}'")]
    InvalidIso8601(String),
}

/// Seconds in a `HHHH:MM:SS.SS` timespan.
pub fn parse_scorm12_time(value: &str) -> Result<f64, DurationError> {
    let caps = SCORM12_TIMESPAN_RE
        .captures(value)
        .ok_or_else(|| DurationError::InvalidScorm12(value.to_string()))?;
    let number = |i: usize| caps.get(i).map_or(0.0, |m| m.as_str().parse::<f64>().unwrap_or(0.0));
    let fraction = caps
        .get(4)
        .map_or(0.0, |m| format!("0{}", m.as_str()).parse::<f64>().unwrap_or(0.0));
    Ok(number(1) * HOUR as f64 + number(2) * MINUTE as f64 + number(3) + fraction)
}

/// Format seconds as `HHHH:MM:SS.SS`, saturating at `9999:59:59.99`.
pub fn format_scorm12_time(seconds: f64) -> String {
    let centis = to_centis(seconds).min(MAX_SCORM12_CENTIS);
    let whole = centis / 100;
    format!(
        "{:04}:{:02}:{:02}.{:02}",
        whole / HOUR,
        (whole % HOUR) / MINUTE,
        whole % MINUTE,
        centis % 100
    )
}

pub fn add_scorm12_times(a: &str, b: &str) -> Result<String, DurationError> {
    Ok(format_scorm12_time(parse_scorm12_time(a)? + parse_scorm12_time(b)?))
}

/// Seconds in an ISO-8601 duration.
pub fn parse_iso8601_duration(value: &str) -> Result<f64, DurationError> {
    let invalid = || DurationError::InvalidIso8601(value.to_string());
    // `P` alone and a dangling `T` carry no components.
    if value == "P" || value.ends_with('T') {
        return Err(invalid());
    }
    let caps = ISO8601_DURATION_RE.captures(value).ok_or_else(invalid)?;
    let units = [YEAR, MONTH, DAY, HOUR, MINUTE, 1];
    let mut total = 0.0;
    for (i, unit) in units.iter().enumerate() {
        if let Some(m) = caps.get(i + 1) {
            let amount: f64 = m.as_str().parse().map_err(|_| invalid())?;
            total += amount * *unit as f64;
        }
    }
    Ok(total)
}

/// Format seconds as the shortest ISO-8601 duration; zero is `PT0S`.
pub fn format_iso8601_duration(seconds: f64) -> String {
    let centis = to_centis(seconds);
    let mut rest = centis / 100;
    let fraction = centis % 100;

    let mut take = |unit: u64| {
        let amount = rest / unit;
        rest %= unit;
        amount
    };
    let years = take(YEAR);
    let months = take(MONTH);
    let days = take(DAY);
    let hours = take(HOUR);
    let minutes = take(MINUTE);
    let secs = rest;

    let mut out = String::from("P");
    for (amount, designator) in [(years, 'Y'), (months, 'M'), (days, 'D')] {
        if amount > 0 {
            out.push_str(&format!("{amount}{designator}"));
        }
    }
    if hours > 0 || minutes > 0 || secs > 0 || fraction > 0 || out.len() == 1 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if fraction > 0 {
            let digits = format!("{fraction:02}");
            out.push_str(&format!("{secs}.{}S", digits.trim_end_matches('0')));
        } else if secs > 0 || out.len() == 2 {
            out.push_str(&format!("{secs}S"));
        }
    }
    out
}

pub fn add_iso8601_durations(a: &str, b: &str) -> Result<String, DurationError> {
    Ok(format_iso8601_duration(
        parse_iso8601_duration(a)? + parse_iso8601_duration(b)?,
    ))
}

pub fn is_scorm12_time_of_day(value: &str) -> bool {
    SCORM12_TIME_OF_DAY_RE.is_match(value)
}

/// A `YYYY[-MM[-DD[Thh[:mm[:ss[.s]]]]]][TZD]` timestamp naming a real date.
pub fn is_timestamp(value: &str) -> bool {
    let Some(caps) = TIMESTAMP_RE.captures(value) else {
        return false;
    };
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let Some(year) = caps.get(1).and_then(|m| m.as_str().parse::<i32>().ok()) else {
        return false;
    };
    if !(1970..=2038).contains(&year) {
        return false;
    }
    match (field(2), field(3)) {
        (Some(month), Some(day)) => NaiveDate::from_ymd_opt(year, month, day).is_some(),
        (Some(month), None) => (1..=12).contains(&month),
        _ => true,
    }
}

fn to_centis(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 100.0).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scorm12_times_add() {
        assert_eq!(
            add_scorm12_times("0000:10:00.00", "0000:05:30.00").expect("add"),
            "0000:15:30.00"
        );
        assert_eq!(
            add_scorm12_times("0001:59:59.50", "00:00:00.5").expect("add"),
            "0002:00:00.00"
        );
    }

    #[test]
    fn iso8601_durations_add() {
        assert_eq!(add_iso8601_durations("PT1H", "PT30M").expect("add"), "PT1H30M");
        assert_eq!(add_iso8601_durations("PT0S", "PT0S").expect("add"), "PT0S");
        assert_eq!(add_iso8601_durations("P1D", "PT1.5S").expect("add"), "P1DT1.5S");
    }

    /// Years and months convert at 365 and 30 days.
    #[test]
    fn iso8601_calendar_units_use_fixed_lengths() {
        assert_eq!(parse_iso8601_duration("P1Y").expect("parse"), (365 * DAY) as f64);
        assert_eq!(parse_iso8601_duration("P1M").expect("parse"), (30 * DAY) as f64);
        assert_eq!(format_iso8601_duration((365 * DAY + 30 * DAY) as f64), "P1Y1M");
    }

    #[test]
    fn malformed_durations_are_rejected() {
        for bad in ["P", "PT", "1H", "PT1H30", "P1DT"] {
            assert!(parse_iso8601_duration(bad).is_err(), "{bad}");
        }
        for bad in ["0000:60:00.00", "1:00:00", "0000:00:00.123", "00000:00:00"] {
            assert!(parse_scorm12_time(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn scorm12_format_saturates() {
        assert_eq!(format_scorm12_time(1e9), "9999:59:59.99");
        assert_eq!(format_scorm12_time(-5.0), "0000:00:00.00");
    }

    #[test]
    fn timestamps_must_name_real_dates() {
        assert!(is_timestamp("2024"));
        assert!(is_timestamp("2024-02-29T10:15:30.5Z"));
        assert!(is_timestamp("2024-02-29T10:15+02:00"));
        assert!(!is_timestamp("2023-02-29"));
        assert!(!is_timestamp("2024-13"));
        assert!(!is_timestamp("24-01-01"));
    }

    #[test]
    fn time_of_day_requires_valid_clock() {
        assert!(is_scorm12_time_of_day("23:59:59.99"));
        assert!(!is_scorm12_time_of_day("24:00:00"));
    }
}
