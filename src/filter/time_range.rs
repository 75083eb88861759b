//! Resolves the relative date-range phrase grammar (`today`, `last 30
//! days`, ...) plus absolute and single-date shapes into half-open UTC
//! instant pairs `[start, end)`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::error::SemLayerError;
use crate::input::DateRangeInput;

/// Resolve a `DateRangeInput` against `now` (the server's current instant,
/// UTC). `end` is always the start of the day *after* the named range's
/// last day.
pub fn resolve_date_range(
    input: &DateRangeInput,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SemLayerError> {
    match input {
        DateRangeInput::Absolute(start, end) => {
            let start = parse_instant_start(start)?;
            let end = parse_instant_end(end)?;
            if end <= start {
                return Err(SemLayerError::InvalidDateRange(format!(
                    "inverted interval: {} .. {}",
                    start, end
                )));
            }
            Ok((start, end))
        }
        DateRangeInput::Single(date) => {
            let day = parse_date(date)?;
            let start = day_start(day);
            let end = day_start(day.succ_opt().ok_or_else(|| {
                SemLayerError::InvalidDateRange(format!("date out of range: {date}"))
            })?);
            Ok((start, end))
        }
        DateRangeInput::Relative(phrase) => resolve_relative_phrase(phrase, now),
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

fn parse_date(s: &str) -> Result<NaiveDate, SemLayerError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| SemLayerError::InvalidDateRange(format!("{s}: {e}")))
}

fn parse_instant_start(s: &str) -> Result<DateTime<Utc>, SemLayerError> {
    if let Ok(date) = parse_date(s) {
        return Ok(day_start(date));
    }
    parse_rfc3339(s)
}

fn parse_instant_end(s: &str) -> Result<DateTime<Utc>, SemLayerError> {
    // An end given as a bare date is exclusive of that day per the
    // half-open convention: the caller means "through the end of `s`".
    if let Ok(date) = parse_date(s) {
        let next = date
            .succ_opt()
            .ok_or_else(|| SemLayerError::InvalidDateRange(format!("date out of range: {s}")))?;
        return Ok(day_start(next));
    }
    parse_rfc3339(s)
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, SemLayerError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SemLayerError::InvalidDateRange(format!("{s}: {e}")))
}

fn resolve_relative_phrase(
    phrase: &str,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SemLayerError> {
    let phrase = phrase.trim().to_lowercase();
    let today = now.date_naive();

    match phrase.as_str() {
        "today" => Ok((day_start(today), day_start(today.succ_opt().unwrap()))),
        "yesterday" => {
            let y = today.pred_opt().unwrap();
            Ok((day_start(y), day_start(today)))
        }
        "this week" => Ok(week_range(today, 0)),
        "last week" => Ok(week_range(today, -1)),
        "this month" => Ok(month_range(today, 0)),
        "last month" => Ok(month_range(today, -1)),
        "this quarter" => Ok(quarter_range(today, 0)),
        "last quarter" => Ok(quarter_range(today, -1)),
        "this year" => Ok(year_range(today, 0)),
        "last year" => Ok(year_range(today, -1)),
        _ => parse_last_n(&phrase, today),
    }
}

fn parse_last_n(
    phrase: &str,
    today: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SemLayerError> {
    let rest = phrase
        .strip_prefix("last ")
        .ok_or_else(|| SemLayerError::InvalidDateRange(format!("unrecognized phrase: {phrase}")))?;
    let mut parts = rest.split_whitespace();
    let n: i64 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SemLayerError::InvalidDateRange(format!("unrecognized phrase: {phrase}")))?;
    let unit = parts
        .next()
        .ok_or_else(|| SemLayerError::InvalidDateRange(format!("unrecognized phrase: {phrase}")))?;

    let end = day_start(today.succ_opt().unwrap());
    let start = match unit.trim_end_matches('s') {
        "day" => end - Duration::days(n),
        "week" => end - Duration::weeks(n),
        "month" => day_start(add_months(today.succ_opt().unwrap(), (-n * 1) as i32)) ,
        "year" => day_start(add_months(today.succ_opt().unwrap(), (-n * 12) as i32)),
        other => {
            return Err(SemLayerError::InvalidDateRange(format!(
                "unrecognized unit: {other}"
            )))
        }
    };
    Ok((start, end))
}

fn week_range(today: NaiveDate, offset_weeks: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let monday = monday + Duration::weeks(offset_weeks);
    (day_start(monday), day_start(monday + Duration::weeks(1)))
}

fn month_range(today: NaiveDate, offset_months: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_of_month = today.with_day(1).unwrap();
    let start = add_months(first_of_month, offset_months);
    let end = add_months(first_of_month, offset_months + 1);
    (day_start(start), day_start(end))
}

fn quarter_range(today: NaiveDate, offset_quarters: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    let quarter_start_month = ((today.month0() / 3) * 3) + 1;
    let first_of_quarter = NaiveDate::from_ymd_opt(today.year(), quarter_start_month, 1).unwrap();
    let start = add_months(first_of_quarter, offset_quarters * 3);
    let end = add_months(first_of_quarter, offset_quarters * 3 + 3);
    (day_start(start), day_start(end))
}

fn year_range(today: NaiveDate, offset_years: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_of_year = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap();
    let start = add_months(first_of_year, offset_years * 12);
    let end = add_months(first_of_year, offset_years * 12 + 12);
    (day_start(start), day_start(end))
}

/// Add (possibly negative) calendar months to a date, clamping the day of
/// month to the target month's length.
fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month0 = total.rem_euclid(12);
    let day = date.day();
    let last_day = last_day_of_month(year, month0 as u32 + 1);
    NaiveDate::from_ymd_opt(year, month0 as u32 + 1, day.min(last_day)).unwrap()
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .pred_opt()
        .unwrap()
        .day()
}
