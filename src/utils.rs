use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

/// Canonical on-disk date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Date format of the `sd`/`ed` query parameters.
pub const QUERY_DATE_FORMAT: &str = "%Y%m%d";
/// Date format used inside remote draw entries.
pub const ENTRY_DATE_FORMAT: &str = "%d/%m/%Y";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_date_for_api(date: NaiveDate) -> String {
    date.format(QUERY_DATE_FORMAT).to_string()
}

pub fn record_filename(date: NaiveDate) -> String {
    format!("{}.json", format_date(date))
}

/// Parses a stored date down to its calendar day.
///
/// Accepts `YYYY-MM-DD` as well as full timestamps, whose time of day is
/// dropped so that two spellings of the same day compare equal.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.naive_local().date());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|datetime| datetime.date())
}

/// Every calendar day from `start` (inclusive) to `end` (exclusive).
pub fn dates_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|date| *date < end).collect()
}

/// Days in `[series_start, today)` that are neither persisted nor excluded,
/// oldest first.
pub fn missing_dates(
    series_start: NaiveDate,
    today: NaiveDate,
    persisted: &BTreeSet<NaiveDate>,
    excluded: &BTreeSet<NaiveDate>,
) -> Vec<NaiveDate> {
    dates_between(series_start, today)
        .into_iter()
        .filter(|date| !persisted.contains(date) && !excluded.contains(date))
        .collect()
}
