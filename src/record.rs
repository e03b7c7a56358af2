//! Turning remote entries into validated [`DrawRecord`]s.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::types::{DrawRecord, LegacyDrawRecord, RawDrawEntry};
use crate::utils::{ENTRY_DATE_FORMAT, parse_calendar_date};

pub const NUMBERS_PER_DRAW: usize = 6;
pub const HIGHEST_NUMBER: u8 = 49;

/// Parses the `DD/MM/YYYY` date of a remote entry.
pub fn entry_date(entry: &RawDrawEntry) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(entry.date.trim(), ENTRY_DATE_FORMAT)
        .map_err(|_| ValidationError::BadDate(entry.date.clone()))
}

/// Maps a remote entry onto the canonical record shape.
///
/// The result is not validated yet; see [`prepare_for_save`].
pub fn normalize(entry: &RawDrawEntry) -> Result<DrawRecord, ValidationError> {
    let date = entry_date(entry)?;

    let numbers = entry
        .no
        .split('+')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u8>()
                .map_err(|_| ValidationError::NonNumericNumber(part.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let special = match entry.sno.as_deref().map(str::trim) {
        None | Some("") => return Err(ValidationError::MissingSpecial),
        Some(raw) => raw
            .parse::<u8>()
            .map_err(|_| ValidationError::NonNumericSpecial(raw.to_string()))?,
    };

    Ok(DrawRecord {
        date,
        draw_id: entry.id.clone(),
        numbers,
        special,
    })
}

pub fn validate(record: &DrawRecord) -> Result<(), ValidationError> {
    if record.draw_id.trim().is_empty() {
        return Err(ValidationError::MissingDrawId);
    }
    if record.numbers.len() != NUMBERS_PER_DRAW {
        return Err(ValidationError::WrongNumberCount {
            got: record.numbers.len(),
        });
    }

    let mut seen = BTreeSet::new();
    for &number in &record.numbers {
        if !(1..=HIGHEST_NUMBER).contains(&number) {
            return Err(ValidationError::NumberOutOfRange(number));
        }
        if !seen.insert(number) {
            return Err(ValidationError::DuplicateNumber(number));
        }
    }

    if !(1..=HIGHEST_NUMBER).contains(&record.special) {
        return Err(ValidationError::SpecialOutOfRange(record.special));
    }
    Ok(())
}

/// Validates and returns a copy with `numbers` in ascending order.
pub fn prepare_for_save(record: &DrawRecord) -> Result<DrawRecord, ValidationError> {
    validate(record)?;
    let mut numbers = record.numbers.clone();
    numbers.sort_unstable();
    Ok(DrawRecord {
        numbers,
        ..record.clone()
    })
}

/// Pretty JSON, two-space indent, as written to disk.
pub fn to_json(record: &DrawRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}

pub fn from_json(json: &str) -> Result<DrawRecord, serde_json::Error> {
    serde_json::from_str(json)
}

/// Converts the old `{date, number, result}` shape.
pub fn from_legacy(legacy: &LegacyDrawRecord) -> Result<DrawRecord, ValidationError> {
    let date = parse_calendar_date(&legacy.date)
        .ok_or_else(|| ValidationError::BadDate(legacy.date.clone()))?;
    Ok(DrawRecord {
        date,
        draw_id: legacy.number.clone(),
        numbers: legacy.result.numbers.clone(),
        special: legacy.result.extra,
    })
}
