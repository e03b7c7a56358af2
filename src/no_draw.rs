//! Durable list of dates confirmed to have had no draw.
//!
//! Stored as a JSON array of `YYYY-MM-DD` strings. The whole list is written
//! back after every addition so an interrupted run keeps every confirmation
//! made before it stopped.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::store::write_atomic;
use crate::utils::{format_date, parse_calendar_date};

#[derive(Debug, Clone)]
pub struct NoDrawDates {
    path: PathBuf,
    dates: BTreeSet<NaiveDate>,
}

impl NoDrawDates {
    /// Reads the list, treating a missing file as empty.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let dates = match fs::read_to_string(&path) {
            Ok(json) => parse_dates(&path, &json)?,
            Err(e) => match StoreError::io(&path, e) {
                StoreError::NotFound(_) => BTreeSet::new(),
                other => return Err(other),
            },
        };
        Ok(Self { path, dates })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dates(&self) -> &BTreeSet<NaiveDate> {
        &self.dates
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Adds `date` in memory. Returns `false` if it was already listed.
    pub fn append(&mut self, date: NaiveDate) -> bool {
        self.dates.insert(date)
    }

    /// Replaces the file with the full current list.
    pub fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let dates: Vec<String> = self.dates.iter().copied().map(format_date).collect();
        let json = serde_json::to_string_pretty(&dates).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, json.as_bytes())
    }

    /// [`append`](Self::append) followed by [`flush`](Self::flush). If the
    /// flush fails the date is dropped again, so memory matches the file.
    pub fn record(&mut self, date: NaiveDate) -> Result<bool, StoreError> {
        let added = self.append(date);
        if added {
            if let Err(e) = self.flush() {
                self.dates.remove(&date);
                return Err(e);
            }
        }
        Ok(added)
    }
}

fn parse_dates(path: &Path, json: &str) -> Result<BTreeSet<NaiveDate>, StoreError> {
    let raw: Vec<String> = serde_json::from_str(json).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    raw.iter()
        .map(|value| {
            parse_calendar_date(value).ok_or_else(|| StoreError::Json {
                path: path.to_path_buf(),
                source: serde::de::Error::custom(format!("not a date: {value:?}")),
            })
        })
        .collect()
}
