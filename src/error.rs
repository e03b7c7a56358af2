//! Error types shared by the fetch, store and reconcile layers.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::RunSummary;

/// A draw entry that must not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing draw number")]
    MissingDrawId,

    #[error("expected 6 numbers but got {got}")]
    WrongNumberCount { got: usize },

    #[error("number {0} is outside 1..=49")]
    NumberOutOfRange(u8),

    #[error("number {0} appears more than once")]
    DuplicateNumber(u8),

    #[error("missing special number")]
    MissingSpecial,

    #[error("special number should not be {0:?}")]
    NonNumericSpecial(String),

    #[error("special number {0} is outside 1..=49")]
    SpecialOutOfRange(u8),

    #[error("drawn number should not be {0:?}")]
    NonNumericNumber(String),

    #[error("unrecognised draw date {0:?}")]
    BadDate(String),
}

/// Failures talking to the remote source.
///
/// None of these ever means "no draw": a successful response without an entry
/// for the date is the only negative answer.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("timeout requesting {url}")]
    Timeout { url: String },

    #[error("HTTP {status} requesting {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("unreadable response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Record store and exclusion list failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The resource does not exist yet. Callers that treat absence as an
    /// empty collection match on this variant instead of inspecting IO codes.
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("refusing to store draw of {date}: {source}")]
    Invalid {
        date: NaiveDate,
        #[source]
        source: ValidationError,
    },

    #[error("invalid draw in {}: {source}", path.display())]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

impl StoreError {
    /// Maps an IO error, keeping "not found" as its own variant.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(path)
        } else {
            StoreError::Io { path, source }
        }
    }
}

/// Anything that stops a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid draw entry: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A pass that stopped early. Everything in `summary` is already durable.
#[derive(Debug, Error)]
#[error("run aborted: {source}")]
pub struct RunAborted {
    pub summary: RunSummary,
    /// The day being settled, or `None` if the pass failed before the first.
    pub date: Option<NaiveDate>,
    #[source]
    pub source: ReconcileError,
}
