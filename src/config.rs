use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::{DEFAULT_HOST, DEFAULT_USER_AGENT};
use crate::retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::utils::DATE_FORMAT;

/// 1993-01-05 is the first Mark Six draw.
pub const FIRST_DRAW_DATE: &str = "1993-01-05";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StoreBackend::Json),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => bail!("unknown store backend {other:?} (expected json or sqlite)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub records_dir: PathBuf,
    pub no_draw_dates_path: PathBuf,
    pub first_draw_date: NaiveDate,
    pub host: String,
    pub user_agent: String,
    pub store: StoreBackend,
    pub database_path: PathBuf,
    pub report_dir: PathBuf,
    pub retry: RetryPolicy,
    pub request_interval: Duration,
}

/// Reads `.env` (if any) and the `MARKSIX_*` environment variables.
pub fn load() -> Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| env::var(key).ok())
}

/// Builds the config from any key lookup; `load` uses the process environment.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

    let first_draw_date = {
        let raw = get("MARKSIX_FIRST_DRAW_DATE", FIRST_DRAW_DATE);
        NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .with_context(|| format!("MARKSIX_FIRST_DRAW_DATE must be YYYY-MM-DD, got {raw:?}"))?
    };

    let max_attempts: u32 = parse_var(&lookup, "MARKSIX_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
    let retry_min_ms: u64 = parse_var(&lookup, "MARKSIX_RETRY_MIN_MS", 1000)?;
    let retry_max_ms: u64 = parse_var(&lookup, "MARKSIX_RETRY_MAX_MS", 5000)?;
    let retry_factor: f64 = parse_var(&lookup, "MARKSIX_RETRY_FACTOR", 1.2)?;
    let interval_ms: u64 = parse_var(&lookup, "MARKSIX_REQUEST_INTERVAL_MS", 1000)?;

    if max_attempts == 0 {
        bail!("MARKSIX_MAX_ATTEMPTS must be at least 1");
    }
    if !(retry_factor.is_finite() && retry_factor >= 1.0) {
        bail!("MARKSIX_RETRY_FACTOR must be a number >= 1, got {retry_factor}");
    }
    if retry_max_ms < retry_min_ms {
        bail!("MARKSIX_RETRY_MAX_MS must not be below MARKSIX_RETRY_MIN_MS");
    }

    Ok(Config {
        records_dir: PathBuf::from(get("MARKSIX_RECORDS_DIR", "data/records")),
        no_draw_dates_path: PathBuf::from(get("MARKSIX_NO_DRAW_FILE", "data/no-draw-dates.json")),
        first_draw_date,
        host: get("MARKSIX_HOST", DEFAULT_HOST),
        user_agent: get("MARKSIX_USER_AGENT", DEFAULT_USER_AGENT),
        store: get("MARKSIX_STORE", "json").parse()?,
        database_path: PathBuf::from(get("MARKSIX_DB_PATH", "data/marksix.db")),
        report_dir: PathBuf::from(get("MARKSIX_REPORT_DIR", "reports")),
        retry: RetryPolicy::new(
            max_attempts,
            Duration::from_millis(retry_min_ms),
            Duration::from_millis(retry_max_ms),
            retry_factor,
        ),
        request_interval: Duration::from_millis(interval_ms),
    })
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has invalid value {raw:?}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.records_dir, PathBuf::from("data/records"));
        assert_eq!(
            config.no_draw_dates_path,
            PathBuf::from("data/no-draw-dates.json")
        );
        assert_eq!(
            config.first_draw_date,
            NaiveDate::from_ymd_opt(1993, 1, 5).unwrap()
        );
        assert_eq!(config.store, StoreBackend::Json);
        assert_eq!(config.retry.max_attempts(), 10);
        assert_eq!(config.request_interval, Duration::from_secs(1));
    }

    #[test]
    fn overrides() {
        let config = from_lookup(lookup(&[
            ("MARKSIX_RECORDS_DIR", "/tmp/records"),
            ("MARKSIX_STORE", "SQLite"),
            ("MARKSIX_MAX_ATTEMPTS", "3"),
            ("MARKSIX_REQUEST_INTERVAL_MS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.records_dir, PathBuf::from("/tmp/records"));
        assert_eq!(config.store, StoreBackend::Sqlite);
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(config.request_interval, Duration::ZERO);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(from_lookup(lookup(&[("MARKSIX_FIRST_DRAW_DATE", "05/01/1993")])).is_err());
        assert!(from_lookup(lookup(&[("MARKSIX_MAX_ATTEMPTS", "many")])).is_err());
        assert!(from_lookup(lookup(&[("MARKSIX_MAX_ATTEMPTS", "0")])).is_err());
        assert!(from_lookup(lookup(&[("MARKSIX_STORE", "postgres")])).is_err());
        assert!(from_lookup(lookup(&[("MARKSIX_RETRY_FACTOR", "0.5")])).is_err());
    }
}
