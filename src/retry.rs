//! Backoff policy for remote requests.
//!
//! Failures are split into [`FailureType::Transient`] (worth another try) and
//! [`FailureType::Permanent`]. The policy only ever delays transient ones.

use std::time::Duration;

use tracing::debug;

use crate::error::FetchError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration, attempt: u32 },
    DoNotRetry,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    max_attempts: u32,
    min_delay: Duration,
    max_delay: Duration,
    factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            factor: DEFAULT_FACTOR,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration, factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay,
            max_delay,
            factor,
        }
    }

    /// No waiting between attempts. Handy for tests against a local server.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO, 1.0)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt` is the 1-indexed attempt that just failed.
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent || attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry;
        }

        let delay = self.delay_for(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// `min(min_delay * factor^(attempt - 1), max_delay)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms = self.min_delay.as_millis() as f64 * self.factor.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms.max(0.0).round() as u64)
    }
}

pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::Network { .. } | FetchError::Timeout { .. } => FailureType::Transient,
        FetchError::HttpStatus { status, .. } => classify_http_status(*status),
        FetchError::Decode { .. } | FetchError::RetriesExhausted { .. } => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 | 429 => FailureType::Transient,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}
