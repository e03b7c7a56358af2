use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::types::{DateRange, RawDrawEntry};
use crate::utils::format_date_for_api;

pub const DEFAULT_HOST: &str = "https://bet.hkjc.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
const RESULTS_PATH: &str = "/marksix/getJSON.aspx";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where draw entries come from.
///
/// `Ok(entries)` is a definitive answer for the whole window: a date inside
/// it without an entry had no draw. Anything uncertain must be an `Err`.
#[async_trait]
pub trait DrawSource {
    async fn fetch_window(&self, window: &DateRange) -> Result<Vec<RawDrawEntry>, FetchError>;
}

/// Client for the HKJC Mark Six results endpoint.
pub struct HkjcClient {
    client: Client,
    host: String,
    retry: RetryPolicy,
    request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HkjcClient {
    pub fn new(
        host: &str,
        user_agent: &str,
        retry: RetryPolicy,
        request_interval: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::from_reqwest(host, e))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            retry,
            request_interval,
            last_request: Mutex::new(None),
        })
    }

    pub fn results_url(&self) -> String {
        format!("{}{}", self.host, RESULTS_PATH)
    }

    async fn request_once(&self, window: &DateRange) -> Result<Vec<RawDrawEntry>, FetchError> {
        self.pace().await;

        let url = self.results_url();
        let sd = format_date_for_api(window.start);
        let ed = format_date_for_api(window.end);
        debug!(%url, %sd, %ed, "requesting draw results");

        let response = self
            .client
            .get(&url)
            .query(&[("sd", sd.as_str()), ("ed", ed.as_str()), ("sb", "0")])
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;

        serde_json::from_str::<Vec<RawDrawEntry>>(&body).map_err(|e| FetchError::Decode {
            url,
            reason: e.to_string(),
        })
    }

    /// Keeps consecutive requests at least `request_interval` apart.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.request_interval {
                tokio::time::sleep(self.request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl DrawSource for HkjcClient {
    async fn fetch_window(&self, window: &DateRange) -> Result<Vec<RawDrawEntry>, FetchError> {
        let mut attempt = 1;
        loop {
            let error = match self.request_once(window).await {
                Ok(entries) => return Ok(entries),
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            match self.retry.should_retry(failure_type, attempt) {
                RetryDecision::Retry { delay, attempt: next } => {
                    warn!(attempt, error = %error, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry if failure_type == FailureType::Transient => {
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(error),
                    });
                }
                RetryDecision::DoNotRetry => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_url_joins_host_and_path() {
        let client = HkjcClient::new(
            "https://example.test/",
            DEFAULT_USER_AGENT,
            RetryPolicy::immediate(1),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(
            client.results_url(),
            "https://example.test/marksix/getJSON.aspx"
        );
    }
}
