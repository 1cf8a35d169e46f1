//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Single-attempt GET requests for article pages
//! - Bounded, fixed-delay retries for sitemap documents
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Network error / timeout | Retry up to `max_retries` attempts, fixed delay |
//! | Any HTTP response (2xx or not) | Returned to the caller as data |
//!
//! Callers decide what a non-2xx status means for their stage.

use crate::{NewswireError, Result};
use reqwest::Client;
use std::time::Duration;

/// Timeout and retry settings for one website
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Per-request timeout
    pub timeout: Duration,

    /// Total number of attempts before giving up
    pub max_retries: u32,

    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

/// A fetched HTTP response body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status_code: u16,

    /// Response body
    pub body: String,
}

impl FetchedPage {
    /// Returns true for 2xx responses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent string sent with every request
/// * `timeout` - Per-request timeout
pub fn build_http_client(user_agent: &str, timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP GET with bounded, fixed-delay retries on transport failures
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: FetchPolicy,
}

impl Fetcher {
    /// Creates a fetcher with its own client built from `policy`
    pub fn new(user_agent: &str, policy: FetchPolicy) -> Result<Self> {
        let client = build_http_client(user_agent, policy.timeout)?;
        Ok(Self { client, policy })
    }

    /// Fetches `url`, retrying transport failures
    ///
    /// Makes at most `max_retries` attempts, sleeping `retry_delay` between
    /// consecutive attempts. A received response of any status ends the loop.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - A response was received
    /// * `Err(NewswireError::FetchFailed)` - Every attempt failed; carries the last error
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let attempts = self.policy.max_retries.max(1);
        let mut attempt = 1;

        loop {
            tracing::debug!(url, attempt, attempts, "Fetching");

            match self.try_fetch(url).await {
                Ok(page) => return Ok(page),
                Err(source) if attempt >= attempts => {
                    tracing::warn!(url, attempt, error = %source, "Fetch failed, giving up");
                    return Err(NewswireError::FetchFailed {
                        url: url.to_string(),
                        attempts,
                        source,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        url,
                        attempt,
                        delay = ?self.policy.retry_delay,
                        error = %e,
                        "Fetch attempt failed, retrying"
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Fetches `url` with a single attempt
    pub async fn fetch_once(&self, url: &str) -> Result<FetchedPage> {
        self.try_fetch(url).await.map_err(|source| NewswireError::Http {
            url: url.to_string(),
            source,
        })
    }

    async fn try_fetch(&self, url: &str) -> reqwest::Result<FetchedPage> {
        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();
        let body = response.text().await?;

        Ok(FetchedPage {
            status_code,
            body,
        })
    }
}
