//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the crawler's user agent string
//! - Single GET attempts with status and Content-Type checks
//! - Error classification into transient and terminal failures
//! - Linear-backoff retries for transient failures

use crate::config::{Config, CrawlerConfig};
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Why a fetch did not produce a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Timeouts, connection failures and truncated bodies; worth retrying
    #[error("{0}")]
    Transient(String),

    /// Non-success status or non-HTML content; retrying won't help
    #[error("{0}")]
    Terminal(String),

    /// The crawl was stopped while the fetch was pending
    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }

    fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            FetchError::Transient(format!(
                "Request timed out after {}ms",
                timeout.as_millis()
            ))
        } else {
            FetchError::Transient(format!("Network error: {}", error))
        }
    }
}

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects; relative links resolve against it
    pub final_url: Url,
    pub status_code: u16,
    pub content_type: String,
    pub body: String,
    /// Request start to last body byte
    pub load_time: Duration,
}

/// Builds an HTTP client with proper configuration
///
/// The per-request timeout is applied to each request separately (see
/// [`fetch_page`]); the client-level timeout is a ceiling for anything that
/// bypasses it.
///
/// # Example
///
/// ```no_run
/// use sitewalk::config::Config;
/// use sitewalk::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let timeout = config.crawler.timeout();

    Client::builder()
        .user_agent(config.user_agent_string())
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns whether a Content-Type header value denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Performs one GET attempt
///
/// # Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | Timeout | Transient |
/// | Connection / network error | Transient |
/// | Body read failure | Transient |
/// | Non-2xx status | Terminal (`HTTP <code>`) |
/// | Content-Type not HTML | Terminal |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `timeout` - Limit for the whole attempt, body included
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<FetchedPage, FetchError> {
    let started = Instant::now();

    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Terminal(format!("HTTP {}", status.as_u16())));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html_content_type(&content_type) {
        let shown = if content_type.is_empty() {
            "none"
        } else {
            content_type.as_str()
        };
        return Err(FetchError::Terminal(format!(
            "Unsupported content type: {}",
            shown
        )));
    }

    let final_url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
        load_time: started.elapsed(),
    })
}

/// Retry budget and backoff for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait before the attempt following failed attempt number `attempt`
    /// (1-based): linear, `attempt * base_delay`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Total attempts allowed, the first one included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl From<&CrawlerConfig> for RetryPolicy {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
        }
    }
}

/// Runs `attempt_fn` until it succeeds, fails terminally or runs out of
/// attempts
///
/// `attempt_fn` receives the 1-based attempt number. Only transient errors
/// are retried. The backoff sleep ends early with [`FetchError::Cancelled`]
/// when `cancel` fires.
///
/// # Returns
///
/// The first success, the first terminal error, or the last transient error
/// annotated with the number of attempts made.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    url: &Url,
    mut attempt_fn: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(FetchError::Transient(message)) if attempt < policy.max_attempts() => {
                let wait = policy.backoff(attempt);
                tracing::warn!(
                    "Attempt {}/{} failed for {}: {} (retrying in {}ms)",
                    attempt,
                    policy.max_attempts(),
                    url,
                    message,
                    wait.as_millis()
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                }
                attempt += 1;
            }
            Err(FetchError::Transient(message)) if attempt > 1 => {
                return Err(FetchError::Transient(format!(
                    "{} (after {} attempts)",
                    message, attempt
                )));
            }
            Err(e) => return Err(e),
        }
    }
}
