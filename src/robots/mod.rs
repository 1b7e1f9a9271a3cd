//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files. Fetch failures fail open: a host whose robots.txt can't
//! be retrieved is treated as allowing everything.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::{RobotsRule, RobotsRules};

use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Cache key for the host serving `url`
///
/// Scheme and port are part of the key because they select a different
/// robots.txt file.
pub fn robots_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// The path (plus query) that robots rules are matched against
pub fn robots_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Fetches and parses robots.txt for a host
///
/// # Arguments
///
/// * `client` - The HTTP client (already carrying the user agent header)
/// * `key` - The host key from [`robots_key`]
/// * `user_agent` - The user agent string rules are matched against
/// * `timeout` - Request timeout
///
/// # Returns
///
/// The parsed rules, or allow-all when the fetch fails or the server answers
/// with a non-success status.
pub async fn fetch_robots(
    client: &Client,
    key: &str,
    user_agent: &str,
    timeout: Duration,
) -> RobotsRules {
    let robots_url = format!("{}/robots.txt", key);
    tracing::debug!("Fetching robots.txt: {}", robots_url);

    let response = match client.get(&robots_url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch {} ({}), allowing all", robots_url, e);
            return RobotsRules::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "{} returned HTTP {}, allowing all",
            robots_url,
            response.status().as_u16()
        );
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            let rules = RobotsRules::parse(&body, user_agent);
            tracing::debug!(
                "Parsed {} rule(s) from {} (agent matched: {})",
                rules.rules().len(),
                robots_url,
                rules.matched_agent()
            );
            rules
        }
        Err(e) => {
            tracing::warn!("Failed to read {} ({}), allowing all", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}
