//! URL handling module for Sitewalk
//!
//! This module provides seed validation, URL normalization for the visited
//! set, and host extraction for domain confinement.

mod domain;
mod normalize;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{extract_host, same_host};
pub use normalize::normalize_url;

/// Validates and normalizes a crawl seed
///
/// The seed must be an absolute `http` or `https` URL with a host. The
/// returned URL is normalized the same way discovered links are, so the
/// seed and a link pointing back at it share one visited-set key.
///
/// # Examples
///
/// ```
/// use sitewalk::url::parse_seed_url;
///
/// let seed = parse_seed_url("https://Example.com/#top").unwrap();
/// assert_eq!(seed.as_str(), "https://example.com/");
///
/// assert!(parse_seed_url("ftp://example.com/").is_err());
/// assert!(parse_seed_url("not a url").is_err());
/// ```
pub fn parse_seed_url(seed: &str) -> Result<Url, UrlError> {
    let url = normalize_url(seed.trim())?;
    if extract_host(&url).is_none() {
        return Err(UrlError::MissingHost);
    }
    Ok(url)
}
