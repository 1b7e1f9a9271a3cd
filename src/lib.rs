//! Sitewalk: a polite single-site crawl engine
//!
//! This crate crawls one website breadth-first from a seed URL, respecting
//! robots.txt, a global request delay and a per-URL retry budget, and hands
//! back structured page records for indexing and export.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sitewalk operations
///
/// Only failures that stop a crawl from starting (or the binary from
/// finishing) surface here. Per-URL failures are recorded as
/// [`state::CrawlError`] entries in the result instead.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sitewalk operations
pub type Result<T> = std::result::Result<T, WalkError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlHandle, Crawler};
pub use state::{CrawlError, CrawlResult, CrawlStats, PageRecord};
pub use crate::url::{normalize_url, parse_seed_url};
