use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sitewalk
///
/// A `Config` is an immutable snapshot for the duration of one crawl. Every
/// key has a default, so an empty TOML file (or no file at all) is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Formats the user agent header value
    ///
    /// Format: `CrawlerName/Version` or `CrawlerName/Version (+ContactURL)`
    pub fn user_agent_string(&self) -> String {
        let ua = &self.user_agent;
        match &ua.contact_url {
            Some(contact) => format!("{}/{} (+{})", ua.crawler_name, ua.crawler_version, contact),
            None => format!("{}/{}", ua.crawler_name, ua.crawler_version),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of workers fetching in parallel
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: u32,

    /// Minimum gap between the start of any two requests (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Additional attempts after a transient failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Linear backoff base: attempt N waits N times this long (milliseconds)
    #[serde(rename = "retry-base-delay-ms")]
    pub retry_base_delay_ms: u64,

    /// Whether robots.txt is consulted before fetching
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,

    /// Maximum number of page records produced
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum link depth from the seed (the seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            request_delay_ms: 500,
            timeout_ms: 10_000,
            max_retries: 2,
            retry_base_delay_ms: 1_000,
            respect_robots: true,
            max_pages: 100,
            max_depth: 3,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Sitewalk".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where to write the JSON crawl result, if anywhere
    #[serde(rename = "json-path")]
    pub json_path: Option<String>,
}
