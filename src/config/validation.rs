use crate::config::types::{Config, CrawlerConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// The crawl engine assumes a validated config and does no range checks of
/// its own, so anything built outside [`super::load_config`] (CLI overrides,
/// tests, embedding code) should pass through here first.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn check_range<T>(name: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    check_range("max_concurrency", config.max_concurrency, 1, 64)?;
    check_range("request_delay_ms", config.request_delay_ms, 0, 60_000)?;
    check_range("timeout_ms", config.timeout_ms, 100, 120_000)?;
    check_range("max_retries", config.max_retries, 0, 10)?;
    check_range("retry_base_delay_ms", config.retry_base_delay_ms, 0, 60_000)?;
    check_range("max_pages", config.max_pages, 1, 100_000)?;
    check_range("max_depth", config.max_depth, 0, 20)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name goes into an HTTP header and robots.txt matching
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::Validation(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}
