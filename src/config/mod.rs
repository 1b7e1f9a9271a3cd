//! Configuration module for Sitewalk
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sitewalk::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitewalk.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
