//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML parsing and link extraction
//! - Frontier scheduling and global rate limiting
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod limiter;
mod parser;
mod scheduler;

pub use coordinator::{CrawlHandle, Crawler};
pub use fetcher::{
    build_http_client, fetch_page, is_html_content_type, with_retry, FetchError, FetchedPage,
    RetryPolicy,
};
pub use limiter::RateLimiter;
pub use parser::{ExtractError, ExtractedPage, HtmlExtractor, PageContext, PageExtractor};
pub use scheduler::{Dispatch, Scheduler, WorkItem, MAX_LINKS_PER_PAGE};
