//! State module for tracking crawl progress and results
//!
//! # Components
//!
//! - `StatsTracker`: lock-free counters shared by all workers, snapshotted into `CrawlStats`
//! - `ResultAccumulator`: collects `PageRecord`s and `CrawlError`s as workers finish items
//! - `CrawlResult`: the final `{pages, errors, stats}` handed to indexing and export

mod results;
mod stats;

// Re-export main types
pub use results::{CrawlError, CrawlResult, PageRecord, ResultAccumulator};
pub use stats::{ActiveRequest, CrawlStats, StatsTracker};
