use crate::state::CrawlStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// One successfully fetched and parsed page
///
/// Field names serialize exactly as the export formats expect them
/// (`linkCount`, `crawledAt`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: String,

    /// Heading text keyed by tag name (`h1` .. `h6`)
    pub headings: BTreeMap<String, Vec<String>>,

    pub link_count: usize,
    pub image_count: usize,
    pub word_count: usize,
    pub depth: u32,
    pub referrer: Option<String>,
    pub crawled_at: DateTime<Utc>,

    /// Body size in bytes
    pub content_length: usize,

    /// Wall time of the successful attempt, request to last body byte
    pub load_time_ms: u64,
}

/// A work item that failed for good (terminal error or retries exhausted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlError {
    pub url: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CrawlError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Final output of a crawl
///
/// This is the read-only snapshot handed to the search index and the
/// exporters. A stopped crawl produces one too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub pages: Vec<PageRecord>,
    pub errors: Vec<CrawlError>,
    pub stats: CrawlStats,
}

impl CrawlResult {
    /// Number of pages at each depth
    pub fn depth_breakdown(&self) -> BTreeMap<u32, usize> {
        let mut breakdown = BTreeMap::new();
        for page in &self.pages {
            *breakdown.entry(page.depth).or_insert(0) += 1;
        }
        breakdown
    }
}

/// Collects pages and errors from all workers
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    pages: Mutex<Vec<PageRecord>>,
    errors: Mutex<Vec<CrawlError>>,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page unless the cap is already reached
    ///
    /// Returns false (and drops the record) when `max_pages` records are
    /// already held.
    pub fn push_page(&self, record: PageRecord, max_pages: usize) -> bool {
        let mut pages = self.pages.lock().unwrap_or_else(PoisonError::into_inner);
        if pages.len() >= max_pages {
            return false;
        }
        pages.push(record);
        true
    }

    pub fn push_error(&self, error: CrawlError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Moves everything collected so far into a final result
    ///
    /// The accumulator is left empty.
    pub fn take_result(&self, stats: CrawlStats) -> CrawlResult {
        let pages =
            std::mem::take(&mut *self.pages.lock().unwrap_or_else(PoisonError::into_inner));
        let errors =
            std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner));
        CrawlResult {
            pages,
            errors,
            stats,
        }
    }
}
