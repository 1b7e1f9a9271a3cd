use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Point-in-time view of crawl progress
///
/// `processed`, `failed`, `skipped` and `duplicates` only ever grow during a
/// crawl. `queued`, `active_requests` and `visited_size` are gauges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    /// Pages fetched and extracted successfully
    pub processed: usize,

    /// Items that ended in a `CrawlError`
    pub failed: usize,

    /// Items skipped because robots.txt denied them
    pub skipped: usize,

    /// Dequeued items whose URL had already been visited
    pub duplicates: usize,

    pub start_time: DateTime<Utc>,

    /// Same as `processed`; kept for consumers that expect it
    pub crawled: usize,

    /// Items waiting in the frontier
    pub queued: usize,

    /// Same as `failed`; kept for consumers that expect it
    pub errors: usize,

    /// Milliseconds since the crawl started
    #[serde(rename = "elapsed")]
    pub elapsed_ms: u64,

    /// Fetches currently on the wire
    pub active_requests: usize,

    pub visited_size: usize,
}

impl CrawlStats {
    /// Number of work items that reached a final outcome
    pub fn completed(&self) -> usize {
        self.processed + self.failed + self.skipped + self.duplicates
    }

    /// Calculate pages processed per second
    pub fn pages_per_second(&self) -> f64 {
        let elapsed = self.elapsed_ms as f64 / 1000.0;
        if elapsed > 0.0 {
            self.processed as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Thread-safe statistics shared by every worker
///
/// All counters are atomics so progress snapshots never wait on a worker.
#[derive(Debug)]
pub struct StatsTracker {
    processed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    duplicates: AtomicUsize,
    active_requests: AtomicUsize,
    queued: AtomicUsize,
    visited: AtomicUsize,
    start_time: DateTime<Utc>,
    started: Instant,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            processed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            duplicates: AtomicUsize::new(0),
            active_requests: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            visited: AtomicUsize::new(0),
            start_time: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::SeqCst);
    }

    /// Current processed count, used for the page cap
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    /// Mirrors the frontier gauges; called with the frontier lock held
    pub fn set_frontier_sizes(&self, queued: usize, visited: usize) {
        self.queued.store(queued, Ordering::SeqCst);
        self.visited.store(visited, Ordering::SeqCst);
    }

    /// Marks a fetch as on the wire until the returned guard is dropped
    ///
    /// The guard also decrements when the fetch future is dropped on
    /// cancellation, so the gauge can't leak.
    pub fn request_started(&self) -> ActiveRequest<'_> {
        self.active_requests.fetch_add(1, Ordering::SeqCst);
        ActiveRequest { stats: self }
    }

    /// Takes a consistent-enough snapshot without blocking any worker
    pub fn snapshot(&self) -> CrawlStats {
        let processed = self.processed.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);

        CrawlStats {
            processed,
            failed,
            skipped: self.skipped.load(Ordering::SeqCst),
            duplicates: self.duplicates.load(Ordering::SeqCst),
            start_time: self.start_time,
            crawled: processed,
            queued: self.queued.load(Ordering::SeqCst),
            errors: failed,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            active_requests: self.active_requests.load(Ordering::SeqCst),
            visited_size: self.visited.load(Ordering::SeqCst),
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII marker for one in-flight request
#[derive(Debug)]
pub struct ActiveRequest<'a> {
    stats: &'a StatsTracker,
}

impl Drop for ActiveRequest<'_> {
    fn drop(&mut self) {
        self.stats.active_requests.fetch_sub(1, Ordering::SeqCst);
    }
}
