//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker loop that coordinates all aspects of the
//! crawling process, including:
//! - Validating the seed and seeding the frontier
//! - Running the worker pool until the frontier drains, the page cap is hit
//!   or the crawl is stopped
//! - Gating each URL on robots.txt and the global rate limiter
//! - Fetching with retries, extracting, and feeding links back
//! - Publishing progress snapshots and the final result

use crate::config::{validate, Config};
use crate::crawler::fetcher::{
    build_http_client, fetch_page, with_retry, FetchError, FetchedPage, RetryPolicy,
};
use crate::crawler::limiter::RateLimiter;
use crate::crawler::parser::{ExtractedPage, HtmlExtractor, PageContext, PageExtractor};
use crate::crawler::scheduler::{Dispatch, Scheduler, WorkItem};
use crate::robots::{fetch_robots, robots_key, robots_path, RobotsCache};
use crate::state::{CrawlError, CrawlResult, CrawlStats, ResultAccumulator, StatsTracker};
use crate::url::{extract_host, parse_seed_url};
use crate::WalkError;
use reqwest::Client;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Pause between two items handled by the same worker
const WORKER_PAUSE: Duration = Duration::from_millis(10);

/// How long an idle worker sleeps before checking the frontier again
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Crawl engine configured once and started per seed URL
pub struct Crawler {
    config: Arc<Config>,
    client: Client,
    extractor: Arc<dyn PageExtractor>,
}

impl Crawler {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration; validated here
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to start crawls
    /// * `Err(WalkError)` - Invalid configuration or HTTP client failure
    pub fn new(config: Config) -> Result<Self, WalkError> {
        validate(&config)?;
        let client = build_http_client(&config)?;

        Ok(Self {
            config: Arc::new(config),
            client,
            extractor: Arc::new(HtmlExtractor::new()),
        })
    }

    /// Replaces the HTML extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts crawling from `seed_url` in the background
    ///
    /// Must be called from within a Tokio runtime. Each call starts an
    /// independent crawl with its own frontier, caches and statistics.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlHandle)` - Progress stream, stop control and the result
    /// * `Err(WalkError::InvalidInput)` - The seed is not an absolute
    ///   `http`/`https` URL; no request was made
    pub fn start(&self, seed_url: &str) -> Result<CrawlHandle, WalkError> {
        let seed = parse_seed_url(seed_url).map_err(|e| {
            WalkError::InvalidInput(format!("Invalid seed URL '{}': {}", seed_url, e))
        })?;
        let seed_host = extract_host(&seed).ok_or_else(|| {
            WalkError::InvalidInput(format!("Seed URL '{}' has no host", seed_url))
        })?;

        let crawler = &self.config.crawler;
        let stats = Arc::new(StatsTracker::new());
        let scheduler = Scheduler::new(
            WorkItem::seed(seed.clone()),
            seed_host,
            crawler.max_depth,
            crawler.max_pages as usize,
            stats.clone(),
        );

        let cancel = CancellationToken::new();
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();

        let context = Arc::new(CrawlContext {
            config: self.config.clone(),
            user_agent: self.config.user_agent_string(),
            client: self.client.clone(),
            extractor: self.extractor.clone(),
            scheduler,
            limiter: RateLimiter::new(crawler.request_delay()),
            robots: RobotsCache::new(),
            results: ResultAccumulator::new(),
            stats,
            cancel: cancel.clone(),
            progress_tx,
            progress_lock: Mutex::new(()),
        });

        tracing::info!(
            "Starting crawl of {} (workers: {}, max pages: {}, max depth: {}, delay: {}ms, robots: {})",
            seed,
            crawler.max_concurrency,
            crawler.max_pages,
            crawler.max_depth,
            context.limiter.delay().as_millis(),
            if crawler.respect_robots { "respected" } else { "ignored" }
        );

        let task = tokio::spawn(run_crawl(context));

        Ok(CrawlHandle {
            cancel,
            progress: Some(progress_rx),
            task,
        })
    }

    /// Crawls `seed_url` to completion and returns the result
    pub async fn run(&self, seed_url: &str) -> Result<CrawlResult, WalkError> {
        self.start(seed_url)?.join().await
    }
}

/// Control surface of a running crawl
///
/// Progress snapshots arrive on [`CrawlHandle::take_progress`]; the result
/// is delivered once by [`CrawlHandle::join`]. Dropping the handle leaves
/// the crawl running to completion in the background.
pub struct CrawlHandle {
    cancel: CancellationToken,
    progress: Option<mpsc::UnboundedReceiver<CrawlStats>>,
    task: JoinHandle<CrawlResult>,
}

impl CrawlHandle {
    /// Stops the crawl
    ///
    /// Pending fetches, rate-limit waits and backoff sleeps are abandoned.
    /// Nothing is recorded for abandoned items. [`CrawlHandle::join`] still
    /// returns everything gathered so far. Stopping twice is a no-op.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Stop requested, finishing up");
        }
        self.cancel.cancel();
    }

    /// A token that stops this crawl when cancelled, for signal handlers
    pub fn stop_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Takes the progress stream
    ///
    /// One snapshot is sent per completed item, with non-decreasing
    /// counters. Returns `None` after the first call.
    pub fn take_progress(&mut self) -> Option<mpsc::UnboundedReceiver<CrawlStats>> {
        self.progress.take()
    }

    /// Waits for every worker to exit and returns the result
    pub async fn join(self) -> Result<CrawlResult, WalkError> {
        Ok(self.task.await?)
    }
}

/// State shared by every worker of one crawl
struct CrawlContext {
    config: Arc<Config>,
    user_agent: String,
    client: Client,
    extractor: Arc<dyn PageExtractor>,
    scheduler: Scheduler,
    limiter: RateLimiter,
    robots: RobotsCache,
    results: ResultAccumulator,
    stats: Arc<StatsTracker>,
    cancel: CancellationToken,
    progress_tx: mpsc::UnboundedSender<CrawlStats>,
    /// Serializes snapshot-and-send so snapshots arrive in order
    progress_lock: Mutex<()>,
}

/// Marks a claimed item complete when dropped, even if the worker bails out
struct Claim<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.scheduler.complete();
    }
}

/// Runs the worker pool and assembles the result
async fn run_crawl(context: Arc<CrawlContext>) -> CrawlResult {
    let worker_count = context.config.crawler.max_concurrency.max(1);
    let mut workers = JoinSet::new();
    for worker_id in 0..worker_count {
        workers.spawn(run_worker(context.clone(), worker_id));
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Worker task failed: {}", e);
        }
    }

    let result = context.results.take_result(context.stats.snapshot());
    let stats = &result.stats;
    tracing::info!(
        "Crawl {}: {} pages, {} errors, {} skipped, {} duplicates in {:.1}s",
        if context.cancel.is_cancelled() { "stopped" } else { "finished" },
        stats.processed,
        stats.failed,
        stats.skipped,
        stats.duplicates,
        stats.elapsed_ms as f64 / 1000.0
    );
    if !context.robots.is_empty() {
        tracing::debug!("robots.txt rules cached for {} host(s)", context.robots.len());
    }

    result
}

/// One worker: claim, process, report, pause, until there is nothing left
async fn run_worker(context: Arc<CrawlContext>, worker_id: u32) {
    tracing::debug!("Worker {} started", worker_id);

    loop {
        if context.cancel.is_cancelled() {
            break;
        }

        let item = match context.scheduler.next_item() {
            Dispatch::Claimed(item) => item,
            Dispatch::Duplicate(item) => {
                tracing::debug!("Already visited, skipping {}", item.url);
                context.stats.record_duplicate();
                context.report_progress();
                continue;
            }
            Dispatch::Wait => {
                if context.pause(IDLE_POLL).await {
                    continue;
                }
                break;
            }
            Dispatch::Done => break,
        };

        let claim = Claim {
            scheduler: &context.scheduler,
        };
        let finished = context.process(&item).await;
        // Results and links are in place before the claim is released
        drop(claim);

        if !finished {
            tracing::debug!("Abandoned {} (crawl stopped)", item.url);
            break;
        }

        context.report_progress();

        if !context.pause(WORKER_PAUSE).await {
            break;
        }
    }

    tracing::debug!("Worker {} finished", worker_id);
}

impl CrawlContext {
    /// Handles one claimed item
    ///
    /// # Returns
    ///
    /// `false` when the crawl was stopped before the item reached an outcome
    async fn process(&self, item: &WorkItem) -> bool {
        if self.config.crawler.respect_robots {
            match self.robots_allows(&item.url).await {
                None => return false,
                Some(false) => {
                    tracing::info!("Blocked by robots.txt: {}", item.url);
                    self.stats.record_skipped();
                    return true;
                }
                Some(true) => {}
            }
        }

        let url = &item.url;
        let policy = RetryPolicy::from(&self.config.crawler);
        let fetched = with_retry(policy, &self.cancel, url, move |attempt| {
            self.fetch_attempt(url, attempt)
        })
        .await;

        let page = match fetched {
            Ok(page) => {
                tracing::debug!(
                    "Fetched {} (HTTP {}, {}, {} bytes)",
                    page.final_url,
                    page.status_code,
                    page.content_type,
                    page.body.len()
                );
                page
            }
            Err(FetchError::Cancelled) => return false,
            Err(e) => {
                self.record_failure(item, e.to_string());
                return true;
            }
        };

        let context = PageContext {
            url: &item.url,
            base_url: &page.final_url,
            depth: item.depth,
            referrer: item.referrer.as_deref(),
            load_time: page.load_time,
        };

        match self.extractor.extract(&page.body, &context) {
            Ok(extracted) => self.record_page(item, extracted),
            Err(e) => self.record_failure(item, format!("Failed to parse page: {}", e)),
        }

        true
    }

    /// One rate-limited GET; abandoned as soon as the crawl is stopped
    async fn fetch_attempt(&self, url: &Url, attempt: u32) -> Result<FetchedPage, FetchError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
            result = async {
                self.limiter.acquire().await;
                let _active = self.stats.request_started();
                tracing::debug!("Fetching {} (attempt {})", url, attempt);
                fetch_page(&self.client, url, self.config.crawler.timeout()).await
            } => result,
        }
    }

    /// Checks robots.txt for `url`, fetching it on the first visit to a host
    ///
    /// Returns `None` when the crawl was stopped while waiting.
    async fn robots_allows(&self, url: &Url) -> Option<bool> {
        let key = robots_key(url);
        let key_ref = key.as_str();
        let context = self;

        let rules = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            rules = self.robots.get_or_fetch(key_ref, move || async move {
                context.limiter.acquire().await;
                let _active = context.stats.request_started();
                fetch_robots(
                    &context.client,
                    key_ref,
                    &context.user_agent,
                    context.config.crawler.timeout(),
                )
                .await
            }) => rules,
        };

        Some(rules.is_allowed(&robots_path(url)))
    }

    fn record_page(&self, item: &WorkItem, page: ExtractedPage) {
        let ExtractedPage { record, links } = page;
        tracing::info!(
            "Crawled {} (depth {}, {} links, {}ms)",
            item.url,
            item.depth,
            record.link_count,
            record.load_time_ms
        );

        if !self
            .results
            .push_page(record, self.config.crawler.max_pages as usize)
        {
            tracing::debug!(
                "Page cap reached ({} pages), dropping {}",
                self.results.page_count(),
                item.url
            );
            return;
        }
        self.stats.record_processed();

        let added = self.scheduler.discover(item, &links);
        tracing::debug!("Queued {} new link(s) from {}", added, item.url);
    }

    fn record_failure(&self, item: &WorkItem, message: String) {
        tracing::warn!("Failed {}: {}", item.url, message);
        self.results
            .push_error(CrawlError::new(item.url.as_str(), message));
        self.stats.record_failed();
    }

    /// Publishes a progress snapshot
    fn report_progress(&self) {
        let _guard = self
            .progress_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.stats.snapshot();
        tracing::debug!(
            "Progress: {} processed, {} failed, {} skipped, {} queued, {} in flight, {} active",
            snapshot.processed,
            snapshot.failed,
            snapshot.skipped,
            snapshot.queued,
            self.scheduler.in_flight(),
            snapshot.active_requests
        );
        // Nobody listening is fine
        let _ = self.progress_tx.send(snapshot);
    }

    /// Sleeps for `duration`; returns `false` if the crawl was stopped instead
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
