//! Scheduler for managing the crawl frontier and visited set
//!
//! This module handles:
//! - The FIFO frontier of pending work items
//! - The visited set that guarantees at-most-one dispatch per URL
//! - Tracking in-flight items so idle workers know whether more work can appear
//! - Enforcing the depth and page budgets at dequeue and enqueue time

use crate::state::StatsTracker;
use crate::url::same_host;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

/// Most links a single page may add to the frontier
pub const MAX_LINKS_PER_PAGE: usize = 20;

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: Url,

    /// Link distance from the seed (the seed is 0)
    pub depth: u32,

    /// The page this URL was discovered on
    pub referrer: Option<String>,
}

impl WorkItem {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            referrer: None,
        }
    }
}

/// What a worker should do next
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The worker now owns this URL; it has been added to the visited set
    Claimed(WorkItem),

    /// The URL was already visited; nothing to fetch
    Duplicate(WorkItem),

    /// Nothing dispatchable right now, but in-flight items may still add work
    /// or free page budget
    Wait,

    /// The crawl has nothing left to do
    Done,
}

/// Frontier queue, visited set and in-flight count, guarded together
#[derive(Debug, Default)]
struct Frontier {
    queue: VecDeque<WorkItem>,
    visited: HashSet<String>,
    in_flight: usize,
}

/// Scheduler owns the frontier and enforces crawl budgets
///
/// All frontier mutations go through one mutex, so "is it visited?" and
/// "mark it visited" can't interleave between workers.
pub struct Scheduler {
    frontier: Mutex<Frontier>,
    seed_host: String,
    max_depth: u32,
    max_pages: usize,
    stats: Arc<StatsTracker>,
}

impl Scheduler {
    /// Creates a scheduler seeded with one work item
    ///
    /// # Arguments
    ///
    /// * `seed` - The depth-0 work item
    /// * `seed_host` - Only links on this exact host are followed
    /// * `max_depth` - Deepest depth that may be enqueued
    /// * `max_pages` - Page record budget
    /// * `stats` - Receives queue and visited gauges; its page count drives the budget
    pub fn new(
        seed: WorkItem,
        seed_host: String,
        max_depth: u32,
        max_pages: usize,
        stats: Arc<StatsTracker>,
    ) -> Self {
        let mut frontier = Frontier::default();
        frontier.queue.push_back(seed);

        let scheduler = Self {
            frontier: Mutex::new(frontier),
            seed_host,
            max_depth,
            max_pages,
            stats,
        };
        scheduler.publish_sizes(&scheduler.lock());
        scheduler
    }

    fn lock(&self) -> MutexGuard<'_, Frontier> {
        self.frontier.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_sizes(&self, frontier: &Frontier) {
        self.stats
            .set_frontier_sizes(frontier.queue.len(), frontier.visited.len());
    }

    /// Takes the next work item off the frontier
    ///
    /// A claimed item counts as in flight until [`Scheduler::complete`] is
    /// called for it. Claims are held back while pages already produced plus
    /// items in flight would reach `max_pages`, so the page cap is never
    /// overshot by concurrent workers.
    ///
    /// The page count is read under the frontier lock. A worker records its
    /// page before [`Scheduler::complete`] releases its claim, so the count
    /// seen here never lags behind the in-flight count.
    pub fn next_item(&self) -> Dispatch {
        let mut frontier = self.lock();
        let pages_done = self.stats.processed();

        if pages_done >= self.max_pages {
            return Dispatch::Done;
        }

        if pages_done + frontier.in_flight >= self.max_pages {
            return Dispatch::Wait;
        }

        let Some(item) = frontier.queue.pop_front() else {
            return if frontier.in_flight == 0 {
                Dispatch::Done
            } else {
                Dispatch::Wait
            };
        };

        let dispatch = if frontier.visited.insert(item.url.as_str().to_string()) {
            frontier.in_flight += 1;
            Dispatch::Claimed(item)
        } else {
            Dispatch::Duplicate(item)
        };

        self.publish_sizes(&frontier);
        dispatch
    }

    /// Marks a claimed item as finished
    ///
    /// Callers must record the item's result and enqueue its links before
    /// calling this; otherwise an idle worker could see an empty frontier
    /// with nothing in flight and end the crawl early.
    pub fn complete(&self) {
        let mut frontier = self.lock();
        frontier.in_flight = frontier.in_flight.saturating_sub(1);
    }

    /// Enqueues links discovered on a page
    ///
    /// Links are kept in document order when they are on the seed host, not
    /// yet visited, and not repeated on the same page; at most
    /// [`MAX_LINKS_PER_PAGE`] survive. Nothing is enqueued when the page is
    /// already at `max_depth` or the page budget is used up.
    ///
    /// # Arguments
    ///
    /// * `page` - The work item the links were found on
    /// * `links` - Absolute candidate URLs in document order
    ///
    /// # Returns
    ///
    /// The number of work items added to the frontier
    pub fn discover(&self, page: &WorkItem, links: &[Url]) -> usize {
        if page.depth >= self.max_depth {
            return 0;
        }

        let mut frontier = self.lock();
        if self.stats.processed() >= self.max_pages {
            return 0;
        }

        let depth = page.depth + 1;
        let referrer = page.url.as_str();
        let mut seen_on_page = HashSet::new();
        let accepted: Vec<WorkItem> = links
            .iter()
            .filter(|link| same_host(link, &self.seed_host))
            .filter(|link| !frontier.visited.contains(link.as_str()))
            .filter(|link| seen_on_page.insert(link.as_str()))
            .take(MAX_LINKS_PER_PAGE)
            .map(|link| WorkItem {
                url: link.clone(),
                depth,
                referrer: Some(referrer.to_string()),
            })
            .collect();

        let added = accepted.len();
        frontier.queue.extend(accepted);
        self.publish_sizes(&frontier);
        added
    }

    /// Returns whether a URL has been claimed by a worker
    #[cfg(test)]
    fn is_visited(&self, url: &Url) -> bool {
        self.lock().visited.contains(url.as_str())
    }

    /// Returns the number of work items in the frontier
    #[cfg(test)]
    fn frontier_size(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns the number of claimed items not yet completed
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}
